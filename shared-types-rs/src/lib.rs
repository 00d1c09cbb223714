//! Data model for the API quality pipeline.
//!
//! Everything that crosses a crate boundary lives here: declarative test
//! cases, recorded HTTP exchanges, run results, the persisted failure log
//! and the diagnosis payload.

pub mod context;
pub mod diagnosis;
pub mod failure_log;
pub mod http;
pub mod run;
pub mod test_case;

pub use context::{RetrievedContext, Snippet};
pub use diagnosis::{DiagnosisRecord, FailureCategory, NO_INFORMATION};
pub use failure_log::{FailingCall, FailureDetails, FailureLogRecord, RequestData, ResponseData, RunStatus};
pub use http::{HttpMethod, RequestRecord, ResponseBody};
pub use run::{TestFailure, TestRunResult};
pub use test_case::{SuiteError, TestCase, TestSuite};

pub type Result<T> = std::result::Result<T, SuiteError>;
