//! Test Runner Library
//! Executes a test suite against a base URL, one HTTP probe per case,
//! stopping at the first failing assertion.

mod assertions;
mod probe;
mod recorder;
mod runner;

pub use assertions::{check_record, transport_failure_reason};
pub use probe::{ProbeError, ProbeExecutor, DEFAULT_PROBE_TIMEOUT};
pub use recorder::InteractionRecorder;
pub use runner::TestRunner;
