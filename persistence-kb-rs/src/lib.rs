//! Persistence for run artifacts: the canonical failure log, its redacted
//! copy, the raw log file and the keyed run history.

pub mod failure_log;
pub mod raw_log;
pub mod redaction;
pub mod run_store;

pub use failure_log::build_failure_log;
pub use raw_log::write_raw_log;
pub use redaction::{redact_failure_log, PII_FIELDS};
pub use run_store::RunStore;
