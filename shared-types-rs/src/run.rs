// shared-types-rs/src/run.rs
// Outcome of one pass over a test suite

use serde::{Deserialize, Serialize};

use crate::http::RequestRecord;

/// The first failing assertion of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    pub test_name: String,
    pub reason: String,
    pub failed_record: RequestRecord,
}

/// Result of a stop-on-first-failure run.
///
/// When `success` is false the history ends with the failing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunResult {
    pub success: bool,
    pub request_history: Vec<RequestRecord>,
    pub failure: Option<TestFailure>,
}

impl TestRunResult {
    pub fn passed(request_history: Vec<RequestRecord>) -> Self {
        Self {
            success: true,
            request_history,
            failure: None,
        }
    }

    pub fn failed(request_history: Vec<RequestRecord>, failure: TestFailure) -> Self {
        Self {
            success: false,
            request_history,
            failure: Some(failure),
        }
    }
}
