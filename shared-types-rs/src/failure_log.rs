// shared-types-rs/src/failure_log.rs
// Persisted per-run log record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::http::{HttpMethod, RequestRecord, ResponseBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Passed => write!(f, "passed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

/// Request/response pair view of the record that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailingCall {
    pub request_data: RequestData,
    pub response_data: ResponseData,
}

impl From<&RequestRecord> for FailingCall {
    fn from(record: &RequestRecord) -> Self {
        Self {
            request_data: RequestData {
                method: record.method,
                url: record.url.clone(),
                headers: record.request_headers.clone(),
                body: record.request_body.clone(),
            },
            response_data: ResponseData {
                status_code: record.status_code,
                headers: record.response_headers.clone(),
                body: record.response_body.clone(),
            },
        }
    }
}

/// Fields present only on failed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub test_name: String,
    pub failure_reason: String,
    pub failing_call: FailingCall,
}

/// Canonical record of one run, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureLogRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub commit_hash: String,
    pub status: RunStatus,
    #[serde(flatten)]
    pub failure: Option<FailureDetails>,
    pub request_history: Vec<RequestRecord>,
}

impl FailureLogRecord {
    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.failure_reason.as_str())
    }

    pub fn test_name(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.test_name.as_str())
    }
}
