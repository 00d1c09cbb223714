use chrono::{DateTime, Utc};
use shared_types::{FailingCall, FailureDetails, FailureLogRecord, RunStatus, TestRunResult};

/// Build the canonical log record for a finished run.
///
/// Pure: the same inputs always give an identical record. The timestamp is
/// taken from the caller, never from the clock.
pub fn build_failure_log(
    result: &TestRunResult,
    commit_hash: &str,
    run_id: &str,
    timestamp: DateTime<Utc>,
) -> FailureLogRecord {
    let (status, failure) = match (&result.failure, result.success) {
        (None, true) => (RunStatus::Passed, None),
        (Some(failure), _) => (
            RunStatus::Failed,
            Some(FailureDetails {
                test_name: failure.test_name.clone(),
                failure_reason: failure.reason.clone(),
                failing_call: FailingCall::from(&failure.failed_record),
            }),
        ),
        // Unsuccessful without details cannot come from the runner, but a
        // hand-built result still gets a failed status.
        (None, false) => (RunStatus::Failed, None),
    };

    FailureLogRecord {
        run_id: run_id.to_string(),
        timestamp,
        commit_hash: commit_hash.to_string(),
        status,
        failure,
        request_history: result.request_history.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use shared_types::{HttpMethod, RequestRecord, ResponseBody, TestFailure};
    use std::collections::BTreeMap;

    fn record(status: u16, url: &str) -> RequestRecord {
        RequestRecord {
            method: HttpMethod::Post,
            url: url.to_string(),
            request_headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            request_body: Some(json!({"username": "test_user"})),
            status_code: status,
            response_headers: BTreeMap::new(),
            response_body: ResponseBody::Json(json!({"detail": "boom"})),
        }
    }

    fn failed_run() -> TestRunResult {
        let first = record(200, "http://api/health");
        let second = record(500, "http://api/login");
        TestRunResult::failed(
            vec![first, second.clone()],
            TestFailure {
                test_name: "login_requirements".to_string(),
                reason: "Expected 200 or 401 from /login, got 500".to_string(),
                failed_record: second,
            },
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_failed_run_extracts_failing_call() {
        let log = build_failure_log(&failed_run(), "abc123", "run-1", at());

        assert_eq!(log.status, RunStatus::Failed);
        assert_eq!(log.request_history.len(), 2);
        let failure = log.failure.unwrap();
        assert_eq!(failure.test_name, "login_requirements");
        assert_eq!(failure.failing_call.request_data.url, "http://api/login");
        assert_eq!(failure.failing_call.response_data.status_code, 500);
    }

    #[test]
    fn test_passed_run_keeps_history_only() {
        let passed = TestRunResult::passed(vec![record(200, "http://api/health")]);
        let log = build_failure_log(&passed, "abc123", "run-2", at());

        assert_eq!(log.status, RunStatus::Passed);
        assert!(log.failure.is_none());
        assert_eq!(log.request_history.len(), 1);
    }

    #[test]
    fn test_builder_is_idempotent() {
        let run = failed_run();
        let first = serde_json::to_vec(&build_failure_log(&run, "abc123", "run-1", at())).unwrap();
        let second = serde_json::to_vec(&build_failure_log(&run, "abc123", "run-1", at())).unwrap();
        assert_eq!(first, second);
    }
}
