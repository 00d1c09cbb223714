//! Deterministic diagnosis used when no model is available.

use shared_types::{DiagnosisRecord, FailureCategory, FailureLogRecord, HttpMethod, RequestRecord};

const UNKNOWN_REASON: &str = "Unknown failure";
const UNKNOWN_TEST: &str = "unknown_test";
const NO_HISTORY_STEP: &str = "Run the test suite against the API";

const STATUS_FIX: &str = "Review the endpoint implementation and make sure that:
1. The route is registered with the router
2. Returned status codes match the API contract
3. Error branches return the documented codes (401 for auth failures, 404 for missing resources)";

const FORMAT_FIX: &str = "Return a JSON body from every branch of the handler, including error paths, \
and set `Content-Type: application/json` on the response.";

const ENVIRONMENT_FIX: &str = "Check:
1. The API service is running and reachable from the test runner
2. Network connectivity and DNS between runner and service
3. Environment variables and configuration of the deployment
4. Service dependencies (database, cache, upstream APIs)";

const REVIEW_FIX: &str = "Review the test definition and the API contract for discrepancies.";

/// A standalone three-digit 4xx or 5xx number.
fn mentions_error_status(reason: &str) -> bool {
    reason
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) && matches!(token.as_bytes()[0], b'4' | b'5'))
}

/// Prefix of the reason recorded when a probe never got a response.
const TRANSPORT_FAILURE_PREFIX: &str = "exception calling ";

/// Category for a failure reason, by substring heuristics.
///
/// A transport failure is always an environment issue, whatever its
/// endpoint looks like. Otherwise status codes win over JSON format
/// mentions, which win over exception or error mentions.
pub fn classify(reason: &str) -> FailureCategory {
    let lower = reason.to_lowercase();
    if lower.starts_with(TRANSPORT_FAILURE_PREFIX) {
        FailureCategory::EnvironmentIssue
    } else if lower.contains("status_code") || lower.contains("status code") || mentions_error_status(&lower) {
        FailureCategory::ProductBug
    } else if lower.contains("json") {
        FailureCategory::ProductBug
    } else if lower.contains("exception") || lower.contains("error") {
        FailureCategory::EnvironmentIssue
    } else {
        FailureCategory::AutomationFlaw
    }
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn curl_command(record: &RequestRecord) -> String {
    let url = shell_quote(&record.url);
    match (&record.method, &record.request_body) {
        (HttpMethod::Get, _) | (_, None) => format!("curl -X {} {}", record.method, url),
        (method, Some(body)) => format!(
            "curl -X {} {} -H 'Content-Type: application/json' -d {}",
            method,
            url,
            shell_quote(&body.to_string())
        ),
    }
}

/// One curl command per recorded request, in order.
pub fn reproduction_steps(history: &[RequestRecord]) -> Vec<String> {
    if history.is_empty() {
        return vec![NO_HISTORY_STEP.to_string()];
    }
    history.iter().map(curl_command).collect()
}

pub fn rule_based_diagnosis(log: &FailureLogRecord) -> DiagnosisRecord {
    if !log.is_failed() {
        return DiagnosisRecord::success();
    }

    let reason = log.failure_reason().unwrap_or(UNKNOWN_REASON);
    let test_name = log.test_name().unwrap_or(UNKNOWN_TEST);
    let lower = reason.to_lowercase();
    let category = classify(reason);

    let (summary, fix) = match category {
        FailureCategory::ProductBug if lower.contains("json") && !mentions_error_status(&lower) => (
            format!(
                "Test '{}' expected a JSON response but received a different format. \
                 The API should return JSON consistently for this endpoint.",
                test_name
            ),
            FORMAT_FIX,
        ),
        FailureCategory::ProductBug => (
            format!(
                "Test '{}' failed due to an unexpected HTTP status code. {}. \
                 The endpoint is not handling the request as the contract requires.",
                test_name, reason
            ),
            STATUS_FIX,
        ),
        FailureCategory::EnvironmentIssue => (
            format!(
                "Test '{}' encountered an exception: {}. \
                 This points to network problems, an unavailable service or misconfiguration.",
                test_name, reason
            ),
            ENVIRONMENT_FIX,
        ),
        _ => (format!("Test '{}' failed: {}", test_name, reason), REVIEW_FIX),
    };

    DiagnosisRecord::new(category, summary, reproduction_steps(&log.request_history), fix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use shared_types::{FailingCall, FailureDetails, ResponseBody, RunStatus};
    use std::collections::BTreeMap;

    fn record(method: HttpMethod, url: &str, body: Option<serde_json::Value>) -> RequestRecord {
        RequestRecord {
            method,
            url: url.to_string(),
            request_headers: BTreeMap::new(),
            request_body: body,
            status_code: 500,
            response_headers: BTreeMap::new(),
            response_body: ResponseBody::Empty,
        }
    }

    fn failed_log(reason: &str, history: Vec<RequestRecord>) -> FailureLogRecord {
        let last = history
            .last()
            .cloned()
            .unwrap_or_else(|| record(HttpMethod::Get, "http://api/", None));
        FailureLogRecord {
            run_id: "r".to_string(),
            timestamp: Utc::now(),
            commit_hash: "c".to_string(),
            status: RunStatus::Failed,
            failure: Some(FailureDetails {
                test_name: "login_requirements".to_string(),
                failure_reason: reason.to_string(),
                failing_call: FailingCall::from(&last),
            }),
            request_history: history,
        }
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(classify("Expected 200 or 401 from /login, got 500"), FailureCategory::ProductBug);
        assert_eq!(classify("Expected 200 from /health, got 404"), FailureCategory::ProductBug);
        assert_eq!(classify("Unexpected status_code"), FailureCategory::ProductBug);
        assert_eq!(classify("Expected JSON response from /health"), FailureCategory::ProductBug);
        assert_eq!(
            classify("Exception calling /health: connection refused"),
            FailureCategory::EnvironmentIssue
        );
        assert_eq!(classify("request timed out"), FailureCategory::AutomationFlaw);
    }

    #[test]
    fn test_transport_failure_wins_over_status_like_paths() {
        assert_eq!(
            classify("Exception calling /errors/500: connection refused"),
            FailureCategory::EnvironmentIssue
        );
        assert_eq!(
            classify("Exception calling /pages/404/json: operation timed out"),
            FailureCategory::EnvironmentIssue
        );
        assert_eq!(classify("Expected 200 from /errors/500, got 503"), FailureCategory::ProductBug);
    }

    #[test]
    fn test_port_numbers_are_not_status_codes() {
        assert_eq!(
            classify("Exception calling /health: tcp connect to 127.0.0.1:45123 failed"),
            FailureCategory::EnvironmentIssue
        );
    }

    #[test]
    fn test_curl_steps_follow_history() {
        let steps = reproduction_steps(&[
            record(HttpMethod::Get, "http://api/health", None),
            record(HttpMethod::Post, "http://api/login", Some(json!({"username": "o'brien"}))),
            record(HttpMethod::Delete, "http://api/items/1", None),
        ]);

        assert_eq!(steps[0], "curl -X GET 'http://api/health'");
        assert_eq!(
            steps[1],
            r#"curl -X POST 'http://api/login' -H 'Content-Type: application/json' -d '{"username":"o'\''brien"}'"#
        );
        assert_eq!(steps[2], "curl -X DELETE 'http://api/items/1'");
    }

    #[test]
    fn test_empty_history_gets_generic_step() {
        assert_eq!(reproduction_steps(&[]), vec![NO_HISTORY_STEP.to_string()]);
    }

    #[test]
    fn test_passed_run_is_success() {
        let log = FailureLogRecord {
            status: RunStatus::Passed,
            failure: None,
            ..failed_log("x", Vec::new())
        };
        assert_eq!(rule_based_diagnosis(&log), DiagnosisRecord::success());
    }

    #[test]
    fn test_login_500_diagnosis() {
        let history = vec![
            record(HttpMethod::Get, "http://api/health", None),
            record(HttpMethod::Post, "http://api/login", Some(json!({"username": "test_user"}))),
        ];
        let diagnosis = rule_based_diagnosis(&failed_log("Expected 200 or 401 from /login, got 500", history));

        assert_eq!(diagnosis.failure_category, FailureCategory::ProductBug);
        assert!(diagnosis.root_cause_summary.contains("login_requirements"));
        assert!(diagnosis.suggested_fix.contains("status codes"));
        assert_eq!(diagnosis.reproduction_steps.len(), 2);
    }

    #[test]
    fn test_json_requirement_diagnosis() {
        let diagnosis = rule_based_diagnosis(&failed_log("Expected JSON response from /health", Vec::new()));
        assert_eq!(diagnosis.failure_category, FailureCategory::ProductBug);
        assert!(diagnosis.suggested_fix.contains("application/json"));
    }
}
