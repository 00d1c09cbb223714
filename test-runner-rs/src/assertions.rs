//! Pass/fail rules applied to each recorded probe.

use shared_types::{RequestRecord, ResponseBody, TestCase};

/// Reason for a probe that never got a response.
pub fn transport_failure_reason(case: &TestCase, record: &RequestRecord) -> String {
    let detail = match &record.response_body {
        ResponseBody::TransportError(message) | ResponseBody::Text(message) => message.as_str(),
        _ => "unknown error",
    };
    format!("Exception calling {}: {}", case.endpoint(), detail)
}

/// `None` when `record` satisfies `case`, otherwise the failure reason.
///
/// Checks run in order: transport failure, status membership, then the
/// JSON requirement. Empty JSON objects and arrays count as JSON.
pub fn check_record(case: &TestCase, record: &RequestRecord) -> Option<String> {
    if record.is_transport_failure() {
        return Some(transport_failure_reason(case, record));
    }

    if !case.accepts(record.status_code) {
        return Some(format!(
            "Expected {} from {}, got {}",
            case.expected_description(),
            case.endpoint(),
            record.status_code
        ));
    }

    if case.requires_json() && !record.response_body.is_structured() {
        return Some(format!("Expected JSON response from {}", case.endpoint()));
    }

    None
}
