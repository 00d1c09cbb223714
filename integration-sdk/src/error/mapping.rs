//! Error mapping for HTTP responses
//!
//! Converts non-2xx responses from the external services into the
//! normalized ServiceError type.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Pull the most specific message out of a JSON error body.
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`,
/// `{"message": ..}` and `{"error": {"description": ..}}` shapes.
fn extract_message(json: &Value) -> Option<&str> {
    match json.get("error") {
        Some(Value::String(message)) => Some(message.as_str()),
        Some(error) => error
            .get("message")
            .or_else(|| error.get("description"))
            .and_then(|m| m.as_str()),
        None => json.get("message").and_then(|m| m.as_str()),
    }
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    context.status_code = Some(status.as_u16());

    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(extract_message)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });

    if let Some(Value::Object(map)) = &parsed {
        if let Some(code) = map.get("code").and_then(|c| c.as_str()) {
            context.add("error_code", code);
        }
    }

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::NOT_FOUND => ServiceError::service(format!("Resource not found: {}", message)),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => ServiceError::network(message),
        _ => ServiceError::service(message),
    }
}
