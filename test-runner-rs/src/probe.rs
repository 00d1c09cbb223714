//! # HTTP Probe Executor
//!
//! Issues exactly one request per test case and turns whatever happens
//! (a response of any status, a timeout, a refused connection) into a
//! [`RequestRecord`]. Nothing in here returns an error to the caller once
//! the executor is built.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use shared_types::{HttpMethod, RequestRecord, ResponseBody, TestCase};
use tracing::debug;

/// Per-probe timeout used when none is configured.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Sends probes with a bounded timeout and no retries.
#[derive(Debug, Clone)]
pub struct ProbeExecutor {
    client: Client,
    timeout: Duration,
}

impl ProbeExecutor {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::ClientBuild(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `case` against `base_url`.
    pub async fn execute(&self, case: &TestCase, base_url: &str) -> RequestRecord {
        let method = case.method();
        let url = case.url(base_url);
        let body = if method.sends_body() {
            case.payload().cloned()
        } else {
            None
        };

        let mut builder = self.client.request(to_reqwest_method(method), &url);
        if let Some(payload) = &body {
            builder = builder.json(payload);
        }

        let request = match builder.build() {
            Ok(request) => request,
            Err(e) => {
                debug!(%method, url = %url, error = %e, "Probe request could not be built");
                return RequestRecord::transport_failure(method, url, BTreeMap::new(), body, e.to_string());
            }
        };
        let request_headers = header_map(request.headers());

        match self.client.execute(request).await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let response_headers = header_map(response.headers());
                let is_json = is_json_content_type(response.headers());
                let response_body = match response.bytes().await {
                    Ok(bytes) => parse_body(&bytes, is_json),
                    Err(e) => {
                        // Status arrived but the body did not; keep the status.
                        ResponseBody::TransportError(e.to_string())
                    }
                };
                debug!(%method, url = %url, status = status_code, "Probe completed");

                RequestRecord {
                    method,
                    url,
                    request_headers,
                    request_body: body,
                    status_code,
                    response_headers,
                    response_body,
                }
            }
            Err(e) => {
                debug!(%method, url = %url, error = %e, "Probe failed before a response arrived");
                RequestRecord::transport_failure(method, url, request_headers, body, describe_error(&e))
            }
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Repeated header names are joined with `, `.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

/// `application/json` and any `+json` media type.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let media = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            media == "application/json" || media.ends_with("+json")
        })
        .unwrap_or(false)
}

fn parse_body(bytes: &[u8], is_json: bool) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }
    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return ResponseBody::Json(value);
        }
    }
    ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
}

fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_json_content_types() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert!(is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json_content_type(&headers));

        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn test_parse_body_degrades_to_text() {
        assert_eq!(parse_body(b"", true), ResponseBody::Empty);
        assert_eq!(parse_body(b"{\"a\":1}", true), ResponseBody::Json(serde_json::json!({"a": 1})));
        assert_eq!(parse_body(b"{oops", true), ResponseBody::Text("{oops".to_string()));
        assert_eq!(parse_body(b"{\"a\":1}", false), ResponseBody::Text("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let map = header_map(&headers);
        assert_eq!(map.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }
}
