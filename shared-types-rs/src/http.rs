// shared-types-rs/src/http.rs
// HTTP method and recorded exchange types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::test_case::SuiteError;

/// Methods the probe executor knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST and PUT carry the test payload; GET and DELETE never send a body.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HttpMethod {
    type Error = SuiteError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(SuiteError::UnsupportedMethod(value.to_string())),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = SuiteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HttpMethod::try_from(value.as_str())
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Response payload as observed by the probe.
///
/// Serializes to the bare JSON value (or string) so persisted logs keep the
/// flat shape consumers expect. Reading a log back cannot tell a text body
/// from a transport error; `status_code == 0` is the marker for the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    TransportError(String),
}

impl ResponseBody {
    /// True for JSON objects and arrays, including empty ones.
    pub fn is_structured(&self) -> bool {
        matches!(self, ResponseBody::Json(Value::Object(_)) | ResponseBody::Json(Value::Array(_)))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl From<ResponseBody> for Value {
    fn from(body: ResponseBody) -> Self {
        match body {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) | ResponseBody::TransportError(text) => Value::String(text),
        }
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResponseBody::Empty,
            Value::String(text) => ResponseBody::Text(text),
            other => ResponseBody::Json(other),
        }
    }
}

/// One HTTP exchange, exactly as the probe saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub method: HttpMethod,
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
    pub request_body: Option<Value>,
    /// 0 when the request never reached the network.
    pub status_code: u16,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: ResponseBody,
}

impl RequestRecord {
    /// Record for a call that failed before any response arrived.
    pub fn transport_failure(
        method: HttpMethod,
        url: impl Into<String>,
        request_headers: BTreeMap<String, String>,
        request_body: Option<Value>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            request_headers,
            request_body,
            status_code: 0,
            response_headers: BTreeMap::new(),
            response_body: ResponseBody::TransportError(error.into()),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0
    }
}
