//! Common utilities for service clients
//!
//! Shared HTTP plumbing: client construction, JSON POST with status
//! handling, and error response parsing.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ErrorContext, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "quality-agent".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("integration-sdk".to_string()),
        }
    }
}

impl UserAgent {
    pub fn for_client(extra: &str) -> Self {
        Self {
            extra: Some(extra.to_string()),
            ..Self::default()
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(30)))
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))?;

    Ok(client)
}

/// Parse error response from HTTP response
pub async fn parse_error_response(service_name: &str, endpoint: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let mut context = ErrorContext::for_service(service_name).endpoint(endpoint);

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    crate::error::mapping::map_http_error(status, &body, &mut context).with_context(context)
}

/// POST a JSON body and decode a JSON response.
///
/// `headers` are added on top of the client's defaults. Any non-2xx status
/// becomes a mapped [`ServiceError`].
pub async fn post_json<B, T>(
    client: &Client,
    service_name: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let start = Instant::now();
    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;
    let status = response.status();
    debug!(
        service = service_name,
        url = url,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "External call completed"
    );

    if !status.is_success() {
        let err = parse_error_response(service_name, url, response).await;
        debug!(
            service = err.service_name().unwrap_or(service_name),
            status = ?err.status_code(),
            retryable = err.is_retryable(),
            "External call rejected"
        );
        return Err(err);
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        ServiceError::parsing(format!("Invalid {} response: {}", service_name, e))
            .with_context(ErrorContext::for_service(service_name).endpoint(url))
    })
}
