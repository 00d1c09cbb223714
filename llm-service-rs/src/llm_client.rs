// llm-service-rs/src/llm_client.rs
//
// HTTP client for OpenAI-compatible chat completion endpoints
//
// - JSON-object responses only (`response_format: json_object`)
// - Exponential backoff on server errors, rate limits and network failures
// - Client errors are returned immediately
//
// Configuration comes from `LlmSettings` (LLM_API_KEY / OPENAI_API_KEY,
// LLM_API_URL, LLM_MODEL, LLM_MAX_RETRIES, LLM_TIMEOUT_SECS).

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use config_rs::LlmSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(8);
const MAX_ELAPSED: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Failures talking to the model, split by whether a retry can help.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    NotConfigured,

    // 400, 401, 403, 404
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    // 500, 502, 503, 504
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ServerError(_) | LlmError::NetworkError(_) | LlmError::RateLimitExceeded(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
    initial_retry_delay: Duration,
    max_retry_delay: Duration,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::UnknownError(format!("failed to build HTTP client: {}", e)))?;

        log::info!(
            "LLM client initialized for {} (model: {}, configured: {})",
            settings.api_url,
            settings.model,
            settings.is_configured()
        );

        Ok(Self {
            client,
            settings,
            initial_retry_delay: DEFAULT_INITIAL_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        })
    }

    /// Override the backoff delays.
    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_retry_delay = initial;
        self.max_retry_delay = max.max(initial);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_retry_delay)
            .with_max_interval(self.max_retry_delay)
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(MAX_ELAPSED))
            .with_randomization_factor(0.5)
            .build()
    }

    /// Send one system + user exchange and return the reply text.
    ///
    /// Retries up to `max_retries` extra times on retryable errors.
    pub async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String, LlmError> {
        let api_key = self.settings.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let request_body = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: Some(0.0),
        };

        let mut backoff = self.create_backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if attempt > 1 {
                log::info!("Retry attempt {} for LLM request", attempt);
            }

            match self.execute_request(api_key, &request_body).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if !err.is_retryable() || attempt > self.settings.max_retries {
                        log::error!("LLM request failed after {} attempts: {}", attempt, err);
                        return Err(err);
                    }

                    match backoff.next_backoff() {
                        Some(delay) => {
                            log::warn!("Retryable error: {}. Retrying in {:?}", err, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            log::error!("Exceeded maximum backoff time: {}", err);
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    /// Like [`generate_text`](Self::generate_text) but parses the reply as JSON.
    pub async fn complete_json(&self, prompt: &str, system_prompt: &str) -> Result<Value, LlmError> {
        let text = self.generate_text(prompt, system_prompt).await?;
        parse_json_content(&text)
    }

    async fn execute_request(&self, api_key: &str, request_body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(api_key)
            .json(request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::NetworkError(format!("Request timed out: {}", err))
                } else if err.is_connect() {
                    LlmError::NetworkError(format!("Connection failed: {}", err))
                } else {
                    LlmError::NetworkError(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 401 | 403 | 404 => LlmError::InvalidRequest(format!("{}: {}", status, text)),
                429 => LlmError::RateLimitExceeded(text),
                500 | 502 | 503 | 504 => LlmError::ServerError(format!("{}: {}", status, text)),
                _ => LlmError::UnknownError(format!("{}: {}", status, text)),
            });
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &data.usage {
            log::info!("LLM request completed. Used {} tokens", usage.total_tokens);
        }

        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseError("No choices returned in response".to_string()))
    }
}

/// Parse model output as JSON, unwrapping a fenced code block if present.
pub fn parse_json_content(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| LlmError::ParseError(format!("Model output is not JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_fenced_json() {
        assert_eq!(parse_json_content(r#"{"a":1}"#).unwrap()["a"], 1);
        assert_eq!(parse_json_content("```json\n{\"a\": 2}\n```").unwrap()["a"], 2);
        assert_eq!(parse_json_content("```\n{\"a\": 3}\n```\n").unwrap()["a"], 3);
        tokio_test::assert_err!(parse_json_content("Sorry, I cannot help"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::ServerError("503".into()).is_retryable());
        assert!(LlmError::RateLimitExceeded("slow down".into()).is_retryable());
        assert!(LlmError::NetworkError("reset".into()).is_retryable());
        assert!(!LlmError::InvalidRequest("401".into()).is_retryable());
        assert!(!LlmError::ParseError("junk".into()).is_retryable());
        assert!(!LlmError::NotConfigured.is_retryable());
    }
}
