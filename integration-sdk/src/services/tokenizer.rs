//! PII tokenization vault client
//!
//! Replaces sensitive field values with opaque tokens. When the vault is
//! not configured or the call fails, the original values come back with
//! `enabled = false`, which callers must treat as "not redacted".

use std::time::Duration;

use config_rs::TokenizerSettings;
use error_handling::{FailSoft, FailSoftResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, post_json, UserAgent};

const SERVICE_NAME: &str = "tokenizer";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    #[serde(default)]
    records: Vec<TokenizedRecord>,
}

#[derive(Debug, Deserialize)]
struct TokenizedRecord {
    #[serde(default)]
    fields: Map<String, Value>,
}

pub struct TokenizerClient {
    http: Option<Client>,
    settings: TokenizerSettings,
    fail_soft: FailSoft,
}

impl TokenizerClient {
    pub fn new(settings: TokenizerSettings) -> Self {
        let http = build_http_client(Some(UserAgent::for_client(SERVICE_NAME)), Some(TIMEOUT)).ok();
        let fail_soft = FailSoft::new(SERVICE_NAME, settings.is_configured() && http.is_some());
        Self {
            http,
            settings,
            fail_soft,
        }
    }

    pub fn from_env() -> Self {
        Self::new(TokenizerSettings::from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.fail_soft.is_configured()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/vaults/{}/tokenize",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.vault_id.as_deref().unwrap_or_default()
        )
    }

    /// Tokenize one record of `field -> value` pairs.
    pub async fn tokenize(&self, fields: &Map<String, Value>) -> FailSoftResult<Map<String, Value>> {
        self.fail_soft
            .call("tokenize", || self.request(fields), || fields.clone())
            .await
    }

    async fn request(&self, fields: &Map<String, Value>) -> Result<Map<String, Value>> {
        if fields.is_empty() {
            return Ok(Map::new());
        }
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| ServiceError::configuration("HTTP client unavailable"))?;
        let token = self.settings.api_token.as_deref().unwrap_or_default();
        let auth = format!("Bearer {}", token);

        let response: TokenizeResponse = post_json(
            http,
            SERVICE_NAME,
            &self.endpoint(),
            &[("Authorization", auth.as_str())],
            &json!({ "records": [{ "fields": fields }] }),
        )
        .await?;

        let tokenized = response
            .records
            .into_iter()
            .next()
            .map(|r| r.fields)
            .ok_or_else(|| ServiceError::parsing("tokenize response carried no records"))?;

        // Every requested field must come back as a token.
        let missing: Vec<&str> = fields
            .keys()
            .filter(|field| !tokenized.contains_key(field.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::parsing(format!(
                "tokenize response missing fields: {}",
                missing.join(", ")
            )));
        }
        Ok(tokenized)
    }
}
