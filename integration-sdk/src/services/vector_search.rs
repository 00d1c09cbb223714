//! Vector similarity search client
//!
//! Queries named indexes for ranked text snippets and upserts documents
//! into them. An empty result list is a normal answer.

use std::time::Duration;

use config_rs::VectorSearchSettings;
use error_handling::{FailSoft, FailSoftResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::Snippet;

use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, post_json, UserAgent};

const SERVICE_NAME: &str = "vector-search";
const TIMEOUT: Duration = Duration::from_secs(15);

/// A document to index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub text: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Snippet>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default)]
    indexed: Option<usize>,
}

pub struct VectorSearchClient {
    http: Option<Client>,
    settings: VectorSearchSettings,
    fail_soft: FailSoft,
}

impl VectorSearchClient {
    pub fn new(settings: VectorSearchSettings) -> Self {
        let http = build_http_client(Some(UserAgent::for_client(SERVICE_NAME)), Some(TIMEOUT)).ok();
        let fail_soft = FailSoft::new(SERVICE_NAME, settings.is_configured() && http.is_some());
        Self {
            http,
            settings,
            fail_soft,
        }
    }

    pub fn from_env() -> Self {
        Self::new(VectorSearchSettings::from_env())
    }

    /// Client that never performs I/O.
    pub fn disabled() -> Self {
        Self::new(VectorSearchSettings::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.fail_soft.is_configured()
    }

    fn index_url(&self, index_name: &str, action: &str) -> String {
        format!(
            "{}/indexes/{}/{}",
            self.settings.url.as_deref().unwrap_or_default().trim_end_matches('/'),
            index_name,
            action
        )
    }

    fn auth_header(&self) -> Option<String> {
        self.settings.api_key.as_ref().map(|key| format!("Bearer {}", key))
    }

    /// Top `top_k` snippets for `query` from `index_name`.
    pub async fn search(&self, index_name: &str, query: &str, top_k: usize) -> FailSoftResult<Vec<Snippet>> {
        self.fail_soft
            .call("search", || self.request_search(index_name, query, top_k), Vec::new)
            .await
    }

    /// Add `documents` to `index_name`, returning how many were indexed.
    pub async fn upsert(&self, index_name: &str, documents: &[IndexDocument]) -> FailSoftResult<usize> {
        self.fail_soft
            .call("upsert", || self.request_upsert(index_name, documents), || 0)
            .await
    }

    fn http(&self) -> Result<&Client> {
        self.http
            .as_ref()
            .ok_or_else(|| ServiceError::configuration("HTTP client unavailable"))
    }

    async fn request_search(&self, index_name: &str, query: &str, top_k: usize) -> Result<Vec<Snippet>> {
        let auth = self.auth_header();
        let headers: Vec<(&str, &str)> = auth.iter().map(|a| ("Authorization", a.as_str())).collect();

        let response: SearchResponse = post_json(
            self.http()?,
            SERVICE_NAME,
            &self.index_url(index_name, "search"),
            &headers,
            &json!({ "query": query, "top_k": top_k }),
        )
        .await?;

        let mut results = response.results;
        results.truncate(top_k);
        Ok(results)
    }

    async fn request_upsert(&self, index_name: &str, documents: &[IndexDocument]) -> Result<usize> {
        let auth = self.auth_header();
        let headers: Vec<(&str, &str)> = auth.iter().map(|a| ("Authorization", a.as_str())).collect();

        let response: UpsertResponse = post_json(
            self.http()?,
            SERVICE_NAME,
            &self.index_url(index_name, "documents"),
            &headers,
            &json!({ "documents": documents }),
        )
        .await?;

        Ok(response.indexed.unwrap_or(documents.len()))
    }
}
