//! Test collection manager client
//!
//! Registers a collection document and returns the id the service assigned.

use std::time::Duration;

use config_rs::CollectionSettings;
use error_handling::{FailSoft, FailSoftResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, post_json, UserAgent};

const SERVICE_NAME: &str = "collections";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct CreateCollectionResponse {
    #[serde(default)]
    collection: CollectionRef,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionRef {
    uid: Option<String>,
    id: Option<String>,
}

pub struct CollectionClient {
    http: Option<Client>,
    settings: CollectionSettings,
    fail_soft: FailSoft,
}

impl CollectionClient {
    pub fn new(settings: CollectionSettings) -> Self {
        let http = build_http_client(Some(UserAgent::for_client(SERVICE_NAME)), Some(TIMEOUT)).ok();
        let fail_soft = FailSoft::new(SERVICE_NAME, settings.is_configured() && http.is_some());
        Self {
            http,
            settings,
            fail_soft,
        }
    }

    pub fn from_env() -> Self {
        Self::new(CollectionSettings::from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.fail_soft.is_configured()
    }

    /// Create a collection and return its id, or `None` when degraded.
    pub async fn create_collection(&self, collection: &Value) -> FailSoftResult<Option<String>> {
        self.fail_soft
            .call("create_collection", || self.request(collection), || None)
            .await
    }

    async fn request(&self, collection: &Value) -> Result<Option<String>> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| ServiceError::configuration("HTTP client unavailable"))?;

        let mut url = format!("{}/collections", self.settings.base_url.trim_end_matches('/'));
        if let Some(workspace) = &self.settings.workspace_id {
            url.push_str(&format!("?workspace={}", workspace));
        }

        let api_key = self.settings.api_key.as_deref().unwrap_or_default();
        let response: CreateCollectionResponse = post_json(
            http,
            SERVICE_NAME,
            &url,
            &[("X-Api-Key", api_key)],
            &json!({ "collection": collection }),
        )
        .await?;

        let id = response
            .collection
            .uid
            .or(response.collection.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::parsing("collection created but no id returned"))?;
        info!(collection_id = %id, "Collection created");
        Ok(Some(id))
    }
}
