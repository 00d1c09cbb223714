//! Report document store client
//!
//! Creates one document per run through the store's mutation endpoint.

use std::time::Duration;

use config_rs::ReportStoreSettings;
use error_handling::{FailSoft, FailSoftResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, post_json, UserAgent};

const SERVICE_NAME: &str = "reports";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateResponse {
    #[serde(default)]
    document_ids: Vec<String>,
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
struct MutateResult {
    id: Option<String>,
}

pub struct ReportStoreClient {
    http: Option<Client>,
    settings: ReportStoreSettings,
    fail_soft: FailSoft,
}

impl ReportStoreClient {
    pub fn new(settings: ReportStoreSettings) -> Self {
        let http = build_http_client(Some(UserAgent::for_client(SERVICE_NAME)), Some(TIMEOUT)).ok();
        let fail_soft = FailSoft::new(SERVICE_NAME, settings.is_configured() && http.is_some());
        Self {
            http,
            settings,
            fail_soft,
        }
    }

    pub fn from_env() -> Self {
        Self::new(ReportStoreSettings::from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.fail_soft.is_configured()
    }

    fn mutate_url(&self) -> String {
        let base = match &self.settings.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.api.sanity.io",
                self.settings.project_id.as_deref().unwrap_or_default()
            ),
        };
        format!(
            "{}/{}/data/mutate/{}?returnIds=true",
            base,
            self.settings.api_version,
            self.settings.dataset.as_deref().unwrap_or_default()
        )
    }

    /// Store `document` and return its id, or `None` when degraded.
    pub async fn create_report(&self, document: &Value) -> FailSoftResult<Option<String>> {
        self.fail_soft
            .call("create_report", || self.request(document), || None)
            .await
    }

    async fn request(&self, document: &Value) -> Result<Option<String>> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| ServiceError::configuration("HTTP client unavailable"))?;
        let auth = format!("Bearer {}", self.settings.write_token.as_deref().unwrap_or_default());

        let response: MutateResponse = post_json(
            http,
            SERVICE_NAME,
            &self.mutate_url(),
            &[("Authorization", auth.as_str())],
            &json!({ "mutations": [{ "create": document }] }),
        )
        .await?;

        let id = response
            .document_ids
            .into_iter()
            .next()
            .or_else(|| response.results.into_iter().find_map(|r| r.id))
            .ok_or_else(|| ServiceError::parsing("report stored but no document id returned"))?;
        info!(report_id = %id, "Report document created");
        Ok(Some(id))
    }
}
