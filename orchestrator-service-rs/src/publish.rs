//! Collection registration and report publishing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use config_rs::AppSettings;
use integration_sdk::{CollectionClient, ReportStoreClient};
use llm_service::DiagnosisSource;
use serde::Serialize;
use serde_json::{json, Value};
use shared_types::{DiagnosisRecord, FailingCall, RunStatus, TestCase, TestSuite};
use tracing::{info, warn};

use crate::pipeline::PipelineRunResult;

const COLLECTION_SCHEMA: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

fn status_script(case: &TestCase) -> Vec<String> {
    let expected = case
        .expected_status()
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!("pm.test('{} returns {}', function() {{", case.name(), case.expected_description()),
        format!("    pm.expect(pm.response.code).to.be.oneOf([{}]);", expected),
        "});".to_string(),
    ];
    if case.requires_json() {
        lines.push(format!("pm.test('{} returns JSON', function() {{", case.name()));
        lines.push("    pm.response.to.be.json;".to_string());
        lines.push("});".to_string());
    }
    lines
}

fn request_item(case: &TestCase) -> Value {
    let path: Vec<&str> = case
        .endpoint()
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    let mut request = json!({
        "method": case.method().as_str(),
        "url": {
            "raw": format!("{{{{base_url}}}}{}", case.endpoint()),
            "host": ["{{base_url}}"],
            "path": path,
        },
        "header": [],
    });
    if let (true, Some(payload)) = (case.method().sends_body(), case.payload()) {
        request["header"] = json!([{"key": "Content-Type", "value": "application/json"}]);
        request["body"] = json!({
            "mode": "raw",
            "raw": serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string()),
            "options": {"raw": {"language": "json"}},
        });
    }

    json!({
        "name": case.name(),
        "request": request,
        "event": [{
            "listen": "test",
            "script": {"exec": status_script(case), "type": "text/javascript"},
        }],
    })
}

/// Collection document with one request item and status check per case.
pub fn collection_document(name: &str, suite: &TestSuite, base_url: &str) -> Value {
    json!({
        "info": {
            "name": name,
            "description": format!("{} API checks against {}", suite.len(), base_url),
            "schema": COLLECTION_SCHEMA,
        },
        "item": suite.iter().map(request_item).collect::<Vec<_>>(),
        "variable": [{"key": "base_url", "value": base_url.trim_end_matches('/')}],
    })
}

/// Stored report for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    #[serde(rename = "_type")]
    pub doc_type: &'static str,
    pub run_id: String,
    pub commit_hash: String,
    pub base_url: String,
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub diagnosis: DiagnosisRecord,
    pub diagnosis_source: DiagnosisSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_call: Option<FailingCall>,
    pub pii_tokenized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl ReportDocument {
    pub fn from_run(result: &PipelineRunResult, collection_id: Option<String>) -> Self {
        let failure = result.failure_log.failure.as_ref();
        Self {
            doc_type: "testReport",
            run_id: result.run_id.clone(),
            commit_hash: result.commit_hash.clone(),
            base_url: result.base_url.clone(),
            timestamp: result.timestamp,
            status: result.failure_log.status,
            test_name: failure.map(|f| f.test_name.clone()),
            failure_reason: failure.map(|f| f.failure_reason.clone()),
            diagnosis: result.diagnosis.clone(),
            diagnosis_source: result.diagnosis_source,
            failing_call: failure.map(|f| f.failing_call.clone()),
            pii_tokenized: result.pii_tokenized,
            collection_id,
        }
    }
}

/// Write `report` as `{dir}/{run_id}_report.json`.
pub fn write_report(dir: &Path, report: &ReportDocument) -> error_handling::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_report.json", report.run_id));
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!(path = %path.display(), "Report written");
    Ok(path)
}

/// Fail-soft publishing to the collection and report services.
pub struct Publisher {
    collections: CollectionClient,
    reports: ReportStoreClient,
}

impl Publisher {
    pub fn new(collections: CollectionClient, reports: ReportStoreClient) -> Self {
        Self { collections, reports }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            CollectionClient::new(settings.collections.clone()),
            ReportStoreClient::new(settings.reports.clone()),
        )
    }

    /// Register the suite as a collection. `None` when the service is off
    /// or failing.
    pub async fn register_suite(&self, name: &str, suite: &TestSuite, base_url: &str) -> Option<String> {
        let result = self
            .collections
            .create_collection(&collection_document(name, suite, base_url))
            .await;
        if let Some(reason) = result.reason {
            info!(reason = %reason, "Suite not registered as a collection");
        }
        result.value
    }

    pub async fn publish_report(&self, report: &ReportDocument) -> Option<String> {
        let document = match serde_json::to_value(report) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Report did not serialize");
                return None;
            }
        };
        let result = self.reports.create_report(&document).await;
        if let Some(reason) = result.reason {
            info!(reason = %reason, "Report not published");
        }
        result.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_items_follow_suite() {
        let document = collection_document("checks", &TestSuite::default_suite(), "http://api:8000/");

        let items = document["item"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "health_check");
        assert_eq!(items[0]["request"]["method"], "GET");
        assert_eq!(items[0]["request"]["url"]["path"], json!(["health"]));
        assert!(items[0]["request"].get("body").is_none());

        assert_eq!(items[1]["request"]["method"], "POST");
        assert!(items[1]["request"]["body"]["raw"].as_str().unwrap().contains("test_user"));
        let script = items[1]["event"][0]["script"]["exec"].as_array().unwrap();
        assert!(script.iter().any(|line| line.as_str().unwrap().contains("oneOf([200, 401])")));

        assert_eq!(document["variable"][0]["value"], "http://api:8000");
    }
}
