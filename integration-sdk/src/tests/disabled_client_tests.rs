//! Unconfigured clients must never reach the network

use serde_json::{json, Map};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::services::collections::CollectionClient;
use crate::services::reports::ReportStoreClient;
use crate::services::tokenizer::TokenizerClient;
use crate::services::vector_search::VectorSearchClient;
use config_rs::{CollectionSettings, ReportStoreSettings, TokenizerSettings, VectorSearchSettings};

/// Server that fails the test if it receives any request.
async fn silent_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_tokenizer_without_token_is_disabled() {
    let mock_server = silent_server().await;
    let client = TokenizerClient::new(TokenizerSettings {
        vault_id: Some("vault".to_string()),
        api_token: None,
        base_url: mock_server.uri(),
    });

    let mut fields = Map::new();
    fields.insert("phone".to_string(), json!("555-0100"));
    let result = client.tokenize(&fields).await;

    assert!(!client.is_enabled());
    assert!(!result.enabled);
    assert_eq!(result.value, fields);
    assert_eq!(result.reason.as_deref(), Some("tokenizer is not configured"));
}

#[tokio::test]
async fn test_collections_without_key_is_disabled() {
    let mock_server = silent_server().await;
    let client = CollectionClient::new(CollectionSettings {
        api_key: None,
        base_url: mock_server.uri(),
        workspace_id: None,
    });

    let result = client.create_collection(&json!({})).await;
    assert!(!result.enabled);
    assert_eq!(result.value, None);
}

#[tokio::test]
async fn test_reports_without_dataset_is_disabled() {
    let mock_server = silent_server().await;
    let client = ReportStoreClient::new(ReportStoreSettings {
        project_id: Some("p".to_string()),
        dataset: None,
        write_token: Some("t".to_string()),
        base_url: Some(mock_server.uri()),
        ..ReportStoreSettings::default()
    });

    let result = client.create_report(&json!({})).await;
    assert!(!result.enabled);
    assert_eq!(result.value, None);
}

#[tokio::test]
async fn test_vector_search_without_url_is_disabled() {
    // No URL means there is no server to reach; the short-circuit reason
    // shows the request was never attempted.
    let client = VectorSearchClient::new(VectorSearchSettings {
        url: None,
        api_key: Some("key".to_string()),
    });
    assert!(!client.is_enabled());

    let search = client.search("code_index:x", "q", 5).await;
    assert!(!search.enabled);
    assert!(search.value.is_empty());
    assert_eq!(search.reason.as_deref(), Some("vector-search is not configured"));

    let upsert = client.upsert("code_index:x", &[]).await;
    assert!(!upsert.enabled);
    assert_eq!(upsert.value, 0);
    assert_eq!(upsert.reason.as_deref(), Some("vector-search is not configured"));
}
