//! Mock tests for the tokenizer client

use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::services::tokenizer::TokenizerClient;
use config_rs::TokenizerSettings;

fn create_test_client(mock_server: &MockServer) -> TokenizerClient {
    TokenizerClient::new(TokenizerSettings {
        vault_id: Some("vault123".to_string()),
        api_token: Some("token-abc".to_string()),
        base_url: mock_server.uri(),
    })
}

fn record() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("email".to_string(), json!("jane@example.com"));
    fields.insert("ssn".to_string(), json!("123-45-6789"));
    fields
}

#[tokio::test]
async fn test_tokenize_returns_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vaults/vault123/tokenize"))
        .and(header("Authorization", "Bearer token-abc"))
        .and(body_json(json!({
            "records": [{"fields": {"email": "jane@example.com", "ssn": "123-45-6789"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"fields": {"email": "tok_email_1", "ssn": "tok_ssn_1"}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&record()).await;

    assert!(result.enabled);
    assert_eq!(result.value["email"], "tok_email_1");
    assert_eq!(result.value["ssn"], "tok_ssn_1");
}

#[tokio::test]
async fn test_tokenize_error_returns_original() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vaults/vault123/tokenize"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid token"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&record()).await;

    assert!(!result.enabled);
    assert_eq!(result.value, record());
    assert!(result.reason.unwrap().contains("Invalid token"));
}

#[tokio::test]
async fn test_tokenize_malformed_body_returns_original() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&record()).await;

    assert!(!result.enabled);
    assert_eq!(result.value, record());
}

#[tokio::test]
async fn test_tokenize_empty_records_is_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vaults/vault123/tokenize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&record()).await;

    assert!(!result.enabled);
    assert_eq!(result.value, record());
    assert!(result.reason.unwrap().contains("no records"));
}

#[tokio::test]
async fn test_tokenize_partial_fields_is_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vaults/vault123/tokenize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"fields": {"email": "tok_email_1"}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&record()).await;

    assert!(!result.enabled);
    assert_eq!(result.value, record());
    assert!(result.reason.unwrap().contains("ssn"));
}

#[tokio::test]
async fn test_tokenize_empty_input_skips_the_vault() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.tokenize(&Map::new()).await;

    assert!(result.enabled);
    assert!(result.value.is_empty());
}
