use std::time::Duration;

use serde_json::json;
use shared_types::{HttpMethod, ResponseBody, TestCase, TestSuite};
use test_runner::{ProbeExecutor, TestRunner};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn runner() -> TestRunner {
    tokio_test::assert_ok!(TestRunner::new(Duration::from_secs(5)))
}

/// Base URL of a port nothing is listening on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_without_body_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let case = TestCase::new("health_check", HttpMethod::Get, "/health", None, [200], false).unwrap();
    let suite = TestSuite::new(vec![case]).unwrap();

    let result = runner().run(&suite, &server.uri()).await;

    assert!(result.success);
    assert!(result.failure.is_none());
    assert_eq!(result.request_history.len(), 1);
    let record = &result.request_history[0];
    assert_eq!(record.status_code, 200);
    assert_eq!(record.response_body, ResponseBody::Empty);
    assert_eq!(record.request_body, None);
}

#[tokio::test]
async fn login_rejected_with_json_passes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "test_user", "password": "wrong_password"})))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let suite = TestSuite::from_json_str(
        r#"[{"name": "login_requirements", "method": "POST", "endpoint": "/login",
             "payload": {"username": "test_user", "password": "wrong_password"},
             "expected_status": [200, 401], "requires_json": true}]"#,
    )
    .unwrap();

    let result = runner().run(&suite, &server.uri()).await;

    assert!(result.success);
    let record = &result.request_history[0];
    assert_eq!(record.status_code, 401);
    assert_eq!(record.response_body, ResponseBody::Json(json!({"error": "invalid credentials"})));
    assert_eq!(record.request_headers.get("content-type").map(String::as_str), Some("application/json"));
}

#[tokio::test]
async fn default_suite_passes_against_healthy_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .mount(&server)
        .await;

    let suite = TestSuite::default_suite();
    let result = runner().run(&suite, &format!("{}/", server.uri())).await;

    assert!(result.success);
    assert_eq!(result.request_history.len(), suite.len());
}

#[tokio::test]
async fn server_error_stops_run_with_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cases = TestSuite::default_suite().cases().to_vec();
    cases.push(TestCase::new("profile", HttpMethod::Get, "/profile", None, [200], false).unwrap());
    let suite = TestSuite::new(cases).unwrap();

    let result = runner().run(&suite, &server.uri()).await;

    assert!(!result.success);
    assert_eq!(result.request_history.len(), 2);
    let failure = result.failure.unwrap();
    assert_eq!(failure.test_name, "login_requirements");
    assert_eq!(failure.reason, "Expected 200 or 401 from /login, got 500");
    assert_eq!(failure.failed_record, result.request_history[1]);
    assert_eq!(failure.failed_record.response_body, ResponseBody::Text("Internal Server Error".to_string()));
}

#[tokio::test]
async fn plain_text_fails_json_requirement() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2]"))
        .mount(&server)
        .await;

    let case = TestCase::new("items", HttpMethod::Get, "/items", None, [200], true).unwrap();
    let suite = TestSuite::new(vec![case]).unwrap();

    let result = runner().run(&suite, &server.uri()).await;

    assert!(!result.success);
    assert_eq!(result.failure.unwrap().reason, "Expected JSON response from /items");
}

#[tokio::test]
async fn first_failure_at_index_zero_sends_nothing_else() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = runner().run(&TestSuite::default_suite(), &server.uri()).await;

    assert!(!result.success);
    assert_eq!(result.request_history.len(), 1);
    assert_eq!(result.failure.unwrap().reason, "Expected 200 from /health, got 503");
}

#[tokio::test]
async fn connection_refused_is_recorded_with_status_zero() {
    let base_url = closed_port_url();
    let result = runner().run(&TestSuite::default_suite(), &base_url).await;

    assert!(!result.success);
    assert_eq!(result.request_history.len(), 1);

    let failure = result.failure.unwrap();
    assert_eq!(failure.test_name, "health_check");
    assert_eq!(failure.failed_record.status_code, 0);
    assert!(matches!(failure.failed_record.response_body, ResponseBody::TransportError(_)));
    assert!(failure.reason.starts_with("Exception calling /health: "));
}

#[tokio::test]
async fn timeout_is_a_failing_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ProbeExecutor::new(Duration::from_millis(200)).unwrap();
    let runner = TestRunner::with_executor(executor);
    let result = runner.run(&TestSuite::default_suite(), &server.uri()).await;

    assert!(!result.success);
    assert_eq!(result.request_history.len(), 1);
    assert_eq!(result.request_history[0].status_code, 0);
    assert!(result.failure.unwrap().reason.contains("timed out"));
}

#[tokio::test]
async fn get_and_delete_never_send_a_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let case = TestCase::new(
        "delete_item",
        HttpMethod::Delete,
        "/items/1",
        Some(json!({"ignored": true})),
        [204],
        false,
    )
    .unwrap();
    let result = runner().run(&TestSuite::new(vec![case]).unwrap(), &server.uri()).await;

    assert!(result.success);
    assert_eq!(result.request_history[0].request_body, None);
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}
