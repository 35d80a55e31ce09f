#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use treeline_compare::endpoint::probe;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test]
async fn json_success_keeps_the_decoded_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-backend", "treeline")
                .set_body_json(json!({"projects": ["alpha"]})),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let record = probe(&client, &server.uri(), "/api/").await;

    assert_eq!(record["status"], "success");
    assert_eq!(record["status_code"], 200);
    assert_eq!(record["data"], json!({"projects": ["alpha"]}));
    assert_eq!(record["headers"]["x-backend"], "treeline");
}

#[tokio::test]
async fn non_json_success_falls_back_to_a_truncated_text_excerpt() {
    let server = MockServer::start().await;
    let body = "x".repeat(800);
    Mock::given(method("GET"))
        .and(path("/__lbheartbeat__"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let record = probe(&client, &server.uri(), "/__lbheartbeat__").await;

    assert_eq!(record["status"], "success");
    let excerpt = record["data"].as_str().unwrap();
    assert_eq!(excerpt.chars().count(), 500);
}

#[tokio::test]
async fn error_status_keeps_the_code_and_a_short_excerpt() {
    let server = MockServer::start().await;
    let body = "boom ".repeat(100);
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let record = probe(&client, &server.uri(), "/api/").await;

    assert_eq!(record["status"], "error");
    assert_eq!(record["status_code"], 404);
    assert_eq!(record["error"].as_str().unwrap().chars().count(), 200);
    assert!(record.get("data").is_none());
}

#[tokio::test]
async fn transport_failure_has_no_status_code() {
    let client = reqwest::Client::new();
    // Port 1 is never listening.
    let record = probe(&client, "http://127.0.0.1:1", "/api/").await;

    assert_eq!(record["status"], "error");
    assert!(record.get("status_code").is_none());
    assert!(!record["error"].as_str().unwrap().is_empty());
}
