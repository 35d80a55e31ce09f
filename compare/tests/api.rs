#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use treeline_compare::api::run_comparison;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test]
async fn identical_deployments_match_on_every_endpoint() {
    let local = MockServer::start().await;
    let staging = MockServer::start().await;
    for server in [&local, &staging] {
        Mock::given(method("GET"))
            .and(path("/api/repository/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "alpha"}])))
            .mount(server)
            .await;
    }

    let endpoints = vec!["/api/repository/".to_string()];
    let comparison = run_comparison(&local.uri(), &staging.uri(), &endpoints)
        .await
        .unwrap();

    assert!(!comparison.has_mismatches());
    assert_eq!(comparison.comparison_summary.total_endpoints, 1);
    assert_eq!(comparison.comparison_summary.matching_endpoints, 1);
    assert_eq!(comparison.comparison_summary.status_code_mismatches, 0);
    assert!(comparison.detailed_results[0].differences.is_empty());
}

#[tokio::test]
async fn differing_payloads_are_flagged_with_difference_records() {
    let local = MockServer::start().await;
    let staging = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": 1})))
        .mount(&local)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": 2})))
        .mount(&staging)
        .await;

    let endpoints = vec!["/api/".to_string()];
    let comparison = run_comparison(&local.uri(), &staging.uri(), &endpoints)
        .await
        .unwrap();

    assert!(comparison.has_mismatches());
    let result = &comparison.detailed_results[0];
    assert!(!result.data_matches);
    assert_eq!(result.differences.len(), 1);
    assert_eq!(result.differences[0].path(), "version");
}

#[tokio::test]
async fn unreachable_side_records_status_zero() {
    let local = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&local)
        .await;

    let endpoints = vec!["/api/".to_string()];
    let comparison = run_comparison(&local.uri(), "http://127.0.0.1:1", &endpoints)
        .await
        .unwrap();

    let result = &comparison.detailed_results[0];
    assert_eq!(result.local_status, 200);
    assert_eq!(result.staging_status, 0);
    assert!(!result.data_matches);
}

#[tokio::test]
async fn non_json_body_is_wrapped_in_an_error_record() {
    let local = MockServer::start().await;
    let staging = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&local)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&staging)
        .await;

    let endpoints = vec!["/api/".to_string()];
    let comparison = run_comparison(&local.uri(), &staging.uri(), &endpoints)
        .await
        .unwrap();

    let result = &comparison.detailed_results[0];
    assert!(!result.data_matches);
    assert!(
        result
            .differences
            .iter()
            .any(|difference| difference.path() == "error" || difference.path() == "text")
    );
}
