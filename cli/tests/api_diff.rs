#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::predicate;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

async fn mock_api(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn identical_deployments_exit_zero_and_write_the_report() {
    let local = mock_api(json!({"version": 1})).await;
    let staging = mock_api(json!({"version": 1})).await;
    let output_dir = tempfile::tempdir().unwrap();
    let report_path = output_dir.path().join("api_comparison.json");

    let local_uri = local.uri();
    let staging_uri = staging.uri();
    let report = report_path.clone();
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("api-diff")
            .unwrap()
            .args([
                "--local",
                &local_uri,
                "--staging",
                &staging_uri,
                "--endpoints",
                "/api/",
                "--output",
                report.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("COMPARISON SUMMARY"))
            .stdout(predicate::str::contains("Data matches: 1"));
    })
    .await
    .unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written["comparison_summary"]["total_endpoints"], 1);
    assert_eq!(written["detailed_results"][0]["data_matches"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn differing_deployments_exit_one() {
    let local = mock_api(json!({"version": 1})).await;
    let staging = mock_api(json!({"version": 2})).await;

    let local_uri = local.uri();
    let staging_uri = staging.uri();
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("api-diff")
            .unwrap()
            .args([
                "--local",
                &local_uri,
                "--staging",
                &staging_uri,
                "--endpoints",
                "/api/",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Data matches: 0"));
    })
    .await
    .unwrap();
}
