use std::time::Duration;
use std::time::Instant;

use chrono::Local;
use reqwest::header::ACCEPT;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;

use crate::diff::Difference;
use crate::diff::diff;
use crate::endpoint::truncate_chars;
use crate::error::CompareError;

/// Per-request budget for one side of one endpoint.
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "treeline-api-compare/1.0";

/// The key API endpoints compared when no explicit list is given. The job
/// and push listings are bounded so the payloads stay comparable.
pub fn default_endpoints() -> Vec<String> {
    [
        "/api/",
        "/api/repository/",
        "/api/project/",
        "/api/optioncollectionhash/",
        "/api/failureclassification/",
        "/api/user/",
        "/api/bugzilla/",
        "/api/performance/framework/",
        "/api/performance/platform/",
        "/api/jobs/?count=10",
        "/api/push/?count=10",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub fn http_client() -> Result<reqwest::Client, CompareError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointComparison {
    pub endpoint: String,
    pub local_status: u16,
    pub staging_status: u16,
    pub local_response_time: f64,
    pub staging_response_time: f64,
    pub data_matches: bool,
    pub differences: Vec<Difference>,
    pub local_size: usize,
    pub staging_size: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSummary {
    pub timestamp: String,
    pub local_base_url: String,
    pub staging_base_url: String,
    pub total_endpoints: usize,
    pub matching_endpoints: usize,
    pub status_code_mismatches: usize,
    pub avg_local_response_time: f64,
    pub avg_staging_response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiComparison {
    pub comparison_summary: ApiSummary,
    pub detailed_results: Vec<EndpointComparison>,
}

impl ApiComparison {
    /// Tool-level significance: any endpoint whose data does not match.
    pub fn has_mismatches(&self) -> bool {
        self.detailed_results.iter().any(|r| !r.data_matches)
    }
}

/// Fetch one side of an endpoint. Never fails: a transport error folds into
/// status 0 with an `{error}` body, and a non-JSON body is wrapped in an
/// error record with a truncated text excerpt. Always reports elapsed time.
async fn fetch(client: &reqwest::Client, base_url: &str, endpoint: &str) -> (u16, Value, f64) {
    let url = format!("{}{endpoint}", base_url.trim_end_matches('/'));
    let start = Instant::now();
    let response = match client.get(&url).timeout(API_TIMEOUT).send().await {
        Ok(response) => response,
        Err(err) => {
            return (0, json!({"error": err.to_string()}), start.elapsed().as_secs_f64());
        }
    };
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            return (status, json!({"error": err.to_string()}), start.elapsed().as_secs_f64());
        }
    };
    let elapsed = start.elapsed().as_secs_f64();
    let data = serde_json::from_str::<Value>(&body).unwrap_or_else(|_| {
        json!({
            "error": "Invalid JSON response",
            "text": truncate_chars(&body, 500),
        })
    });
    (status, data, elapsed)
}

fn payload_size(data: &Value) -> usize {
    serde_json::to_string(data).map_or(0, |encoded| encoded.len())
}

/// Compare one endpoint between the two deployments.
pub async fn compare_endpoint(
    client: &reqwest::Client,
    local_base_url: &str,
    staging_base_url: &str,
    endpoint: &str,
) -> EndpointComparison {
    info!("comparing {endpoint}");
    let ((local_status, local_data, local_time), (staging_status, staging_data, staging_time)) = tokio::join!(
        fetch(client, local_base_url, endpoint),
        fetch(client, staging_base_url, endpoint),
    );

    let differences = diff(&local_data, &staging_data);
    EndpointComparison {
        endpoint: endpoint.to_string(),
        local_status,
        staging_status,
        local_response_time: local_time,
        staging_response_time: staging_time,
        data_matches: differences.is_empty(),
        local_size: payload_size(&local_data),
        staging_size: payload_size(&staging_data),
        differences,
        timestamp: Local::now().to_rfc3339(),
    }
}

pub fn summarize(
    local_base_url: &str,
    staging_base_url: &str,
    results: &[EndpointComparison],
) -> ApiSummary {
    let total = results.len();
    let average = |select: fn(&EndpointComparison) -> f64| {
        if total == 0 {
            0.0
        } else {
            results.iter().map(select).sum::<f64>() / total as f64
        }
    };
    ApiSummary {
        timestamp: Local::now().to_rfc3339(),
        local_base_url: local_base_url.to_string(),
        staging_base_url: staging_base_url.to_string(),
        total_endpoints: total,
        matching_endpoints: results.iter().filter(|r| r.data_matches).count(),
        status_code_mismatches: results
            .iter()
            .filter(|r| r.local_status != r.staging_status)
            .count(),
        avg_local_response_time: average(|r| r.local_response_time),
        avg_staging_response_time: average(|r| r.staging_response_time),
    }
}

/// Probe every endpoint against both deployments and assemble the report.
pub async fn run_comparison(
    local_base_url: &str,
    staging_base_url: &str,
    endpoints: &[String],
) -> Result<ApiComparison, CompareError> {
    let client = http_client()?;
    info!(
        "starting API comparison: local={local_base_url} staging={staging_base_url} endpoints={}",
        endpoints.len()
    );

    let mut detailed_results = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        detailed_results
            .push(compare_endpoint(&client, local_base_url, staging_base_url, endpoint).await);
    }

    Ok(ApiComparison {
        comparison_summary: summarize(local_base_url, staging_base_url, &detailed_results),
        detailed_results,
    })
}
