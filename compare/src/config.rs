use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::info;

use crate::diff::Difference;
use crate::diff::diff;
use crate::endpoint::probe;
use crate::environment;
use crate::error::CompareError;

/// Named configuration surfaces probed on both deployments.
pub const CONFIG_SOURCES: [(&str, &str); 4] = [
    ("api_info", "/api/"),
    ("version_info", "/__version__"),
    ("heartbeat", "/__heartbeat__"),
    ("lbheartbeat", "/__lbheartbeat__"),
];

/// Differences whose path contains one of these are expected to vary
/// between deployments and never affect the exit code.
const IGNORED_PATH_MARKERS: [&str; 3] = ["timestamp", "commit", "version"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigComparison {
    pub timestamp: String,
    pub local_config: Value,
    pub staging_config: Value,
    pub differences: Vec<Difference>,
    pub environment_vars: Value,
}

impl ConfigComparison {
    /// List-length records and ignored-path records are reported but never
    /// significant.
    pub fn significant_differences(&self) -> Vec<&Difference> {
        self.differences
            .iter()
            .filter(|difference| {
                !matches!(difference, Difference::ListLengthDifference { .. })
                    && !IGNORED_PATH_MARKERS
                        .iter()
                        .any(|marker| difference.path().contains(marker))
            })
            .collect()
    }

    pub fn has_significant_differences(&self) -> bool {
        !self.significant_differences().is_empty()
    }
}

/// Probe the configuration surfaces on both deployments, diff them, then
/// attach the local environment snapshot. The snapshot is carried in the
/// report but never diffed, since it has no staging counterpart.
pub async fn run_comparison(
    local_base_url: &str,
    staging_base_url: &str,
) -> Result<ConfigComparison, CompareError> {
    info!("starting configuration comparison");
    let client = reqwest::Client::new();

    let mut local_config = Map::new();
    let mut staging_config = Map::new();
    for (name, endpoint) in CONFIG_SOURCES {
        info!("checking endpoint: {endpoint}");
        local_config.insert(
            name.to_string(),
            probe(&client, local_base_url, endpoint).await,
        );
        staging_config.insert(
            name.to_string(),
            probe(&client, staging_base_url, endpoint).await,
        );
    }

    let differences = diff(
        &Value::Object(local_config.clone()),
        &Value::Object(staging_config.clone()),
    );

    info!("collecting local environment configuration");
    let environment = environment::collect().await;
    let environment_vars = environment
        .get("environment_variables")
        .cloned()
        .unwrap_or(Value::Null);
    local_config.insert("environment".to_string(), environment);

    Ok(ConfigComparison {
        timestamp: Local::now().to_rfc3339(),
        local_config: Value::Object(local_config),
        staging_config: Value::Object(staging_config),
        differences,
        environment_vars,
    })
}
