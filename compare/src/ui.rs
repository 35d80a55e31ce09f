use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::error::CompareError;

/// Report file the headless-browser differ writes under its output
/// directory.
pub const UI_REPORT_RELATIVE_PATH: &str = "ui-comparison-report.json";

/// Default location of the node differ script.
pub const DEFAULT_SCRIPT: &str = "ui_comparator.js";

#[derive(Debug, Clone, PartialEq)]
pub struct UiOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Verify the node runtime is present; the caller turns the error into a
/// failed probe result rather than aborting the run.
pub async fn check_node() -> Result<String, CompareError> {
    let output = Command::new("node")
        .arg("--version")
        .output()
        .await
        .map_err(|_| CompareError::Fatal("Node.js not available".to_string()))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    } else {
        Err(CompareError::Fatal("Node.js not available".to_string()))
    }
}

/// Run the headless-browser differ as an opaque subprocess. The script owns
/// screenshots, pixel diffing, and its own report file; this side only
/// relays URLs and captures the outcome.
pub async fn run_comparison(
    script: &Path,
    local_base_url: &str,
    staging_base_url: &str,
    output_dir: &Path,
) -> Result<UiOutcome, CompareError> {
    info!("running UI comparison via {}", script.display());
    let output = Command::new("node")
        .arg(script)
        .arg("--local")
        .arg(local_base_url)
        .arg("--staging")
        .arg(staging_base_url)
        .arg("--output")
        .arg(output_dir)
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(UiOutcome {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
