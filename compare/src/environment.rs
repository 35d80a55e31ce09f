use serde_json::Map;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

/// The closed set of environment variables surfaced by the local probe.
pub const TRACKED_ENV_VARS: [&str; 13] = [
    "DEBUG_FLAG",
    "DATABASE_URL",
    "REDIS_URL",
    "BROKER_URL",
    "SITE_URL",
    "AUTH_DOMAIN",
    "AUTH_CLIENT_ID",
    "BUG_TRACKER_URL",
    "GITHUB_TOKEN",
    "TELEMETRY_API_KEY",
    "INGEST_MULTIDATA_FLAG",
    "ALERTS_ENABLED_FLAG",
    "PROJECTS_TO_INGEST",
];

const SECRET_MARKERS: [&str; 4] = ["token", "key", "password", "secret"];

/// Whether a variable's value must be redacted before it leaves the probe.
pub fn is_secret_var(name: &str) -> bool {
    let name = name.to_lowercase();
    SECRET_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Redact a secret to `***` plus its last four characters (`***` alone for
/// values of four characters or fewer). Redaction is idempotent, so an
/// already-redacted value passes through unchanged and is never reversed
/// downstream.
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 4 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("***{tail}")
    } else {
        "***".to_string()
    }
}

/// Collect the tracked environment variables: unset variables record null,
/// secrets are redacted at collection time, everything else is verbatim.
pub fn collect_environment_variables() -> Map<String, Value> {
    let mut vars = Map::new();
    for name in TRACKED_ENV_VARS {
        let value = match std::env::var(name) {
            Ok(value) if is_secret_var(name) => Value::String(redact(&value)),
            Ok(value) => Value::String(value),
            Err(_) => Value::Null,
        };
        vars.insert(name.to_string(), value);
    }
    vars
}

async fn run_capture(program: &str, args: &[&str]) -> Result<String, String> {
    match Command::new(program).args(args).output().await {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        }
        Ok(output) => Err(String::from_utf8_lossy(&output.stderr).trim_end().to_string()),
        Err(err) => Err(err.to_string()),
    }
}

/// Structured snapshot of the local environment: tracked variables, the
/// container composition, the VCS head, and runtime version fingerprints.
/// Every collector is independently failure-tolerant; a failed collector
/// records its error (or is skipped, for the optional runtimes) and the
/// rest proceed.
pub async fn collect() -> Value {
    let mut config = Map::new();
    config.insert(
        "environment_variables".to_string(),
        Value::Object(collect_environment_variables()),
    );

    match run_capture("docker-compose", &["config"]).await {
        Ok(stdout) => {
            config.insert("docker_compose".to_string(), stdout.into());
        }
        Err(err) => {
            debug!("docker-compose snapshot failed: {err}");
            config.insert("docker_compose_error".to_string(), err.into());
        }
    }

    let git_facts = [
        ("git_branch", vec!["branch", "--show-current"]),
        ("git_commit", vec!["rev-parse", "HEAD"]),
        ("git_commit_date", vec!["log", "-1", "--format=%ci"]),
    ];
    for (key, args) in git_facts {
        match run_capture("git", &args).await {
            Ok(value) => {
                config.insert(key.to_string(), value.into());
            }
            Err(err) => {
                debug!("{key} lookup failed: {err}");
                config
                    .entry("git_error")
                    .or_insert_with(|| Value::String(err));
            }
        }
    }

    // Runtime versions are best-effort; absence is recorded silently.
    if let Ok(version) = run_capture("python", &["--version"]).await {
        config.insert("python_version".to_string(), version.into());
    }
    if let Ok(version) = run_capture("node", &["--version"]).await {
        config.insert("node_version".to_string(), version.into());
    }

    Value::Object(config)
}
