//! Shared plumbing for the treeline binaries: tracing setup and failure
//! line loading from the results database.

use anyhow::Context;
use serde_json::Value;
use sqlx::Connection;
use sqlx::PgConnection;
use sqlx::Row;
use treeline_search::FailureLine;
use treeline_search::Subtest;

/// Install the process-wide tracing subscriber: env-filtered fmt layer to
/// stderr, so stdout stays reserved for the tools' human summaries.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reqwest=warn,hyper=warn,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Legacy reftest rows store the test name as a JSON tuple; everything else
/// is a plain string.
fn parse_test_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Array(_)) => value,
        _ => Value::String(raw.to_string()),
    }
}

/// Load every failure line with a non-empty message from the results
/// database.
pub async fn load_failure_lines(database_url: &str) -> anyhow::Result<Vec<FailureLine>> {
    let mut conn = PgConnection::connect(database_url)
        .await
        .context("connecting to the results database")?;
    let rows = sqlx::query(
        "SELECT id, job_guid, test, subtest, status,
                COALESCE(expected, '') AS expected, message,
                best_classification_id, best_is_verified
         FROM failure_line
         WHERE message IS NOT NULL AND message <> ''
         ORDER BY id",
    )
    .fetch_all(&mut conn)
    .await
    .context("loading failure lines")?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let test = match row.try_get::<Option<String>, _>("test")? {
            Some(raw) => parse_test_value(&raw),
            None => Value::Null,
        };
        lines.push(FailureLine {
            id: row.try_get("id")?,
            job_guid: row.try_get("job_guid")?,
            test,
            subtest: Subtest::Present(row.try_get("subtest")?),
            status: row.try_get("status")?,
            expected: row.try_get("expected")?,
            message: row.try_get("message")?,
            best_classification: row.try_get("best_classification_id")?,
            best_is_verified: row.try_get("best_is_verified")?,
        });
    }
    conn.close().await.context("closing the results database")?;
    Ok(lines)
}
