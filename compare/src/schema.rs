use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use sqlx::Connection;
use sqlx::PgConnection;
use sqlx::Row;
use tracing::info;
use tracing::warn;

use crate::error::CompareError;

/// A row-count delta at or above this share of the staging count is
/// significant for the exit-code contract.
pub const ROW_COUNT_SIGNIFICANCE_PERCENT: f64 = 10.0;

/// The canonical CI tables analyzed when no explicit list is given.
pub fn default_tables() -> Vec<String> {
    [
        "repository",
        "repository_group",
        "option_collection",
        "failure_classification",
        "job_type",
        "machine",
        "product",
        "build_platform",
        "machine_platform",
        "performance_framework",
        "performance_signature",
        "push",
        "job",
        "bug_job_map",
        "classified_failure",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<i32>,
}

/// Complete descriptor for one table. A table either yields one of these
/// or is reported as missing; it is never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_name: String,
    pub column_count: usize,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<String>,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub version: String,
    pub size: String,
    pub table_count: i64,
    pub estimated_rows: i64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableComparison {
    pub table_name: String,
    pub local: Option<TableInfo>,
    pub staging: Option<TableInfo>,
    pub differences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingTables {
    pub local: Vec<String>,
    pub staging: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountDifference {
    pub table: String,
    pub local_count: i64,
    pub staging_count: i64,
    pub difference: i64,
    pub difference_percent: f64,
}

impl RowCountDifference {
    pub fn is_significant(&self) -> bool {
        self.difference_percent >= ROW_COUNT_SIGNIFICANCE_PERCENT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseComparison {
    pub timestamp: String,
    pub local_db_info: DatabaseInfo,
    pub staging_db_info: Option<DatabaseInfo>,
    pub schema_differences: Vec<String>,
    pub table_comparisons: Vec<TableComparison>,
    pub missing_tables: MissingTables,
    pub row_count_differences: Vec<RowCountDifference>,
}

impl DatabaseComparison {
    /// Exit-code significance: any schema difference, any missing table on
    /// either side, or any row-count delta at or above the threshold.
    pub fn has_significant_differences(&self) -> bool {
        !self.schema_differences.is_empty()
            || !self.missing_tables.local.is_empty()
            || !self.missing_tables.staging.is_empty()
            || self
                .row_count_differences
                .iter()
                .any(RowCountDifference::is_significant)
    }
}

/// Table names are interpolated into `COUNT(*)` statements, so only plain
/// identifiers are accepted.
fn validate_table_name(table: &str) -> Result<(), CompareError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CompareError::Fatal(format!(
            "invalid table name: {table:?}"
        )))
    }
}

async fn database_info(conn: &mut PgConnection) -> Result<DatabaseInfo, CompareError> {
    let version: String = sqlx::query_scalar("SELECT version()").fetch_one(&mut *conn).await?;
    let size: String =
        sqlx::query_scalar("SELECT pg_size_pretty(pg_database_size(current_database()))")
            .fetch_one(&mut *conn)
            .await?;
    let table_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public'",
    )
    .fetch_one(&mut *conn)
    .await?;
    let estimated_rows: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(n_tup_ins - n_tup_del), 0)::BIGINT FROM pg_stat_user_tables",
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(DatabaseInfo {
        version,
        size,
        table_count,
        estimated_rows,
        timestamp: Local::now().to_rfc3339(),
    })
}

/// Returns `None` when the table does not exist on this side.
async fn table_info(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Option<TableInfo>, CompareError> {
    validate_table_name(table)?;

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = $1
         )",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    if !exists {
        return Ok(None);
    }

    let columns: Vec<ColumnInfo> = sqlx::query(
        "SELECT
             column_name::TEXT AS column_name,
             data_type::TEXT AS data_type,
             is_nullable::TEXT AS is_nullable,
             column_default::TEXT AS column_default,
             character_maximum_length::INT AS character_maximum_length
         FROM information_schema.columns
         WHERE table_schema = 'public' AND table_name = $1
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| {
        Ok(ColumnInfo {
            column_name: row.try_get("column_name")?,
            data_type: row.try_get("data_type")?,
            is_nullable: row.try_get("is_nullable")?,
            column_default: row.try_get("column_default")?,
            character_maximum_length: row.try_get("character_maximum_length")?,
        })
    })
    .collect::<Result<_, sqlx::Error>>()?;

    // Authoritative count, not the planner estimate.
    let row_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(&mut *conn)
        .await?;

    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT indexdef FROM pg_indexes WHERE tablename = $1 AND schemaname = 'public'",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let constraints: Vec<String> = sqlx::query_scalar(
        "SELECT conname::TEXT || ': ' || pg_get_constraintdef(oid)
         FROM pg_constraint WHERE conrelid = $1::regclass",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(TableInfo {
        table_name: table.to_string(),
        column_count: columns.len(),
        row_count,
        columns,
        indexes,
        constraints,
    }))
}

/// Ordered human-readable differences between two present tables.
pub fn compare_tables(local: &TableInfo, staging: &TableInfo) -> Vec<String> {
    let mut differences = Vec::new();

    if local.column_count != staging.column_count {
        differences.push(format!(
            "Column count differs: local={}, staging={}",
            local.column_count, staging.column_count
        ));
    }

    let local_names: Vec<&str> = local.columns.iter().map(|c| c.column_name.as_str()).collect();
    let staging_names: Vec<&str> = staging
        .columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();

    let missing_in_local: Vec<&str> = staging_names
        .iter()
        .filter(|name| !local_names.contains(name))
        .copied()
        .collect();
    if !missing_in_local.is_empty() {
        differences.push(format!(
            "Columns missing in local: {}",
            missing_in_local.join(", ")
        ));
    }
    let missing_in_staging: Vec<&str> = local_names
        .iter()
        .filter(|name| !staging_names.contains(name))
        .copied()
        .collect();
    if !missing_in_staging.is_empty() {
        differences.push(format!(
            "Columns missing in staging: {}",
            missing_in_staging.join(", ")
        ));
    }

    for local_col in &local.columns {
        let Some(staging_col) = staging
            .columns
            .iter()
            .find(|c| c.column_name == local_col.column_name)
        else {
            continue;
        };
        if local_col.data_type != staging_col.data_type {
            differences.push(format!(
                "Column {} type differs: local={}, staging={}",
                local_col.column_name, local_col.data_type, staging_col.data_type
            ));
        }
        if local_col.is_nullable != staging_col.is_nullable {
            differences.push(format!(
                "Column {} nullable differs: local={}, staging={}",
                local_col.column_name, local_col.is_nullable, staging_col.is_nullable
            ));
        }
    }

    if local.row_count != staging.row_count {
        differences.push(format!(
            "Row count differs: local={}, staging={}",
            local.row_count, staging.row_count
        ));
    }

    differences
}

/// Numeric row-count delta; `None` when the counts agree. A staging count
/// of zero with a nonzero delta is treated as a 100% difference.
pub fn row_count_difference(
    table: &str,
    local_count: i64,
    staging_count: i64,
) -> Option<RowCountDifference> {
    if local_count == staging_count {
        return None;
    }
    let difference_percent = if staging_count > 0 {
        (local_count - staging_count).abs() as f64 / staging_count as f64 * 100.0
    } else {
        100.0
    };
    Some(RowCountDifference {
        table: table.to_string(),
        local_count,
        staging_count,
        difference: local_count - staging_count,
        difference_percent,
    })
}

/// Row-count mismatch strings stay in the per-table record but are kept out
/// of the aggregate so that the numeric threshold alone governs row-count
/// significance.
fn is_schema_difference(difference: &str) -> bool {
    !difference.starts_with("Row count differs")
}

/// Run the full schema comparison. A staging URL that is present but
/// unreachable downgrades the run to local-only analysis; in that mode no
/// table is flagged missing and the exit contract reports success.
pub async fn run_comparison(
    local_db_url: &str,
    staging_db_url: Option<&str>,
    tables: &[String],
) -> Result<DatabaseComparison, CompareError> {
    info!("starting database comparison");
    let mut local_conn = PgConnection::connect(local_db_url).await?;

    let mut staging_conn = match staging_db_url {
        Some(url) => match PgConnection::connect(url).await {
            Ok(conn) => Some(conn),
            Err(err) => {
                warn!("cannot connect to staging database, proceeding local-only: {err}");
                None
            }
        },
        None => None,
    };

    let local_db_info = database_info(&mut local_conn).await?;
    let mut staging_db_info = None;
    if let Some(conn) = staging_conn.as_mut() {
        staging_db_info = Some(database_info(conn).await?);
    }

    let mut table_comparisons = Vec::new();
    let mut schema_differences = Vec::new();
    let mut missing_tables = MissingTables::default();
    let mut row_count_differences = Vec::new();

    for table in tables {
        info!("analyzing table: {table}");
        let local_table = table_info(&mut local_conn, table).await?;
        let staging_table = match staging_conn.as_mut() {
            Some(conn) => table_info(conn, table).await?,
            None => None,
        };

        if staging_conn.is_some() {
            match (&local_table, &staging_table) {
                (None, Some(_)) => missing_tables.local.push(table.clone()),
                (Some(_), None) => missing_tables.staging.push(table.clone()),
                _ => {}
            }
        }

        let differences = match (&local_table, &staging_table) {
            (Some(local), Some(staging)) => {
                let differences = compare_tables(local, staging);
                schema_differences.extend(
                    differences
                        .iter()
                        .filter(|d| is_schema_difference(d))
                        .map(|d| format!("{table}: {d}")),
                );
                if let Some(delta) =
                    row_count_difference(table, local.row_count, staging.row_count)
                {
                    row_count_differences.push(delta);
                }
                differences
            }
            _ => Vec::new(),
        };

        table_comparisons.push(TableComparison {
            table_name: table.clone(),
            local: local_table,
            staging: staging_table,
            differences,
        });
    }

    local_conn.close().await?;
    if let Some(conn) = staging_conn {
        conn.close().await?;
    }

    Ok(DatabaseComparison {
        timestamp: Local::now().to_rfc3339(),
        local_db_info,
        staging_db_info,
        schema_differences,
        table_comparisons,
        missing_tables,
        row_count_differences,
    })
}
