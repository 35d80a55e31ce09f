use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use treeline_compare::report::write_pretty_json;
use treeline_compare::schema;

/// Compare database schemas and row counts between the local and staging
/// databases.
#[derive(Parser)]
#[command(name = "db-diff")]
struct Args {
    /// Local database URL; falls back to DATABASE_URL.
    #[arg(long = "local-db")]
    local_db: Option<String>,

    /// Staging database URL. Never derived from the local URL.
    #[arg(long = "staging-db")]
    staging_db: Option<String>,

    /// Output file for the detailed JSON report.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Specific tables to compare instead of the built-in list.
    #[arg(long, num_args = 1..)]
    tables: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let args = Args::parse();

    let local_db = args
        .local_db
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .context("--local-db or DATABASE_URL is required")?;
    let tables = if args.tables.is_empty() {
        schema::default_tables()
    } else {
        args.tables.clone()
    };

    let comparison = schema::run_comparison(&local_db, args.staging_db.as_deref(), &tables).await?;

    println!("{}", "=".repeat(60));
    println!("DATABASE COMPARISON SUMMARY");
    println!("{}", "=".repeat(60));
    match &comparison.staging_db_info {
        Some(staging_db_info) => {
            println!("Local tables: {}", comparison.local_db_info.table_count);
            println!("Staging tables: {}", staging_db_info.table_count);
            println!("Schema differences: {}", comparison.schema_differences.len());
            println!("Missing in local: {}", comparison.missing_tables.local.len());
            println!(
                "Missing in staging: {}",
                comparison.missing_tables.staging.len()
            );
            println!(
                "Row count differences: {}",
                comparison.row_count_differences.len()
            );
        }
        None => {
            println!(
                "Local database analyzed: {} tables",
                comparison.local_db_info.table_count
            );
            println!("Staging database: Not accessible");
        }
    }

    if !comparison.schema_differences.is_empty() {
        println!(
            "\nSCHEMA DIFFERENCES ({}):",
            comparison.schema_differences.len()
        );
        for difference in comparison.schema_differences.iter().take(10) {
            println!("  {difference}");
        }
        if comparison.schema_differences.len() > 10 {
            println!("  ... and {} more", comparison.schema_differences.len() - 10);
        }
    }

    let significant: Vec<_> = comparison
        .row_count_differences
        .iter()
        .filter(|delta| delta.is_significant())
        .collect();
    if !significant.is_empty() {
        println!("\nSIGNIFICANT ROW COUNT DIFFERENCES:");
        for delta in significant {
            println!(
                "  {}: {} vs {} ({:.1}% diff)",
                delta.table, delta.local_count, delta.staging_count, delta.difference_percent
            );
        }
    }

    if let Some(path) = &args.output {
        write_pretty_json(path, &comparison)?;
        println!("\nDetailed report saved to: {}", path.display());
    }

    if comparison.has_significant_differences() {
        std::process::exit(1);
    }
    Ok(())
}
