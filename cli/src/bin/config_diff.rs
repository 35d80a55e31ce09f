use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use treeline_compare::config;
use treeline_compare::diff::Difference;
use treeline_compare::report::write_pretty_json;
use treeline_compare::runner::DEFAULT_LOCAL_URL;
use treeline_compare::runner::DEFAULT_STAGING_URL;

/// Compare runtime configuration between the local and staging
/// deployments.
#[derive(Parser)]
#[command(name = "config-diff")]
struct Args {
    /// Local base URL.
    #[arg(long, default_value = DEFAULT_LOCAL_URL)]
    local: String,

    /// Staging base URL.
    #[arg(long, default_value = DEFAULT_STAGING_URL)]
    staging: String,

    /// Output file for the detailed JSON report.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let args = Args::parse();

    let comparison = config::run_comparison(&args.local, &args.staging).await?;

    println!("{}", "=".repeat(60));
    println!("CONFIGURATION COMPARISON SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total differences found: {}", comparison.differences.len());

    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for difference in &comparison.differences {
        let kind = match difference {
            Difference::MissingInLocal { .. } => "Missing In Local",
            Difference::MissingInStaging { .. } => "Missing In Staging",
            Difference::ValueDifference { .. } => "Value Difference",
            Difference::ListLengthDifference { .. } => "List Length Difference",
        };
        *by_kind.entry(kind).or_insert(0) += 1;
    }
    for (kind, count) in by_kind {
        println!("\n{kind}: {count}");
    }

    println!("\nENVIRONMENT VARIABLES:");
    if let Some(vars) = comparison.environment_vars.as_object() {
        for (name, value) in vars {
            let status = if value.is_null() { "NOT SET" } else { "SET" };
            println!("  {name}: {status}");
        }
    }

    if let Some(path) = &args.output {
        write_pretty_json(path, &comparison)?;
        println!("\nDetailed report saved to: {}", path.display());
    }

    let significant = comparison.significant_differences();
    if !significant.is_empty() {
        println!(
            "\nFound {} significant configuration differences",
            significant.len()
        );
        std::process::exit(1);
    }
    Ok(())
}
