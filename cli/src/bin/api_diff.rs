use std::path::PathBuf;

use clap::Parser;
use treeline_compare::api;
use treeline_compare::report::write_pretty_json;
use treeline_compare::runner::DEFAULT_LOCAL_URL;
use treeline_compare::runner::DEFAULT_STAGING_URL;

/// Compare API responses between the local and staging deployments.
#[derive(Parser)]
#[command(name = "api-diff")]
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

    /// Specific endpoints to compare instead of the built-in list.
    #[arg(long, num_args = 1..)]
    endpoints: Vec<String>,

    /// Print the per-endpoint difference records.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let args = Args::parse();

    let endpoints = if args.endpoints.is_empty() {
        api::default_endpoints()
    } else {
        args.endpoints.clone()
    };

    println!("Starting API comparison between:");
    println!("  Local:   {}", args.local);
    println!("  Staging: {}", args.staging);
    println!("  Endpoints: {}", endpoints.len());
    println!("{}", "-".repeat(60));

    let comparison = api::run_comparison(&args.local, &args.staging, &endpoints).await?;

    for result in &comparison.detailed_results {
        let status_match = if result.local_status == result.staging_status {
            "ok"
        } else {
            "MISMATCH"
        };
        let data_match = if result.data_matches { "ok" } else { "MISMATCH" };
        println!(
            "{:30} Status:{status_match} Data:{data_match} Time: {:.2}s / {:.2}s",
            result.endpoint, result.local_response_time, result.staging_response_time
        );
    }

    if args.verbose {
        for result in &comparison.detailed_results {
            if !result.data_matches {
                println!("\nDifferences for {}:", result.endpoint);
                println!("{}", serde_json::to_string_pretty(&result.differences)?);
            }
        }
    }

    let summary = &comparison.comparison_summary;
    println!("\n{}", "=".repeat(60));
    println!("COMPARISON SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total endpoints checked: {}", summary.total_endpoints);
    println!("Data matches: {}", summary.matching_endpoints);
    println!("Status code mismatches: {}", summary.status_code_mismatches);
    println!(
        "Avg response time - Local: {:.3}s",
        summary.avg_local_response_time
    );
    println!(
        "Avg response time - Staging: {:.3}s",
        summary.avg_staging_response_time
    );

    if let Some(path) = &args.output {
        write_pretty_json(path, &comparison)?;
        println!("\nDetailed report saved to: {}", path.display());
    }

    if comparison.has_mismatches() {
        std::process::exit(1);
    }
    Ok(())
}
