use std::path::PathBuf;

use clap::Parser;
use treeline_compare::runner::ComparisonRunner;
use treeline_compare::runner::DEFAULT_LOCAL_URL;
use treeline_compare::runner::DEFAULT_OUTPUT_DIR;
use treeline_compare::runner::DEFAULT_STAGING_URL;
use treeline_compare::runner::Tool;

/// Run every comparison probe against the two deployments and assemble the
/// master report.
#[derive(Parser)]
#[command(name = "run-comparison")]
struct Args {
    /// Local base URL.
    #[arg(long, default_value = DEFAULT_LOCAL_URL)]
    local: String,

    /// Staging base URL.
    #[arg(long, default_value = DEFAULT_STAGING_URL)]
    staging: String,

    /// Output directory; each run gets a timestamped subdirectory.
    #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Skip specific comparison tools.
    #[arg(long, num_args = 1.., value_enum)]
    skip: Vec<Tool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let args = Args::parse();

    let runner = ComparisonRunner::new(&args.local, &args.staging, &args.output)?;
    println!("Local: {}", args.local);
    println!("Staging: {}", args.staging);
    println!(
        "Results will be saved to: {}",
        runner.results_dir().display()
    );

    let report = tokio::select! {
        report = runner.run_all(&args.skip) => report?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Comparison interrupted");
            std::process::exit(1);
        }
    };

    let summary = &report.comparison_summary;
    println!("\n{}", "=".repeat(60));
    println!("MASTER COMPARISON COMPLETE");
    println!("{}", "=".repeat(60));
    println!("Success Rate: {:.1}%", summary.success_rate);
    println!("Successful Tools: {}", summary.successful_tools);
    println!("Failed Tools: {}", summary.failed_tools);
    println!("\nReports saved:");
    println!(
        "  JSON: {}",
        runner.results_dir().join("master_report.json").display()
    );
    println!(
        "  HTML: {}",
        runner.results_dir().join("master_report.html").display()
    );

    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &report.recommendations {
            println!(
                "  [{}] {}: {}",
                recommendation.severity.as_str().to_uppercase(),
                recommendation.category,
                recommendation.message
            );
        }
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
