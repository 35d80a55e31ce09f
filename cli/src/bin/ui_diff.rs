use std::path::PathBuf;

use clap::Parser;
use treeline_compare::runner::DEFAULT_STAGING_URL;
use treeline_compare::ui;

/// Compare rendered UI between the local frontend and staging via the
/// headless-browser differ.
#[derive(Parser)]
#[command(name = "ui-diff")]
struct Args {
    /// Local frontend base URL.
    #[arg(long, default_value = "http://localhost:5001")]
    local: String,

    /// Staging base URL.
    #[arg(long, default_value = DEFAULT_STAGING_URL)]
    staging: String,

    /// Output directory for screenshots, diffs, and the report.
    #[arg(long, short, default_value = "./comparison-results")]
    output: PathBuf,

    /// Path to the node differ script.
    #[arg(long, default_value = ui::DEFAULT_SCRIPT)]
    script: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let args = Args::parse();

    let node_version = ui::check_node().await?;
    tracing::info!("node runtime: {node_version}");

    std::fs::create_dir_all(&args.output)?;
    let outcome = ui::run_comparison(&args.script, &args.local, &args.staging, &args.output).await?;

    print!("{}", outcome.stdout);
    eprint!("{}", outcome.stderr);
    println!(
        "Report: {}",
        args.output.join(ui::UI_REPORT_RELATIVE_PATH).display()
    );

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
