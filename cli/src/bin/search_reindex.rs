use anyhow::Context;
use clap::Parser;
use treeline_search::SearchClient;
use treeline_search::SearchConfig;
use treeline_search::reindex;
use treeline_search::render_histogram;

/// Rebuild the failure-line search index from the results database and
/// report self-match quality.
#[derive(Parser)]
#[command(name = "search-reindex")]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    treeline_cli::init_logging();
    let Args {} = Args::parse();

    let config = SearchConfig::from_env().context("ELASTICSEARCH_URL is not set")?;
    let client = SearchClient::new(config)?;
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let lines = treeline_cli::load_failure_lines(&database_url).await?;
    let histogram = reindex(&client, &lines).await?;

    println!("Reindexed {} failure lines", lines.len());
    print!("{}", render_histogram(&histogram));
    Ok(())
}
