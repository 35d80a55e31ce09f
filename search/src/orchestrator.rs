use std::collections::BTreeMap;

use tracing::info;

use crate::client::BulkAction;
use crate::client::SearchClient;
use crate::client::phrase_query;
use crate::error::SearchError;
use crate::projector::FailureLine;
use crate::projector::project;

/// Self-match-count histogram: how many failure lines produced each result
/// count when phrase-queried with their own message. The expected shape is
/// a heavy tail at count >= 1 (self-match plus near-duplicates).
pub type MatchHistogram = BTreeMap<usize, usize>;

/// Rebuild the failure-line index from scratch and measure phrase-match
/// quality against it.
///
/// Ordering is strict: reinit happens-before bulk happens-before refresh
/// happens-before any search. Any client error aborts the run, so the index
/// is either freshly reinitialized and fully loaded or the caller retries.
pub async fn reindex(
    client: &SearchClient,
    lines: &[FailureLine],
) -> Result<MatchHistogram, SearchError> {
    let lines: Vec<&FailureLine> = lines.iter().filter(|line| !line.message.is_empty()).collect();

    client.reinit().await?;
    let inserted = client
        .bulk(lines.iter().map(|line| project(line)), BulkAction::Index)
        .await?;
    info!("inserted {inserted} of {} failure lines", lines.len());
    client.refresh().await?;

    let mut histogram = MatchHistogram::new();
    for line in &lines {
        let results = client.search(phrase_query(&line.message)).await?;
        *histogram.entry(results.len()).or_insert(0) += 1;
    }
    Ok(histogram)
}

/// Render the histogram as a horizontal bar chart for operator inspection.
pub fn render_histogram(histogram: &MatchHistogram) -> String {
    let mut chart = String::new();
    for (matches, lines) in histogram {
        chart.push_str(&format!("{matches:>6} | {}\n", "#".repeat(*lines)));
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn histogram_renders_in_ascending_count_order() {
        let histogram = MatchHistogram::from([(1, 3), (0, 1), (4, 2)]);
        assert_eq!(
            render_histogram(&histogram),
            "     0 | #\n     1 | ###\n     4 | ##\n"
        );
    }

    #[test]
    fn empty_histogram_renders_empty() {
        assert_eq!(render_histogram(&MatchHistogram::new()), "");
    }
}
