//! Full-text search over CI failure lines, backed by an
//! Elasticsearch-compatible cluster.
//!
//! The crate owns the index settings (including the log-message analyzer),
//! the projection from persisted failure lines to search documents, and the
//! offline reindex pipeline used to cluster similar failures.

mod client;
mod document;
mod error;
mod orchestrator;
mod projector;
mod settings;

pub use client::BulkAction;
pub use client::SearchClient;
pub use client::SearchConfig;
pub use client::best_match_query;
pub use client::phrase_query;
pub use document::QUERY_MESSAGE_CHARS;
pub use document::SearchDocument;
pub use document::Subtest;
pub use document::query_excerpt;
pub use error::SearchError;
pub use orchestrator::MatchHistogram;
pub use orchestrator::reindex;
pub use orchestrator::render_histogram;
pub use projector::FailureLine;
pub use projector::project;
pub use settings::DOC_TYPE;
pub use settings::INDEX_NAME;
pub use settings::MESSAGE_TOKENIZER_PATTERN;
pub use settings::index_settings;
