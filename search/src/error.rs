use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search cluster request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to create index {index}: {message}")]
    IndexCreate { index: String, message: String },

    #[error("document {id} not found")]
    NotFound { id: i64 },

    #[error("unexpected response from search cluster: {0}")]
    Decode(String),
}

impl SearchError {
    pub(crate) fn index_create(message: impl Into<String>) -> Self {
        Self::IndexCreate {
            index: crate::settings::INDEX_NAME.to_string(),
            message: message.into(),
        }
    }
}
