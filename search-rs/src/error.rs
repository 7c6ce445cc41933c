//! Error types for search-rs

use thiserror::Error;

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Search client error types
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query rejected before dispatch (e.g. empty term in exact mode)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or backend failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Uploaded content is not readable text
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Coordinator has been torn down
    #[error("Search coordinator has been shut down")]
    Shutdown,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Transport(err.to_string())
    }
}

impl SearchError {
    /// Human-readable message without the category prefix
    pub fn message(&self) -> String {
        match self {
            SearchError::Validation(msg)
            | SearchError::Transport(msg)
            | SearchError::Decode(msg)
            | SearchError::Config(msg) => msg.clone(),
            SearchError::Shutdown => "Search coordinator has been shut down".to_string(),
            SearchError::Io(e) => e.to_string(),
            SearchError::Json(e) => e.to_string(),
        }
    }
}
