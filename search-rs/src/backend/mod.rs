//! Search backend abstraction

use crate::error::Result;
use crate::types::{FileDetectionReport, RawSearchResponse, SearchMode, SearchQuery};

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Search and ingestion endpoints consumed by the client
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Relevance-ranked search; an empty term lists every document
    async fn search_fuzzy(&self, term: &str) -> Result<RawSearchResponse>;

    /// Literal phrase search capped at `size` documents
    async fn search_exact(&self, term: &str, size: u32) -> Result<RawSearchResponse>;

    /// Ask the backend to ingest source files it has not indexed yet
    async fn check_new_files(&self) -> Result<FileDetectionReport>;

    /// Backend name used in logs
    fn name(&self) -> &str;
}

/// Run a validated query against the endpoint matching its mode
pub async fn execute(
    backend: &dyn SearchBackend,
    query: &SearchQuery,
    exact_size: u32,
) -> Result<RawSearchResponse> {
    match query.mode {
        SearchMode::Fuzzy => backend.search_fuzzy(&query.term).await,
        SearchMode::Exact => backend.search_exact(&query.term, exact_size).await,
    }
}
