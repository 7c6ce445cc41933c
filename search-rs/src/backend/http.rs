//! HTTP search backend
//!
//! Talks to the document search API: fuzzy and exact search over GET, new file
//! detection over POST.

use super::SearchBackend;
use crate::config::BackendConfig;
use crate::error::{Result, SearchError};
use crate::types::{FileDetectionReport, RawSearchResponse};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-based backend client
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn with_client(config: BackendConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("HttpBackend: Request failed with status {}: {}", status, error_text);
            return Err(SearchError::Transport(format!("{} - {}", status, error_text)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SearchError::Transport(format!("Invalid response body: {}", e)))
    }
}

#[async_trait::async_trait]
impl SearchBackend for HttpBackend {
    async fn search_fuzzy(&self, term: &str) -> Result<RawSearchResponse> {
        let url = self.url(&self.config.search_path);
        debug!("HttpBackend: GET {} (fuzzy, {} chars)", url, term.len());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_term", term),
                ("index_name", self.config.index_name.as_str()),
            ])
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn search_exact(&self, term: &str, size: u32) -> Result<RawSearchResponse> {
        let url = self.url(&self.config.exact_search_path);
        debug!("HttpBackend: GET {} (exact, size={})", url, size);

        let size = size.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_term", term),
                ("index_name", self.config.index_name.as_str()),
                ("size", size.as_str()),
            ])
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn check_new_files(&self) -> Result<FileDetectionReport> {
        let url = self.url(&self.config.check_new_files_path);
        debug!("HttpBackend: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        Self::decode(response).await
    }

    fn name(&self) -> &str {
        &self.config.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = BackendConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::new(config).unwrap();
        assert_eq!(
            backend.url("/api_documents/search/"),
            "http://localhost:8000/api_documents/search/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::new(config).unwrap();

        let result = backend.search_fuzzy("invoice").await;
        assert!(matches!(result, Err(SearchError::Transport(_))));
    }
}
