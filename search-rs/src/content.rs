//! Search seeded from an uploaded file
//!
//! A selected text file is read once and its whole content is sent as a single
//! fuzzy search. The content and the raw response are persisted so the search
//! surface can pick them up later, until the selection is cleared.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::SearchBackend;
use crate::config::ContentConfig;
use crate::count::CountBroadcaster;
use crate::error::{Result, SearchError};
use crate::events::{ErrorEvent, ErrorReporter, Operation};
use crate::normalizer;
use crate::types::{RawSearchResponse, SearchMode, SearchResultRow};

const CONTENT_FILE: &str = "search_content.txt";
const RESULTS_FILE: &str = "search_results.json";

/// Content/response pair kept for the search surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSearch {
    pub content: String,
    pub response: RawSearchResponse,
}

/// Directory-backed store for the last file-seeded search
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, content: &str, response: &RawSearchResponse) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(CONTENT_FILE), content).await?;
        let json = serde_json::to_vec_pretty(response)?;
        tokio::fs::write(self.dir.join(RESULTS_FILE), json).await?;
        Ok(())
    }

    /// Stored pair, or `None` if nothing (or only half of it) is stored
    pub async fn load(&self) -> Result<Option<StoredSearch>> {
        let content = match tokio::fs::read_to_string(self.dir.join(CONTENT_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let json = match tokio::fs::read(self.dir.join(RESULTS_FILE)).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredSearch {
            content,
            response: serde_json::from_slice(&json)?,
        }))
    }

    pub async fn clear(&self) -> Result<()> {
        for name in [CONTENT_FILE, RESULTS_FILE] {
            match tokio::fs::remove_file(self.dir.join(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Runs one fuzzy search per selected file
pub struct ContentSearchBridge {
    backend: Arc<dyn SearchBackend>,
    count: CountBroadcaster,
    reporter: Arc<dyn ErrorReporter>,
    store: ContentStore,
    accepted_extensions: Vec<String>,
}

impl ContentSearchBridge {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        count: CountBroadcaster,
        reporter: Arc<dyn ErrorReporter>,
        config: &ContentConfig,
    ) -> Self {
        Self {
            backend,
            count,
            reporter,
            store: ContentStore::new(config.state_dir.clone()),
            accepted_extensions: config
                .accepted_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Read a selected file and search with its content.
    ///
    /// Unsupported or undecodable files are reported and never reach the backend.
    pub async fn search_file(&self, path: &Path) -> Result<Vec<SearchResultRow>> {
        let content = match self.read_text(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    component = "content_search",
                    action = "read_file",
                    path = %path.display(),
                    "{}",
                    e
                );
                self.reporter
                    .report(ErrorEvent::new(Operation::ContentSearch, e.message()));
                return Err(e);
            }
        };

        self.search_content(&content).await
    }

    /// Search once with `content` as the fuzzy term
    pub async fn search_content(&self, content: &str) -> Result<Vec<SearchResultRow>> {
        info!(
            component = "content_search",
            action = "search_started",
            chars = content.chars().count(),
            "Searching with file content"
        );

        let response = match self.backend.search_fuzzy(content).await {
            Ok(response) => response,
            Err(e) => {
                warn!(component = "content_search", action = "search_failed", "{}", e);
                self.reporter
                    .report(ErrorEvent::new(Operation::ContentSearch, e.message()));
                return Err(e);
            }
        };

        let rows = normalizer::normalize(&response);
        let count = normalizer::result_count(SearchMode::Fuzzy, &response, &rows);

        // Count is published only once the search is stored
        if let Err(e) = self.store.save(content, &response).await {
            warn!(component = "content_search", action = "persist", "Failed to persist search: {}", e);
            self.reporter
                .report(ErrorEvent::new(Operation::ContentSearch, e.message()));
            return Err(e);
        }
        self.count.update(count);

        info!(
            component = "content_search",
            action = "search_completed",
            rows = rows.len(),
            "Content search completed"
        );
        Ok(rows)
    }

    /// Last persisted content/response pair
    pub async fn persisted(&self) -> Result<Option<StoredSearch>> {
        self.store.load().await
    }

    /// Forget the selected file and its results
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!(component = "content_search", action = "clear", "Cleared selected file");
        Ok(())
    }

    async fn read_text(&self, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        if !self.accepted_extensions.contains(&extension) {
            return Err(SearchError::Decode(format!(
                "Unsupported file type for {}: expected one of {}",
                path.display(),
                self.accepted_extensions.join(", ")
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SearchError::Decode(format!("Failed to read {}: {}", path.display(), e)))?;

        String::from_utf8(bytes)
            .map_err(|_| SearchError::Decode(format!("{} is not valid UTF-8 text", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{BackendCall, MockBackend};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Fixture {
        _dir: tempfile::TempDir,
        files: PathBuf,
        backend: Arc<MockBackend>,
        count: CountBroadcaster,
        bridge: ContentSearchBridge,
        errors: UnboundedReceiver<ErrorEvent>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        std::fs::create_dir_all(&files).unwrap();

        let config = ContentConfig {
            accepted_extensions: vec![".TXT".to_string()],
            state_dir: dir.path().join("state"),
        };
        let backend = Arc::new(MockBackend::new());
        let count = CountBroadcaster::new();
        let (tx, errors) = unbounded_channel();
        let bridge = ContentSearchBridge::new(backend.clone(), count.clone(), Arc::new(tx), &config);

        Fixture {
            _dir: dir,
            files,
            backend,
            count,
            bridge,
            errors,
        }
    }

    fn two_pages() -> RawSearchResponse {
        serde_json::from_value(json!({
            "results": [{
                "filename": "a.pdf",
                "matching_pages": [
                    {"page_number": 1, "highlights": ["lorem"]},
                    {"page_number": 3, "highlights": ["ipsum"]}
                ]
            }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_file_issues_one_fuzzy_search_and_persists() {
        let f = fixture();
        let path = f.files.join("query.txt");
        std::fs::write(&path, "lorem ipsum").unwrap();
        f.backend.push_search(two_pages(), Duration::ZERO);

        let rows = f.bridge.search_file(&path).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(f.count.current(), 2);
        assert_eq!(
            f.backend.calls(),
            vec![BackendCall::Fuzzy {
                term: "lorem ipsum".to_string()
            }]
        );

        let stored = f.bridge.persisted().await.unwrap().unwrap();
        assert_eq!(stored.content, "lorem ipsum");
        assert_eq!(stored.response, two_pages());
    }

    #[tokio::test]
    async fn test_unsupported_extension_never_searches() {
        let mut f = fixture();
        let path = f.files.join("scan.pdf");
        std::fs::write(&path, "%PDF-1.7").unwrap();
        f.count.update(5);

        let result = f.bridge.search_file(&path).await;

        assert!(matches!(result, Err(SearchError::Decode(_))));
        assert!(f.backend.calls().is_empty());
        assert_eq!(f.count.current(), 5);
        assert!(f.bridge.persisted().await.unwrap().is_none());
        assert_eq!(f.errors.try_recv().unwrap().operation, Operation::ContentSearch);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decode_error() {
        let mut f = fixture();
        let path = f.files.join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let result = f.bridge.search_file(&path).await;

        assert!(matches!(result, Err(SearchError::Decode(_))));
        assert!(f.backend.calls().is_empty());
        assert!(f.errors.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_state_untouched() {
        let mut f = fixture();
        f.count.update(4);
        f.backend.push_search_error("503 Service Unavailable - ", Duration::ZERO);

        let result = f.bridge.search_content("terms").await;

        assert!(matches!(result, Err(SearchError::Transport(_))));
        assert_eq!(f.count.current(), 4);
        assert!(f.bridge.persisted().await.unwrap().is_none());
        let event = f.errors.try_recv().unwrap();
        assert_eq!(event.operation, Operation::ContentSearch);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_previous_count() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "occupied").unwrap();

        let config = ContentConfig {
            accepted_extensions: vec!["txt".to_string()],
            state_dir: blocker,
        };
        let backend = Arc::new(MockBackend::new());
        let count = CountBroadcaster::new();
        count.update(4);
        let (tx, mut errors) = unbounded_channel();
        let bridge = ContentSearchBridge::new(backend.clone(), count.clone(), Arc::new(tx), &config);
        backend.push_search(two_pages(), Duration::ZERO);

        let result = bridge.search_content("lorem").await;

        assert!(matches!(result, Err(SearchError::Io(_))));
        assert_eq!(count.current(), 4);
        assert_eq!(errors.try_recv().unwrap().operation, Operation::ContentSearch);
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_search() {
        let f = fixture();
        f.backend.push_search(two_pages(), Duration::ZERO);
        f.bridge.search_content("lorem").await.unwrap();
        assert!(f.bridge.persisted().await.unwrap().is_some());

        f.bridge.clear().await.unwrap();
        assert!(f.bridge.persisted().await.unwrap().is_none());

        // Clearing twice is fine
        f.bridge.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        ContentStore::new(dir.path())
            .save("seed", &two_pages())
            .await
            .unwrap();

        let reopened = ContentStore::new(dir.path()).load().await.unwrap().unwrap();
        assert_eq!(reopened.content, "seed");
        assert_eq!(reopened.response.results.len(), 1);
    }
}
