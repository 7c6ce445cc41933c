//! Configuration for search-rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SearchError};
use crate::types::SearchMode;

/// Environment variable prefix for overrides (`SEARCH_RS__BACKEND__BASE_URL`, ...)
pub const ENV_PREFIX: &str = "SEARCH_RS";

/// Main client configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Search backend endpoints
    #[serde(default)]
    pub backend: BackendConfig,
    /// Coordinator behaviour
    #[serde(default)]
    pub search: SearchConfig,
    /// Search-by-file settings
    #[serde(default)]
    pub content: ContentConfig,
    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fuzzy search path
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Exact search path
    #[serde(default = "default_exact_search_path")]
    pub exact_search_path: String,
    /// New file detection path
    #[serde(default = "default_check_new_files_path")]
    pub check_new_files_path: String,
    /// Index queried by every search
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// Result cap sent with exact searches
    #[serde(default = "default_exact_result_size")]
    pub exact_result_size: u32,
    /// Request timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Coordinator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Mode used before the user toggles it
    #[serde(default)]
    pub initial_mode: SearchMode,
}

/// Search-by-file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    /// File extensions accepted as search input
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
    /// Directory holding the persisted content/response association
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_search_path() -> String {
    "/api_documents/search/".to_string()
}

fn default_exact_search_path() -> String {
    "/api_documents/search_exact/".to_string()
}

fn default_check_new_files_path() -> String {
    "/api_documents/check_new_files/".to_string()
}

fn default_index_name() -> String {
    "pdfs".to_string()
}

fn default_exact_result_size() -> u32 {
    100
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_accepted_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".search-rs")
}

fn default_log_level() -> String {
    "search_rs=info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            exact_search_path: default_exact_search_path(),
            check_new_files_path: default_check_new_files_path(),
            index_name: default_index_name(),
            exact_result_size: default_exact_result_size(),
            timeout_seconds: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            initial_mode: SearchMode::default(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            accepted_extensions: default_accepted_extensions(),
            state_dir: default_state_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SearchError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Layer defaults, an optional TOML file and `SEARCH_RS__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&ClientConfig::default())
            .map_err(|e| SearchError::Config(format!("Failed to build defaults: {}", e)))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ClientConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            SearchError::Config(format!(
                "Invalid backend URL '{}': {}",
                self.backend.base_url, e
            ))
        })?;

        if self.backend.exact_result_size == 0 {
            return Err(SearchError::Config(
                "exact_result_size must be greater than zero".to_string(),
            ));
        }

        if self.content.accepted_extensions.is_empty() {
            return Err(SearchError::Config(
                "No accepted file extensions configured".to_string(),
            ));
        }

        Ok(())
    }
}
