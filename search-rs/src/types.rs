//! Search data model
//!
//! Wire payloads returned by the search backend (`Raw*`), the normalized
//! document/page/row model built from them, and the new-file detection report.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{Result, SearchError};

/// Search matching mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Relevance-ranked, typo tolerant
    #[default]
    Fuzzy,
    /// Literal phrase match, capped result size
    Exact,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Fuzzy => write!(f, "fuzzy"),
            SearchMode::Exact => write!(f, "exact"),
        }
    }
}

/// A validated search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub mode: SearchMode,
}

impl SearchQuery {
    /// Build a query, rejecting an empty term in exact mode.
    ///
    /// An empty fuzzy term means "list all documents".
    pub fn new(term: impl Into<String>, mode: SearchMode) -> Result<Self> {
        let term = term.into();
        if mode == SearchMode::Exact && term.trim().is_empty() {
            return Err(SearchError::Validation(
                "Exact search requires a non-empty term".to_string(),
            ));
        }
        Ok(Self { term, mode })
    }
}

/// A dispatched query tagged with its position in dispatch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub sequence_id: u64,
}

/// Search backend response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub results: Vec<RawDocument>,
    /// Total declared by exact search endpoints
    #[serde(
        default,
        rename = "totalCount",
        alias = "total_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<u64>,
}

impl RawSearchResponse {
    /// Total the backend claims to have matched, if it said so
    pub fn declared_total(&self) -> Option<u64> {
        self.total_count.or(self.total_hits)
    }
}

/// One matched document as sent by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub matching_pages: Vec<RawPage>,
}

/// One matched page as sent by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Fuzzy endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<TextField>,
    /// Exact endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TextField>,
}

/// A text field the backend sends either as a string or a list of fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    One(String),
    Many(Vec<String>),
}

impl TextField {
    /// Fragments joined with a single space; a bare string is returned verbatim
    pub fn joined(&self) -> String {
        match self {
            TextField::One(text) => text.clone(),
            TextField::Many(fragments) => fragments.join(" "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TextField::One(text) => text.is_empty(),
            TextField::Many(fragments) => fragments.is_empty(),
        }
    }
}

/// A matched page after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMatch {
    pub page_number: u32,
    pub highlight_text: String,
}

/// A matched document after normalization; pages keep backend order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub file_name: String,
    pub relative_path: String,
    pub total_pages: u32,
    pub pages: Vec<PageMatch>,
}

/// Flat table row, one per matched page.
///
/// `row_id` is the document file name and is shared by every row of that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRow {
    pub row_id: String,
    pub document_name: String,
    pub content: String,
    pub page_number: u32,
    pub total_pages: u32,
    pub relative_path: String,
}

/// Outcome of a new-file detection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    Success,
    #[serde(other)]
    Error,
}

/// A file the backend could not ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    #[serde(rename = "error", default, deserialize_with = "string_or_null")]
    pub error_message: String,
}

/// Report of one new-file detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetectionReport {
    pub status: DetectionStatus,
    #[serde(default)]
    pub total_found: u64,
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub processed_files: Vec<String>,
    #[serde(default)]
    pub failed_files: Vec<FailedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Path shown for failures that did not come from a specific file
pub const SYSTEM_ERROR_PATH: &str = "Error del sistema";

impl FileDetectionReport {
    /// Report standing in for a detection request that never produced one
    pub fn from_failure(message: impl Into<String>) -> Self {
        Self {
            status: DetectionStatus::Error,
            total_found: 0,
            total_processed: 0,
            processed_files: Vec::new(),
            failed_files: vec![FailedFile {
                path: SYSTEM_ERROR_PATH.to_string(),
                error_message: message.into(),
            }],
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DetectionStatus::Success
    }
}

impl fmt::Display for FileDetectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            DetectionStatus::Success => "Success",
            DetectionStatus::Error => "Error",
        };
        writeln!(f, "Status: {}", status)?;
        if let Some(message) = &self.message {
            writeln!(f, "{}", message)?;
        }
        writeln!(f, "Files found: {}", self.total_found)?;
        write!(f, "Files processed: {}", self.total_processed)?;

        if !self.processed_files.is_empty() {
            write!(f, "\nProcessed files:")?;
            for path in &self.processed_files {
                write!(f, "\n  {}", path)?;
            }
        }

        if !self.failed_files.is_empty() {
            write!(f, "\nFiles with errors:")?;
            for failed in &self.failed_files {
                write!(f, "\n  {} - Error: {}", failed.path, failed.error_message)?;
            }
        }

        Ok(())
    }
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
