//! Scripted backend for testing
//!
//! Replies are queued per endpoint and handed out in call order, each after an
//! optional delay. When a queue is empty the mock answers with an empty result
//! (or an empty successful detection report). Every call is recorded.

use super::SearchBackend;
use crate::error::{Result, SearchError};
use crate::types::{DetectionStatus, FileDetectionReport, RawSearchResponse};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Fuzzy { term: String },
    Exact { term: String, size: u32 },
    CheckNewFiles,
}

struct Scripted<T> {
    delay: Duration,
    outcome: std::result::Result<T, String>,
}

/// Mock backend implementation for testing
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    search_replies: Mutex<VecDeque<Scripted<RawSearchResponse>>>,
    check_replies: Mutex<VecDeque<Scripted<FileDetectionReport>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a search reply (fuzzy or exact, whichever is called next)
    pub fn push_search(&self, response: RawSearchResponse, delay: Duration) {
        self.search_replies.lock().unwrap_or_else(|p| p.into_inner()).push_back(Scripted {
            delay,
            outcome: Ok(response),
        });
    }

    /// Queue a failing search
    pub fn push_search_error(&self, message: &str, delay: Duration) {
        self.search_replies.lock().unwrap_or_else(|p| p.into_inner()).push_back(Scripted {
            delay,
            outcome: Err(message.to_string()),
        });
    }

    /// Queue a detection report
    pub fn push_check(&self, report: FileDetectionReport, delay: Duration) {
        self.check_replies.lock().unwrap_or_else(|p| p.into_inner()).push_back(Scripted {
            delay,
            outcome: Ok(report),
        });
    }

    /// Queue a failing detection request
    pub fn push_check_error(&self, message: &str, delay: Duration) {
        self.check_replies.lock().unwrap_or_else(|p| p.into_inner()).push_back(Scripted {
            delay,
            outcome: Err(message.to_string()),
        });
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Number of search calls (fuzzy and exact)
    pub fn search_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !matches!(call, BackendCall::CheckNewFiles))
            .count()
    }

    fn record(&self, call: BackendCall) {
        debug!("MockBackend: {:?}", call);
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(call);
    }

    async fn next_search(&self) -> Result<RawSearchResponse> {
        let scripted = self
            .search_replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();

        match scripted {
            Some(scripted) => settle(scripted).await,
            None => Ok(RawSearchResponse::default()),
        }
    }
}

async fn settle<T>(scripted: Scripted<T>) -> Result<T> {
    if !scripted.delay.is_zero() {
        tokio::time::sleep(scripted.delay).await;
    }
    scripted.outcome.map_err(SearchError::Transport)
}

#[async_trait::async_trait]
impl SearchBackend for MockBackend {
    async fn search_fuzzy(&self, term: &str) -> Result<RawSearchResponse> {
        self.record(BackendCall::Fuzzy {
            term: term.to_string(),
        });
        self.next_search().await
    }

    async fn search_exact(&self, term: &str, size: u32) -> Result<RawSearchResponse> {
        self.record(BackendCall::Exact {
            term: term.to_string(),
            size,
        });
        self.next_search().await
    }

    async fn check_new_files(&self) -> Result<FileDetectionReport> {
        self.record(BackendCall::CheckNewFiles);

        let scripted = self
            .check_replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();

        match scripted {
            Some(scripted) => settle(scripted).await,
            None => Ok(FileDetectionReport {
                status: DetectionStatus::Success,
                total_found: 0,
                total_processed: 0,
                processed_files: Vec::new(),
                failed_files: Vec::new(),
                message: None,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
