//! New file detection
//!
//! Asks the backend to ingest source files it has not indexed yet and turns
//! the outcome into a `FileDetectionReport`. Transport failures go to the error
//! reporter and are folded into an error-status report, so callers always get a
//! report back. A successful
//! run re-runs the coordinator's current search so new content shows up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::backend::SearchBackend;
use crate::coordinator::SearchCoordinator;
use crate::events::{ErrorEvent, ErrorReporter, Operation};
use crate::types::FileDetectionReport;

/// Drives the "detect new files" workflow
pub struct FileIngestionReporter {
    backend: Arc<dyn SearchBackend>,
    coordinator: SearchCoordinator,
    reporter: Arc<dyn ErrorReporter>,
    in_progress: Arc<AtomicUsize>,
}

/// Clears the in-progress marker however the operation ends
struct InProgress(Arc<AtomicUsize>);

impl InProgress {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FileIngestionReporter {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        coordinator: SearchCoordinator,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            backend,
            coordinator,
            reporter,
            in_progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True while a detection request is outstanding
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst) > 0
    }

    /// Run one detection request; never fails, errors become an error report
    pub async fn check_for_new_files(&self) -> FileDetectionReport {
        let report = {
            let _running = InProgress::enter(&self.in_progress);
            info!(
                component = "file_ingestion",
                action = "detection_started",
                "Checking for new files"
            );

            match self.backend.check_new_files().await {
                Ok(report) => report,
                Err(e) => {
                    error!(
                        component = "file_ingestion",
                        action = "detection_failed",
                        "New file detection failed: {}",
                        e
                    );
                    self.reporter
                        .report(ErrorEvent::new(Operation::CheckNewFiles, e.message()));
                    FileDetectionReport::from_failure(e.message())
                }
            }
        };

        info!(
            component = "file_ingestion",
            action = "detection_completed",
            status = ?report.status,
            total_found = report.total_found,
            total_processed = report.total_processed,
            failed = report.failed_files.len(),
            "New file detection finished"
        );

        if report.is_success() {
            match self.coordinator.refresh() {
                Ok(sequence_id) => debug!(
                    component = "file_ingestion",
                    sequence_id,
                    "Re-running current search after ingestion"
                ),
                Err(e) => debug!(
                    component = "file_ingestion",
                    "Skipped follow-up search: {}",
                    e
                ),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{BackendCall, MockBackend};
    use crate::coordinator::CoordinatorOptions;
    use crate::count::CountBroadcaster;
    use crate::events::TracingReporter;
    use crate::types::{DetectionStatus, FailedFile, SearchMode};
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    fn setup() -> (Arc<MockBackend>, SearchCoordinator, Arc<FileIngestionReporter>) {
        let backend = Arc::new(MockBackend::new());
        let coordinator = SearchCoordinator::new(
            backend.clone(),
            CountBroadcaster::new(),
            Arc::new(TracingReporter),
            CoordinatorOptions::default(),
        );
        let reporter = Arc::new(FileIngestionReporter::new(
            backend.clone(),
            coordinator.clone(),
            Arc::new(TracingReporter),
        ));
        (backend, coordinator, reporter)
    }

    fn processed(paths: &[&str]) -> FileDetectionReport {
        FileDetectionReport {
            status: DetectionStatus::Success,
            total_found: paths.len() as u64,
            total_processed: paths.len() as u64,
            processed_files: paths.iter().map(|p| p.to_string()).collect(),
            failed_files: Vec::new(),
            message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_becomes_error_report() {
        let (backend, _coordinator, reporter) = setup();
        backend.push_check_error("timeout", Duration::from_millis(50));

        let report = reporter.check_for_new_files().await;

        assert_eq!(report.status, DetectionStatus::Error);
        assert_eq!(report.total_found, 0);
        assert_eq!(report.total_processed, 0);
        assert!(report.processed_files.is_empty());
        assert_eq!(
            report.failed_files,
            vec![FailedFile {
                path: "Error del sistema".to_string(),
                error_message: "timeout".to_string(),
            }]
        );
        assert!(!reporter.is_running());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.search_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_is_reported() {
        let backend = Arc::new(MockBackend::new());
        let coordinator = SearchCoordinator::new(
            backend.clone(),
            CountBroadcaster::new(),
            Arc::new(TracingReporter),
            CoordinatorOptions::default(),
        );
        let (tx, mut errors) = unbounded_channel();
        let reporter = FileIngestionReporter::new(backend.clone(), coordinator, Arc::new(tx));
        backend.push_check_error("timeout", Duration::from_millis(50));

        let report = reporter.check_for_new_files().await;

        assert_eq!(report.status, DetectionStatus::Error);
        let event = errors.try_recv().unwrap();
        assert_eq!(event.operation, Operation::CheckNewFiles);
        assert_eq!(event.message, "timeout");
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_re_runs_last_search() {
        let (backend, coordinator, reporter) = setup();
        coordinator.set_term("annual report");
        coordinator.set_mode(SearchMode::Exact).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        backend.push_check(processed(&["2024/q4.pdf"]), Duration::ZERO);
        let report = reporter.check_for_new_files().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(report.is_success());
        assert_eq!(report.processed_files, vec!["2024/q4.pdf".to_string()]);

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], BackendCall::CheckNewFiles);
        assert_eq!(
            calls[2],
            BackendCall::Exact {
                term: "annual report".to_string(),
                size: 100
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_status_skips_refresh() {
        let (backend, _coordinator, reporter) = setup();
        backend.push_check(
            FileDetectionReport {
                status: DetectionStatus::Error,
                total_found: 1,
                total_processed: 0,
                processed_files: Vec::new(),
                failed_files: vec![FailedFile {
                    path: "broken.pdf".to_string(),
                    error_message: "encrypted".to_string(),
                }],
                message: None,
            },
            Duration::ZERO,
        );

        let report = reporter.check_for_new_files().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(report.status, DetectionStatus::Error);
        assert_eq!(backend.search_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_progress_flag_spans_request() {
        let (backend, _coordinator, reporter) = setup();
        backend.push_check(processed(&[]), Duration::from_millis(200));
        assert!(!reporter.is_running());

        let task = {
            let reporter = reporter.clone();
            tokio::spawn(async move { reporter.check_for_new_files().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(reporter.is_running());

        let report = task.await.unwrap();
        assert!(report.is_success());
        assert!(!reporter.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_cleared_when_cancelled() {
        let (backend, _coordinator, reporter) = setup();
        backend.push_check(processed(&[]), Duration::from_secs(60));

        let task = {
            let reporter = reporter.clone();
            tokio::spawn(async move { reporter.check_for_new_files().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(reporter.is_running());

        task.abort();
        let _ = task.await;
        assert!(!reporter.is_running());
    }
}
