//! Error reporting collaborator

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::error;

/// Operation that produced an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Search,
    ContentSearch,
    CheckNewFiles,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Search => write!(f, "search"),
            Operation::ContentSearch => write!(f, "content_search"),
            Operation::CheckNewFiles => write!(f, "check_new_files"),
        }
    }
}

/// User-facing error notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    pub operation: Operation,
    pub message: String,
}

impl ErrorEvent {
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Receives errors meant for the user. Implementations must not block.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, event: ErrorEvent);
}

/// Reporter that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, event: ErrorEvent) {
        error!(operation = %event.operation, "{}", event.message);
    }
}

impl ErrorReporter for UnboundedSender<ErrorEvent> {
    fn report(&self, event: ErrorEvent) {
        // A closed receiver just means nobody is listening any more
        let _ = self.send(event);
    }
}
