//! search-rs: document search client
//!
//! Coordinates searches against an ingested document corpus and normalizes
//! the nested document -> page -> highlight responses into flat table rows.
//!
//! # Features
//!
//! - Debounced fuzzy/exact search with last-dispatch-wins response ordering
//! - Flattening of backend payloads into one row per matched page
//! - Shared result count observable by any number of widgets
//! - Search seeded from an uploaded text file
//! - New file detection with a uniform success/error report
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! index_name = "pdfs"
//! exact_result_size = 100
//!
//! [search]
//! debounce_ms = 500
//! initial_mode = "fuzzy"
//!
//! [content]
//! accepted_extensions = ["txt"]
//! state_dir = ".search-rs"
//!
//! [logging]
//! level = "search_rs=info"
//! format = "pretty"
//! ```

pub mod backend;
pub mod config;
pub mod content;
pub mod coordinator;
pub mod count;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod normalizer;
pub mod telemetry;
pub mod types;

pub use backend::{HttpBackend, MockBackend, SearchBackend};
pub use config::ClientConfig;
pub use content::ContentSearchBridge;
pub use coordinator::{CoordinatorOptions, CoordinatorState, SearchCoordinator, SearchView};
pub use count::CountBroadcaster;
pub use error::{Result, SearchError};
pub use events::{ErrorEvent, ErrorReporter, Operation, TracingReporter};
pub use ingestion::FileIngestionReporter;
pub use types::{FileDetectionReport, SearchMode, SearchResultRow};
