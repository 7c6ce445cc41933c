//! Search coordinator
//!
//! Turns keystrokes and mode toggles into backend queries. Keystrokes are
//! debounced; mode toggles and refreshes dispatch immediately. Requests may
//! overlap, but only the response to the most recently dispatched request is
//! ever applied: older responses are dropped when they arrive.
//!
//! All methods that dispatch spawn tokio tasks and must be called from within
//! a tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::backend::{self, SearchBackend};
use crate::config::ClientConfig;
use crate::count::CountBroadcaster;
use crate::error::{Result, SearchError};
use crate::events::{ErrorEvent, ErrorReporter, Operation};
use crate::normalizer;
use crate::types::{RawSearchResponse, SearchMode, SearchQuery, SearchRequest, SearchResultRow};

/// Lifecycle of the most recent search cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Debouncing,
    Dispatched,
    SettledSuccess,
    SettledError,
}

/// Snapshot handed to the rendering surface
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub rows: Vec<SearchResultRow>,
    pub loading: bool,
    pub mode: SearchMode,
    pub term: String,
}

/// Tunables for a coordinator instance
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub debounce: Duration,
    pub exact_size: u32,
    pub initial_mode: SearchMode,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            exact_size: 100,
            initial_mode: SearchMode::Fuzzy,
        }
    }
}

impl CoordinatorOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            debounce: config.search.debounce(),
            exact_size: config.backend.exact_result_size,
            initial_mode: config.search.initial_mode,
        }
    }
}

struct Shared {
    term: String,
    mode: SearchMode,
    phase: CoordinatorState,
    rows: Vec<SearchResultRow>,
    loading: bool,
    closed: bool,
    next_sequence: u64,
    /// Sequence id of the newest dispatch; the only one allowed to apply
    latest_sequence: u64,
    debounce: Option<JoinHandle<()>>,
    debounce_generation: u64,
    in_flight: HashMap<u64, AbortHandle>,
}

impl Shared {
    fn view(&self) -> SearchView {
        SearchView {
            rows: self.rows.clone(),
            loading: self.loading,
            mode: self.mode,
            term: self.term.clone(),
        }
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
        self.debounce_generation += 1;
    }

    fn teardown(&mut self) {
        self.closed = true;
        self.cancel_debounce();
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
        self.loading = false;
        self.phase = CoordinatorState::Idle;
    }
}

struct Inner {
    backend: Arc<dyn SearchBackend>,
    count: CountBroadcaster,
    reporter: Arc<dyn ErrorReporter>,
    options: CoordinatorOptions,
    shared: Mutex<Shared>,
    view_tx: watch::Sender<SearchView>,
}

/// Debounced, sequence-gated search driver. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

impl SearchCoordinator {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        count: CountBroadcaster,
        reporter: Arc<dyn ErrorReporter>,
        options: CoordinatorOptions,
    ) -> Self {
        let shared = Shared {
            term: String::new(),
            mode: options.initial_mode,
            phase: CoordinatorState::Idle,
            rows: Vec::new(),
            loading: false,
            closed: false,
            next_sequence: 1,
            latest_sequence: 0,
            debounce: None,
            debounce_generation: 0,
            in_flight: HashMap::new(),
        };
        let (view_tx, _) = watch::channel(shared.view());

        Self {
            inner: Arc::new(Inner {
                backend,
                count,
                reporter,
                options,
                shared: Mutex::new(shared),
                view_tx,
            }),
        }
    }

    /// Initial load: list every document with the current (empty) term
    pub fn start(&self) -> Result<u64> {
        info!(
            component = "search_coordinator",
            action = "start",
            backend = self.inner.backend.name(),
            "Loading initial results"
        );
        self.refresh()
    }

    /// Record raw input and restart the debounce timer
    pub fn set_term(&self, raw_input: impl Into<String>) {
        let raw_input = raw_input.into();
        let mut shared = self.inner.lock();
        if shared.closed {
            debug!(component = "search_coordinator", "Ignoring input after shutdown");
            return;
        }

        shared.cancel_debounce();
        shared.term = raw_input;
        shared.phase = CoordinatorState::Debouncing;

        let generation = shared.debounce_generation;
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.options.debounce;
        debug!(
            component = "search_coordinator",
            action = "debounce",
            generation,
            "Debounce timer (re)started"
        );

        shared.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire_debounce(generation);
            }
        }));

        self.inner.publish(&shared);
    }

    /// Switch mode and search the current term right away
    pub fn set_mode(&self, mode: SearchMode) -> Result<u64> {
        let mut shared = self.inner.lock();
        if shared.closed {
            return Err(SearchError::Shutdown);
        }

        shared.mode = mode;
        shared.cancel_debounce();
        let result = self.inner.dispatch(&mut shared);
        self.inner.publish(&shared);
        drop(shared);

        self.inner.report_validation(&result);
        result
    }

    /// Re-run the last known term and mode without waiting for the debounce delay
    pub fn refresh(&self) -> Result<u64> {
        let mut shared = self.inner.lock();
        if shared.closed {
            return Err(SearchError::Shutdown);
        }

        shared.cancel_debounce();
        let result = self.inner.dispatch(&mut shared);
        self.inner.publish(&shared);
        drop(shared);

        self.inner.report_validation(&result);
        result
    }

    /// Stop timers and make every outstanding response a no-op
    pub fn shutdown(&self) {
        let mut shared = self.inner.lock();
        if shared.closed {
            return;
        }
        shared.teardown();
        self.inner.publish(&shared);
        info!(component = "search_coordinator", action = "shutdown", "Coordinator shut down");
    }

    /// Rendering-surface snapshots, updated after every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> SearchView {
        self.inner.lock().view()
    }

    pub fn rows(&self) -> Vec<SearchResultRow> {
        self.inner.lock().rows.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    pub fn mode(&self) -> SearchMode {
        self.inner.lock().mode
    }

    pub fn term(&self) -> String {
        self.inner.lock().term.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.inner.lock().phase
    }

    /// Sequence id of the newest dispatched request (0 before the first one)
    pub fn latest_sequence(&self) -> u64 {
        self.inner.lock().latest_sequence
    }

    pub fn count(&self) -> &CountBroadcaster {
        &self.inner.count
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, shared: &Shared) {
        self.view_tx.send_replace(shared.view());
    }

    fn fire_debounce(self: Arc<Self>, generation: u64) {
        let mut shared = self.lock();
        if shared.closed || shared.debounce_generation != generation {
            return;
        }
        shared.debounce = None;

        let result = self.dispatch(&mut shared);
        self.publish(&shared);
        drop(shared);

        self.report_validation(&result);
    }

    /// Issue one backend call for the current term and mode
    fn dispatch(self: &Arc<Self>, shared: &mut Shared) -> Result<u64> {
        let query = match SearchQuery::new(shared.term.clone(), shared.mode) {
            Ok(query) => query,
            Err(e) => {
                shared.phase = if shared.loading {
                    CoordinatorState::Dispatched
                } else {
                    CoordinatorState::Idle
                };
                return Err(e);
            }
        };

        let sequence_id = shared.next_sequence;
        shared.next_sequence += 1;
        shared.latest_sequence = sequence_id;
        shared.loading = true;
        shared.phase = CoordinatorState::Dispatched;

        info!(
            component = "search_coordinator",
            action = "search_started",
            sequence_id,
            mode = %query.mode,
            term = %query.term,
            "Search dispatched"
        );

        let request = SearchRequest { query, sequence_id };
        let backend = self.backend.clone();
        let exact_size = self.options.exact_size;
        let weak: Weak<Inner> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let result = backend::execute(backend.as_ref(), &request.query, exact_size).await;
            if let Some(inner) = weak.upgrade() {
                inner.settle(request, result);
            }
        });
        shared.in_flight.insert(sequence_id, handle.abort_handle());

        Ok(sequence_id)
    }

    /// Apply a response if it belongs to the newest dispatch
    fn settle(&self, request: SearchRequest, result: Result<RawSearchResponse>) {
        let sequence_id = request.sequence_id;
        let mut shared = self.lock();
        shared.in_flight.remove(&sequence_id);

        if shared.closed {
            debug!(component = "search_coordinator", sequence_id, "Dropping response after shutdown");
            return;
        }
        if sequence_id != shared.latest_sequence {
            debug!(
                component = "search_coordinator",
                sequence_id,
                latest = shared.latest_sequence,
                "Discarding stale response"
            );
            return;
        }

        shared.loading = false;

        match result {
            Ok(response) => {
                let rows = normalizer::normalize(&response);
                let count = normalizer::result_count(request.query.mode, &response, &rows);
                info!(
                    component = "search_coordinator",
                    action = "search_completed",
                    sequence_id,
                    rows = rows.len(),
                    count,
                    "Search completed"
                );

                shared.rows = rows;
                shared.phase = settled_phase(&shared, CoordinatorState::SettledSuccess);
                // Written under the lock so shutdown or a newer settle cannot
                // interleave; subscribers run only after it is released.
                self.count.store(count);
                self.publish(&shared);
                drop(shared);

                self.count.notify();
            }
            Err(e) => {
                warn!(
                    component = "search_coordinator",
                    action = "search_failed",
                    sequence_id,
                    "Search failed: {}",
                    e
                );

                shared.phase = settled_phase(&shared, CoordinatorState::SettledError);
                self.publish(&shared);
                drop(shared);

                self.reporter
                    .report(ErrorEvent::new(Operation::Search, e.message()));
            }
        }
    }

    fn report_validation(&self, result: &Result<u64>) {
        if let Err(e @ SearchError::Validation(_)) = result {
            warn!(component = "search_coordinator", action = "validate", "{}", e);
            self.reporter
                .report(ErrorEvent::new(Operation::Search, e.message()));
        }
    }
}

/// A keystroke typed while the request was outstanding keeps its timer pending
fn settled_phase(shared: &Shared, settled: CoordinatorState) -> CoordinatorState {
    if shared.debounce.is_some() {
        CoordinatorState::Debouncing
    } else {
        settled
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let shared = self
            .shared
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        shared.teardown();
    }
}
