//! Shared result count
//!
//! A single integer cell written by every completed search and read by any
//! number of independent widgets. Subscribers are called synchronously in
//! subscription order and immediately receive the current value on subscribe.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;

type Callback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct CountState {
    value: u64,
    next_id: u64,
    subscribers: Vec<(u64, Callback)>,
}

/// Publish/subscribe cell holding the latest result count
#[derive(Clone, Default)]
pub struct CountBroadcaster {
    state: Arc<Mutex<CountState>>,
}

impl CountBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value and notify every subscriber
    pub fn update(&self, count: u64) {
        self.store(count);
        self.notify();
    }

    /// Replace the value without calling subscribers.
    ///
    /// Safe to call while holding another lock; pair with `notify` once it is released.
    pub(crate) fn store(&self, count: u64) {
        lock(&self.state).value = count;
    }

    /// Hand the value current at call time to every subscriber
    pub(crate) fn notify(&self) {
        let (count, subscribers) = {
            let state = lock(&self.state);
            (state.value, snapshot(&state))
        };

        debug!(component = "count_broadcaster", count, "Publishing result count");

        for callback in subscribers {
            callback(count);
        }
    }

    /// Set the count back to zero
    pub fn reset(&self) {
        self.update(0);
    }

    /// Last published value
    pub fn current(&self) -> u64 {
        lock(&self.state).value
    }

    /// Register a callback; it is invoked right away with the current value.
    ///
    /// The callback stays registered until the returned handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> CountSubscription
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let (id, current) = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, callback.clone()));
            (id, state.value)
        };

        callback(current);

        CountSubscription {
            id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }
}

/// Handle keeping a count subscription alive
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct CountSubscription {
    id: u64,
    state: Weak<Mutex<CountState>>,
}

impl CountSubscription {
    /// Stop receiving updates
    pub fn unsubscribe(self) {}
}

impl Drop for CountSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            lock(&state).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

fn snapshot(state: &CountState) -> Vec<Callback> {
    state
        .subscribers
        .iter()
        .map(|(_, callback)| callback.clone())
        .collect()
}

fn lock(state: &Mutex<CountState>) -> MutexGuard<'_, CountState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Fn(u64) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |n| sink.lock().unwrap().push(n))
    }

    #[test]
    fn test_store_defers_callbacks_until_notify() {
        let count = CountBroadcaster::new();
        let (seen, sink) = recorder();
        let _sub = count.subscribe(sink);

        count.store(7);
        count.store(9);
        assert_eq!(count.current(), 9);
        assert_eq!(*seen.lock().unwrap(), vec![0]);

        count.notify();
        assert_eq!(*seen.lock().unwrap(), vec![0, 9]);
    }

    #[test]
    fn test_update_replaces_value() {
        let count = CountBroadcaster::new();
        assert_eq!(count.current(), 0);

        count.update(5);
        count.update(3);
        assert_eq!(count.current(), 3);

        count.reset();
        assert_eq!(count.current(), 0);
    }

    #[test]
    fn test_late_subscriber_receives_last_value() {
        let count = CountBroadcaster::new();
        count.update(12);

        let (seen, callback) = recorder();
        let _subscription = count.subscribe(callback);
        assert_eq!(*seen.lock().unwrap(), vec![12]);

        count.update(4);
        assert_eq!(*seen.lock().unwrap(), vec![12, 4]);
    }

    #[test]
    fn test_subscribers_notified_in_subscription_order() {
        let count = CountBroadcaster::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        let _a = count.subscribe(move |n| first.lock().unwrap().push(("a", n)));
        let second = order.clone();
        let _b = count.subscribe(move |n| second.lock().unwrap().push(("b", n)));

        order.lock().unwrap().clear();
        count.update(7);

        assert_eq!(*order.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let count = CountBroadcaster::new();
        let (seen, callback) = recorder();

        let subscription = count.subscribe(callback);
        assert_eq!(count.subscriber_count(), 1);
        subscription.unsubscribe();
        assert_eq!(count.subscriber_count(), 0);

        count.update(9);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_clones_share_state() {
        let count = CountBroadcaster::new();
        let widget = count.clone();
        count.update(2);
        assert_eq!(widget.current(), 2);
    }

    #[test]
    fn test_callback_may_read_current() {
        let count = CountBroadcaster::new();
        let reader = count.clone();
        let (seen, _) = recorder();
        let sink = seen.clone();
        let _subscription = count.subscribe(move |_| sink.lock().unwrap().push(reader.current()));

        count.update(6);
        assert_eq!(*seen.lock().unwrap(), vec![0, 6]);
    }
}
