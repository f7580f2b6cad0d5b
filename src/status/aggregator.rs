//! Shared status state and listener fan-out.
//!
//! [`StatusAggregator`] is the single writer for connection status, traffic
//! counters and control-server stats. Listeners are invoked outside the
//! state lock, so a listener may call [`StatusAggregator::snapshot`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::ListenerId;

use super::types::{
    ControlStats, ControlUpdate, Counter, Endpoint, LinkStatus, StatusSnapshot,
};

// ============================================================================
// Types
// ============================================================================

/// Status listener callback.
///
/// Called with a full snapshot after every observable change.
/// An `Err` means the listener is unreachable; it is logged and ignored.
pub type StatusListener = Box<dyn Fn(&StatusSnapshot) -> Result<()> + Send + Sync>;

type ListenerList = Vec<(ListenerId, Arc<StatusListener>)>;

// ============================================================================
// StatusAggregator
// ============================================================================

/// Process-wide observable relay state.
#[derive(Default)]
pub struct StatusAggregator {
    state: Mutex<StatusSnapshot>,
    listeners: RwLock<ListenerList>,
}

impl StatusAggregator {
    /// Creates an aggregator with everything disconnected and zeroed.
    #[inline]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        *self.state.lock()
    }

    /// Returns the current status of `endpoint`.
    #[inline]
    #[must_use]
    pub fn status(&self, endpoint: Endpoint) -> LinkStatus {
        self.state.lock().connection_status.get(endpoint)
    }

    /// Sets the status of `endpoint`.
    ///
    /// Listeners are notified only if the value actually changed.
    /// Returns `true` on change.
    pub fn update_status(&self, endpoint: Endpoint, status: LinkStatus) -> bool {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.connection_status.set(endpoint, status) {
                trace!(?endpoint, %status, "Status unchanged");
                return false;
            }
            *state
        };

        debug!(?endpoint, %status, "Status updated");
        self.notify(&snapshot);
        true
    }

    /// Increments a traffic counter without notifying listeners.
    pub fn increment(&self, counter: Counter) {
        self.state.lock().message_stats.increment(counter);
    }

    /// Applies a single control-stats change, notifying on change.
    pub fn apply_control(&self, update: ControlUpdate) -> bool {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.obs_stats.apply(update) {
                return false;
            }
            *state
        };

        debug!(?update, "Control stats updated");
        self.notify(&snapshot);
        true
    }

    /// Zeroes control stats without notifying.
    ///
    /// The status change that accompanies a disconnect carries the reset.
    pub fn reset_control(&self) {
        self.state.lock().obs_stats = ControlStats::default();
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Registers a listener.
    pub fn subscribe(&self, listener: StatusListener) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.write().push((id, Arc::new(listener)));
        debug!(listener = %id, "Status listener registered");
        id
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self, snapshot: &StatusSnapshot) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            if let Err(e) = listener(snapshot) {
                warn!(listener = %id, error = %e, "Status listener unreachable");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;

    fn counting_listener(count: &Arc<AtomicUsize>) -> StatusListener {
        let count = Arc::clone(count);
        Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_update_status_same_value_does_not_notify() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        aggregator.subscribe(counting_listener(&count));

        assert!(!aggregator.update_status(Endpoint::ControlLink, LinkStatus::Disconnected));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_update_status_change_notifies_once() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        aggregator.subscribe(counting_listener(&count));

        assert!(aggregator.update_status(Endpoint::ControlLink, LinkStatus::Connected));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!aggregator.update_status(Endpoint::ControlLink, LinkStatus::Connected));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_receives_full_snapshot() {
        let aggregator = StatusAggregator::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        aggregator.subscribe(Box::new(move |snapshot| {
            *seen_clone.lock() = Some(*snapshot);
            Ok(())
        }));

        aggregator.increment(Counter::Received);
        aggregator.update_status(Endpoint::FrameSource, LinkStatus::Connected);

        let snapshot = (*seen.lock()).expect("listener should have fired");
        assert_eq!(snapshot.message_stats.received, 1);
        assert_eq!(snapshot.connection_status.frame_source, LinkStatus::Connected);
    }

    #[test]
    fn test_failing_listener_is_swallowed() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        aggregator.subscribe(Box::new(|_| Err(Error::ConnectionClosed)));
        aggregator.subscribe(counting_listener(&count));

        assert!(aggregator.update_status(Endpoint::ControlLink, LinkStatus::Error));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_read_snapshot() {
        let aggregator = StatusAggregator::new();
        let inner = Arc::clone(&aggregator);
        aggregator.subscribe(Box::new(move |snapshot| {
            assert_eq!(inner.snapshot(), *snapshot);
            Ok(())
        }));

        aggregator.update_status(Endpoint::ControlLink, LinkStatus::Connecting);
    }

    #[test]
    fn test_counters_do_not_notify() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        aggregator.subscribe(counting_listener(&count));

        aggregator.increment(Counter::Forwarded);
        aggregator.increment(Counter::Forwarded);
        aggregator.increment(Counter::Lost);

        let stats = aggregator.snapshot().message_stats;
        assert_eq!(stats.forwarded, 2);
        assert_eq!(stats.lost, 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_apply_control_notifies_on_change_only() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        aggregator.subscribe(counting_listener(&count));

        assert!(aggregator.apply_control(ControlUpdate::Scenes(2)));
        assert!(!aggregator.apply_control(ControlUpdate::Scenes(2)));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        aggregator.reset_control();
        assert_eq!(aggregator.snapshot().obs_stats, ControlStats::default());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let aggregator = StatusAggregator::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = aggregator.subscribe(counting_listener(&count));

        assert_eq!(aggregator.listener_count(), 1);
        assert!(aggregator.unsubscribe(id));
        assert!(!aggregator.unsubscribe(id));

        aggregator.update_status(Endpoint::ControlLink, LinkStatus::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
