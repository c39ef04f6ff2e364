//! Lock-free per-mailbox counters.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// Layer 3: Internal module imports
// (none)

/// Counters kept by every mailbox: posts accepted, messages dispatched,
/// messages dropped (rejected posts, discarded frames), and the wall-clock
/// time of the last dispatched message.
///
/// Counter operations are relaxed atomics; the timestamp takes a short
/// write lock.
#[derive(Debug, Default)]
pub struct MailboxMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    last_message_at: RwLock<Option<DateTime<Utc>>>,
}

impl MailboxMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        *self.last_message_at.write() = Some(Utc::now());
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Posts accepted into the queue.
    pub fn sent_count(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Messages handed to the dispatcher.
    pub fn received_count(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Messages dropped before dispatch.
    pub fn dropped_count(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Messages accepted but not yet dispatched.
    pub fn in_flight(&self) -> u64 {
        self.sent_count().saturating_sub(self.received_count())
    }

    /// Wall-clock time of the last dispatched message.
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        *self.last_message_at.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = MailboxMetrics::new();
        assert_eq!(metrics.sent_count(), 0);
        assert_eq!(metrics.received_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert!(metrics.last_message_at().is_none());
    }

    #[test]
    fn in_flight_tracks_sent_minus_received() {
        let metrics = MailboxMetrics::new();
        metrics.record_sent();
        metrics.record_sent();
        assert_eq!(metrics.in_flight(), 2);

        metrics.record_received();
        assert_eq!(metrics.in_flight(), 1);
        assert!(metrics.last_message_at().is_some());
    }

    #[test]
    fn dropped_is_independent() {
        let metrics = MailboxMetrics::new();
        metrics.record_dropped();
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.in_flight(), 0);
    }
}
