//! Process-lifetime relay counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters updated by the relay pipeline.
#[derive(Debug, Default)]
pub struct RelayStats {
    events_received: AtomicU64,
    duplicates_suppressed: AtomicU64,
    notifications_sent: AtomicU64,
    delivery_failures: AtomicU64,
    queue_messages: AtomicU64,
    poison_messages: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Change events handed to the pipeline.
    pub events_received: u64,
    /// Change events rejected by the dedup store.
    pub duplicates_suppressed: u64,
    /// Messages accepted by the chat sink.
    pub notifications_sent: u64,
    /// Messages the chat sink failed to accept.
    pub delivery_failures: u64,
    /// Queue messages received.
    pub queue_messages: u64,
    /// Queue messages dropped as unparseable.
    pub poison_messages: u64,
}

impl RelayStats {
    pub(crate) fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn duplicate_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivery_failed(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn queue_message(&self) {
        self.queue_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn poison_message(&self) {
        self.poison_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            queue_messages: self.queue_messages.load(Ordering::Relaxed),
            poison_messages: self.poison_messages.load(Ordering::Relaxed),
        }
    }
}
