//! Relay service: dedup, classify, format, deliver.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::classifier::EventClassifier;
use super::formatter;
use super::stats::{RelayStats, StatsSnapshot};
use crate::domain::{ChangeEvent, DedupStore, MilestoneTracker, OrderMessage, build_key};
use crate::error::RelayError;
use crate::notifier::Notifier;

/// Orchestration layer for both inbound sources.
///
/// Every change event follows the pattern: build key → dedup check →
/// classify → format → deliver. Queue records skip the first two steps.
/// Delivery failures are logged and counted, never propagated.
#[derive(Debug, Clone)]
pub struct RelayService {
    dedup: Arc<DedupStore>,
    milestones: Arc<MilestoneTracker>,
    classifier: EventClassifier,
    notifier: Arc<dyn Notifier>,
    stats: Arc<RelayStats>,
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(
        dedup: Arc<DedupStore>,
        milestones: Arc<MilestoneTracker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            classifier: EventClassifier::new(Arc::clone(&milestones)),
            dedup,
            milestones,
            notifier,
            stats: Arc::new(RelayStats::default()),
        }
    }

    /// Returns a reference to the inner [`DedupStore`].
    #[must_use]
    pub fn dedup(&self) -> &Arc<DedupStore> {
        &self.dedup
    }

    /// Returns a reference to the inner [`MilestoneTracker`].
    #[must_use]
    pub fn milestones(&self) -> &Arc<MilestoneTracker> {
        &self.milestones
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Processes one change event, returning how many notifications were
    /// handed to the chat sink. Duplicates return `0`.
    pub async fn handle_change_event(&self, event: &ChangeEvent) -> usize {
        self.stats.event_received();

        let key = build_key(event);
        if self.dedup.is_duplicate(&key, event.received_at) {
            self.stats.duplicate_suppressed();
            tracing::debug!(%key, "duplicate change event suppressed");
            return 0;
        }

        let notifications = self.classifier.classify(event);
        tracing::debug!(
            %key,
            count = notifications.len(),
            "change event classified"
        );

        for notification in &notifications {
            let text = formatter::render_notification(notification);
            self.deliver(notification.kind(), &text).await;
        }
        notifications.len()
    }

    /// Parses and relays one queue message body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the body cannot be
    /// parsed. Nothing is sent in that case; the caller still
    /// acknowledges the message.
    pub async fn handle_order_body(&self, body: &str) -> Result<(), RelayError> {
        self.stats.queue_message();
        let order = match OrderMessage::parse(body) {
            Ok(order) => order,
            Err(err) => {
                self.stats.poison_message();
                return Err(err);
            }
        };
        self.handle_order(&order).await;
        Ok(())
    }

    /// Relays a parsed order record.
    pub async fn handle_order(&self, order: &OrderMessage) {
        let text = formatter::render_order(order);
        self.deliver("order", &text).await;
    }

    /// Sends `text`; failures are logged and counted only.
    async fn deliver(&self, kind: &str, text: &str) {
        match self.notifier.send(text).await {
            Ok(()) => {
                self.stats.notification_sent();
                tracing::info!(kind, "notification sent");
            }
            Err(err) => {
                self.stats.delivery_failed();
                tracing::error!(kind, error = %err, "notification delivery failed");
            }
        }
    }
}

/// Drains decoded change events one at a time, in arrival order, until
/// every sender is dropped.
pub async fn run_event_worker(service: Arc<RelayService>, mut events: mpsc::Receiver<ChangeEvent>) {
    while let Some(event) = events.recv().await {
        service.handle_change_event(&event).await;
    }
    tracing::info!("change event channel closed, worker exiting");
}
