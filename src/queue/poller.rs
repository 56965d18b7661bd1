//! Continuous long-poll loop over the order queue.

use std::sync::Arc;
use std::time::Duration;

use super::OrderQueue;
use crate::config::RelayConfig;
use crate::service::RelayService;

/// Poll loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Messages per receive call.
    pub max_messages: i32,
    /// Long-poll wait per receive call.
    pub wait: Duration,
    /// Pause between consecutive polls.
    pub poll_delay: Duration,
    /// Pause after a failed receive.
    pub error_backoff: Duration,
}

impl From<&RelayConfig> for PollSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_messages: config.queue_max_messages,
            wait: config.queue_wait,
            poll_delay: config.queue_poll_delay,
            error_backoff: config.queue_error_backoff,
        }
    }
}

/// Receives one batch, relays each message, and acknowledges every
/// message whether or not it parsed.
///
/// # Errors
///
/// Propagates the receive failure; per-message failures are logged only.
pub async fn poll_once(
    queue: &dyn OrderQueue,
    service: &RelayService,
    settings: &PollSettings,
) -> Result<usize, crate::error::RelayError> {
    let batch = queue.receive(settings.max_messages, settings.wait).await?;
    let count = batch.len();

    for message in batch {
        if let Err(err) = service.handle_order_body(&message.body).await {
            tracing::error!(
                message_id = %message.message_id,
                error = %err,
                "dropping unparseable queue message"
            );
        }
        if let Err(err) = queue.acknowledge(&message.receipt_handle).await {
            tracing::error!(
                message_id = %message.message_id,
                error = %err,
                "failed to acknowledge queue message"
            );
        }
    }

    Ok(count)
}

/// Polls forever: fixed delay after each batch (including empty ones),
/// longer back-off after a receive error.
pub async fn run_poller(
    queue: Arc<dyn OrderQueue>,
    service: Arc<RelayService>,
    settings: PollSettings,
) {
    tracing::info!(?settings, "order queue poller started");
    loop {
        let pause = match poll_once(queue.as_ref(), &service, &settings).await {
            Ok(0) => settings.poll_delay,
            Ok(count) => {
                tracing::debug!(count, "queue batch processed");
                settings.poll_delay
            }
            Err(err) => {
                tracing::warn!(error = %err, backoff = ?settings.error_backoff, "queue receive failed");
                settings.error_backoff
            }
        };
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RelayError;
    use crate::queue::QueueMessage;
    use crate::service::relay_service::tests::{RecordingNotifier, make_service};

    /// Serves scripted batches and records acknowledgements.
    #[derive(Debug, Default)]
    struct ScriptedQueue {
        batches: Mutex<VecDeque<Result<Vec<QueueMessage>, RelayError>>>,
        acked: Mutex<Vec<String>>,
    }

    impl ScriptedQueue {
        fn with(batches: Vec<Result<Vec<QueueMessage>, RelayError>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                acked: Mutex::new(Vec::new()),
            }
        }

        fn acked(&self) -> Vec<String> {
            self.acked.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl OrderQueue for ScriptedQueue {
        async fn receive(
            &self,
            _max_messages: i32,
            _wait: Duration,
        ) -> Result<Vec<QueueMessage>, RelayError> {
            self.batches
                .lock()
                .ok()
                .and_then(|mut b| b.pop_front())
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn acknowledge(&self, receipt_handle: &str) -> Result<(), RelayError> {
            if let Ok(mut acked) = self.acked.lock() {
                acked.push(receipt_handle.to_string());
            }
            Ok(())
        }
    }

    fn message(id: &str, body: &str) -> QueueMessage {
        QueueMessage {
            message_id: id.to_string(),
            body: body.to_string(),
            receipt_handle: format!("rh-{id}"),
        }
    }

    fn settings() -> PollSettings {
        PollSettings {
            max_messages: 10,
            wait: Duration::from_secs(20),
            poll_delay: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn poison_message_is_acknowledged_without_send() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = make_service(Arc::clone(&notifier));
        let queue = ScriptedQueue::with(vec![Ok(vec![
            message("1", "{definitely not json"),
            message("2", r#"{"status":"filled","order_id":"o-2"}"#),
        ])]);

        let processed = poll_once(&queue, &service, &settings()).await;
        assert!(matches!(processed, Ok(2)));
        assert_eq!(queue.acked(), vec!["rh-1".to_string(), "rh-2".to_string()]);

        let sent = notifier.messages();
        let [only] = sent.as_slice() else {
            panic!("expected one send, got {sent:?}");
        };
        assert!(only.contains("o-2"));
    }

    #[tokio::test]
    async fn delivery_failure_still_acknowledges() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let service = make_service(Arc::clone(&notifier));
        let queue = ScriptedQueue::with(vec![Ok(vec![message("1", r#"{"status":"placed"}"#)])]);

        tokio_test::assert_ok!(poll_once(&queue, &service, &settings()).await);
        assert_eq!(queue.acked(), vec!["rh-1".to_string()]);
        assert_eq!(service.stats().delivery_failures, 1);
    }

    #[tokio::test]
    async fn receive_error_propagates() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = make_service(notifier);
        let queue = ScriptedQueue::with(vec![Err(RelayError::Queue("throttled".to_string()))]);

        let result = poll_once(&queue, &service, &settings()).await;
        assert!(matches!(result, Err(RelayError::Queue(_))));
        assert!(queue.acked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poller_keeps_going_after_errors() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(make_service(Arc::clone(&notifier)));
        let queue = Arc::new(ScriptedQueue::with(vec![
            Err(RelayError::Queue("down".to_string())),
            Ok(Vec::new()),
            Ok(vec![message("9", r#"{"status":"cancelled"}"#)]),
        ]));

        let handle = tokio::spawn(run_poller(
            Arc::clone(&queue) as Arc<dyn OrderQueue>,
            service,
            settings(),
        ));
        // 5s back-off + 1s empty-poll delay, then the third batch.
        tokio::time::sleep(Duration::from_secs(7)).await;
        handle.abort();

        assert_eq!(queue.acked(), vec!["rh-9".to_string()]);
        assert_eq!(notifier.messages().len(), 1);
    }
}
