//! AWS SQS implementation of [`OrderQueue`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Credentials;
use aws_sdk_sqs::error::DisplayErrorContext;

use super::{OrderQueue, QueueMessage};
use crate::config::RelayConfig;
use crate::error::RelayError;

/// SQS-backed order queue.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Builds an SQS client from the static credentials and region in
    /// `config`.
    pub async fn connect(config: &RelayConfig) -> Self {
        let credentials = Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "relay-config",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        Self::new(Client::new(&sdk_config), config.sqs_queue_url.clone())
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl OrderQueue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, RelayError> {
        let wait_secs = i32::try_from(wait.as_secs()).unwrap_or(20).clamp(0, 20);
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| RelayError::Queue(DisplayErrorContext(e).to_string()))?;

        Ok(output
            .messages()
            .iter()
            .filter_map(|m| {
                let receipt_handle = m.receipt_handle()?.to_string();
                Some(QueueMessage {
                    message_id: m.message_id().unwrap_or_default().to_string(),
                    body: m.body().unwrap_or_default().to_string(),
                    receipt_handle,
                })
            })
            .collect())
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), RelayError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| RelayError::Queue(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }
}
