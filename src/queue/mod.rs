//! Order queue boundary.
//!
//! [`OrderQueue`] is the at-least-once inbound source for order records.
//! Messages are acknowledged explicitly by receipt handle; the poller
//! acknowledges every message it receives, parseable or not.

pub mod poller;
pub mod sqs;

use std::fmt;

use async_trait::async_trait;

use crate::error::RelayError;

pub use poller::{PollSettings, poll_once, run_poller};
pub use sqs::SqsQueue;

/// One received queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Broker-assigned message id (for logs).
    pub message_id: String,
    /// Raw body.
    pub body: String,
    /// Opaque handle used to acknowledge the message.
    pub receipt_handle: String,
}

/// Pull-based work queue.
#[async_trait]
pub trait OrderQueue: Send + Sync + fmt::Debug {
    /// Long-polls for up to `max_messages` messages, waiting at most
    /// `wait` for the first to arrive.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Queue`] if the receive call fails.
    async fn receive(
        &self,
        max_messages: i32,
        wait: std::time::Duration,
    ) -> Result<Vec<QueueMessage>, RelayError>;

    /// Removes a message from the queue.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Queue`] if the delete call fails.
    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), RelayError>;
}
