//! Chat sink boundary.
//!
//! [`Notifier`] accepts fully formatted text and attempts delivery. Callers
//! log and swallow failures; a failed send never stops the pipeline.

pub mod telegram;

use std::fmt;

use async_trait::async_trait;

use crate::error::RelayError;

pub use telegram::TelegramNotifier;

/// Outbound chat sink.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Sends one formatted message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChatDelivery`] when the sink rejects or fails
    /// to accept the message.
    async fn send(&self, text: &str) -> Result<(), RelayError>;
}
