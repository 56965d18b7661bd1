//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. Errors only ever
//! originate at an external boundary (configuration, chat, queue, feed);
//! the dedup, milestone, and classification path never returns one.

/// Relay-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category      | Retryable |
/// |-----------|---------------|-----------|
/// | 1000–1999 | Configuration | no        |
/// | 2000–2999 | Input         | no        |
/// | 3000–3999 | Delivery      | yes       |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A required environment variable is not set.
    #[error("missing required setting: {0}")]
    MissingConfig(&'static str),

    /// An environment variable is set but cannot be parsed.
    #[error("invalid setting {key}: {reason}")]
    InvalidConfig {
        /// Name of the offending variable.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A queue message body could not be decoded.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// The chat sink rejected or failed to accept a message.
    #[error("chat delivery failed: {0}")]
    ChatDelivery(String),

    /// Queue receive or delete call failed.
    #[error("queue error: {0}")]
    Queue(String),

    /// Change-feed socket or channel failure.
    #[error("change feed error: {0}")]
    Feed(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MissingConfig(_) => 1001,
            Self::InvalidConfig { .. } => 1002,
            Self::MalformedMessage(_) => 2001,
            Self::ChatDelivery(_) => 3001,
            Self::Queue(_) => 3002,
            Self::Feed(_) => 3003,
        }
    }

    /// Returns `true` when the failure is transient and the surrounding
    /// loop should carry on (after a back-off where one applies).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ChatDelivery(_) | Self::Queue(_) | Self::Feed(_))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::ChatDelivery(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Feed(err.to_string())
    }
}
