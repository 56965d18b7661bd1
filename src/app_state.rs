//! Shared application state injected into the status handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay pipeline (stores and counters).
    pub relay: Arc<RelayService>,
    /// Process start time.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates state for a relay started now.
    #[must_use]
    pub fn new(relay: Arc<RelayService>) -> Self {
        Self {
            relay,
            started_at: Utc::now(),
        }
    }
}
