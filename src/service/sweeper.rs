//! Periodic expiry of the dedup and milestone stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::Expiring;

/// Runs one sweep over every store, returning the total evicted.
pub fn sweep_once(stores: &[Arc<dyn Expiring>], now: DateTime<Utc>) -> usize {
    let mut evicted = 0;
    for store in stores {
        let removed = store.sweep(now);
        if removed > 0 {
            tracing::debug!(store = store.name(), removed, remaining = store.len(), "swept");
        }
        evicted += removed;
    }
    evicted
}

/// Sweeps all stores every `interval`, forever. The first tick fires after
/// one full interval.
pub async fn run_sweeper(stores: Vec<Arc<dyn Expiring>>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sweep_once(&stores, Utc::now());
    }
}
