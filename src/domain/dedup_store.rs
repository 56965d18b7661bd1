//! Time-bounded set of recently seen event keys.
//!
//! [`DedupStore`] answers "has this key been seen within the window?" and
//! records it in the same critical section, so two concurrent deliveries
//! of one key cannot both be treated as new.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::event_key::EventKey;
use super::expiring::{self, Expiring};

/// Default suppression window for redelivered events.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Key → first-seen time, expiring after a fixed window.
#[derive(Debug)]
pub struct DedupStore {
    window: TimeDelta,
    seen: Mutex<HashMap<EventKey, DateTime<Utc>>>,
}

impl DedupStore {
    /// Creates an empty store with the given retention window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window: expiring::retention(window),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `key` was already recorded less than one window
    /// before `now`. Otherwise records `key` as first seen at `now` and
    /// returns `false`.
    ///
    /// An entry older than the window counts as absent even if the sweep
    /// has not removed it yet.
    pub fn is_duplicate(&self, key: &EventKey, now: DateTime<Utc>) -> bool {
        let mut seen = expiring::lock(&self.seen);
        if let Some(first_seen) = seen.get(key)
            && now.signed_duration_since(*first_seen) < self.window
        {
            return true;
        }
        seen.insert(key.clone(), now);
        false
    }

    /// Returns `true` if `key` is currently recorded, without touching it.
    #[must_use]
    pub fn contains(&self, key: &EventKey) -> bool {
        expiring::lock(&self.seen).contains_key(key)
    }
}

impl Default for DedupStore {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl Expiring for DedupStore {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut seen = expiring::lock(&self.seen);
        let before = seen.len();
        seen.retain(|_, first_seen| now.signed_duration_since(*first_seen) < self.window);
        before.saturating_sub(seen.len())
    }

    fn len(&self) -> usize {
        expiring::lock(&self.seen).len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;

    use super::*;
    use crate::domain::change_event::{ChangeEvent, Operation, RowImage, Table};
    use crate::domain::event_key::build_key;

    fn key(id: i64) -> EventKey {
        let Ok(after) = RowImage::try_from(json!({"id": id, "created_at": "2024-01-01"})) else {
            panic!("expected object");
        };
        build_key(&ChangeEvent::new(Table::Users, Operation::Insert, None, after))
    }

    #[test]
    fn first_sighting_is_new_second_is_duplicate() {
        let store = DedupStore::default();
        let now = Utc::now();
        assert!(!store.is_duplicate(&key(1), now));
        assert!(store.is_duplicate(&key(1), now + ChronoDuration::seconds(30)));
        assert!(!store.is_duplicate(&key(2), now));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn redelivery_after_window_is_new() {
        let store = DedupStore::default();
        let now = Utc::now();
        assert!(!store.is_duplicate(&key(1), now));
        let later = now + ChronoDuration::minutes(5) + ChronoDuration::seconds(1);
        assert!(!store.is_duplicate(&key(1), later));
        // The re-record restarts the window.
        assert!(store.is_duplicate(&key(1), later + ChronoDuration::minutes(1)));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let store = DedupStore::default();
        let now = Utc::now();
        store.is_duplicate(&key(1), now - ChronoDuration::minutes(6));
        store.is_duplicate(&key(2), now - ChronoDuration::minutes(1));

        assert_eq!(store.sweep(now), 1);
        assert!(!store.contains(&key(1)));
        assert!(store.contains(&key(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_on_empty_store_is_noop() {
        let store = DedupStore::new(Duration::from_secs(1));
        assert!(store.is_empty());
        assert_eq!(store.sweep(Utc::now()), 0);
    }

    #[test]
    fn concurrent_deliveries_yield_one_new() {
        let store = Arc::new(DedupStore::default());
        let now = Utc::now();
        let mut handles = Vec::with_capacity(8);
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || store.is_duplicate(&key(42), now)));
        }

        let mut new_count = 0;
        for handle in handles {
            let Ok(dup) = handle.join() else {
                panic!("thread panicked");
            };
            if !dup {
                new_count += 1;
            }
        }
        assert_eq!(new_count, 1);
    }
}
