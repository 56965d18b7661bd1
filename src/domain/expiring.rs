//! Common surface of the time-bounded in-memory stores.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// A store whose entries expire after a retention window.
///
/// Implemented by [`super::DedupStore`] and [`super::MilestoneTracker`] so
/// a single sweeper tick can clear both.
pub trait Expiring: Send + Sync + fmt::Debug {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Removes entries that expired at `now`, returning how many were
    /// dropped.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    /// Number of live-or-unswept entries.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Converts a configured retention into a signed time delta, saturating
/// on overflow.
pub(crate) fn retention(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

/// Locks a store map. A panic while holding the lock cannot leave the map
/// half-written (every critical section is a single insert or retain), so
/// a poisoned lock is recovered rather than propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
