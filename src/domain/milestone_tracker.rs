//! Per-subject threshold crossing detection.
//!
//! [`MilestoneTracker`] remembers, for each `(subject, metric)` pair, the
//! highest ladder threshold already notified. A crossing is reported only
//! for a threshold above that high-water mark, and the mark is raised in
//! the same critical section so a burst of updates cannot report one
//! threshold twice.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::expiring::{self, Expiring};

/// Default retention of an idle high-water mark.
pub const DEFAULT_MILESTONE_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Cumulative trading volume thresholds (USD).
pub const VOLUME_LADDER: &[f64] = &[1_000.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0];

/// Cumulative transaction count thresholds.
pub const TRANSACTION_LADDER: &[f64] = &[10.0, 50.0, 100.0, 500.0, 1_000.0];

/// Metric a milestone ladder applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `users.total_volume`.
    Volume,
    /// `users.total_transactions`.
    Transactions,
}

impl Metric {
    /// Returns the ascending threshold ladder for this metric.
    #[must_use]
    pub const fn ladder(&self) -> &'static [f64] {
        match self {
            Self::Volume => VOLUME_LADDER,
            Self::Transactions => TRANSACTION_LADDER,
        }
    }

    /// Returns the metric name as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct HighWaterMark {
    threshold: f64,
    updated_at: DateTime<Utc>,
}

/// `(subject, metric)` → highest threshold notified.
#[derive(Debug)]
pub struct MilestoneTracker {
    retention: TimeDelta,
    marks: Mutex<HashMap<(String, Metric), HighWaterMark>>,
}

impl MilestoneTracker {
    /// Creates an empty tracker with the given idle retention.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            retention: expiring::retention(retention),
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Detects a new threshold crossing for `subject`'s `metric`.
    ///
    /// Thresholds are scanned in ascending order; the first `t` with
    /// `old < t <= new` that exceeds the recorded high-water mark is
    /// recorded and returned. A jump across several thresholds reports
    /// only the lowest of them. Marks idle for longer than the retention
    /// count as absent.
    pub fn check_crossing(
        &self,
        subject: &str,
        metric: Metric,
        old: f64,
        new: f64,
        ladder: &[f64],
        now: DateTime<Utc>,
    ) -> Option<f64> {
        if new <= old {
            return None;
        }

        let mut marks = expiring::lock(&self.marks);
        let key = (subject.to_string(), metric);
        let high_water = marks
            .get(&key)
            .filter(|m| now.signed_duration_since(m.updated_at) <= self.retention)
            .map(|m| m.threshold);

        let crossed = ladder.iter().copied().find(|&t| {
            old < t && t <= new && high_water.is_none_or(|hw| t > hw)
        })?;

        marks.insert(
            key,
            HighWaterMark {
                threshold: crossed,
                updated_at: now,
            },
        );
        Some(crossed)
    }

    /// Returns the recorded high-water mark, if any.
    #[must_use]
    pub fn high_water_mark(&self, subject: &str, metric: Metric) -> Option<f64> {
        expiring::lock(&self.marks)
            .get(&(subject.to_string(), metric))
            .map(|m| m.threshold)
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MILESTONE_RETENTION)
    }
}

impl Expiring for MilestoneTracker {
    fn name(&self) -> &'static str {
        "milestones"
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut marks = expiring::lock(&self.marks);
        let before = marks.len();
        marks.retain(|_, m| now.signed_duration_since(m.updated_at) <= self.retention);
        before.saturating_sub(marks.len())
    }

    fn len(&self) -> usize {
        expiring::lock(&self.marks).len()
    }
}
