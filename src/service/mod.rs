//! Service layer: classification, formatting, and pipeline orchestration.
//!
//! [`RelayService`] runs change events through the dedup store and the
//! [`EventClassifier`], renders the resulting intents, and hands them to the
//! [`crate::notifier::Notifier`]. The sweeper expires store entries on a
//! fixed tick.

pub mod classifier;
pub mod formatter;
pub mod relay_service;
pub mod stats;
pub mod sweeper;

pub use classifier::EventClassifier;
pub use relay_service::{RelayService, run_event_worker};
pub use stats::{RelayStats, StatsSnapshot};
