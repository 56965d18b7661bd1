//! Domain layer: change events, event identity, and the time-bounded stores.
//!
//! This module contains the relay's core state: the row-change model, the
//! key builder used for deduplication, the dedup store, the milestone
//! tracker, the notification intents the classifier produces, and the
//! order records arriving through the queue.

pub mod change_event;
pub mod dedup_store;
pub mod event_key;
pub mod expiring;
pub mod milestone_tracker;
pub mod notification;
pub mod order_message;

pub use change_event::{ChangeEvent, Operation, RowImage, Table};
pub use dedup_store::DedupStore;
pub use event_key::{EventKey, build_key};
pub use expiring::Expiring;
pub use milestone_tracker::{Metric, MilestoneTracker};
pub use notification::Notification;
pub use order_message::{OrderMessage, OrderStatus};
