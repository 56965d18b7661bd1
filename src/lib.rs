//! # trade-relay
//!
//! Notification relay for a trading platform. Watches row changes on the
//! platform database through its realtime change-feed, pulls order
//! lifecycle records from an SQS queue, and forwards human-readable alerts
//! to a Telegram chat.
//!
//! ## Architecture
//!
//! ```text
//! Realtime change-feed (feed/)          SQS order queue (queue/)
//!     │                                     │
//!     ├── mpsc channel                      ├── poll loop
//!     │                                     │
//!     ├── RelayService (service/) ◄─────────┘
//!     │     ├── build_key ─► DedupStore (domain/)
//!     │     ├── EventClassifier ─► MilestoneTracker (domain/)
//!     │     └── formatter
//!     │
//!     └── Notifier (notifier/) ─► Telegram
//!
//! Sweeper (service/) expires DedupStore and MilestoneTracker entries.
//! Status API (api/) exposes /health and /stats.
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod notifier;
pub mod queue;
pub mod service;
