//! Change-feed layer: subscription registrations, frame decoding, and the
//! realtime socket client.
//!
//! Every `(table, operation)` pair the relay reacts to is listed once in
//! [`REGISTRATIONS`]; the socket join payload and the decoder's filter are
//! both derived from it.

pub mod protocol;
pub mod realtime;

use std::fmt;

use crate::domain::{Operation, Table};

pub use realtime::RealtimeFeed;

/// One change-feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Relation to watch.
    pub table: Table,
    /// Operation to watch.
    pub operation: Operation,
}

/// Every subscription the relay opens.
pub const REGISTRATIONS: &[Registration] = &[
    Registration {
        table: Table::Users,
        operation: Operation::Insert,
    },
    Registration {
        table: Table::Users,
        operation: Operation::Update,
    },
    Registration {
        table: Table::AutoTrade,
        operation: Operation::Insert,
    },
    Registration {
        table: Table::AutoTrade,
        operation: Operation::Update,
    },
    Registration {
        table: Table::CopyWallets,
        operation: Operation::Insert,
    },
    Registration {
        table: Table::CopyWallets,
        operation: Operation::Update,
    },
    Registration {
        table: Table::MonthlyActiveUsers,
        operation: Operation::Insert,
    },
];

/// Returns `true` if the relay subscribes to `operation` on `table`.
#[must_use]
pub fn is_registered(table: Table, operation: Operation) -> bool {
    REGISTRATIONS
        .iter()
        .any(|r| r.table == table && r.operation == operation)
}

/// Connection-level signal from the change-feed.
///
/// Logged by the feed client; never turned into a chat notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// The channel join was acknowledged.
    Subscribed,
    /// The server reported a channel error.
    ChannelError(String),
    /// The server closed the channel.
    Closed,
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribed => f.write_str("subscribed"),
            Self::ChannelError(reason) => write!(f, "channel error: {reason}"),
            Self::Closed => f.write_str("closed"),
        }
    }
}
