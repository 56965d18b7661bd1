//! Change event → notification intents.
//!
//! [`EventClassifier`] is a stateless decision over one before/after pair;
//! its only persistent collaborator is the [`MilestoneTracker`]. It never
//! fails: malformed numeric columns coerce to zero and the worst outcome is
//! a suppressed notification.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::notification::{CopyWalletSummary, Subject, TradeSummary};
use crate::domain::{
    ChangeEvent, Metric, MilestoneTracker, Notification, Operation, RowImage, Table,
};

/// A deposit must exceed this amount to be reported.
pub const DEPOSIT_MIN_DELTA: f64 = 0.01;

/// PnL swings of at least this magnitude are reported.
pub const PNL_SWING_MIN: f64 = 100.0;

/// Fee increases of at least this amount are reported.
pub const FEE_SPIKE_MIN: f64 = 50.0;

/// Copy ratio changes must exceed this magnitude to be reported.
pub const RATIO_MIN_DELTA: f64 = 0.001;

/// Automated-trade statuses worth a transition notification.
const TERMINAL_TRADE_STATUSES: [&str; 3] = ["executed", "failed", "skipped"];

/// Scale used to strip binary floating-point noise from deltas.
const DELTA_SCALE: f64 = 1e8;

/// Derives notification intents from change events.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    milestones: Arc<MilestoneTracker>,
}

impl EventClassifier {
    /// Creates a classifier backed by the given milestone tracker.
    #[must_use]
    pub const fn new(milestones: Arc<MilestoneTracker>) -> Self {
        Self { milestones }
    }

    /// Returns the intents implied by `event`, in emission order.
    ///
    /// An UPDATE whose prior image is missing or carries only the primary
    /// key yields nothing.
    #[must_use]
    pub fn classify(&self, event: &ChangeEvent) -> Vec<Notification> {
        match event.operation {
            Operation::Insert => vec![classify_insert(event.table, &event.after)],
            Operation::Update => {
                let Some(before) = event.trusted_before() else {
                    tracing::debug!(
                        table = %event.table,
                        pk = %event.primary_key(),
                        "update without prior state, skipping"
                    );
                    return Vec::new();
                };
                self.classify_update(event.table, before, &event.after, event.received_at)
            }
        }
    }

    fn classify_update(
        &self,
        table: Table,
        before: &RowImage,
        after: &RowImage,
        now: DateTime<Utc>,
    ) -> Vec<Notification> {
        match table {
            Table::Users => self.user_update(before, after, now),
            Table::AutoTrade => trade_update(before, after).into_iter().collect(),
            Table::CopyWallets => copy_wallet_update(before, after).into_iter().collect(),
            Table::MonthlyActiveUsers => Vec::new(),
        }
    }

    fn user_update(
        &self,
        before: &RowImage,
        after: &RowImage,
        now: DateTime<Utc>,
    ) -> Vec<Notification> {
        let user = user_subject(after);
        let mut out = Vec::new();

        let old_deposit = before.number("amount_deposited");
        let new_deposit = after.number("amount_deposited");
        let deposited = delta(new_deposit, old_deposit);
        if old_deposit >= 0.0 && deposited > DEPOSIT_MIN_DELTA {
            out.push(Notification::Deposit {
                user: user.clone(),
                amount: deposited,
                total: new_deposit,
            });
        }

        let old_pnl = before.number("total_pnl");
        let new_pnl = after.number("total_pnl");
        if delta(new_pnl, old_pnl).abs() >= PNL_SWING_MIN {
            out.push(Notification::PnlSwing {
                user: user.clone(),
                previous: old_pnl,
                current: new_pnl,
            });
        }

        for metric in [Metric::Volume, Metric::Transactions] {
            let column = milestone_column(metric);
            let old = before.number(column);
            let new = after.number(column);
            if let Some(threshold) =
                self.milestones
                    .check_crossing(&user.id, metric, old, new, metric.ladder(), now)
            {
                tracing::info!(user = %user.id, %metric, threshold, "milestone crossed");
                out.push(Notification::Milestone {
                    user: user.clone(),
                    metric,
                    threshold,
                    current: new,
                });
            }
        }

        if before.contains("copytrading_enabled") {
            let was = before.flag("copytrading_enabled").unwrap_or(false);
            let is = after.flag("copytrading_enabled").unwrap_or(false);
            if was != is {
                out.push(Notification::CopytradingToggled {
                    user: user.clone(),
                    enabled: is,
                });
            }
        }

        let old_fees = before.number("fees_total");
        let new_fees = after.number("fees_total");
        let fee_increase = delta(new_fees, old_fees);
        if fee_increase >= FEE_SPIKE_MIN {
            out.push(Notification::FeeSpike {
                user,
                increase: fee_increase,
                total: new_fees,
            });
        }

        out
    }
}

fn classify_insert(table: Table, after: &RowImage) -> Notification {
    match table {
        Table::Users => Notification::UserSignedUp {
            user: user_subject(after),
            email: after.text_opt("email"),
            wallet: after.text_opt("wallet_address"),
        },
        Table::AutoTrade => Notification::TradeDetected {
            trade: trade_summary(after),
        },
        Table::CopyWallets => Notification::CopyWalletAdded {
            wallet: copy_wallet_summary(after),
        },
        Table::MonthlyActiveUsers => Notification::MonthlyActiveUser {
            user: Subject {
                id: after
                    .text_opt("user_id")
                    .unwrap_or_else(|| after.text("id")),
                name: after.text_opt("username"),
            },
            month: after.text_opt("month"),
            trades: after.number("trade_count"),
            volume: after.number("volume"),
        },
    }
}

fn trade_update(before: &RowImage, after: &RowImage) -> Option<Notification> {
    let previous = before.text("status");
    let current = after.text("status");
    if previous.eq_ignore_ascii_case(&current) {
        return None;
    }
    let normalized = current.trim().to_ascii_lowercase();
    if !TERMINAL_TRADE_STATUSES.contains(&normalized.as_str()) {
        return None;
    }
    Some(Notification::TradeStatusChanged {
        trade: trade_summary(after),
        previous_status: previous,
    })
}

fn copy_wallet_update(before: &RowImage, after: &RowImage) -> Option<Notification> {
    let was_enabled = before.flag("is_enabled").unwrap_or(false);
    let wallet = copy_wallet_summary(after);
    if was_enabled != wallet.enabled {
        return Some(Notification::CopyWalletToggled { wallet });
    }
    let previous_ratio = before.number("percent_ratio");
    if delta(wallet.ratio, previous_ratio).abs() > RATIO_MIN_DELTA {
        return Some(Notification::CopyRatioChanged {
            wallet,
            previous_ratio,
        });
    }
    None
}

fn user_subject(row: &RowImage) -> Subject {
    Subject {
        id: row.text("id"),
        name: row
            .text_opt("username")
            .or_else(|| row.text_opt("display_name")),
    }
}

fn trade_summary(row: &RowImage) -> TradeSummary {
    TradeSummary {
        trade_id: row.text("id"),
        user_id: row.text("user_id"),
        market: row
            .text_opt("market_title")
            .or_else(|| row.text_opt("market")),
        side: row.text_opt("side").or_else(|| row.text_opt("outcome")),
        amount: row.number("amount"),
        status: row.text("status"),
        reason: row
            .text_opt("error_message")
            .or_else(|| row.text_opt("reason")),
    }
}

fn copy_wallet_summary(row: &RowImage) -> CopyWalletSummary {
    CopyWalletSummary {
        wallet_id: row.text("id"),
        user_id: row.text("user_id"),
        target: row
            .text_opt("wallet_address")
            .or_else(|| row.text_opt("target_wallet")),
        enabled: row.flag("is_enabled").unwrap_or(false),
        ratio: row.number("percent_ratio"),
    }
}

const fn milestone_column(metric: Metric) -> &'static str {
    match metric {
        Metric::Volume => "total_volume",
        Metric::Transactions => "total_transactions",
    }
}

/// `new - old`, rounded so decimal inputs compare exactly against gates.
fn delta(new: f64, old: f64) -> f64 {
    ((new - old) * DELTA_SCALE).round() / DELTA_SCALE
}
