//! Semantic notification intents derived from change events.
//!
//! The classifier emits [`Notification`]s; the formatter turns them into
//! chat text. Intents carry only the values needed to render them.

use serde::Serialize;

use super::milestone_tracker::Metric;

/// Who a notification is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    /// Row or user identifier.
    pub id: String,
    /// Display name, when the row carries one.
    pub name: Option<String>,
}

/// Notification intent produced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// New user row.
    UserSignedUp {
        /// The new user.
        user: Subject,
        /// Email, if present.
        email: Option<String>,
        /// Wallet address, if present.
        wallet: Option<String>,
    },

    /// `amount_deposited` increased.
    Deposit {
        /// Depositing user.
        user: Subject,
        /// Deposited amount (delta).
        amount: f64,
        /// Running total after the deposit.
        total: f64,
    },

    /// `total_pnl` moved by at least the swing gate.
    PnlSwing {
        /// Affected user.
        user: Subject,
        /// PnL before the update.
        previous: f64,
        /// PnL after the update.
        current: f64,
    },

    /// A ladder threshold was crossed for the first time.
    Milestone {
        /// Affected user.
        user: Subject,
        /// Which metric crossed.
        metric: Metric,
        /// Threshold crossed.
        threshold: f64,
        /// Current metric value.
        current: f64,
    },

    /// `copytrading_enabled` flipped.
    CopytradingToggled {
        /// Affected user.
        user: Subject,
        /// New flag value.
        enabled: bool,
    },

    /// `fees_total` jumped by at least the spike gate.
    FeeSpike {
        /// Affected user.
        user: Subject,
        /// Fee increase.
        increase: f64,
        /// Running fee total.
        total: f64,
    },

    /// New automated trade row.
    TradeDetected {
        /// Trade details.
        trade: TradeSummary,
    },

    /// Automated trade reached a terminal status.
    TradeStatusChanged {
        /// Trade details (status is the new one).
        trade: TradeSummary,
        /// Previous status.
        previous_status: String,
    },

    /// New copy-wallet configuration.
    CopyWalletAdded {
        /// Wallet details.
        wallet: CopyWalletSummary,
    },

    /// Copy wallet enabled or disabled.
    CopyWalletToggled {
        /// Wallet details (enabled flag is the new one).
        wallet: CopyWalletSummary,
    },

    /// Copy ratio changed while the enabled flag stayed the same.
    CopyRatioChanged {
        /// Wallet details (ratio is the new one).
        wallet: CopyWalletSummary,
        /// Previous ratio.
        previous_ratio: f64,
    },

    /// New monthly activity rollup row.
    MonthlyActiveUser {
        /// Rolled-up user.
        user: Subject,
        /// Month label, if present.
        month: Option<String>,
        /// Trades in the month.
        trades: f64,
        /// Volume in the month.
        volume: f64,
    },
}

/// Fields shared by automated-trade notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeSummary {
    /// Trade row id.
    pub trade_id: String,
    /// Owning user id.
    pub user_id: String,
    /// Market title or slug.
    pub market: Option<String>,
    /// Outcome or side traded.
    pub side: Option<String>,
    /// Trade amount.
    pub amount: f64,
    /// Trade status.
    pub status: String,
    /// Failure or skip reason, if any.
    pub reason: Option<String>,
}

/// Fields shared by copy-wallet notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyWalletSummary {
    /// Copy-wallet row id.
    pub wallet_id: String,
    /// Owning user id.
    pub user_id: String,
    /// Address being copied.
    pub target: Option<String>,
    /// Whether copying is enabled.
    pub enabled: bool,
    /// Fraction of the target's size mirrored.
    pub ratio: f64,
}

impl Notification {
    /// Returns the notification kind as a static string slice.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserSignedUp { .. } => "user_signed_up",
            Self::Deposit { .. } => "deposit",
            Self::PnlSwing { .. } => "pnl_swing",
            Self::Milestone { .. } => "milestone",
            Self::CopytradingToggled { .. } => "copytrading_toggled",
            Self::FeeSpike { .. } => "fee_spike",
            Self::TradeDetected { .. } => "trade_detected",
            Self::TradeStatusChanged { .. } => "trade_status_changed",
            Self::CopyWalletAdded { .. } => "copy_wallet_added",
            Self::CopyWalletToggled { .. } => "copy_wallet_toggled",
            Self::CopyRatioChanged { .. } => "copy_ratio_changed",
            Self::MonthlyActiveUser { .. } => "monthly_active_user",
        }
    }
}
