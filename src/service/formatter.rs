//! Chat text rendering (Telegram HTML).

use crate::domain::notification::{CopyWalletSummary, Subject, TradeSummary};
use crate::domain::{Metric, Notification, OrderMessage, OrderStatus};

/// Renders a notification intent as Telegram HTML.
#[must_use]
pub fn render_notification(notification: &Notification) -> String {
    match notification {
        Notification::UserSignedUp {
            user,
            email,
            wallet,
        } => {
            let mut out = format!("🎉 <b>New user signed up</b>\n{}", subject_line(user));
            push_opt(&mut out, "Email", email.as_deref());
            push_code(&mut out, "Wallet", wallet.as_deref());
            out
        }
        Notification::Deposit {
            user,
            amount,
            total,
        } => format!(
            "💰 <b>Deposit</b>\n{}\nAmount: <b>${}</b>\nTotal deposited: ${}",
            subject_line(user),
            fmt_amount(*amount),
            fmt_amount(*total),
        ),
        Notification::PnlSwing {
            user,
            previous,
            current,
        } => {
            let change = current - previous;
            let icon = if change >= 0.0 { "📈" } else { "📉" };
            format!(
                "{icon} <b>PnL swing</b>\n{}\nChange: <b>{}${}</b>\nPnL: ${} → ${}",
                subject_line(user),
                if change >= 0.0 { "+" } else { "-" },
                fmt_amount(change.abs()),
                fmt_amount(*previous),
                fmt_amount(*current),
            )
        }
        Notification::Milestone {
            user,
            metric,
            threshold,
            current,
        } => match metric {
            Metric::Volume => format!(
                "🏆 <b>Volume milestone</b>\n{}\nCrossed: <b>${}</b>\nCurrent volume: ${}",
                subject_line(user),
                fmt_count(*threshold),
                fmt_amount(*current),
            ),
            Metric::Transactions => format!(
                "🏆 <b>Transaction milestone</b>\n{}\nCrossed: <b>{} trades</b>\nCurrent count: {}",
                subject_line(user),
                fmt_count(*threshold),
                fmt_count(*current),
            ),
        },
        Notification::CopytradingToggled { user, enabled } => format!(
            "🔁 <b>Copytrading {}</b>\n{}",
            if *enabled { "enabled" } else { "disabled" },
            subject_line(user),
        ),
        Notification::FeeSpike {
            user,
            increase,
            total,
        } => format!(
            "💸 <b>Fee spike</b>\n{}\nIncrease: <b>${}</b>\nTotal fees: ${}",
            subject_line(user),
            fmt_amount(*increase),
            fmt_amount(*total),
        ),
        Notification::TradeDetected { trade } => {
            format!("🤖 <b>New auto trade detected</b>\n{}", trade_lines(trade))
        }
        Notification::TradeStatusChanged {
            trade,
            previous_status,
        } => {
            let icon = match trade.status.to_ascii_lowercase().as_str() {
                "executed" => "✅",
                "failed" => "❌",
                _ => "⏭️",
            };
            let mut out = format!(
                "{icon} <b>Auto trade {}</b>\n{}\nStatus: {} → <b>{}</b>",
                escape_html(&trade.status.to_ascii_lowercase()),
                trade_lines(trade),
                escape_html(previous_status),
                escape_html(&trade.status),
            );
            push_opt(&mut out, "Reason", trade.reason.as_deref());
            out
        }
        Notification::CopyWalletAdded { wallet } => {
            format!("👥 <b>Copy wallet added</b>\n{}", wallet_lines(wallet))
        }
        Notification::CopyWalletToggled { wallet } => format!(
            "👥 <b>Copy wallet {}</b>\n{}",
            if wallet.enabled { "enabled" } else { "disabled" },
            wallet_lines(wallet),
        ),
        Notification::CopyRatioChanged {
            wallet,
            previous_ratio,
        } => format!(
            "⚖️ <b>Copy ratio changed</b>\n{}\nRatio: {} → <b>{}</b>",
            wallet_lines(wallet),
            fmt_ratio(*previous_ratio),
            fmt_ratio(wallet.ratio),
        ),
        Notification::MonthlyActiveUser {
            user,
            month,
            trades,
            volume,
        } => {
            let mut out = format!("📅 <b>Monthly active user</b>\n{}", subject_line(user));
            push_opt(&mut out, "Month", month.as_deref());
            out.push_str(&format!(
                "\nTrades: {}\nVolume: ${}",
                fmt_count(*trades),
                fmt_amount(*volume)
            ));
            out
        }
    }
}

/// Renders a queue order record as Telegram HTML.
#[must_use]
pub fn render_order(order: &OrderMessage) -> String {
    let header = match order.status_class() {
        OrderStatus::Placed => "📝 <b>Order placed</b>".to_string(),
        OrderStatus::Filled => "✅ <b>Order filled</b>".to_string(),
        OrderStatus::Cancelled => "🚫 <b>Order cancelled</b>".to_string(),
        OrderStatus::Failed => "❌ <b>Order failed</b>".to_string(),
        OrderStatus::Other => format!("ℹ️ <b>Order update: {}</b>", escape_html(&order.status)),
    };

    let mut out = header;
    push_code(&mut out, "User", order.user_id.as_deref());
    push_opt(&mut out, "Market", order.market.as_deref());
    push_opt(&mut out, "Outcome", order.outcome.as_deref());
    if let Some(amount) = order.amount {
        out.push_str(&format!("\nAmount: ${}", fmt_amount(amount)));
    }
    if let Some(shares) = order.shares {
        out.push_str(&format!("\nShares: {}", fmt_amount(shares)));
    }
    if let Some(price) = order.price {
        out.push_str(&format!("\nPrice: {price:.3}"));
    }
    push_code(&mut out, "Order", order.order_id.as_deref());
    push_code(&mut out, "Order hash", order.order_hash.as_deref());
    push_code(&mut out, "Tx", order.transaction_hash.as_deref());
    out
}

/// Escapes the characters Telegram's HTML parse mode reserves.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Two decimals with thousands separators: `1234.5` → `1,234.50`.
#[must_use]
pub fn fmt_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{}.{frac_part}", group_thousands(int_part))
}

/// Whole number with thousands separators: `25000.0` → `25,000`.
#[must_use]
pub fn fmt_count(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let sign = if value < 0.0 && rounded != "0" { "-" } else { "" };
    format!("{sign}{}", group_thousands(&rounded))
}

fn fmt_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn subject_line(user: &Subject) -> String {
    match &user.name {
        Some(name) => format!(
            "User: <b>{}</b> (<code>{}</code>)",
            escape_html(name),
            escape_html(&user.id)
        ),
        None => format!("User: <code>{}</code>", escape_html(&user.id)),
    }
}

fn trade_lines(trade: &TradeSummary) -> String {
    let mut out = format!(
        "Trade: <code>{}</code>\nUser: <code>{}</code>",
        escape_html(&trade.trade_id),
        escape_html(&trade.user_id)
    );
    push_opt(&mut out, "Market", trade.market.as_deref());
    push_opt(&mut out, "Side", trade.side.as_deref());
    out.push_str(&format!("\nAmount: ${}", fmt_amount(trade.amount)));
    out
}

fn wallet_lines(wallet: &CopyWalletSummary) -> String {
    let mut out = format!("User: <code>{}</code>", escape_html(&wallet.user_id));
    push_code(&mut out, "Copying", wallet.target.as_deref());
    out.push_str(&format!(
        "\nRatio: {}\nEnabled: {}",
        fmt_ratio(wallet.ratio),
        if wallet.enabled { "yes" } else { "no" }
    ));
    out
}

fn push_opt(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value {
        out.push_str(&format!("\n{label}: {}", escape_html(v)));
    }
}

fn push_code(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value {
        out.push_str(&format!("\n{label}: <code>{}</code>", escape_html(v)));
    }
}
