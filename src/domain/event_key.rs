//! Stable identity for change events.
//!
//! Two deliveries of the same logical row transition map to the same
//! [`EventKey`]. The timestamp component prefers event-carried columns and
//! only falls back to arrival time when the row has neither `updated_at`
//! nor `created_at`; redeliveries of such rows that straddle a second
//! boundary get different keys and are not deduplicated.

use std::fmt;

use super::change_event::{ChangeEvent, Operation, Table};

/// Length of the hex digest token appended to update keys.
const DIGEST_LEN: usize = 12;

/// Derived identity of a change event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey(String);

impl EventKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Columns whose values distinguish one update of a table from another.
#[must_use]
pub const fn relevant_fields(table: Table) -> &'static [&'static str] {
    match table {
        Table::Users => &[
            "amount_deposited",
            "total_pnl",
            "total_volume",
            "total_transactions",
            "copytrading_enabled",
            "fees_total",
        ],
        Table::AutoTrade => &["status"],
        Table::CopyWallets => &["is_enabled", "percent_ratio"],
        Table::MonthlyActiveUsers => &[],
    }
}

/// Builds the dedup key `table:operation:pk:timestamp:digest`.
///
/// Never fails: missing columns contribute empty components.
#[must_use]
pub fn build_key(event: &ChangeEvent) -> EventKey {
    let pk = event.primary_key();
    let timestamp = event
        .after
        .text_opt("updated_at")
        .or_else(|| event.after.text_opt("created_at"))
        .unwrap_or_else(|| {
            event
                .received_at
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string()
        });
    let digest = match event.operation {
        Operation::Update => field_digest(event),
        Operation::Insert => String::new(),
    };

    EventKey(format!(
        "{}:{}:{pk}:{timestamp}:{digest}",
        event.table, event.operation
    ))
}

/// Short digest over the relevant `after` values, or `""` when the table
/// has no relevant-field list.
fn field_digest(event: &ChangeEvent) -> String {
    let fields = relevant_fields(event.table);
    if fields.is_empty() {
        return String::new();
    }
    let joined = fields
        .iter()
        .map(|f| event.after.text(f))
        .collect::<Vec<_>>()
        .join("|");
    let mut hex = format!("{:x}", md5::compute(joined.as_bytes()));
    hex.truncate(DIGEST_LEN);
    hex
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::change_event::RowImage;

    fn row(value: Value) -> RowImage {
        let Ok(row) = RowImage::try_from(value) else {
            panic!("expected object");
        };
        row
    }

    fn update(after: Value) -> ChangeEvent {
        ChangeEvent::new(
            Table::Users,
            Operation::Update,
            Some(row(json!({"id": 1, "total_pnl": 0}))),
            row(after),
        )
    }

    #[test]
    fn insert_key_has_empty_digest() {
        let event = ChangeEvent::new(
            Table::Users,
            Operation::Insert,
            None,
            row(json!({"id": 9, "created_at": "2024-05-01T10:00:00Z"})),
        );
        assert_eq!(
            build_key(&event).as_str(),
            "users:INSERT:9:2024-05-01T10:00:00Z:"
        );
    }

    #[test]
    fn updated_at_preferred_over_created_at() {
        let event = update(json!({
            "id": 1,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-06-01T00:00:00Z",
        }));
        assert!(build_key(&event).as_str().contains("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn arrival_time_used_without_row_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 15).single();
        let Some(at) = at else {
            panic!("valid timestamp");
        };
        let event = ChangeEvent::received(
            Table::MonthlyActiveUsers,
            Operation::Insert,
            None,
            row(json!({"id": 3})),
            at + Duration::milliseconds(400),
        );
        assert_eq!(
            build_key(&event).as_str(),
            "monthly_active_users:INSERT:3:2024-03-02T08:30:15Z:"
        );
    }

    #[test]
    fn digest_changes_with_relevant_fields_only() {
        let base = json!({"id": 1, "updated_at": "t", "total_pnl": 10, "username": "a"});
        let mut renamed = base.clone();
        renamed["username"] = json!("b");
        let mut pnl = base.clone();
        pnl["total_pnl"] = json!(20);

        let k_base = build_key(&update(base));
        assert_eq!(k_base, build_key(&update(renamed)));
        assert_ne!(k_base, build_key(&update(pnl)));

        let digest = k_base.as_str().rsplit(':').next().unwrap_or_default();
        assert_eq!(digest.len(), DIGEST_LEN);
    }

    #[test]
    fn missing_primary_key_degrades_to_empty() {
        let event = ChangeEvent::new(
            Table::AutoTrade,
            Operation::Insert,
            None,
            row(json!({"created_at": "c"})),
        );
        assert_eq!(build_key(&event).as_str(), "auto_trade:INSERT::c:");
    }
}
