//! Row-level change events delivered by the change-feed.
//!
//! A [`ChangeEvent`] carries the table, operation, and before/after row
//! images of one row transition. Row images are loosely typed JSON objects;
//! [`RowImage`] provides the lenient accessors the classifier relies on
//! (missing or malformed values coerce instead of failing).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column holding the primary key in every tracked table.
pub const PRIMARY_KEY: &str = "id";

/// Tracked relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Platform accounts and their running totals.
    Users,
    /// Automated trade executions.
    AutoTrade,
    /// Copy-trading wallet configurations.
    CopyWallets,
    /// Monthly activity rollups.
    MonthlyActiveUsers,
}

impl Table {
    /// Every tracked table.
    pub const ALL: [Self; 4] = [
        Self::Users,
        Self::AutoTrade,
        Self::CopyWallets,
        Self::MonthlyActiveUsers,
    ];

    /// Returns the database relation name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::AutoTrade => "auto_trade",
            Self::CopyWallets => "copy_wallets",
            Self::MonthlyActiveUsers => "monthly_active_users",
        }
    }

    /// Resolves a relation name, returning `None` for untracked tables.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row operation kind. Deletes are not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// A new row.
    Insert,
    /// A modified row.
    Update,
}

impl Operation {
    /// Returns the wire name (`INSERT` / `UPDATE`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
        }
    }

    /// Parses a wire name case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("INSERT") {
            Some(Self::Insert)
        } else if name.eq_ignore_ascii_case("UPDATE") {
            Some(Self::Update)
        } else {
            None
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row image: column name → JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowImage(Map<String, Value>);

impl RowImage {
    /// Wraps an existing JSON object.
    #[must_use]
    pub const fn new(columns: Map<String, Value>) -> Self {
        Self(columns)
    }

    /// Returns `true` if the column is present (even when `null`).
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Returns the raw JSON value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Renders a column as text; missing and `null` become `""`.
    #[must_use]
    pub fn text(&self, column: &str) -> String {
        match self.0.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Renders a column as text, or `None` if missing, `null`, or blank.
    #[must_use]
    pub fn text_opt(&self, column: &str) -> Option<String> {
        Some(self.text(column)).filter(|s| !s.trim().is_empty())
    }

    /// Reads a column as a number. Numeric strings are parsed; anything
    /// else (missing, `null`, garbage, non-finite) coerces to zero.
    #[must_use]
    pub fn number(&self, column: &str) -> f64 {
        let parsed = match self.0.get(column) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(Value::Bool(b)) => Some(f64::from(u8::from(*b))),
            _ => None,
        };
        parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// Reads a column as a boolean flag. Accepts JSON booleans, `"true"` /
    /// `"false"` / `"t"` / `"f"` strings, and numbers (non-zero is true).
    #[must_use]
    pub fn flag(&self, column: &str) -> Option<bool> {
        match self.0.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Some(true),
                "false" | "f" | "0" | "no" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            _ => None,
        }
    }

    /// Returns `true` if the image carries any column besides the primary
    /// key. Replica-identity-default updates only ship the key.
    #[must_use]
    pub fn has_prior_state(&self) -> bool {
        self.0.keys().any(|k| k != PRIMARY_KEY)
    }

    /// Returns `true` if the image has no columns at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RowImage {
    fn from(columns: Map<String, Value>) -> Self {
        Self(columns)
    }
}

impl TryFrom<Value> for RowImage {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// One observed row transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    /// Source relation.
    pub table: Table,
    /// Insert or update.
    pub operation: Operation,
    /// Prior row image, possibly partial or absent.
    pub before: Option<RowImage>,
    /// New row image; always carries the primary key.
    pub after: RowImage,
    /// Wall-clock time the relay decoded the event.
    pub received_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event stamped with the current time.
    #[must_use]
    pub fn new(
        table: Table,
        operation: Operation,
        before: Option<RowImage>,
        after: RowImage,
    ) -> Self {
        Self::received(table, operation, before, after, Utc::now())
    }

    /// Creates a change event with an explicit arrival time.
    #[must_use]
    pub const fn received(
        table: Table,
        operation: Operation,
        before: Option<RowImage>,
        after: RowImage,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            table,
            operation,
            before,
            after,
            received_at,
        }
    }

    /// Primary key from `after`, falling back to `before`, else `""`.
    #[must_use]
    pub fn primary_key(&self) -> String {
        self.after
            .text_opt(PRIMARY_KEY)
            .or_else(|| self.before.as_ref().and_then(|b| b.text_opt(PRIMARY_KEY)))
            .unwrap_or_default()
    }

    /// Returns the prior image only when it holds genuine column values.
    #[must_use]
    pub fn trusted_before(&self) -> Option<&RowImage> {
        self.before.as_ref().filter(|b| b.has_prior_state())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> RowImage {
        let Ok(row) = RowImage::try_from(value) else {
            panic!("expected object");
        };
        row
    }

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.as_str()), Some(table));
        }
        assert_eq!(Table::from_name("orders"), None);
    }

    #[test]
    fn operation_parse_ignores_case() {
        assert_eq!(Operation::from_name("update"), Some(Operation::Update));
        assert_eq!(Operation::from_name("INSERT"), Some(Operation::Insert));
        assert_eq!(Operation::from_name("DELETE"), None);
    }

    #[test]
    fn number_coerces_strings_and_garbage() {
        let r = row(json!({"a": 12.5, "b": "7.25", "c": "n/a", "d": null}));
        assert!((r.number("a") - 12.5).abs() < f64::EPSILON);
        assert!((r.number("b") - 7.25).abs() < f64::EPSILON);
        assert!(r.number("c").abs() < f64::EPSILON);
        assert!(r.number("d").abs() < f64::EPSILON);
        assert!(r.number("missing").abs() < f64::EPSILON);
    }

    #[test]
    fn flag_accepts_postgres_text_booleans() {
        let r = row(json!({"a": true, "b": "f", "c": 1, "d": "maybe"}));
        assert_eq!(r.flag("a"), Some(true));
        assert_eq!(r.flag("b"), Some(false));
        assert_eq!(r.flag("c"), Some(true));
        assert_eq!(r.flag("d"), None);
        assert_eq!(r.flag("missing"), None);
    }

    #[test]
    fn key_only_image_has_no_prior_state() {
        assert!(!row(json!({"id": 7})).has_prior_state());
        assert!(!RowImage::default().has_prior_state());
        assert!(row(json!({"id": 7, "total_pnl": 0})).has_prior_state());
    }

    #[test]
    fn primary_key_falls_back_to_before() {
        let event = ChangeEvent::new(
            Table::Users,
            Operation::Update,
            Some(row(json!({"id": "u-1"}))),
            RowImage::default(),
        );
        assert_eq!(event.primary_key(), "u-1");
    }

    #[test]
    fn text_renders_numbers_without_quotes() {
        let r = row(json!({"id": 42, "name": "alice"}));
        assert_eq!(r.text("id"), "42");
        assert_eq!(r.text("name"), "alice");
        assert_eq!(r.text_opt("missing"), None);
    }
}
