//! Order lifecycle records delivered through the work queue.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RelayError;

/// Flat order record carried in a queue message body.
///
/// Only `status` is required. Numeric fields accept JSON numbers or
/// numeric strings. Producers use several spellings for some fields; when
/// more than one is present the first listed on the field wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireOrder")]
pub struct OrderMessage {
    /// User that placed the order (`user_id`, `user`, `userId`).
    pub user_id: Option<String>,
    /// Exchange order id (`order_id`, `orderId`).
    pub order_id: Option<String>,
    /// Market title or slug (`market`, `market_slug`, `marketTitle`).
    pub market: Option<String>,
    /// Notional amount.
    pub amount: Option<f64>,
    /// Shares bought or sold.
    pub shares: Option<f64>,
    /// Limit or fill price.
    pub price: Option<f64>,
    /// Signed order hash (`order_hash`, `orderHash`).
    pub order_hash: Option<String>,
    /// Settlement transaction hash (`transaction_hash`, `tx_hash`,
    /// `transactionHash`).
    pub transaction_hash: Option<String>,
    /// Lifecycle status as reported by the producer.
    pub status: String,
    /// Outcome traded (e.g. `Yes` / `No`).
    pub outcome: Option<String>,
}

/// Body as received, one field per spelling.
#[derive(Deserialize)]
struct WireOrder {
    #[serde(default, deserialize_with = "lenient_string")]
    user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    user: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "lenient_string")]
    user_id_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    order_id: Option<String>,
    #[serde(default, rename = "orderId", deserialize_with = "lenient_string")]
    order_id_camel: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    market_slug: Option<String>,
    #[serde(default, rename = "marketTitle")]
    market_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    shares: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(default)]
    order_hash: Option<String>,
    #[serde(default, rename = "orderHash")]
    order_hash_camel: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default, rename = "transactionHash")]
    transaction_hash_camel: Option<String>,
    status: String,
    #[serde(default)]
    outcome: Option<String>,
}

impl From<WireOrder> for OrderMessage {
    fn from(wire: WireOrder) -> Self {
        Self {
            user_id: wire.user_id.or(wire.user).or(wire.user_id_camel),
            order_id: wire.order_id.or(wire.order_id_camel),
            market: wire.market.or(wire.market_slug).or(wire.market_title),
            amount: wire.amount,
            shares: wire.shares,
            price: wire.price,
            order_hash: wire.order_hash.or(wire.order_hash_camel),
            transaction_hash: wire
                .transaction_hash
                .or(wire.tx_hash)
                .or(wire.transaction_hash_camel),
            status: wire.status,
            outcome: wire.outcome,
        }
    }
}

/// Status class used to pick a message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Order accepted by the exchange.
    Placed,
    /// Order matched or filled.
    Filled,
    /// Order cancelled.
    Cancelled,
    /// Order failed or was rejected.
    Failed,
    /// Any other status.
    Other,
}

impl OrderMessage {
    /// Decodes a queue message body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the body is not a JSON
    /// object with a `status` field.
    pub fn parse(body: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Classifies the status string case-insensitively.
    #[must_use]
    pub fn status_class(&self) -> OrderStatus {
        match self.status.trim().to_ascii_lowercase().as_str() {
            "placed" | "live" | "open" | "pending" => OrderStatus::Placed,
            "filled" | "matched" => OrderStatus::Filled,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "failed" | "rejected" => OrderStatus::Failed,
            _ => OrderStatus::Other,
        }
    }
}

/// Accepts a number, a numeric string, or `null`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Accepts a string, a number (rendered as text), or `null`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record_with_string_numbers() {
        let body = r#"{
            "user_id": "u-1", "order_id": "o-9", "market": "Will it rain?",
            "amount": "25.5", "shares": 51, "price": 0.5,
            "order_hash": "0xabc", "tx_hash": "0xdef",
            "status": "MATCHED", "outcome": "Yes"
        }"#;
        let Ok(msg) = OrderMessage::parse(body) else {
            panic!("expected valid record");
        };
        assert_eq!(msg.amount, Some(25.5));
        assert_eq!(msg.shares, Some(51.0));
        assert_eq!(msg.transaction_hash.as_deref(), Some("0xdef"));
        assert_eq!(msg.status_class(), OrderStatus::Filled);
    }

    #[test]
    fn numeric_ids_are_rendered_as_text() {
        let Ok(msg) = OrderMessage::parse(r#"{"user": 17, "orderId": 99, "status": "filled"}"#)
        else {
            panic!("expected valid record");
        };
        assert_eq!(msg.user_id.as_deref(), Some("17"));
        assert_eq!(msg.order_id.as_deref(), Some("99"));
    }

    #[test]
    fn minimal_record_needs_only_status() {
        let Ok(msg) = OrderMessage::parse(r#"{"status":"canceled"}"#) else {
            panic!("expected valid record");
        };
        assert_eq!(msg.status_class(), OrderStatus::Cancelled);
        assert!(msg.order_id.is_none());
        assert!(msg.amount.is_none());
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            OrderMessage::parse("not json at all"),
            Err(RelayError::MalformedMessage(_))
        ));
        assert!(OrderMessage::parse(r#"{"order_id":"x"}"#).is_err());
    }

    #[test]
    fn unparseable_numeric_string_becomes_none() {
        let Ok(msg) = OrderMessage::parse(r#"{"status":"live","price":"n/a"}"#) else {
            panic!("expected valid record");
        };
        assert_eq!(msg.price, None);
        assert_eq!(msg.status_class(), OrderStatus::Placed);
    }

    #[test]
    fn both_spellings_of_a_field_are_accepted() {
        let Ok(msg) = OrderMessage::parse(
            r#"{"user":"u-1","user_id":"u-2","market":"M","market_slug":"m",
                "tx_hash":"0x1","transaction_hash":"0x2","status":"filled"}"#,
        ) else {
            panic!("expected valid record");
        };
        assert_eq!(msg.user_id.as_deref(), Some("u-2"));
        assert_eq!(msg.market.as_deref(), Some("M"));
        assert_eq!(msg.transaction_hash.as_deref(), Some("0x2"));
        assert_eq!(msg.status_class(), OrderStatus::Filled);
    }

    #[test]
    fn unknown_status_is_other() {
        let Ok(msg) = OrderMessage::parse(r#"{"status":"expired"}"#) else {
            panic!("expected valid record");
        };
        assert_eq!(msg.status_class(), OrderStatus::Other);
    }
}
