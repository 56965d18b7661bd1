//! Realtime (Phoenix channel) frames: envelope, join/heartbeat builders,
//! and the inbound frame decoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{FeedStatus, REGISTRATIONS, is_registered};
use crate::domain::{ChangeEvent, Operation, RowImage, Table};

/// Topic carrying heartbeats.
const PHOENIX_TOPIC: &str = "phoenix";

/// Top-level realtime frame envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    /// Channel topic (e.g. `realtime:trade-relay`).
    pub topic: String,
    /// Event name (`phx_join`, `phx_reply`, `postgres_changes`, …).
    pub event: String,
    /// Event-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Client-chosen message reference, echoed in replies.
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    /// Reference of the join this message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// A row change the relay subscribes to.
    Change(ChangeEvent),
    /// A connection-level status signal.
    Status(FeedStatus),
    /// Anything else (heartbeat replies, presence, unregistered tables).
    Ignored,
}

/// `postgres_changes` payload body.
#[derive(Debug, Deserialize)]
struct ChangeData {
    table: String,
    #[serde(rename = "type", alias = "eventType")]
    change_type: String,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

/// Builds the channel join frame subscribing to every registration.
#[must_use]
pub fn join_message(topic: &str, schema: &str, access_token: &str, join_ref: &str) -> PhoenixMessage {
    let changes: Vec<Value> = REGISTRATIONS
        .iter()
        .map(|r| {
            json!({
                "event": r.operation.as_str(),
                "schema": schema,
                "table": r.table.as_str(),
            })
        })
        .collect();

    PhoenixMessage {
        topic: topic.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": changes,
                "private": false,
            },
            "access_token": access_token,
        }),
        msg_ref: Some(join_ref.to_string()),
        join_ref: Some(join_ref.to_string()),
    }
}

/// Builds a heartbeat frame.
#[must_use]
pub fn heartbeat_message(msg_ref: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref.to_string()),
        join_ref: None,
    }
}

/// Decodes one text frame. Undecodable frames are logged and ignored.
#[must_use]
pub fn decode_frame(text: &str, received_at: DateTime<Utc>) -> FeedFrame {
    let msg = match serde_json::from_str::<PhoenixMessage>(text) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::warn!(error = %err, "undecodable realtime frame");
            return FeedFrame::Ignored;
        }
    };
    if msg.topic == PHOENIX_TOPIC {
        return FeedFrame::Ignored;
    }

    match msg.event.as_str() {
        "postgres_changes" => decode_change(&msg.payload, received_at),
        "phx_reply" => decode_status(
            msg.payload.get("status"),
            msg.payload.get("response"),
            true,
        ),
        "system" => decode_status(msg.payload.get("status"), msg.payload.get("message"), false),
        "phx_error" => FeedFrame::Status(FeedStatus::ChannelError(msg.payload.to_string())),
        "phx_close" => FeedFrame::Status(FeedStatus::Closed),
        _ => FeedFrame::Ignored,
    }
}

fn decode_change(payload: &Value, received_at: DateTime<Utc>) -> FeedFrame {
    let Some(data) = payload.get("data") else {
        return FeedFrame::Ignored;
    };
    let data = match ChangeData::deserialize(data) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(error = %err, "malformed postgres_changes payload");
            return FeedFrame::Ignored;
        }
    };

    let (Some(table), Some(operation)) = (
        Table::from_name(&data.table),
        Operation::from_name(&data.change_type),
    ) else {
        return FeedFrame::Ignored;
    };
    if !is_registered(table, operation) {
        return FeedFrame::Ignored;
    }

    let Some(after) = data.record.and_then(|v| RowImage::try_from(v).ok()) else {
        return FeedFrame::Ignored;
    };
    let before = data
        .old_record
        .and_then(|v| RowImage::try_from(v).ok())
        .filter(|row| !row.is_empty());

    FeedFrame::Change(ChangeEvent::received(
        table,
        operation,
        before,
        after,
        received_at,
    ))
}

/// `phx_reply` acknowledges only the join (a reply with a `postgres_changes`
/// response); a `system` frame reports the extension's status directly.
fn decode_status(status: Option<&Value>, detail: Option<&Value>, is_reply: bool) -> FeedFrame {
    let status = status.and_then(Value::as_str).unwrap_or_default();
    let detail_text = detail.map(|d| match d {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    match status {
        "ok" if is_reply => {
            if detail.and_then(|d| d.get("postgres_changes")).is_some() {
                FeedFrame::Status(FeedStatus::Subscribed)
            } else {
                FeedFrame::Ignored
            }
        }
        "ok" => FeedFrame::Ignored,
        "error" => FeedFrame::Status(FeedStatus::ChannelError(
            detail_text.unwrap_or_else(|| "unknown".to_string()),
        )),
        _ => FeedFrame::Ignored,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn decode(value: Value) -> FeedFrame {
        decode_frame(&value.to_string(), Utc::now())
    }

    #[test]
    fn join_lists_every_registration() {
        let msg = join_message("realtime:relay", "public", "key", "1");
        let changes = msg
            .payload
            .pointer("/config/postgres_changes")
            .and_then(Value::as_array)
            .map(Vec::len);
        assert_eq!(changes, Some(REGISTRATIONS.len()));
        let json = serde_json::to_string(&msg).unwrap_or_default();
        assert!(json.contains("\"ref\":\"1\""));
        assert!(json.contains("\"event\":\"phx_join\""));
    }

    #[test]
    fn heartbeat_targets_phoenix_topic() {
        let msg = heartbeat_message("7");
        assert_eq!(msg.topic, "phoenix");
        assert_eq!(msg.event, "heartbeat");
        assert!(msg.join_ref.is_none());
    }

    #[test]
    fn update_change_decodes_with_before_image() {
        let frame = decode(json!({
            "topic": "realtime:relay",
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "data": {
                    "schema": "public",
                    "table": "users",
                    "type": "UPDATE",
                    "commit_timestamp": "2024-05-01T10:00:00Z",
                    "record": {"id": "u-1", "total_pnl": 250},
                    "old_record": {"id": "u-1", "total_pnl": 100}
                },
                "ids": [1]
            }
        }));
        let FeedFrame::Change(event) = frame else {
            panic!("expected change, got {frame:?}");
        };
        assert_eq!(event.table, Table::Users);
        assert_eq!(event.operation, Operation::Update);
        assert!(event.trusted_before().is_some());
        assert!((event.after.number("total_pnl") - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn insert_with_empty_old_record_has_no_before() {
        let frame = decode(json!({
            "topic": "realtime:relay",
            "event": "postgres_changes",
            "payload": {"data": {
                "table": "copy_wallets", "type": "INSERT",
                "record": {"id": 3}, "old_record": {}
            }}
        }));
        let FeedFrame::Change(event) = frame else {
            panic!("expected change, got {frame:?}");
        };
        assert!(event.before.is_none());
    }

    #[test]
    fn unregistered_changes_are_ignored() {
        for (table, kind) in [
            ("monthly_active_users", "UPDATE"),
            ("users", "DELETE"),
            ("orders", "INSERT"),
        ] {
            let frame = decode(json!({
                "topic": "realtime:relay",
                "event": "postgres_changes",
                "payload": {"data": {"table": table, "type": kind, "record": {"id": 1}}}
            }));
            assert_eq!(frame, FeedFrame::Ignored, "{table} {kind}");
        }
    }

    #[test]
    fn join_reply_signals_subscribed() {
        let frame = decode(json!({
            "topic": "realtime:relay",
            "event": "phx_reply",
            "ref": "1",
            "payload": {"status": "ok", "response": {"postgres_changes": []}}
        }));
        assert_eq!(frame, FeedFrame::Status(FeedStatus::Subscribed));
    }

    #[test]
    fn error_reply_and_system_error_signal_channel_error() {
        let reply = decode(json!({
            "topic": "realtime:relay",
            "event": "phx_reply",
            "payload": {"status": "error", "response": {"reason": "unauthorized"}}
        }));
        let FeedFrame::Status(FeedStatus::ChannelError(reason)) = reply else {
            panic!("expected channel error, got {reply:?}");
        };
        assert!(reason.contains("unauthorized"));

        let system = decode(json!({
            "topic": "realtime:relay",
            "event": "system",
            "payload": {"status": "error", "message": "replication slot busy"}
        }));
        assert_eq!(
            system,
            FeedFrame::Status(FeedStatus::ChannelError("replication slot busy".to_string()))
        );
    }

    #[test]
    fn heartbeat_replies_and_garbage_are_ignored() {
        let reply = decode(json!({
            "topic": "phoenix",
            "event": "phx_reply",
            "ref": "2",
            "payload": {"status": "ok", "response": {}}
        }));
        assert_eq!(reply, FeedFrame::Ignored);
        assert_eq!(decode_frame("not json", Utc::now()), FeedFrame::Ignored);
    }

    #[test]
    fn close_frame_signals_closed() {
        let frame = decode(json!({"topic": "realtime:relay", "event": "phx_close", "payload": {}}));
        assert_eq!(frame, FeedFrame::Status(FeedStatus::Closed));
    }
}
