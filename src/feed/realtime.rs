//! Realtime websocket client.
//!
//! Runs the read/heartbeat loop for one change-feed connection, pushing
//! decoded [`ChangeEvent`]s into the worker channel and logging status
//! signals. A dropped or errored channel is reconnected after a fixed
//! delay; the loop ends only when the worker channel closes.

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::FeedStatus;
use super::protocol::{self, FeedFrame, PhoenixMessage};
use crate::config::RelayConfig;
use crate::domain::ChangeEvent;
use crate::error::RelayError;

/// Channel topic the relay joins.
const CHANNEL_TOPIC: &str = "realtime:trade-relay";

/// How a session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// The server or network dropped the connection; reconnect.
    Disconnected,
    /// The worker channel closed; stop for good.
    WorkerGone,
}

/// Change-feed client for the managed database's realtime endpoint.
#[derive(Clone)]
pub struct RealtimeFeed {
    socket_url: String,
    api_key: String,
    schema: String,
    heartbeat: Duration,
    reconnect_delay: Duration,
}

impl std::fmt::Debug for RealtimeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeFeed")
            .field("schema", &self.schema)
            .field("heartbeat", &self.heartbeat)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}

impl RealtimeFeed {
    /// Creates a client from the relay configuration.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            socket_url: socket_url(&config.supabase_url, &config.supabase_key),
            api_key: config.supabase_key.clone(),
            schema: config.db_schema.clone(),
            heartbeat: config.feed_heartbeat,
            reconnect_delay: config.feed_reconnect_delay,
        }
    }

    /// Runs sessions until the worker side of `events` is dropped.
    pub async fn run(self, events: mpsc::Sender<ChangeEvent>) {
        loop {
            match self.run_session(&events).await {
                Ok(SessionEnd::WorkerGone) => break,
                Ok(SessionEnd::Disconnected) => {
                    tracing::warn!("change feed disconnected");
                }
                Err(err) => {
                    tracing::error!(error = %err, "change feed session failed");
                }
            }
            if events.is_closed() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
            tracing::info!("reconnecting change feed");
        }
        tracing::info!("change feed stopped");
    }

    async fn run_session(
        &self,
        events: &mpsc::Sender<ChangeEvent>,
    ) -> Result<SessionEnd, RelayError> {
        let (socket, _) = connect_async(self.socket_url.as_str()).await?;
        let (mut ws_tx, mut ws_rx) = socket.split();
        tracing::info!(schema = %self.schema, "change feed connected");

        let mut next_ref: u64 = 1;
        let join = protocol::join_message(
            CHANNEL_TOPIC,
            &self.schema,
            &self.api_key,
            &next_ref.to_string(),
        );
        ws_tx.send(Message::text(encode(&join)?)).await?;

        let mut heartbeat = tokio::time::interval(self.heartbeat);
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    next_ref = next_ref.wrapping_add(1);
                    let beat = protocol::heartbeat_message(&next_ref.to_string());
                    ws_tx.send(Message::text(encode(&beat)?)).await?;
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match protocol::decode_frame(text.as_str(), Utc::now()) {
                                FeedFrame::Change(event) => {
                                    if events.send(event).await.is_err() {
                                        return Ok(SessionEnd::WorkerGone);
                                    }
                                }
                                FeedFrame::Status(status) => {
                                    if let Some(end) = handle_status(&status) {
                                        return end;
                                    }
                                }
                                FeedFrame::Ignored => {}
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "change feed socket closed by server");
                            return Ok(SessionEnd::Disconnected);
                        }
                        None => return Ok(SessionEnd::Disconnected),
                        Some(Err(err)) => return Err(err.into()),
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }
}

/// Logs a status signal; returns how the session should end, if at all.
fn handle_status(status: &FeedStatus) -> Option<Result<SessionEnd, RelayError>> {
    match status {
        FeedStatus::Subscribed => {
            tracing::info!(%status, "change feed");
            None
        }
        FeedStatus::ChannelError(reason) => {
            tracing::error!(%reason, "change feed channel error");
            Some(Err(RelayError::Feed(reason.clone())))
        }
        FeedStatus::Closed => {
            tracing::warn!(%status, "change feed");
            Some(Ok(SessionEnd::Disconnected))
        }
    }
}

fn encode(msg: &PhoenixMessage) -> Result<String, RelayError> {
    serde_json::to_string(msg).map_err(|e| RelayError::Feed(e.to_string()))
}

/// Derives the realtime websocket URL from the project base URL.
#[must_use]
pub fn socket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/realtime/v1/websocket?apikey={api_key}&vsn=1.0.0")
}
