//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Credentials and endpoints are
//! required; tuning knobs fall back to defaults.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RelayError;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Clone)]
pub struct RelayConfig {
    /// Socket address for the status API (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Base URL of the managed database project (`https://<ref>.supabase.co`).
    pub supabase_url: String,

    /// API key used for the realtime socket.
    pub supabase_key: String,

    /// Database schema the change-feed subscribes to.
    pub db_schema: String,

    /// Telegram bot token.
    pub telegram_bot_token: String,

    /// Destination chat id.
    pub telegram_chat_id: String,

    /// AWS region of the order queue.
    pub aws_region: String,

    /// AWS access key id.
    pub aws_access_key_id: String,

    /// AWS secret access key.
    pub aws_secret_access_key: String,

    /// Full URL of the SQS order queue.
    pub sqs_queue_url: String,

    /// How long an event key suppresses redeliveries.
    pub dedup_window: Duration,

    /// How long an idle milestone high-water mark is kept.
    pub milestone_retention: Duration,

    /// Interval of the expiry sweep.
    pub sweep_interval: Duration,

    /// Maximum messages per receive call (SQS caps this at 10).
    pub queue_max_messages: i32,

    /// Long-poll wait per receive call.
    pub queue_wait: Duration,

    /// Delay between consecutive polls.
    pub queue_poll_delay: Duration,

    /// Back-off after a failed receive.
    pub queue_error_backoff: Duration,

    /// Realtime heartbeat interval.
    pub feed_heartbeat: Duration,

    /// Delay before reconnecting a dropped change-feed socket.
    pub feed_reconnect_delay: Duration,

    /// Capacity of the decoded change-event channel.
    pub event_channel_capacity: usize,
}

// Credentials stay out of logs.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("supabase_url", &self.supabase_url)
            .field("db_schema", &self.db_schema)
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("aws_region", &self.aws_region)
            .field("sqs_queue_url", &self.sqs_queue_url)
            .field("dedup_window", &self.dedup_window)
            .field("milestone_retention", &self.milestone_retention)
            .field("sweep_interval", &self.sweep_interval)
            .field("queue_max_messages", &self.queue_max_messages)
            .field("queue_wait", &self.queue_wait)
            .finish_non_exhaustive()
    }
}

impl RelayConfig {
    /// Loads configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingConfig`] if a required variable is
    /// unset or empty, and [`RelayError::InvalidConfig`] if `LISTEN_ADDR`
    /// cannot be parsed or a tick interval (`SWEEP_INTERVAL_SECS`,
    /// `FEED_HEARTBEAT_SECS`) is zero.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, RelayError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(RelayError::MissingConfig(key))
        };

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_key = required("SUPABASE_KEY")?;
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = required("TELEGRAM_CHAT_ID")?;
        let aws_region = required("AWS_REGION")?;
        let aws_access_key_id = required("AWS_ACCESS_KEY_ID")?;
        let aws_secret_access_key = required("AWS_SECRET_ACCESS_KEY")?;
        let sqs_queue_url = required("SQS_QUEUE_URL")?;

        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| RelayError::InvalidConfig {
                key: "LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        let db_schema = lookup("DB_SCHEMA").unwrap_or_else(|| "public".to_string());

        let secs = |key: &str, default: u64| Duration::from_secs(parse_or(&lookup, key, default));
        // Tick intervals feed `tokio::time::interval`, which rejects zero.
        let interval = |key: &'static str, default: u64| -> Result<Duration, RelayError> {
            let value = secs(key, default);
            if value.is_zero() {
                return Err(RelayError::InvalidConfig {
                    key,
                    reason: "must be at least 1 second".to_string(),
                });
            }
            Ok(value)
        };
        let sweep_interval = interval("SWEEP_INTERVAL_SECS", 60)?;
        let feed_heartbeat = interval("FEED_HEARTBEAT_SECS", 30)?;

        Ok(Self {
            listen_addr,
            supabase_url,
            supabase_key,
            db_schema,
            telegram_bot_token,
            telegram_chat_id,
            aws_region,
            aws_access_key_id,
            aws_secret_access_key,
            sqs_queue_url,
            dedup_window: secs("DEDUP_WINDOW_SECS", 300),
            milestone_retention: secs("MILESTONE_RETENTION_SECS", 3_600),
            sweep_interval,
            queue_max_messages: parse_or(&lookup, "QUEUE_MAX_MESSAGES", 10_i32).clamp(1, 10),
            queue_wait: secs("QUEUE_WAIT_SECS", 20),
            queue_poll_delay: Duration::from_millis(parse_or(&lookup, "QUEUE_POLL_DELAY_MS", 1_000)),
            queue_error_backoff: secs("QUEUE_ERROR_BACKOFF_SECS", 5),
            feed_heartbeat,
            feed_reconnect_delay: secs("FEED_RECONNECT_SECS", 5),
            event_channel_capacity: parse_or(&lookup, "EVENT_CHANNEL_CAPACITY", 1_024_usize).max(1),
        })
    }
}

/// Parses a looked-up value as `T`, returning `default` on missing or
/// invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_env() -> HashMap<&'static str, String> {
        [
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_KEY", "service-key"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100200"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("SQS_QUEUE_URL", "https://sqs.eu-west-1.amazonaws.com/1/orders"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<RelayConfig, RelayError> {
        RelayConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_applied_when_optional_keys_absent() {
        let Ok(cfg) = load(&base_env()) else {
            panic!("config should load");
        };
        assert_eq!(cfg.listen_addr.port(), 8080);
        assert_eq!(cfg.db_schema, "public");
        assert_eq!(cfg.dedup_window, Duration::from_secs(300));
        assert_eq!(cfg.milestone_retention, Duration::from_secs(3_600));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(60));
        assert_eq!(cfg.queue_max_messages, 10);
        assert_eq!(cfg.queue_wait, Duration::from_secs(20));
    }

    #[test]
    fn missing_required_key_is_reported_by_name() {
        let mut env = base_env();
        env.remove("SQS_QUEUE_URL");
        let Err(RelayError::MissingConfig(key)) = load(&env) else {
            panic!("expected missing config");
        };
        assert_eq!(key, "SQS_QUEUE_URL");
    }

    #[test]
    fn blank_required_key_counts_as_missing() {
        let mut env = base_env();
        env.insert("TELEGRAM_CHAT_ID", "   ".to_string());
        assert!(matches!(
            load(&env),
            Err(RelayError::MissingConfig("TELEGRAM_CHAT_ID"))
        ));
    }

    #[test]
    fn invalid_listen_addr_rejected() {
        let mut env = base_env();
        env.insert("LISTEN_ADDR", "not-an-addr".to_string());
        assert!(matches!(
            load(&env),
            Err(RelayError::InvalidConfig { key: "LISTEN_ADDR", .. })
        ));
    }

    #[test]
    fn queue_batch_size_is_clamped() {
        let mut env = base_env();
        env.insert("QUEUE_MAX_MESSAGES", "50".to_string());
        let Ok(cfg) = load(&env) else {
            panic!("config should load");
        };
        assert_eq!(cfg.queue_max_messages, 10);
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let mut env = base_env();
        env.insert("SWEEP_INTERVAL_SECS", "0".to_string());
        assert!(matches!(
            load(&env),
            Err(RelayError::InvalidConfig { key: "SWEEP_INTERVAL_SECS", .. })
        ));
    }

    #[test]
    fn zero_heartbeat_rejected() {
        let mut env = base_env();
        env.insert("FEED_HEARTBEAT_SECS", "0".to_string());
        assert!(matches!(
            load(&env),
            Err(RelayError::InvalidConfig { key: "FEED_HEARTBEAT_SECS", .. })
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let Ok(cfg) = load(&base_env()) else {
            panic!("config should load");
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("123:abc"));
        assert!(!rendered.contains("service-key"));
    }
}
