//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::error::RelayError;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4_096;

/// Tags the formatter emits; none of them nest.
const INLINE_TAGS: [&str; 2] = ["b", "code"];

/// Marker appended to a shortened message.
const ELLIPSIS: &str = "…";

/// Room kept for the ellipsis and closing tags.
const CLOSING_RESERVE: usize = 16;

/// `sendMessage` request body.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends HTML messages to one chat through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    /// Creates a notifier for `chat_id` using `bot_token`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChatDelivery`] if the HTTP client cannot be
    /// built.
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, RelayError> {
        Self::with_base_url(API_BASE, bot_token, chat_id)
    }

    /// Creates a notifier against a custom Bot API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ChatDelivery`] if the HTTP client cannot be
    /// built.
    pub fn with_base_url(base_url: &str, bot_token: &str, chat_id: &str) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{bot_token}/sendMessage",
                base_url.trim_end_matches('/')
            ),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), RelayError> {
        let text = truncate_html(text, MAX_MESSAGE_CHARS);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let api: ApiResponse = response.json().await?;
        if !api.ok {
            return Err(RelayError::ChatDelivery(format!(
                "{status}: {}",
                api.description.unwrap_or_else(|| "no description".to_string())
            )));
        }
        Ok(())
    }
}

/// Truncates to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text.get(..idx).unwrap_or(text),
        None => text,
    }
}

/// Shortens rendered HTML to at most `max` characters while keeping it
/// parseable: a cut tag or entity is dropped and open tags are closed.
fn truncate_html(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut cut = truncate_chars(text, max.saturating_sub(CLOSING_RESERVE));
    if let Some(open) = cut.rfind('<')
        && cut.rfind('>').is_none_or(|close| close < open)
    {
        cut = cut.get(..open).unwrap_or(cut);
    }
    if let Some(amp) = cut.rfind('&')
        && cut.rfind(';').is_none_or(|semi| semi < amp)
    {
        cut = cut.get(..amp).unwrap_or(cut);
    }

    let mut out = format!("{cut}{ELLIPSIS}");
    for tag in INLINE_TAGS {
        let opened = cut.matches(&format!("<{tag}>")).count();
        let closed = cut.matches(&format!("</{tag}>")).count();
        if opened > closed {
            out.push_str(&format!("</{tag}>"));
        }
    }
    out
}
