//! Delivery of submissions to the destination chat.

pub mod format;
pub mod telegram;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::config::BotCredentials;
use crate::uploads::Attachment;

pub use telegram::TelegramNotifier;

/// Outcome reported by the bot API for one call.
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// The API's own success flag
    pub ok: bool,
    /// Full response body, kept for logging rejected calls
    pub raw: serde_json::Value,
}

impl NotificationResult {
    /// Interpret a decoded response body. Anything without a boolean `ok` is not a
    /// bot API response.
    pub fn from_response(raw: serde_json::Value) -> anyhow::Result<Self> {
        let ok = raw
            .get("ok")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| anyhow!("Bot API response has no boolean 'ok' field: {raw}"))?;
        Ok(Self { ok, raw })
    }
}

/// Sends formatted notifications. `TelegramNotifier` is the HTTP implementation; tests
/// point it at a mock server.
///
/// An `Err` means the call could not be completed or understood (network failure,
/// timeout, non-JSON body). An API-level refusal comes back as `Ok` with `ok == false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, bot: BotCredentials<'_>, html_text: &str) -> anyhow::Result<NotificationResult>;

    async fn send_file(
        &self,
        bot: BotCredentials<'_>,
        attachment: Attachment,
        caption: &str,
        is_image: bool,
    ) -> anyhow::Result<NotificationResult>;
}
