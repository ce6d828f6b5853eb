//! Telegram Bot API client.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::{NotificationResult, Notifier};
use crate::config::{BotCredentials, TelegramConfig};
use crate::uploads::Attachment;

/// Notifier backed by `https://api.telegram.org/bot<token>/<method>`.
///
/// The token is part of the URL path, so request URLs are never logged and are stripped
/// from transport errors.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: Url,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// `<api_url>/bot<token>/<method>`, keeping any path prefix on `api_url`.
    fn method_url(&self, token: &str, method: &str) -> anyhow::Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Bot API URL cannot be used as a base: {}", self.api_url))?
            .pop_if_empty()
            .push(&format!("bot{token}"))
            .push(method);
        Ok(url)
    }

    async fn call(&self, method: &'static str, request: reqwest::RequestBuilder) -> anyhow::Result<NotificationResult> {
        let response = request.send().await.map_err(|e| anyhow!(e.without_url()))?;
        let status = response.status();

        // Telegram answers with a JSON body carrying `ok` on error statuses too
        let body = response.text().await.map_err(|e| anyhow!(e.without_url()))?;
        debug!(method, %status, "Bot API responded");

        let raw: serde_json::Value = serde_json::from_str(&body)
            .with_context(|| format!("Bot API {method} returned a non-JSON body (status {status})"))?;
        NotificationResult::from_response(raw)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all, fields(chat_id = %bot.chat_id))]
    async fn send_text(&self, bot: BotCredentials<'_>, html_text: &str) -> anyhow::Result<NotificationResult> {
        let url = self.method_url(bot.token, "sendMessage")?;
        let request = self.client.post(url).json(&json!({
            "chat_id": bot.chat_id,
            "text": html_text,
            "parse_mode": "HTML",
        }));

        self.call("sendMessage", request).await
    }

    #[instrument(skip_all, fields(chat_id = %bot.chat_id, file = %attachment.file_name, is_image = is_image))]
    async fn send_file(
        &self,
        bot: BotCredentials<'_>,
        attachment: Attachment,
        caption: &str,
        is_image: bool,
    ) -> anyhow::Result<NotificationResult> {
        let (method, field) = if is_image {
            ("sendPhoto", "photo")
        } else {
            ("sendDocument", "document")
        };
        let url = self.method_url(bot.token, method)?;

        let part = Part::stream_with_length(attachment.file, attachment.size_bytes)
            .file_name(attachment.file_name)
            .mime_str(&attachment.mime_type)
            .with_context(|| format!("Invalid MIME type for attachment: {}", attachment.mime_type))?;

        let mut form = Form::new().text("chat_id", bot.chat_id.to_string()).part(field, part);
        if !caption.is_empty() {
            form = form.text("caption", caption.to_string()).text("parse_mode", "HTML");
        }

        self.call(method, self.client.post(url).multipart(form)).await
    }
}
