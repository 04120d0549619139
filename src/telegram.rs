//! Telegram Bot API notifications
//!
//! Sends plain-text messages to a single chat.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{NotifierError, Result};

/// Outbound message channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Telegram notification client
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    send_url: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, token: &str, chat_id: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            send_url: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        let message = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        // The URL embeds the bot token, so transport errors are reported without it.
        let resp = self
            .client
            .post(&self.send_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifierError::Notification(e.without_url().to_string()))?;

        let status = resp.status();
        let body: Option<TelegramResponse> = resp.json().await.ok();

        match body {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => {
                debug!("Telegram message delivered to chat {}", self.chat_id);
                Ok(())
            }
            Some(TelegramResponse { description, .. }) => Err(NotifierError::Notification(
                format!(
                    "HTTP {}: {}",
                    status,
                    description.unwrap_or_else(|| "sendMessage failed".to_string())
                ),
            )),
            None => Err(NotifierError::Notification(format!(
                "HTTP {}: unreadable response",
                status
            ))),
        }
    }
}
