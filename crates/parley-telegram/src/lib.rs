// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Parley chat bridge.
//!
//! Implements [`ChannelAdapter`] over the Bot API via teloxide: explicit
//! `getUpdates` long polling driven by the bridge's offset, plain-text
//! replies split to Telegram's length limit, and file download.

pub mod handler;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::TelegramConfig;
use parley_core::types::{AdapterType, ChatId, HealthStatus, MessageId, Update};
use parley_core::{ChannelAdapter, ParleyError, PluginAdapter};
use teloxide::Bot;
use teloxide::net::Download;
use teloxide::payloads::GetUpdatesSetters;
use teloxide::requests::Requester;
use teloxide::types::{FileId, Recipient};
use tracing::{debug, info};

use crate::handler::{MAX_MESSAGE_CHARS, split_message, to_bridge_update};

/// Head-room on top of the long-poll timeout for the HTTP request itself.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
}

impl TelegramChannel {
    /// Requires `config.bot_token` to be set and non-empty.
    pub fn new(config: TelegramConfig) -> Result<Self, ParleyError> {
        let token = config.bot_token.as_deref().map(str::trim).ok_or_else(|| {
            ParleyError::Config("telegram.bot_token is required for the Telegram transport".into())
        })?;
        if token.is_empty() {
            return Err(ParleyError::Config("telegram.bot_token cannot be empty".into()));
        }

        let http_timeout = Duration::from_secs(u64::from(config.poll_timeout_secs)) + HTTP_TIMEOUT_SLACK;
        let client = teloxide::net::default_reqwest_settings()
            .timeout(http_timeout)
            .build()
            .map_err(|e| ParleyError::Config(format!("failed to build Telegram HTTP client: {e}")))?;

        Ok(Self {
            bot: Bot::with_client(token, client),
            config,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn channel_err(what: &str, e: impl std::error::Error + Send + Sync + 'static) -> ParleyError {
        ParleyError::Channel {
            message: format!("{what}: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Telegram bot unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ParleyError> {
        let mut request = self.bot.get_updates().timeout(self.config.poll_timeout_secs);
        if let Some(offset) = offset {
            request = request.offset(i32::try_from(offset).unwrap_or(i32::MAX));
        }
        let updates = request
            .await
            .map_err(|e| Self::channel_err("failed to fetch updates", e))?;

        if !updates.is_empty() {
            debug!(count = updates.len(), ?offset, "fetched Telegram updates");
        }
        Ok(updates.into_iter().map(to_bridge_update).collect())
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, ParleyError> {
        let recipient = Recipient::Id(teloxide::types::ChatId(chat_id.0));
        let mut last_id = None;
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let sent = self
                .bot
                .send_message(recipient.clone(), chunk)
                .await
                .map_err(|e| Self::channel_err("failed to send message", e))?;
            last_id = Some(sent.id.0);
        }
        let id = last_id.ok_or_else(|| ParleyError::channel("nothing was sent"))?;
        Ok(MessageId(id.to_string()))
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, ParleyError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| Self::channel_err("failed to get file info", e))?;

        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(|e| Self::channel_err("failed to download file", e))?;

        info!(file_id, size = buf.len(), "downloaded file from Telegram");
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(config(None)).is_err());
        assert!(TelegramChannel::new(config(Some("  "))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let channel = TelegramChannel::new(config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }
}
