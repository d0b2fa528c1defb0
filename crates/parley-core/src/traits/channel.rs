// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the chat transport (Telegram long polling).

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, MessageId, Update};

/// Adapter for the long-poll chat transport.
///
/// The bridge pulls one batch at a time with [`fetch_updates`](Self::fetch_updates)
/// and processes it sequentially before asking for the next.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Long-polls for updates with an id of at least `offset`.
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ParleyError>;

    /// Sends a plain-text message to a chat.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, ParleyError>;

    /// Downloads an attached file by its transport file id.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, ParleyError>;
}
