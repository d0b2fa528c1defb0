// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockChannel` hands out pre-loaded update batches one per fetch, captures
//! every sent message, and serves downloads from an in-memory file table.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parley_core::types::{AdapterType, DocumentRef, HealthStatus, InboundMessage, MessageId, Update};
use parley_core::{ChannelAdapter, ChatId, ParleyError, PluginAdapter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A text message update.
pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(InboundMessage {
            chat_id: ChatId(chat_id),
            text: Some(text.to_string()),
            document: None,
            sender: Some("tester".to_string()),
        }),
    }
}

/// A document update with an optional caption.
pub fn document_update(update_id: i64, chat_id: i64, file_id: &str, file_name: &str, caption: Option<&str>) -> Update {
    Update {
        update_id,
        message: Some(InboundMessage {
            chat_id: ChatId(chat_id),
            text: caption.map(str::to_string),
            document: Some(DocumentRef {
                file_id: file_id.to_string(),
                file_name: Some(file_name.to_string()),
                mime_type: None,
            }),
            sender: Some("tester".to_string()),
        }),
    }
}

pub struct MockChannel {
    batches: Mutex<VecDeque<Result<Vec<Update>, String>>>,
    sent: Mutex<Vec<(ChatId, String)>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetch_offsets: Mutex<Vec<Option<i64>>>,
    cancel_when_drained: Mutex<Option<CancellationToken>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            fetch_offsets: Mutex::new(Vec::new()),
            cancel_when_drained: Mutex::new(None),
        }
    }

    /// Queues a batch returned by a later `fetch_updates`.
    pub async fn push_batch(&self, updates: Vec<Update>) {
        self.batches.lock().await.push_back(Ok(updates));
    }

    /// Queues a transport failure.
    pub async fn push_fetch_error(&self, message: &str) {
        self.batches.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn add_file(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.lock().await.insert(file_id.to_string(), bytes);
    }

    /// Cancels `token` on the first fetch after the queued batches ran out.
    pub async fn cancel_when_drained(&self, token: CancellationToken) {
        *self.cancel_when_drained.lock().await = Some(token);
    }

    pub async fn sent_messages(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().await.clone()
    }

    /// Text of every sent message, in send order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, t)| t.clone()).collect()
    }

    /// Offsets passed to each `fetch_updates` call.
    pub async fn fetch_offsets(&self) -> Vec<Option<i64>> {
        self.fetch_offsets.lock().await.clone()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ParleyError> {
        self.fetch_offsets.lock().await.push(offset);
        tokio::task::yield_now().await;

        match self.batches.lock().await.pop_front() {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(message)) => Err(ParleyError::channel(message)),
            None => {
                if let Some(token) = self.cancel_when_drained.lock().await.as_ref() {
                    token.cancel();
                }
                Ok(Vec::new())
            }
        }
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, ParleyError> {
        let mut sent = self.sent.lock().await;
        sent.push((chat_id, text.to_string()));
        Ok(MessageId(sent.len().to_string()))
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, ParleyError> {
        self.files
            .lock()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| ParleyError::channel(format!("unknown file id {file_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn batches_are_served_in_order_then_empty() {
        let channel = MockChannel::new();
        channel.push_batch(vec![text_update(1, 7, "a")]).await;
        channel.push_fetch_error("down").await;

        assert_eq!(channel.fetch_updates(None).await.unwrap().len(), 1);
        assert!(channel.fetch_updates(Some(2)).await.is_err());
        assert!(channel.fetch_updates(Some(2)).await.unwrap().is_empty());
        assert_eq!(channel.fetch_offsets().await, vec![None, Some(2), Some(2)]);
    }

    #[tokio::test]
    async fn drained_channel_cancels_token() {
        let channel = MockChannel::new();
        let token = CancellationToken::new();
        channel.cancel_when_drained(token.clone()).await;
        channel.fetch_updates(None).await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn sends_are_captured() {
        let channel = MockChannel::new();
        channel.send_message(ChatId(3), "hello").await.unwrap();
        assert_eq!(channel.sent_messages().await, vec![(ChatId(3), "hello".to_string())]);
        assert!(channel.download_file("missing").await.is_err());
    }
}
