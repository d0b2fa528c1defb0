// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait: the conversation store.
//!
//! The store is the sole source of truth for message history, per-thread
//! key/value state, and the update-offset cursor. Typed accessors over the
//! key/value state are provided as default methods so that every backend
//! shares the same key naming.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CHAT_SCOPE, ChatId, ContinuationContext, CurrentProfile, DocumentRecord, HistoryQuery, Role,
    StateKey, StoredMessage, ThreadDefaults, ThreadSummary,
};

/// Adapter for the durable conversation store.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ParleyError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ParleyError>;

    /// Configured fallbacks for unset profile fields.
    fn defaults(&self) -> &ThreadDefaults;

    // --- Message log ---

    /// Appends a message to the `(chat_id, topic)` thread and prunes the thread
    /// to its retention bounds. The appended message always survives pruning.
    async fn append(
        &self,
        chat_id: ChatId,
        topic: &str,
        role: Role,
        content: &str,
        agent: &str,
    ) -> Result<StoredMessage, ParleyError>;

    /// Returns up to `limit` of the most recent messages, oldest first.
    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<StoredMessage>, ParleyError>;

    /// Case-insensitive substring search over a chat's messages, newest first.
    async fn search(
        &self,
        chat_id: ChatId,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ParleyError>;

    /// One row per `(chat_id, topic)`, most recently updated first.
    async fn list_threads(&self, chat_id: Option<ChatId>) -> Result<Vec<ThreadSummary>, ParleyError>;

    /// Builds the continuation view for a thread.
    async fn continue_context(
        &self,
        chat_id: ChatId,
        topic: &str,
        limit: usize,
    ) -> Result<ContinuationContext, ParleyError>;

    // --- Topic state ---

    async fn get_topic_state(
        &self,
        chat_id: ChatId,
        topic: &str,
        key: StateKey,
    ) -> Result<Option<String>, ParleyError>;

    async fn set_topic_state(
        &self,
        chat_id: ChatId,
        topic: &str,
        key: StateKey,
        value: &str,
    ) -> Result<(), ParleyError>;

    // --- Offset cursor ---

    /// Highest acknowledged update id, `0` if never set.
    async fn get_offset(&self) -> Result<i64, ParleyError>;

    /// Stores `offset` unless it is lower than the stored value. Returns the
    /// value in effect afterwards.
    async fn set_offset(&self, offset: i64) -> Result<i64, ParleyError>;

    // --- Typed accessors ---

    /// Reads a state value, falling back to `default` when unset.
    async fn topic_state_or(
        &self,
        chat_id: ChatId,
        topic: &str,
        key: StateKey,
        default: &str,
    ) -> Result<String, ParleyError> {
        Ok(self
            .get_topic_state(chat_id, topic, key)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    async fn get_selected_model(&self, chat_id: ChatId, topic: &str) -> Result<String, ParleyError> {
        let default = self.defaults().model.clone();
        self.topic_state_or(chat_id, topic, StateKey::Model, &default)
            .await
    }

    async fn set_selected_model(
        &self,
        chat_id: ChatId,
        topic: &str,
        model: &str,
    ) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, topic, StateKey::Model, model)
            .await
    }

    async fn get_selected_agent(&self, chat_id: ChatId, topic: &str) -> Result<String, ParleyError> {
        let default = self.defaults().agent.clone();
        self.topic_state_or(chat_id, topic, StateKey::Agent, &default)
            .await
    }

    async fn set_selected_agent(
        &self,
        chat_id: ChatId,
        topic: &str,
        agent: &str,
    ) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, topic, StateKey::Agent, agent)
            .await
    }

    async fn get_language(&self, chat_id: ChatId, topic: &str) -> Result<String, ParleyError> {
        let default = self.defaults().language.clone();
        self.topic_state_or(chat_id, topic, StateKey::Language, &default)
            .await
    }

    async fn set_language(
        &self,
        chat_id: ChatId,
        topic: &str,
        language: &str,
    ) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, topic, StateKey::Language, language)
            .await
    }

    /// The chat's current topic, or the configured default topic.
    async fn get_current_topic(&self, chat_id: ChatId) -> Result<String, ParleyError> {
        let default = self.defaults().topic.clone();
        self.topic_state_or(chat_id, CHAT_SCOPE, StateKey::CurrentTopic, &default)
            .await
    }

    async fn set_current_topic(&self, chat_id: ChatId, topic: &str) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, CHAT_SCOPE, StateKey::CurrentTopic, topic)
            .await
    }

    /// Current `{topic, agent}` for a chat; `default_topic` is used when the chat
    /// never switched topics.
    async fn current_profile(
        &self,
        chat_id: ChatId,
        default_topic: &str,
    ) -> Result<CurrentProfile, ParleyError> {
        let topic = self
            .topic_state_or(chat_id, CHAT_SCOPE, StateKey::CurrentTopic, default_topic)
            .await?;
        let agent = self.get_selected_agent(chat_id, &topic).await?;
        Ok(CurrentProfile { topic, agent })
    }

    async fn get_nav_step(&self, chat_id: ChatId, topic: &str) -> Result<Option<String>, ParleyError> {
        self.get_topic_state(chat_id, topic, StateKey::NavStep).await
    }

    async fn set_nav_step(&self, chat_id: ChatId, topic: &str, step: &str) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, topic, StateKey::NavStep, step)
            .await
    }

    async fn get_page_cursor(&self, chat_id: ChatId, topic: &str) -> Result<usize, ParleyError> {
        Ok(self
            .get_topic_state(chat_id, topic, StateKey::PageCursor)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    async fn set_page_cursor(
        &self,
        chat_id: ChatId,
        topic: &str,
        cursor: usize,
    ) -> Result<(), ParleyError> {
        self.set_topic_state(chat_id, topic, StateKey::PageCursor, &cursor.to_string())
            .await
    }

    /// Cached candidate list (e.g. the last model listing); empty when unset or unreadable.
    async fn get_candidates(&self, chat_id: ChatId, topic: &str) -> Result<Vec<String>, ParleyError> {
        let raw = self
            .get_topic_state(chat_id, topic, StateKey::Candidates)
            .await?;
        Ok(raw
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default())
    }

    async fn set_candidates(
        &self,
        chat_id: ChatId,
        topic: &str,
        candidates: &[String],
    ) -> Result<(), ParleyError> {
        let encoded = serde_json::to_string(candidates).map_err(ParleyError::storage)?;
        self.set_topic_state(chat_id, topic, StateKey::Candidates, &encoded)
            .await
    }

    async fn get_active_document(
        &self,
        chat_id: ChatId,
        topic: &str,
    ) -> Result<Option<DocumentRecord>, ParleyError> {
        let raw = self
            .get_topic_state(chat_id, topic, StateKey::ActiveDocument)
            .await?;
        Ok(raw.and_then(|v| serde_json::from_str(&v).ok()))
    }

    async fn set_active_document(
        &self,
        chat_id: ChatId,
        topic: &str,
        document: &DocumentRecord,
    ) -> Result<(), ParleyError> {
        let encoded = serde_json::to_string(document).map_err(ParleyError::storage)?;
        self.set_topic_state(chat_id, topic, StateKey::ActiveDocument, &encoded)
            .await
    }

    /// Whether free-form messages in this thread get an automatic reply. Defaults to on.
    async fn get_auto_reply(&self, chat_id: ChatId, topic: &str) -> Result<bool, ParleyError> {
        Ok(self
            .get_topic_state(chat_id, topic, StateKey::AutoReply)
            .await?
            .map(|v| v != "off")
            .unwrap_or(true))
    }

    async fn set_auto_reply(
        &self,
        chat_id: ChatId,
        topic: &str,
        enabled: bool,
    ) -> Result<(), ParleyError> {
        let value = if enabled { "on" } else { "off" };
        self.set_topic_state(chat_id, topic, StateKey::AutoReply, value)
            .await
    }
}
