// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Parley bridge.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque numeric conversation identifier assigned by the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// The unit of conversation continuity: one topic inside one chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadKey {
    pub chat_id: ChatId,
    pub topic: String,
}

impl ThreadKey {
    pub fn new(chat_id: ChatId, topic: impl Into<String>) -> Self {
        Self {
            chat_id,
            topic: topic.into(),
        }
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.topic)
    }
}

/// Author of a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A message as persisted in the conversation log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Monotonic insertion sequence; the only ordering key.
    pub seq: i64,
    pub chat_id: ChatId,
    pub topic: String,
    pub role: Role,
    pub content: String,
    pub agent: String,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// Aggregate row describing one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub chat_id: ChatId,
    pub topic: String,
    pub message_count: i64,
    /// Timestamp of the latest message in the thread.
    pub updated_at: String,
}

/// Query for [`crate::StorageAdapter::get_history`].
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub chat_id: ChatId,
    /// `None` returns messages across every topic of the chat.
    pub topic: Option<String>,
    pub limit: usize,
}

/// Bounded recent-message-plus-summary view fed to the completion gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationContext {
    pub chat_id: ChatId,
    pub topic: String,
    pub agent: String,
    pub model_id: String,
    /// Most recent messages of the thread, oldest first.
    pub messages: Vec<StoredMessage>,
    /// Digest of everything older than `messages`, always headed by the thread identity.
    pub summary: String,
    /// Number of older messages folded into the summary.
    pub compacted: usize,
}

impl ContinuationContext {
    /// First line of every summary.
    pub fn identity_header(topic: &str, agent: &str, model_id: &str) -> String {
        format!("Thread: topic={topic} agent={agent} model={model_id}")
    }

    /// Re-labels the context for the agent and model actually answering,
    /// rewriting the summary header to match.
    pub fn with_identity(mut self, agent: &str, model_id: &str) -> Self {
        let digest = self
            .summary
            .split_once('\n')
            .map(|(_, rest)| rest.to_string());
        let mut summary = Self::identity_header(&self.topic, agent, model_id);
        if let Some(digest) = digest {
            summary.push('\n');
            summary.push_str(&digest);
        }
        self.agent = agent.to_string();
        self.model_id = model_id.to_string();
        self.summary = summary;
        self
    }
}

/// Fallback values used when a thread has never set a profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDefaults {
    pub topic: String,
    pub agent: String,
    pub model: String,
    pub language: String,
}

/// The resolved `(topic, agent, model, language)` governing one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub topic: String,
    pub agent: String,
    pub model: String,
    pub language: String,
}

/// Chat-scoped `{topic, agent}` pair returned by `current_profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentProfile {
    pub topic: String,
    pub agent: String,
}

/// Named keys of the per-thread key/value state.
///
/// Every logical concern stored in topic state goes through one of these
/// variants so that callers never scatter raw key strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum StateKey {
    Model,
    Agent,
    Language,
    NavStep,
    Candidates,
    ActiveDocument,
    PageCursor,
    CurrentTopic,
    AutoReply,
}

/// Topic name used for chat-scoped state such as the current topic.
pub const CHAT_SCOPE: &str = "*";

/// Token counts for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single message in a provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

/// A request to the completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
}

/// A response from the completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub id: Option<String>,
    pub content: String,
    pub model: String,
    /// `None` when the endpoint did not report usage.
    pub usage: Option<TokenUsage>,
}

/// One entry of the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            context_window: None,
        }
    }
}

/// Reference to a file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Structured result of document ingestion. Only `storage_path` is the pointer kept
/// in topic state; title and summary are for display and extra context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    pub category: String,
    pub summary: String,
    pub storage_path: String,
}

/// A message carried by an inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub text: Option<String>,
    pub document: Option<DocumentRef>,
    /// Sender display name or id, when the transport provides one.
    pub sender: Option<String>,
}

/// One inbound update from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<InboundMessage>,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    DocumentIngestion,
}
