// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat bridge.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Parley workspace. The transport, completion
//! endpoint, conversation store, and document ingestion all plug in through the
//! traits defined here.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FailureKind, ParleyError};
pub use types::{
    AdapterType, ChatId, ContinuationContext, HealthStatus, MessageId, Profile, Role, StateKey,
    StoredMessage, ThreadDefaults, ThreadKey, TokenUsage,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ChannelAdapter, DocumentIngestor, PluginAdapter, ProviderAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parley_error_variants_render() {
        let provider = ParleyError::provider("boom", Some(503));
        assert_eq!(provider.to_string(), "provider error: boom");

        let non_retryable = ParleyError::NonRetryable {
            kind: FailureKind::ContextLength,
            message: "too long".into(),
        };
        assert_eq!(
            non_retryable.to_string(),
            "completion failed (context_length): too long"
        );

        let exhausted = ParleyError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(exhausted.to_string().contains("3 attempt(s)"));

        assert!(ParleyError::storage(std::io::Error::other("disk")).is_storage());
        assert!(!ParleyError::Disabled.is_storage());
    }

    #[test]
    fn role_display_and_parse_roundtrip() {
        for role in [Role::User, Role::Assistant, Role::System] {
            let s = role.to_string();
            assert_eq!(Role::from_str(&s).unwrap(), role);
        }
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn state_keys_are_snake_case() {
        assert_eq!(StateKey::Model.to_string(), "model");
        assert_eq!(StateKey::ActiveDocument.to_string(), "active_document");
        assert_eq!(StateKey::CurrentTopic.to_string(), "current_topic");
    }

    #[test]
    fn thread_key_display() {
        let key = ThreadKey::new(ChatId(42), "research");
        assert_eq!(key.to_string(), "42/research");
    }

    #[test]
    fn continuation_identity_is_relabelled_with_digest_kept() {
        let ctx = ContinuationContext {
            chat_id: ChatId(1),
            topic: "general".into(),
            agent: "assistant".into(),
            model_id: "gpt-4o-mini".into(),
            messages: Vec::new(),
            summary: format!(
                "{}\nEarlier messages compacted: 2",
                ContinuationContext::identity_header("general", "assistant", "gpt-4o-mini")
            ),
            compacted: 2,
        };

        let ctx = ctx.with_identity("coder", "gpt-4o");
        assert_eq!(ctx.agent, "coder");
        assert_eq!(ctx.model_id, "gpt-4o");
        assert_eq!(
            ctx.summary,
            "Thread: topic=general agent=coder model=gpt-4o\nEarlier messages compacted: 2"
        );

        let bare = ContinuationContext {
            summary: ContinuationContext::identity_header("t", "a", "m"),
            compacted: 0,
            ..ctx
        };
        assert_eq!(
            bare.with_identity("a", "m2").summary,
            "Thread: topic=t agent=a model=m2"
        );
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_document_ingestor<T: DocumentIngestor>() {}
        fn _assert_clock<T: Clock>() {}
    }
}
