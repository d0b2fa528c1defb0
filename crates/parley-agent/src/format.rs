// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of command replies and user-facing errors.

use parley_core::types::{DocumentRecord, ModelInfo, StoredMessage, ThreadSummary};
use parley_core::{FailureKind, ParleyError, Profile};

pub const HELP: &str = "\
Commands:
/topic <name> - switch topic (/topics lists threads)
/agent <name> - switch agent
/models [more] - list models, /model <id or number> - select one
/sync_models - refresh the model catalog
/lang <code> - reply language
/history [n] - recent messages in this topic
/search <keyword> - search this chat
/mode on|off - automatic replies in this topic
/continue - show what the model remembers
/doc - show the active document
/ask [model=..] [agent=..] [topic=..] [lang=..] <text> - one-off overrides
Anything else is sent to the model.";

pub fn profile(profile: &Profile, auto_reply: bool) -> String {
    format!(
        "Topic: {}\nAgent: {}\nModel: {}\nLanguage: {}\nAuto-reply: {}",
        profile.topic,
        profile.agent,
        profile.model,
        profile.language,
        if auto_reply { "on" } else { "off" }
    )
}

pub fn threads(threads: &[ThreadSummary], current_topic: &str) -> String {
    if threads.is_empty() {
        return "No conversations yet.".to_string();
    }
    let mut out = String::from("Topics:");
    for thread in threads {
        let marker = if thread.topic == current_topic { "*" } else { "-" };
        out.push_str(&format!(
            "\n{marker} {} ({} messages, last {})",
            thread.topic, thread.message_count, thread.updated_at
        ));
    }
    out
}

/// One page of the catalog; `first_number` is the listing number of `page[0]`.
pub fn models(page: &[ModelInfo], first_number: usize, selected: &str, has_more: bool) -> String {
    if page.is_empty() {
        return "The model catalog is empty. Try /sync_models.".to_string();
    }
    let mut out = String::from("Models:");
    for (i, model) in page.iter().enumerate() {
        let marker = if model.id == selected { " (selected)" } else { "" };
        let label = model
            .label
            .as_deref()
            .map(|l| format!(" - {l}"))
            .unwrap_or_default();
        out.push_str(&format!("\n{}. {}{label}{marker}", first_number + i, model.id));
    }
    if has_more {
        out.push_str("\nMore with /models more.");
    }
    out.push_str("\nSelect with /model <id or number>.");
    out
}

pub fn messages(title: &str, messages: &[StoredMessage], empty: &str) -> String {
    if messages.is_empty() {
        return empty.to_string();
    }
    let mut out = title.to_string();
    for m in messages {
        out.push_str(&format!("\n[{}] {} ({}): {}", m.created_at, m.role, m.topic, m.content));
    }
    out
}

pub fn document(document: Option<&DocumentRecord>) -> String {
    match document {
        Some(doc) => format!(
            "Active document: {} ({})\n{}",
            doc.title, doc.category, doc.summary
        ),
        None => "No active document in this topic. Send a file to attach one.".to_string(),
    }
}

/// Reference material passed to the completion gateway.
pub fn document_context(doc: &DocumentRecord) -> String {
    format!("Document \"{}\" ({}):\n{}", doc.title, doc.category, doc.summary)
}

/// Explanation shown to the user when handling a message failed.
pub fn user_error(err: &ParleyError) -> String {
    match err {
        ParleyError::Validation(message) => message.clone(),
        ParleyError::NonRetryable { kind, message } => match kind {
            FailureKind::Auth => {
                "The completion service refused the request: the credential has no access to this model. Your message was saved.".to_string()
            }
            FailureKind::UnknownModel => {
                "The selected model is not available. Pick another one with /models. Your message was saved.".to_string()
            }
            FailureKind::ContextLength => {
                "This conversation is too long for the model. Start a new topic with /topic <name>. Your message was saved.".to_string()
            }
            FailureKind::InvalidRequest => {
                format!("The completion request was rejected: {message}. Your message was saved.")
            }
        },
        ParleyError::RetriesExhausted { attempts, .. } => format!(
            "The model did not answer after {attempts} attempt(s). Your message was saved; please try again later."
        ),
        ParleyError::Timeout { .. } => {
            "The model took too long to answer. Your message was saved; please try again later.".to_string()
        }
        ParleyError::Disabled => {
            "Saved, not auto-replied: no completion credential is configured.".to_string()
        }
        ParleyError::Storage { .. } => {
            "Internal storage error. Please try again.".to_string()
        }
        ParleyError::Channel { .. } => "Could not reach the chat service. Please try again.".to_string(),
        ParleyError::Provider { .. } | ParleyError::Config(_) | ParleyError::Internal(_) => {
            format!("Something went wrong: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_core::{ChatId, Role};

    use super::*;

    #[test]
    fn models_mark_the_selected_one() {
        let rendered = models(&[ModelInfo::new("a"), ModelInfo::new("b")], 1, "b", false);
        assert!(rendered.contains("1. a\n"));
        assert!(rendered.contains("2. b (selected)"));
        assert!(!rendered.contains("/models more"));
        assert_eq!(
            models(&[], 1, "a", false),
            "The model catalog is empty. Try /sync_models."
        );
    }

    #[test]
    fn later_pages_keep_absolute_numbers() {
        let rendered = models(&[ModelInfo::new("k")], 11, "a", true);
        assert!(rendered.contains("11. k"));
        assert!(rendered.contains("More with /models more."));
    }

    #[test]
    fn messages_render_role_and_topic() {
        let m = StoredMessage {
            seq: 1,
            chat_id: ChatId(1),
            topic: "rust".into(),
            role: Role::User,
            content: "hello".into(),
            agent: "assistant".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let rendered = messages("History:", &[m], "none");
        assert_eq!(rendered, "History:\n[2026-01-01T00:00:00.000Z] user (rust): hello");
        assert_eq!(messages("History:", &[], "none"), "none");
    }

    #[test]
    fn every_error_has_a_user_message() {
        let auth = ParleyError::NonRetryable {
            kind: FailureKind::Auth,
            message: "403".into(),
        };
        assert!(user_error(&auth).contains("no access"));
        assert_eq!(
            user_error(&ParleyError::Validation("Usage: /search <keyword>".into())),
            "Usage: /search <keyword>"
        );
        let exhausted = ParleyError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(user_error(&exhausted).contains("3 attempt(s)"));
        assert!(user_error(&ParleyError::Disabled).starts_with("Saved, not auto-replied"));
    }
}
