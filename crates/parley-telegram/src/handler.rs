// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into transport-neutral bridge updates.

use parley_core::types::{ChatId, DocumentRef, InboundMessage, Update};
use teloxide::types::{Message, UpdateKind};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Maps a Telegram update. Kinds other than new messages keep their id (so
/// the offset still advances) but carry no message.
pub fn to_bridge_update(update: teloxide::types::Update) -> Update {
    let update_id = i64::from(update.id.0);
    let message = match &update.kind {
        UpdateKind::Message(msg) => Some(to_inbound_message(msg)),
        _ => None,
    };
    Update { update_id, message }
}

/// Extracts text (or a caption) and an attached document from a message.
pub fn to_inbound_message(msg: &Message) -> InboundMessage {
    let text = msg.text().or_else(|| msg.caption()).map(str::to_string);
    let document = msg.document().map(|doc| DocumentRef {
        file_id: doc.file.id.to_string(),
        file_name: doc.file_name.clone(),
        mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
    });
    let sender = msg.from.as_ref().map(|user| {
        user.username
            .clone()
            .unwrap_or_else(|| user.id.0.to_string())
    });

    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        text,
        document,
        sender,
    }
}

/// Splits `text` into chunks Telegram accepts, preferring line breaks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let split_at = match rest[..hard_end].rfind('\n') {
            Some(i) if i > 0 => i,
            _ => hard_end,
        };
        chunks.push(rest[..split_at].to_string());
        rest = rest[split_at..].strip_prefix('\n').unwrap_or(&rest[split_at..]);
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_message(extra: serde_json::Value) -> serde_json::Value {
        let mut json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": 4242i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": 4242u64,
                "is_bot": false,
                "first_name": "Test",
                "username": "tester",
            },
        });
        if let (Some(obj), Some(more)) = (json.as_object_mut(), extra.as_object()) {
            obj.extend(more.clone());
        }
        json
    }

    #[test]
    fn text_message_maps_to_inbound() {
        let msg: Message =
            serde_json::from_value(private_message(serde_json::json!({ "text": "hello" }))).unwrap();
        let inbound = to_inbound_message(&msg);
        assert_eq!(inbound.chat_id, ChatId(4242));
        assert_eq!(inbound.text.as_deref(), Some("hello"));
        assert_eq!(inbound.sender.as_deref(), Some("tester"));
        assert!(inbound.document.is_none());
    }

    #[test]
    fn document_message_carries_caption_and_file() {
        let msg: Message = serde_json::from_value(private_message(serde_json::json!({
            "caption": "please summarize",
            "document": {
                "file_id": "doc-1",
                "file_unique_id": "u-1",
                "file_size": 12,
                "file_name": "notes.txt",
                "mime_type": "text/plain",
            },
        })))
        .unwrap();
        let inbound = to_inbound_message(&msg);
        assert_eq!(inbound.text.as_deref(), Some("please summarize"));
        let doc = inbound.document.unwrap();
        assert_eq!(doc.file_id, "doc-1");
        assert_eq!(doc.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(doc.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn update_keeps_its_id() {
        let update: teloxide::types::Update = serde_json::from_value(serde_json::json!({
            "update_id": 77,
            "message": private_message(serde_json::json!({ "text": "hi" })),
        }))
        .unwrap();
        let bridged = to_bridge_update(update);
        assert_eq!(bridged.update_id, 77);
        assert_eq!(bridged.message.unwrap().text.as_deref(), Some("hi"));
    }

    #[test]
    fn split_prefers_line_breaks() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(split_message("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(split_message("", 10), vec![""]);
        assert_eq!(split_message("short", MAX_MESSAGE_CHARS), vec!["short"]);
    }

    #[test]
    fn split_respects_char_boundaries() {
        let text = "가나다라마바사";
        let chunks = split_message(text, 3);
        assert_eq!(chunks, vec!["가나다", "라마바", "사"]);
    }
}
