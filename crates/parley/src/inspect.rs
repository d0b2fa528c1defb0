// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley threads`, `parley history` and `parley search`.
//!
//! Read-only views over the conversation store for operators.

use std::io::IsTerminal;

use parley_config::ParleyConfig;
use parley_core::types::{HistoryQuery, StoredMessage, ThreadSummary};
use parley_core::{ChatId, ParleyError, Role, StorageAdapter};
use parley_storage::SqliteStorage;
use serde::Serialize;

async fn open_store(config: &ParleyConfig) -> Result<SqliteStorage, ParleyError> {
    let storage = SqliteStorage::new(config.storage.clone(), config.thread_defaults());
    storage.initialize().await?;
    Ok(storage)
}

fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ParleyError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ParleyError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{rendered}");
    Ok(())
}

pub async fn run_threads(
    config: &ParleyConfig,
    chat: Option<i64>,
    json: bool,
    plain: bool,
) -> Result<(), ParleyError> {
    let storage = open_store(config).await?;
    let threads = storage.list_threads(chat.map(ChatId)).await?;
    storage.close().await?;

    if json {
        return print_json(&threads);
    }
    print!("{}", render_threads(&threads, use_color(plain)));
    Ok(())
}

pub async fn run_history(
    config: &ParleyConfig,
    chat: i64,
    topic: Option<String>,
    limit: usize,
    json: bool,
    plain: bool,
) -> Result<(), ParleyError> {
    let storage = open_store(config).await?;
    let topic = match topic {
        Some(topic) => topic,
        None => storage.get_current_topic(ChatId(chat)).await?,
    };
    let messages = storage
        .get_history(&HistoryQuery {
            chat_id: ChatId(chat),
            topic: Some(topic),
            limit,
        })
        .await?;
    storage.close().await?;

    if json {
        return print_json(&messages);
    }
    print!("{}", render_messages(&messages, use_color(plain)));
    Ok(())
}

pub async fn run_search(
    config: &ParleyConfig,
    chat: i64,
    keyword: &str,
    limit: usize,
    json: bool,
    plain: bool,
) -> Result<(), ParleyError> {
    let storage = open_store(config).await?;
    let messages = storage.search(ChatId(chat), keyword, limit).await?;
    storage.close().await?;

    if json {
        return print_json(&messages);
    }
    print!("{}", render_messages(&messages, use_color(plain)));
    Ok(())
}

fn render_threads(threads: &[ThreadSummary], color: bool) -> String {
    if threads.is_empty() {
        return "no threads\n".to_string();
    }
    let mut out = String::new();
    for thread in threads {
        let key = format!("{}/{}", thread.chat_id.0, thread.topic);
        let key = if color {
            use colored::Colorize;
            key.bold().to_string()
        } else {
            key
        };
        out.push_str(&format!(
            "{key}  {} message(s)  last {}\n",
            thread.message_count, thread.updated_at
        ));
    }
    out
}

fn render_messages(messages: &[StoredMessage], color: bool) -> String {
    if messages.is_empty() {
        return "no messages\n".to_string();
    }
    let mut out = String::new();
    for m in messages {
        let role = if color {
            use colored::Colorize;
            match m.role {
                Role::User => m.role.to_string().cyan().to_string(),
                Role::Assistant => m.role.to_string().green().to_string(),
                Role::System => m.role.to_string().dimmed().to_string(),
            }
        } else {
            m.role.to_string()
        };
        out.push_str(&format!(
            "#{} {} [{}] {} ({}): {}\n",
            m.seq, m.created_at, m.topic, role, m.agent, m.content
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(seq: i64, role: Role, content: &str) -> StoredMessage {
        StoredMessage {
            seq,
            chat_id: ChatId(1),
            topic: "general".into(),
            role,
            content: content.into(),
            agent: "assistant".into(),
            created_at: "2026-03-01T10:00:00.000Z".into(),
        }
    }

    #[test]
    fn plain_rendering_has_no_escape_codes() {
        let rendered = render_messages(
            &[message(1, Role::User, "hi"), message(2, Role::Assistant, "hello")],
            false,
        );
        assert_eq!(
            rendered,
            "#1 2026-03-01T10:00:00.000Z [general] user (assistant): hi\n\
             #2 2026-03-01T10:00:00.000Z [general] assistant (assistant): hello\n"
        );
        assert_eq!(render_messages(&[], false), "no messages\n");
    }

    #[test]
    fn threads_render_one_line_each() {
        let threads = vec![ThreadSummary {
            chat_id: ChatId(5),
            topic: "rust".into(),
            message_count: 3,
            updated_at: "2026-03-01T10:00:00.000Z".into(),
        }];
        assert_eq!(
            render_threads(&threads, false),
            "5/rust  3 message(s)  last 2026-03-01T10:00:00.000Z\n"
        );
        assert_eq!(render_threads(&[], false), "no threads\n");
    }

    #[tokio::test]
    async fn history_reads_current_topic_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ParleyConfig::default();
        config.storage.database_path = dir.path().join("p.db").to_string_lossy().into_owned();

        let storage = open_store(&config).await.unwrap();
        storage.set_current_topic(ChatId(1), "rust").await.unwrap();
        storage
            .append(ChatId(1), "rust", Role::User, "borrowck", "assistant")
            .await
            .unwrap();
        storage.close().await.unwrap();

        run_history(&config, 1, None, 10, true, true).await.unwrap();
        run_search(&config, 1, "BORROW", 10, false, true).await.unwrap();
        run_threads(&config, Some(1), false, true).await.unwrap();
    }
}
