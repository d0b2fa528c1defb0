// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log: append with retention pruning, history, search, thread listing.

use std::str::FromStr;

use parley_core::types::{ChatId, Role, StoredMessage, ThreadSummary};
use parley_core::ParleyError;
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

/// Per-thread retention bounds applied after every append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Maximum messages kept per thread. Values below 1 are treated as 1.
    pub max_messages: usize,
    /// Maximum age in days; `0` disables age-based pruning.
    pub max_age_days: u32,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_messages: 500,
            max_age_days: 0,
        }
    }
}

/// A message about to be appended.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub topic: String,
    pub role: Role,
    pub content: String,
    pub agent: String,
}

const SELECT_COLUMNS: &str = "seq, chat_id, topic, role, content, agent, created_at";

fn row_to_message(row: &Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    let role: String = row.get(3)?;
    let role = Role::from_str(&role).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoredMessage {
        seq: row.get(0)?,
        chat_id: ChatId(row.get(1)?),
        topic: row.get(2)?,
        role,
        content: row.get(4)?,
        agent: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append a message stamped with the current time, then prune the thread.
pub async fn append_message(
    db: &Database,
    message: NewMessage,
    retention: Retention,
) -> Result<StoredMessage, ParleyError> {
    append_message_at(db, message, super::now_timestamp(), retention).await
}

/// Append a message with an explicit `created_at`, then prune the thread.
///
/// Insert and pruning run in one transaction. The appended row is excluded
/// from both pruning rules, so a thread is never emptied by its own write.
pub async fn append_message_at(
    db: &Database,
    message: NewMessage,
    created_at: String,
    retention: Retention,
) -> Result<StoredMessage, ParleyError> {
    let age_cutoff = (retention.max_age_days > 0).then(|| {
        super::format_timestamp(
            chrono::Utc::now() - chrono::Duration::days(i64::from(retention.max_age_days)),
        )
    });
    let keep = retention.max_messages.max(1) as i64;

    db.connection()
        .call(move |conn| -> Result<StoredMessage, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (chat_id, topic, role, content, agent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.chat_id.0,
                    message.topic,
                    message.role.to_string(),
                    message.content,
                    message.agent,
                    created_at,
                ],
            )?;
            let seq = tx.last_insert_rowid();

            // Everything at or below the (keep + 1)-th newest row goes.
            tx.execute(
                "DELETE FROM messages
                 WHERE chat_id = ?1 AND topic = ?2 AND seq <> ?3 AND seq <= (
                     SELECT seq FROM messages WHERE chat_id = ?1 AND topic = ?2
                     ORDER BY seq DESC LIMIT 1 OFFSET ?4
                 )",
                params![message.chat_id.0, message.topic, seq, keep],
            )?;

            if let Some(cutoff) = age_cutoff {
                tx.execute(
                    "DELETE FROM messages
                     WHERE chat_id = ?1 AND topic = ?2 AND seq <> ?3 AND created_at < ?4",
                    params![message.chat_id.0, message.topic, seq, cutoff],
                )?;
            }
            tx.commit()?;

            Ok(StoredMessage {
                seq,
                chat_id: message.chat_id,
                topic: message.topic,
                role: message.role,
                content: message.content,
                agent: message.agent,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` most recent messages, returned oldest first.
///
/// `topic = None` spans every topic of the chat.
pub async fn get_history(
    db: &Database,
    chat_id: ChatId,
    topic: Option<&str>,
    limit: usize,
) -> Result<Vec<StoredMessage>, ParleyError> {
    let topic = topic.map(str::to_string);
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut messages = match &topic {
                Some(topic) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM messages
                         WHERE chat_id = ?1 AND topic = ?2
                         ORDER BY seq DESC LIMIT ?3"
                    ))?;
                    let rows = stmt.query_map(params![chat_id.0, topic, limit], row_to_message)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM messages
                         WHERE chat_id = ?1
                         ORDER BY seq DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![chat_id.0, limit], row_to_message)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
            };
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of stored messages in one thread.
pub async fn count_messages(db: &Database, chat_id: ChatId, topic: &str) -> Result<usize, ParleyError> {
    let topic = topic.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE chat_id = ?1 AND topic = ?2",
                params![chat_id.0, topic],
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0) as usize)
        .map_err(map_tr_err)
}

/// Case-insensitive substring search across all topics of a chat, newest first.
///
/// SQLite's `lower` and `LIKE` only fold ASCII, so rows are scanned newest
/// first and matched with Unicode lowercasing until `limit` hits are found.
pub async fn search_messages(
    db: &Database,
    chat_id: ChatId,
    keyword: &str,
    limit: usize,
) -> Result<Vec<StoredMessage>, ParleyError> {
    let needle = keyword.to_lowercase();
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM messages
                 WHERE chat_id = ?1
                 ORDER BY seq DESC"
            ))?;
            let mut rows = stmt.query_map(params![chat_id.0], row_to_message)?;
            let mut hits = Vec::new();
            while hits.len() < limit {
                let Some(message) = rows.next().transpose()? else {
                    break;
                };
                if message.content.to_lowercase().contains(&needle) {
                    hits.push(message);
                }
            }
            Ok(hits)
        })
        .await
        .map_err(map_tr_err)
}

/// One row per `(chat_id, topic)`, most recently active first.
pub async fn list_threads(
    db: &Database,
    chat_id: Option<ChatId>,
) -> Result<Vec<ThreadSummary>, ParleyError> {
    db.connection()
        .call(move |conn| -> Result<Vec<ThreadSummary>, rusqlite::Error> {
            let map = |row: &Row<'_>| -> Result<ThreadSummary, rusqlite::Error> {
                Ok(ThreadSummary {
                    chat_id: ChatId(row.get(0)?),
                    topic: row.get(1)?,
                    message_count: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            };
            let base = "SELECT chat_id, topic, COUNT(*), MAX(created_at) FROM messages";
            let tail = "GROUP BY chat_id, topic ORDER BY MAX(seq) DESC";
            match chat_id {
                Some(chat_id) => {
                    let mut stmt = conn.prepare(&format!("{base} WHERE chat_id = ?1 {tail}"))?;
                    let rows = stmt.query_map(params![chat_id.0], map)?;
                    rows.collect()
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{base} {tail}"))?;
                    let rows = stmt.query_map([], map)?;
                    rows.collect()
                }
            }
        })
        .await
        .map_err(map_tr_err)
}
