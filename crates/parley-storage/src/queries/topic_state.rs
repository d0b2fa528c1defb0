// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread key/value state. Last write wins; no history is kept.

use parley_core::types::{ChatId, StateKey};
use parley_core::ParleyError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn get_state(
    db: &Database,
    chat_id: ChatId,
    topic: &str,
    key: StateKey,
) -> Result<Option<String>, ParleyError> {
    let topic = topic.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM topic_state WHERE chat_id = ?1 AND topic = ?2 AND key = ?3",
                params![chat_id.0, topic, key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_state(
    db: &Database,
    chat_id: ChatId,
    topic: &str,
    key: StateKey,
    value: &str,
) -> Result<(), ParleyError> {
    let topic = topic.to_string();
    let key = key.to_string();
    let value = value.to_string();
    let now = super::now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO topic_state (chat_id, topic, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (chat_id, topic, key)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![chat_id.0, topic, key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
