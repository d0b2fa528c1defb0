// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The update-offset watermark. Never moves backward.

use parley_core::ParleyError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

const OFFSET_KEY: &str = "update_offset";

/// Stored offset, `0` when never set.
pub async fn get_offset(db: &Database) -> Result<i64, ParleyError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM bridge_meta WHERE key = ?1",
                    params![OFFSET_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.unwrap_or(0))
        })
        .await
        .map_err(map_tr_err)
}

/// Stores `offset` unless a larger value is already stored. Returns the value in effect.
pub async fn set_offset(db: &Database, offset: i64) -> Result<i64, ParleyError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO bridge_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = MAX(value, excluded.value)",
                params![OFFSET_KEY, offset],
            )?;
            conn.query_row(
                "SELECT value FROM bridge_meta WHERE key = ?1",
                params![OFFSET_KEY],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn defaults_to_zero() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(get_offset(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lower_value_is_clamped() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(set_offset(&db, 10).await.unwrap(), 10);
        assert_eq!(set_offset(&db, 4).await.unwrap(), 10);
        assert_eq!(get_offset(&db).await.unwrap(), 10);
        assert_eq!(set_offset(&db, 11).await.unwrap(), 11);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn stored_offset_is_running_maximum(values in proptest::collection::vec(0i64..1_000, 1..12)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let db = Database::open_in_memory().await.unwrap();
                let mut expected = 0;
                for v in &values {
                    expected = expected.max(*v);
                    prop_assert_eq!(set_offset(&db, *v).await.unwrap(), expected);
                }
                prop_assert_eq!(get_offset(&db).await.unwrap(), expected);
                Ok(())
            })?;
        }
    }
}
