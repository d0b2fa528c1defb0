// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use parley_core::ParleyError;
use tracing::debug;

use crate::migrations;

/// Handle to the conversation database. Wraps the single writer connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and runs
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ParleyError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ParleyError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(ParleyError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(ParleyError::storage)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, ParleyError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(ParleyError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), ParleyError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch(
                        "PRAGMA journal_mode = WAL;
                         PRAGMA synchronous = NORMAL;",
                    )?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(migrations::run_migrations)
            .await
            .map_err(ParleyError::storage)?;
        Ok(())
    }

    /// The underlying connection. Query modules go through `call()` on it.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), ParleyError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(ParleyError::storage)
    }
}

/// Truncating WAL checkpoint. A no-op on databases not in WAL mode.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), ParleyError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}

/// Convert a tokio-rusqlite error into `ParleyError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/parley.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' \
                     AND name IN ('messages', 'topic_state', 'bridge_meta') ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["bridge_meta", "messages", "topic_state"]);
        assert!(path.exists());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_enabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }
}
