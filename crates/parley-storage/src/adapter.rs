// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::types::{
    ChatId, ContinuationContext, HistoryQuery, Role, StateKey, StoredMessage, ThreadDefaults,
    ThreadSummary,
};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, StorageAdapter};

use crate::continuation::{DIGEST_LINES, build_summary};
use crate::database::{self, Database};
use crate::queries;
use crate::queries::messages::{NewMessage, Retention};

/// SQLite-backed conversation store.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`];
/// every other operation fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    defaults: ThreadDefaults,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig, defaults: ThreadDefaults) -> Self {
        Self {
            config,
            defaults,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db
            .get()
            .ok_or_else(|| ParleyError::storage("storage not initialized -- call initialize() first"))
    }

    fn retention(&self) -> Retention {
        Retention {
            max_messages: self.config.max_messages_per_thread,
            max_age_days: self.config.max_message_age_days,
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            database::checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ParleyError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        database::checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    fn defaults(&self) -> &ThreadDefaults {
        &self.defaults
    }

    async fn append(
        &self,
        chat_id: ChatId,
        topic: &str,
        role: Role,
        content: &str,
        agent: &str,
    ) -> Result<StoredMessage, ParleyError> {
        let message = NewMessage {
            chat_id,
            topic: topic.to_string(),
            role,
            content: content.to_string(),
            agent: agent.to_string(),
        };
        queries::messages::append_message(self.db()?, message, self.retention()).await
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<StoredMessage>, ParleyError> {
        queries::messages::get_history(
            self.db()?,
            query.chat_id,
            query.topic.as_deref(),
            query.limit,
        )
        .await
    }

    async fn search(
        &self,
        chat_id: ChatId,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, ParleyError> {
        queries::messages::search_messages(self.db()?, chat_id, keyword, limit).await
    }

    async fn list_threads(&self, chat_id: Option<ChatId>) -> Result<Vec<ThreadSummary>, ParleyError> {
        queries::messages::list_threads(self.db()?, chat_id).await
    }

    async fn continue_context(
        &self,
        chat_id: ChatId,
        topic: &str,
        limit: usize,
    ) -> Result<ContinuationContext, ParleyError> {
        let db = self.db()?;
        let agent = self.get_selected_agent(chat_id, topic).await?;
        let model_id = self.get_selected_model(chat_id, topic).await?;

        let total = queries::messages::count_messages(db, chat_id, topic).await?;
        let mut older = queries::messages::get_history(
            db,
            chat_id,
            Some(topic),
            limit.saturating_add(DIGEST_LINES),
        )
        .await?;
        let messages = older.split_off(older.len().saturating_sub(limit));
        let compacted = total.saturating_sub(messages.len());
        let summary = build_summary(topic, &agent, &model_id, compacted, &older);

        Ok(ContinuationContext {
            chat_id,
            topic: topic.to_string(),
            agent,
            model_id,
            messages,
            summary,
            compacted,
        })
    }

    async fn get_topic_state(
        &self,
        chat_id: ChatId,
        topic: &str,
        key: StateKey,
    ) -> Result<Option<String>, ParleyError> {
        queries::topic_state::get_state(self.db()?, chat_id, topic, key).await
    }

    async fn set_topic_state(
        &self,
        chat_id: ChatId,
        topic: &str,
        key: StateKey,
        value: &str,
    ) -> Result<(), ParleyError> {
        queries::topic_state::set_state(self.db()?, chat_id, topic, key, value).await
    }

    async fn get_offset(&self) -> Result<i64, ParleyError> {
        queries::offset::get_offset(self.db()?).await
    }

    async fn set_offset(&self, offset: i64) -> Result<i64, ParleyError> {
        queries::offset::set_offset(self.db()?, offset).await
    }
}
