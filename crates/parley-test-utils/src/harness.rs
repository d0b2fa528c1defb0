// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end bridge testing.
//!
//! `TestHarness` assembles a complete [`Bridge`] over a temp SQLite database,
//! a temp usage log and model catalog, a [`MockChannel`], a [`MockProvider`]
//! and a [`ManualClock`]. Nothing in the stack touches the network or sleeps
//! in real time.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::{Bridge, LocalDocumentIngestor};
use parley_completion::{CompletionGateway, ModelCatalog};
use parley_config::ParleyConfig;
use parley_core::types::InboundMessage;
use parley_core::{ChatId, ManualClock, ParleyError, StorageAdapter};
use parley_cost::{UsageLog, UsageRecord};
use parley_storage::SqliteStorage;

use crate::mock_channel::MockChannel;
use crate::mock_provider::{MockOutcome, MockProvider};

/// Builder for test environments.
pub struct TestHarnessBuilder {
    outcomes: Vec<MockOutcome>,
    fallback: Option<MockOutcome>,
    latency: Option<Duration>,
    disabled: bool,
    configure: Vec<Box<dyn FnOnce(&mut ParleyConfig) + Send>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            fallback: None,
            latency: None,
            disabled: false,
            configure: Vec::new(),
        }
    }

    /// Successful replies returned in order.
    pub fn with_responses(mut self, responses: Vec<&str>) -> Self {
        self.outcomes = responses.into_iter().map(MockOutcome::reply).collect();
        self
    }

    /// Scripted endpoint outcomes returned in order.
    pub fn with_outcomes(mut self, outcomes: Vec<MockOutcome>) -> Self {
        self.outcomes = outcomes;
        self
    }

    /// Outcome once the script is exhausted.
    pub fn otherwise(mut self, outcome: MockOutcome) -> Self {
        self.fallback = Some(outcome);
        self
    }

    /// Every endpoint call advances the manual clock by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// No completion credential configured.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Adjusts the configuration before the stack is built. File paths are
    /// pointed into the temp directory afterwards.
    pub fn with_config(mut self, f: impl FnOnce(&mut ParleyConfig) + Send + 'static) -> Self {
        self.configure.push(Box::new(f));
        self
    }

    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir = tempfile::TempDir::new().map_err(ParleyError::storage)?;
        let path = |name: &str| temp_dir.path().join(name).to_string_lossy().into_owned();

        let mut config = ParleyConfig::default();
        for f in self.configure {
            f(&mut config);
        }
        config.storage.database_path = path("parley.db");
        config.cost.usage_log_path = path("usage.jsonl");
        config.completion.model_catalog_path = path("models.json");
        config.documents.storage_dir = path("documents");

        let clock = Arc::new(ManualClock::new());

        let storage = SqliteStorage::new(config.storage.clone(), config.thread_defaults());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let usage = Arc::new(UsageLog::open(&config.cost.usage_log_path)?);

        let catalog = Arc::new(
            ModelCatalog::load_or_seed(
                &config.completion.model_catalog_path,
                &config.completion.catalog_seeds(),
            )
            .await?,
        );

        let mut provider = if self.disabled {
            MockProvider::disabled()
        } else {
            MockProvider::scripted(self.outcomes)
        };
        if let Some(fallback) = self.fallback {
            provider = provider.otherwise(fallback);
        }
        if let Some(latency) = self.latency {
            provider = provider.with_latency(clock.clone(), latency);
        }
        let provider = Arc::new(provider);

        let gateway = Arc::new(CompletionGateway::from_config(
            &config,
            provider.clone(),
            clock.clone(),
            usage.clone(),
        ));

        let channel = Arc::new(MockChannel::new());
        let ingestor = Arc::new(LocalDocumentIngestor::new(&config.documents));

        let bridge = Bridge::new(
            channel.clone(),
            storage.clone(),
            gateway,
            catalog.clone(),
            ingestor,
            clock.clone(),
            config.clone(),
        );

        Ok(TestHarness {
            bridge,
            storage,
            provider,
            channel,
            clock,
            usage,
            catalog,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete bridge with mock adapters and temp storage.
pub struct TestHarness {
    pub bridge: Bridge,
    pub storage: Arc<dyn StorageAdapter>,
    pub provider: Arc<MockProvider>,
    pub channel: Arc<MockChannel>,
    pub clock: Arc<ManualClock>,
    pub usage: Arc<UsageLog>,
    pub catalog: Arc<ModelCatalog>,
    pub config: ParleyConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Handles one text message and returns the bridge's reply, if any.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Option<String>, ParleyError> {
        self.bridge
            .handle_message(InboundMessage {
                chat_id: ChatId(chat_id),
                text: Some(text.to_string()),
                document: None,
                sender: Some("tester".to_string()),
            })
            .await
    }

    /// Like [`send_text`](Self::send_text) but panics on errors and missing replies.
    pub async fn reply(&self, chat_id: i64, text: &str) -> String {
        match self.send_text(chat_id, text).await {
            Ok(Some(reply)) => reply,
            Ok(None) => panic!("no reply to {text:?}"),
            Err(e) => panic!("{text:?} failed: {e}"),
        }
    }

    pub async fn usage_records(&self) -> Vec<UsageRecord> {
        self.usage.read_all().await.unwrap_or_default()
    }
}
