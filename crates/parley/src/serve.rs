// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Wires the Telegram transport, the SQLite conversation store, the
//! OpenAI-compatible completion provider, the usage log and the model catalog
//! into a [`Bridge`] and runs it until SIGINT or SIGTERM.

use std::sync::Arc;

use parley_agent::{Bridge, LocalDocumentIngestor, install_signal_handler};
use parley_completion::{CompletionGateway, ModelCatalog, OpenAiCompatProvider};
use parley_config::ParleyConfig;
use parley_core::{
    Clock, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter, StorageAdapter, SystemClock,
};
use parley_cost::UsageLog;
use parley_storage::SqliteStorage;
use parley_telegram::TelegramChannel;
use tracing::{error, info, warn};

/// Runs the `parley serve` command.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    info!(name = %config.agent.name, "starting parley serve");

    let storage = SqliteStorage::new(config.storage.clone(), config.thread_defaults());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let channel = TelegramChannel::new(config.telegram.clone()).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram channel");
        eprintln!(
            "error: Telegram bot token required. Set telegram.bot_token in parley.toml or PARLEY_TELEGRAM_BOT_TOKEN."
        );
        e
    })?;
    report_health(&channel).await;

    let provider = OpenAiCompatProvider::new(&config.completion)?;
    if !provider.is_enabled() {
        warn!("no completion credential configured; messages will be saved without auto-replies");
    }
    let provider = Arc::new(provider);

    let usage_log = Arc::new(UsageLog::open(&config.cost.usage_log_path)?);
    let catalog = Arc::new(
        ModelCatalog::load_or_seed(
            &config.completion.model_catalog_path,
            &config.completion.catalog_seeds(),
        )
        .await?,
    );
    info!(models = catalog.list().len(), "model catalog ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway = Arc::new(CompletionGateway::from_config(
        &config,
        provider,
        clock.clone(),
        usage_log,
    ));
    let ingestor = Arc::new(LocalDocumentIngestor::new(&config.documents));

    let bridge = Bridge::new(
        Arc::new(channel),
        storage,
        gateway,
        catalog,
        ingestor,
        clock,
        config,
    );

    let cancel = install_signal_handler();
    bridge.run(cancel).await?;

    info!("parley serve stopped");
    Ok(())
}

/// A failing health check is logged; the poll loop retries the transport anyway.
async fn report_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter unhealthy")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "adapter health check failed"),
    }
}
