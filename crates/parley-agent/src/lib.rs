// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge loop for the Parley chat bridge.
//!
//! The [`Bridge`] is the central coordinator that:
//! - Long-polls the chat transport one batch at a time
//! - Handles every update of a batch to completion, in order
//! - Persists the update offset after each batch
//! - Converts any per-update failure into a message for the user
//! - Stops after the batch in flight when cancelled

pub mod dispatch;
pub mod documents;
pub mod format;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use parley_completion::{CompletionGateway, ModelCatalog};
use parley_config::ParleyConfig;
use parley_core::types::{ChatId, InboundMessage, Update};
use parley_core::{ChannelAdapter, Clock, DocumentIngestor, ParleyError, StorageAdapter};
use parley_router::{CommandRouter, ProfileResolver, RateLimiter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use documents::LocalDocumentIngestor;
pub use shutdown::install_signal_handler;

/// Sequential chat-to-model bridge.
pub struct Bridge {
    channel: Arc<dyn ChannelAdapter>,
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<CompletionGateway>,
    catalog: Arc<ModelCatalog>,
    ingestor: Arc<dyn DocumentIngestor>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    router: CommandRouter,
    resolver: ProfileResolver,
    config: ParleyConfig,
}

impl Bridge {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<CompletionGateway>,
        catalog: Arc<ModelCatalog>,
        ingestor: Arc<dyn DocumentIngestor>,
        clock: Arc<dyn Clock>,
        config: ParleyConfig,
    ) -> Self {
        let limiter = RateLimiter::new(config.rate_limit.min_interval(), clock.clone());
        info!(
            bridge = config.agent.name.as_str(),
            gateway_enabled = gateway.is_enabled(),
            "bridge initialized"
        );
        Self {
            channel,
            storage,
            gateway,
            catalog,
            ingestor,
            clock,
            limiter,
            router: CommandRouter::new(),
            resolver: ProfileResolver::new(),
            config,
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    /// Runs the poll loop until `cancel` fires.
    ///
    /// Transport errors are logged and the loop waits one poll interval before
    /// trying again. A cancellation never interrupts a batch.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ParleyError> {
        let poll_interval = Duration::from_millis(self.config.agent.poll_interval_ms);
        let mut offset = self.storage.get_offset().await?;
        info!(offset, "bridge loop running");

        while !cancel.is_cancelled() {
            let fetch_from = (offset > 0).then_some(offset + 1);
            let fetched = tokio::select! {
                fetched = self.channel.fetch_updates(fetch_from) => fetched,
                _ = cancel.cancelled() => break,
            };

            match fetched {
                Ok(updates) if !updates.is_empty() => {
                    let highest = updates.iter().map(|u| u.update_id).max().unwrap_or(offset);
                    match self.process_batch(updates).await {
                        Ok(stored) => offset = stored,
                        Err(e) => {
                            error!(error = %e, "failed to persist update offset");
                            offset = offset.max(highest);
                        }
                    }
                    continue;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to fetch updates"),
            }

            tokio::select! {
                _ = self.clock.sleep(poll_interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!(offset, "shutdown signal received, stopping bridge loop");
        self.storage.close().await?;
        info!("bridge loop stopped");
        Ok(())
    }

    /// Handles every update in order, then persists the highest update id.
    ///
    /// Returns the offset in effect afterwards. Only a failure to persist the
    /// offset is returned as an error.
    pub async fn process_batch(&self, updates: Vec<Update>) -> Result<i64, ParleyError> {
        let mut highest = None;
        for update in updates {
            let update_id = update.update_id;
            self.handle_update(update).await;
            highest = highest.max(Some(update_id));
        }

        match highest {
            Some(id) => {
                let stored = self.storage.set_offset(id).await?;
                debug!(offset = stored, "offset persisted");
                Ok(stored)
            }
            None => self.storage.get_offset().await,
        }
    }

    /// Processes one update to completion. Never fails: errors become a reply.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "update carries no message");
            return;
        };
        let chat_id = message.chat_id;

        let allowed = &self.config.telegram.allowed_chats;
        if !allowed.is_empty() && !allowed.contains(&chat_id.0) {
            debug!(chat_id = chat_id.0, "ignoring message from chat that is not allowed");
            return;
        }

        let reply = match self.handle_message(message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                log_failure(chat_id, &e);
                format::user_error(&e)
            }
        };

        if let Err(e) = self.channel.send_message(chat_id, &reply).await {
            error!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }

    /// Returns the reply text for one inbound message, or `None` when there is nothing to say.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<Option<String>, ParleyError> {
        let chat_id = message.chat_id;
        let text = message
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        // A failed attachment is reported inline; the caption is still handled.
        let mut replies = Vec::new();
        if let Some(document) = &message.document {
            match self.attach_document(chat_id, document).await {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    log_failure(chat_id, &e);
                    replies.push(format::user_error(&e));
                }
            }
        }
        if let Some(text) = text {
            debug!(chat_id = chat_id.0, sender = ?message.sender, "handling message");
            let outcome = match self.router.classify(text) {
                Ok(command) => self.dispatch(chat_id, command).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(reply) => replies.push(reply),
                Err(e) if replies.is_empty() => return Err(e),
                Err(e) => {
                    log_failure(chat_id, &e);
                    replies.push(format::user_error(&e));
                }
            }
        }

        Ok((!replies.is_empty()).then(|| replies.join("\n\n")))
    }
}

fn log_failure(chat_id: ChatId, err: &ParleyError) {
    if err.is_storage() {
        error!(chat_id = chat_id.0, error = %err, "store write failed while handling update");
    } else {
        warn!(chat_id = chat_id.0, error = %err, "failed to handle update");
    }
}
