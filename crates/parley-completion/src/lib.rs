// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion side of the Parley chat bridge.
//!
//! - [`client`]: HTTP client for an OpenAI-compatible chat completions endpoint
//! - [`provider`]: [`parley_core::ProviderAdapter`] over that client
//! - [`gateway`]: retry, budget, and usage accounting around any provider
//! - [`catalog`]: persisted list of selectable models
//! - [`discovery`]: probing the endpoint to refresh the catalog

pub mod catalog;
pub mod classify;
pub mod client;
pub mod discovery;
pub mod gateway;
pub mod provider;
pub mod types;

pub use catalog::ModelCatalog;
pub use classify::classify;
pub use client::OpenAiCompatClient;
pub use discovery::discover_models;
pub use gateway::{CompletionGateway, GeneratedReply, ReplyRequest, RetryPolicy, render_continuation};
pub use provider::OpenAiCompatProvider;
