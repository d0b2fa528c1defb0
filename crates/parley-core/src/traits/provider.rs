// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the chat-completion endpoint.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// A single completion call, no retries.
///
/// Implementations report HTTP failures as [`ParleyError::Provider`] with the
/// status set, and transport timeouts as [`ParleyError::Timeout`], so that the
/// gateway can classify them.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// True when a usable credential is configured.
    fn is_enabled(&self) -> bool;

    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError>;
}
