// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model discovery by probing the completion endpoint.
//!
//! Each seed id is tried with a one-token request; ids that answer are kept.
//! Probes are not user completions and write no usage records.

use std::time::Duration;

use parley_core::types::{ModelInfo, ProviderMessage, ProviderRequest, Role};
use parley_core::{ParleyError, ProviderAdapter};
use tracing::{debug, info};

const PROBE_PROMPT: &str = "ping";

/// Returns the subset of `seeds` that the endpoint accepts, in seed order.
///
/// Errors from individual probes are swallowed; an empty result means nothing
/// answered. Fails only when the provider is disabled.
pub async fn discover_models(
    provider: &dyn ProviderAdapter,
    seeds: &[String],
    probe_timeout: Duration,
) -> Result<Vec<ModelInfo>, ParleyError> {
    if !provider.is_enabled() {
        return Err(ParleyError::Disabled);
    }

    let mut found = Vec::new();
    for id in seeds.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if found.iter().any(|m: &ModelInfo| m.id == id) {
            continue;
        }
        let request = ProviderRequest {
            model: id.to_string(),
            system_prompt: None,
            messages: vec![ProviderMessage {
                role: Role::User,
                content: PROBE_PROMPT.to_string(),
            }],
            max_tokens: 1,
        };
        match tokio::time::timeout(probe_timeout, provider.complete(request)).await {
            Ok(Ok(_)) => {
                debug!(model = id, "model probe succeeded");
                found.push(ModelInfo::new(id));
            }
            Ok(Err(e)) => debug!(model = id, error = %e, "model probe failed"),
            Err(_) => debug!(model = id, ?probe_timeout, "model probe timed out"),
        }
    }

    info!(probed = seeds.len(), available = found.len(), "model discovery finished");
    Ok(found)
}
