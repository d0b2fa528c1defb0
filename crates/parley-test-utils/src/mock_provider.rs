// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! `MockProvider` plays back a queue of [`MockOutcome`]s, then repeats a
//! fallback outcome. With a [`ManualClock`] attached, every call advances
//! simulated time by a fixed latency.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};
use parley_core::{ManualClock, ParleyError, PluginAdapter, ProviderAdapter};
use tokio::sync::Mutex;

/// What the mock endpoint does for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Success with reported usage of 10 prompt and 20 completion tokens.
    Reply(String),
    /// Success without usage, forcing the text-length estimate.
    ReplyWithoutUsage(String),
    /// HTTP failure with the given status.
    Fail { status: u16, message: String },
    /// The attempt timed out.
    Timeout,
}

impl MockOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    pub fn status(status: u16) -> Self {
        Self::Fail {
            status,
            message: format!("mock status {status}"),
        }
    }
}

pub struct MockProvider {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    calls: AtomicU32,
    requests: Mutex<Vec<ProviderRequest>>,
    enabled: bool,
    clock: Option<(Arc<ManualClock>, Duration)>,
}

impl MockProvider {
    /// Always answers "mock response".
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: MockOutcome::reply("mock response"),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            enabled: true,
            clock: None,
        }
    }

    /// Answers with `responses` in order, then with "mock response".
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockOutcome::Reply).collect())
    }

    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        let provider = Self::new();
        Self {
            script: Mutex::new(outcomes.into()),
            ..provider
        }
    }

    /// Outcome used once the script is exhausted.
    pub fn otherwise(mut self, outcome: MockOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// A provider without credentials; the gateway must not call it.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Advances `clock` by `latency` on every call.
    pub fn with_latency(mut self, clock: Arc<ManualClock>, latency: Duration) -> Self {
        self.clock = Some((clock, latency));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in call order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let latency = match &self.clock {
            Some((clock, latency)) => {
                clock.advance(*latency);
                *latency
            }
            None => Duration::ZERO,
        };

        match outcome {
            MockOutcome::Reply(content) => Ok(ProviderResponse {
                id: Some(format!("mock-resp-{n}")),
                content,
                model,
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 20,
                    total_tokens: 30,
                }),
            }),
            MockOutcome::ReplyWithoutUsage(content) => Ok(ProviderResponse {
                id: Some(format!("mock-resp-{n}")),
                content,
                model,
                usage: None,
            }),
            MockOutcome::Fail { status, message } => Err(ParleyError::provider(
                format!("API error {status}: {message}"),
                Some(status),
            )),
            MockOutcome::Timeout => Err(ParleyError::Timeout { duration: latency }),
        }
    }
}
