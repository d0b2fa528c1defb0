// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion gateway: prompt assembly, retry with exponential backoff under a
//! wall-clock budget, terminal-failure short-circuit, and usage accounting.
//!
//! One call to [`CompletionGateway::generate_reply`] is one attempt sequence.
//! It writes exactly one usage record when it ends, whatever the outcome,
//! except when the gateway is disabled and no attempt is made at all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::ParleyConfig;
use parley_config::model::RetryConfig;
use parley_core::types::{ContinuationContext, ProviderMessage, ProviderRequest, Role, TokenUsage};
use parley_core::{Clock, ParleyError, ProviderAdapter};
use parley_cost::{CallLabels, ModelPricing, UsageLog, UsageRecord, calculate_cost, estimate_usage};
use tracing::{debug, error, info, warn};

use crate::classify::classify;

/// Retry and budget settings for one attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub total_budget: Duration,
    /// No attempt or backoff may start with less than this left in the budget.
    pub safety_margin: Duration,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(retry: &RetryConfig, request_timeout: Duration) -> Self {
        Self {
            max_attempts: retry.max_retries.max(1),
            base_delay: retry.base_delay(),
            total_budget: retry.total_budget(),
            safety_margin: retry.safety_margin(),
            request_timeout,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Everything the gateway needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRequest {
    pub model_id: String,
    pub topic: String,
    pub agent: String,
    pub language: String,
    pub user_input: String,
    /// Rendered continuation (identity header, digest, recent turns).
    pub context_summary: String,
    /// Reference material such as the active document summary.
    pub extra_context: Option<String>,
}

/// A successful reply and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub text: String,
    pub attempts: u32,
    pub usage: TokenUsage,
    /// False when token counts were estimated from text length.
    pub usage_reported: bool,
}

pub struct CompletionGateway {
    provider: Arc<dyn ProviderAdapter>,
    clock: Arc<dyn Clock>,
    usage_log: Arc<UsageLog>,
    policy: RetryPolicy,
    pricing: ModelPricing,
    max_tokens: u32,
    personas: HashMap<String, String>,
}

impl CompletionGateway {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        clock: Arc<dyn Clock>,
        usage_log: Arc<UsageLog>,
        policy: RetryPolicy,
        pricing: ModelPricing,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            clock,
            usage_log,
            policy,
            pricing,
            max_tokens,
            personas: HashMap::new(),
        }
    }

    /// Builds the gateway from configuration; personas come from `[[agents]]`.
    pub fn from_config(
        config: &ParleyConfig,
        provider: Arc<dyn ProviderAdapter>,
        clock: Arc<dyn Clock>,
        usage_log: Arc<UsageLog>,
    ) -> Self {
        Self::new(
            provider,
            clock,
            usage_log,
            RetryPolicy::from_config(&config.retry, config.completion.request_timeout()),
            ModelPricing::from(&config.cost),
            config.completion.max_tokens,
        )
        .with_personas(
            config
                .agents
                .iter()
                .map(|a| (a.name.clone(), a.persona.clone())),
        )
    }

    pub fn with_personas(mut self, personas: impl IntoIterator<Item = (String, String)>) -> Self {
        self.personas.extend(personas);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_enabled()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider(&self) -> &Arc<dyn ProviderAdapter> {
        &self.provider
    }

    /// System instruction carrying the thread identity and the quality directive.
    pub fn system_prompt(&self, request: &ReplyRequest) -> String {
        let mut prompt = format!("You are {}, a conversational assistant.", request.agent);
        if let Some(persona) = self.personas.get(&request.agent)
            && !persona.trim().is_empty()
        {
            prompt.push(' ');
            prompt.push_str(persona.trim());
        }
        prompt.push_str(&format!(
            "\nConversation topic: {}.\nReply in the language with code `{}`.\n\
             Be accurate and specific. If you are unsure, say so instead of guessing.",
            request.topic, request.language
        ));
        prompt
    }

    /// User turn: continuation summary, optional reference material, then the raw input.
    pub fn user_turn(request: &ReplyRequest) -> String {
        let mut turn = String::new();
        if !request.context_summary.trim().is_empty() {
            turn.push_str("[Conversation so far]\n");
            turn.push_str(request.context_summary.trim());
            turn.push_str("\n\n");
        }
        if let Some(extra) = request.extra_context.as_deref()
            && !extra.trim().is_empty()
        {
            turn.push_str("[Reference material]\n");
            turn.push_str(extra.trim());
            turn.push_str("\n\n");
        }
        turn.push_str("[Message]\n");
        turn.push_str(&request.user_input);
        turn
    }

    /// Produces a reply for `request` under the retry policy.
    ///
    /// Returns `Disabled` without attempting anything when no credential is
    /// configured, `NonRetryable` as soon as a terminal failure is seen, and
    /// `RetriesExhausted` when attempts or budget run out.
    pub async fn generate_reply(&self, request: &ReplyRequest) -> Result<GeneratedReply, ParleyError> {
        if !self.is_enabled() {
            return Err(ParleyError::Disabled);
        }

        let labels = CallLabels {
            model_id: request.model_id.clone(),
            topic: request.topic.clone(),
            agent: request.agent.clone(),
        };
        let system_prompt = self.system_prompt(request);
        let user_turn = Self::user_turn(request);
        let provider_request = ProviderRequest {
            model: request.model_id.clone(),
            system_prompt: Some(system_prompt.clone()),
            messages: vec![ProviderMessage {
                role: Role::User,
                content: user_turn.clone(),
            }],
            max_tokens: self.max_tokens,
        };

        let started = self.clock.now();
        let mut attempt = 0u32;
        let last_error = loop {
            attempt += 1;
            let remaining = self.remaining(started);
            if attempt > 1 && remaining < self.policy.safety_margin {
                warn!(attempt, ?remaining, "retry budget exhausted before attempt");
                attempt -= 1;
                break None;
            }

            let per_attempt = self.policy.request_timeout.min(remaining);
            debug!(model = %request.model_id, attempt, ?per_attempt, "completion attempt");
            let outcome =
                match tokio::time::timeout(per_attempt, self.provider.complete(provider_request.clone()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ParleyError::Timeout {
                        duration: per_attempt,
                    }),
                };

            let err = match outcome {
                Ok(response) => {
                    let (usage, usage_reported) = match response.usage {
                        Some(usage) => (usage, true),
                        None => (
                            estimate_usage(&format!("{system_prompt}\n{user_turn}"), &response.content),
                            false,
                        ),
                    };
                    let cost = calculate_cost(&usage, &self.pricing);
                    let latency_ms = self.elapsed_ms(started);
                    self.write_usage(UsageRecord::success(
                        &labels, attempt, latency_ms, usage, cost, response.id,
                    ))
                    .await;
                    info!(
                        model = %request.model_id,
                        topic = %request.topic,
                        attempt,
                        latency_ms,
                        total_tokens = usage.total_tokens,
                        "completion succeeded"
                    );
                    return Ok(GeneratedReply {
                        text: response.content,
                        attempts: attempt,
                        usage,
                        usage_reported,
                    });
                }
                Err(err) => err,
            };

            if let Some(kind) = classify(&err) {
                warn!(attempt, %kind, error = %err, "terminal completion failure");
                let message = err.to_string();
                self.write_usage(UsageRecord::failure(
                    &labels,
                    attempt,
                    self.elapsed_ms(started),
                    message.clone(),
                ))
                .await;
                return Err(ParleyError::NonRetryable { kind, message });
            }

            if attempt >= self.policy.max_attempts {
                warn!(attempt, error = %err, "completion attempts exhausted");
                break Some(err);
            }

            let backoff = self.policy.backoff(attempt);
            let remaining = self.remaining(started);
            if remaining.saturating_sub(backoff) < self.policy.safety_margin {
                warn!(attempt, ?remaining, ?backoff, error = %err, "not enough budget left to retry");
                break Some(err);
            }
            warn!(attempt, ?backoff, error = %err, "retryable completion failure, backing off");
            self.clock.sleep(backoff).await;
        };

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "wall-clock budget exhausted".to_string());
        self.write_usage(UsageRecord::failure(
            &labels,
            attempt,
            self.elapsed_ms(started),
            last_error.clone(),
        ))
        .await;
        Err(ParleyError::RetriesExhausted {
            attempts: attempt,
            last_error,
        })
    }

    fn remaining(&self, started: Instant) -> Duration {
        let elapsed = self.clock.now().saturating_duration_since(started);
        self.policy.total_budget.saturating_sub(elapsed)
    }

    fn elapsed_ms(&self, started: Instant) -> u64 {
        let elapsed = self.clock.now().saturating_duration_since(started);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Usage records are observability only; a failed write is logged, never raised.
    async fn write_usage(&self, record: UsageRecord) {
        if let Err(e) = self.usage_log.record(&record).await {
            error!(error = %e, path = %self.usage_log.path().display(), "failed to write usage record");
        }
    }
}

/// Renders a continuation for the gateway: the digest followed by the recent
/// turns, skipping the message with sequence `exclude_seq` (the input itself).
pub fn render_continuation(ctx: &ContinuationContext, exclude_seq: Option<i64>) -> String {
    let mut rendered = ctx.summary.clone();
    let recent: Vec<_> = ctx
        .messages
        .iter()
        .filter(|m| Some(m.seq) != exclude_seq)
        .collect();
    if !recent.is_empty() {
        rendered.push_str("\nRecent messages:");
        for message in recent {
            rendered.push_str(&format!("\n{}: {}", message.role, message.content));
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use parley_core::types::{AdapterType, ChatId, HealthStatus, ProviderResponse, StoredMessage};
    use parley_core::{FailureKind, ManualClock, PluginAdapter};
    use parley_cost::UsageStatus;
    use tracing_test::traced_test;

    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Reply,
        ReplyWithoutUsage,
        Status(u16),
        Timeout,
    }

    /// Provider that plays back outcomes and advances a manual clock by a fixed latency per call.
    struct ScriptedProvider {
        clock: Arc<ManualClock>,
        latency: Duration,
        script: Mutex<VecDeque<Outcome>>,
        fallback: Outcome,
        calls: AtomicU32,
        enabled: bool,
    }

    impl ScriptedProvider {
        fn new(clock: Arc<ManualClock>, latency: Duration, script: Vec<Outcome>, fallback: Outcome) -> Self {
            Self {
                clock,
                latency,
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicU32::new(0),
                enabled: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
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
    impl ProviderAdapter for ScriptedProvider {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.clock.advance(self.latency);
            let outcome = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
            match outcome {
                Outcome::Reply | Outcome::ReplyWithoutUsage => Ok(ProviderResponse {
                    id: Some(format!("resp-{n}")),
                    content: "scripted reply".into(),
                    model: request.model,
                    usage: matches!(outcome, Outcome::Reply).then_some(TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                }),
                Outcome::Status(status) => Err(ParleyError::provider(
                    format!("API error {status}: scripted"),
                    Some(status),
                )),
                Outcome::Timeout => Err(ParleyError::Timeout {
                    duration: self.latency,
                }),
            }
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        provider: Arc<ScriptedProvider>,
        usage: Arc<UsageLog>,
        gateway: CompletionGateway,
        _dir: tempfile::TempDir,
    }

    fn fixture(policy: RetryPolicy, latency: Duration, script: Vec<Outcome>, fallback: Outcome) -> Fixture {
        fixture_with(policy, latency, script, fallback, true)
    }

    fn fixture_with(
        policy: RetryPolicy,
        latency: Duration,
        script: Vec<Outcome>,
        fallback: Outcome,
        enabled: bool,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let mut provider = ScriptedProvider::new(clock.clone(), latency, script, fallback);
        provider.enabled = enabled;
        let provider = Arc::new(provider);
        let usage = Arc::new(UsageLog::open(dir.path().join("usage.jsonl")).unwrap());
        let gateway = CompletionGateway::new(
            provider.clone(),
            clock.clone(),
            usage.clone(),
            policy,
            ModelPricing {
                input_per_mtok: 1.0,
                output_per_mtok: 2.0,
            },
            256,
        )
        .with_personas([("tutor".to_string(), "Explain step by step.".to_string())]);
        Fixture {
            clock,
            provider,
            usage,
            gateway,
            _dir: dir,
        }
    }

    fn request() -> ReplyRequest {
        ReplyRequest {
            model_id: "gpt-4o-mini".into(),
            topic: "rust".into(),
            agent: "tutor".into(),
            language: "en".into(),
            user_input: "explain lifetimes".into(),
            context_summary: "Thread: topic=rust agent=tutor model=gpt-4o-mini".into(),
            extra_context: None,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            total_budget: Duration::from_secs(60),
            safety_margin: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn backoff_doubles_from_base() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
        assert!(p.backoff(40) >= p.backoff(3));
    }

    #[test]
    fn policy_from_config_counts_total_attempts() {
        let retry = RetryConfig {
            max_retries: 3,
            ..RetryConfig::default()
        };
        let p = RetryPolicy::from_config(&retry, Duration::from_secs(30));
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn user_turn_embeds_summary_context_and_input() {
        let request = ReplyRequest {
            model_id: "m".into(),
            topic: "t".into(),
            agent: "a".into(),
            language: "en".into(),
            user_input: "what next?".into(),
            context_summary: "Thread: topic=t agent=a model=m".into(),
            extra_context: Some("Document: plan.md".into()),
        };
        let turn = CompletionGateway::user_turn(&request);
        let s = turn.find("Thread:").unwrap();
        let d = turn.find("Document:").unwrap();
        let m = turn.find("what next?").unwrap();
        assert!(s < d && d < m);

        let bare = ReplyRequest {
            extra_context: None,
            context_summary: String::new(),
            ..request
        };
        assert_eq!(CompletionGateway::user_turn(&bare), "[Message]\nwhat next?");
    }

    #[test]
    fn render_continuation_skips_excluded_message() {
        let msg = |seq: i64, role: Role, content: &str| StoredMessage {
            seq,
            chat_id: ChatId(1),
            topic: "t".into(),
            role,
            content: content.into(),
            agent: "a".into(),
            created_at: String::new(),
        };
        let ctx = ContinuationContext {
            chat_id: ChatId(1),
            topic: "t".into(),
            agent: "a".into(),
            model_id: "m".into(),
            messages: vec![
                msg(1, Role::User, "hi"),
                msg(2, Role::Assistant, "hello"),
                msg(3, Role::User, "current"),
            ],
            summary: "Thread: topic=t agent=a model=m".into(),
            compacted: 0,
        };
        let rendered = render_continuation(&ctx, Some(3));
        assert!(rendered.contains("user: hi"));
        assert!(rendered.contains("assistant: hello"));
        assert!(!rendered.contains("current"));
    }

    #[tokio::test]
    async fn always_timing_out_stops_at_max_attempts_within_budget() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            total_budget: Duration::from_secs(100),
            safety_margin: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        };
        let f = fixture(policy, Duration::from_secs(30), vec![], Outcome::Timeout);

        let err = f.gateway.generate_reply(&request()).await.unwrap_err();
        match err {
            ParleyError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(f.provider.calls(), 3);
        assert!(f.clock.elapsed() <= policy.total_budget);
        assert_eq!(f.clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);

        let records = f.usage.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, UsageStatus::Failure);
        assert_eq!(records[0].attempt, 3);
    }

    #[tokio::test]
    async fn budget_stops_retries_before_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(8),
            total_budget: Duration::from_secs(60),
            safety_margin: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        };
        let f = fixture(policy, Duration::from_secs(10), vec![], Outcome::Status(503));

        let err = f.gateway.generate_reply(&request()).await.unwrap_err();
        assert!(matches!(err, ParleyError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(f.provider.calls(), 3);
        assert_eq!(f.clock.sleeps(), vec![Duration::from_secs(8), Duration::from_secs(16)]);
        assert!(f.clock.elapsed() <= policy.total_budget);
        assert_eq!(f.usage.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let f = fixture(policy(), Duration::from_millis(100), vec![], Outcome::Status(403));

        let err = f.gateway.generate_reply(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            ParleyError::NonRetryable {
                kind: FailureKind::Auth,
                ..
            }
        ));
        assert_eq!(f.provider.calls(), 1);
        assert!(f.clock.sleeps().is_empty());

        let records = f.usage.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, UsageStatus::Failure);
        assert_eq!(records[0].attempt, 1);
        assert!(records[0].error.as_deref().unwrap().contains("403"));
    }

    #[tokio::test]
    #[traced_test]
    async fn transient_failure_then_success_records_one_success() {
        let f = fixture(
            policy(),
            Duration::from_millis(200),
            vec![Outcome::Status(503), Outcome::Status(429)],
            Outcome::Reply,
        );

        let reply = f.gateway.generate_reply(&request()).await.unwrap();
        assert_eq!(reply.text, "scripted reply");
        assert_eq!(reply.attempts, 3);
        assert!(reply.usage_reported);
        assert_eq!(reply.usage.total_tokens, 15);
        assert_eq!(f.clock.sleeps(), vec![Duration::from_millis(500), Duration::from_millis(1000)]);
        assert!(logs_contain("retryable completion failure"));
        assert!(logs_contain("completion succeeded"));

        let records = f.usage.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.status, UsageStatus::Success);
        assert_eq!(record.attempt, 3);
        assert_eq!(record.topic, "rust");
        assert_eq!(record.agent, "tutor");
        assert_eq!(record.request_id.as_deref(), Some("resp-3"));
        assert_eq!(record.latency_ms, 600 + 1500);
        assert!(record.estimated_cost_usd > 0.0);
    }

    #[tokio::test]
    async fn missing_usage_is_estimated_from_text() {
        let f = fixture(policy(), Duration::ZERO, vec![], Outcome::ReplyWithoutUsage);

        let reply = f.gateway.generate_reply(&request()).await.unwrap();
        assert!(!reply.usage_reported);
        assert!(reply.usage.prompt_tokens > 0);
        assert_eq!(reply.usage.completion_tokens, 4);
        assert_eq!(
            reply.usage.total_tokens,
            reply.usage.prompt_tokens + reply.usage.completion_tokens
        );
    }

    #[tokio::test]
    async fn disabled_gateway_makes_no_attempt_and_writes_nothing() {
        let f = fixture_with(policy(), Duration::ZERO, vec![], Outcome::Reply, false);

        let err = f.gateway.generate_reply(&request()).await.unwrap_err();
        assert!(matches!(err, ParleyError::Disabled));
        assert_eq!(f.provider.calls(), 0);
        assert!(f.usage.read_all().await.unwrap().is_empty());
    }

    #[test]
    fn system_prompt_carries_identity_and_persona() {
        let f = fixture(policy(), Duration::ZERO, vec![], Outcome::Reply);
        let prompt = f.gateway.system_prompt(&request());
        assert!(prompt.starts_with("You are tutor"));
        assert!(prompt.contains("Explain step by step."));
        assert!(prompt.contains("topic: rust"));
        assert!(prompt.contains("`en`"));
    }
}
