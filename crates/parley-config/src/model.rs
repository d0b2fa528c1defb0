// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley chat bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use parley_core::ThreadDefaults;
use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Bridge identity and session defaults.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Named agent personas selectable with `/agent`.
    #[serde(default)]
    pub agents: Vec<AgentSpecConfig>,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion endpoint settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Retry and wall-clock budget for completion calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Minimum spacing between completion calls per thread.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Conversation store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Usage log and pricing settings.
    #[serde(default)]
    pub cost: CostConfig,

    /// Uploaded document storage settings.
    #[serde(default)]
    pub documents: DocumentsConfig,
}

impl ParleyConfig {
    /// Fallbacks applied when a thread never set a profile field.
    pub fn thread_defaults(&self) -> ThreadDefaults {
        ThreadDefaults {
            topic: self.agent.default_topic.clone(),
            agent: self.agent.default_agent.clone(),
            model: self.completion.default_model.clone(),
            language: self.agent.default_language.clone(),
        }
    }

    /// Looks up an agent persona by name.
    pub fn agent_spec(&self, name: &str) -> Option<&AgentSpecConfig> {
        self.agents.iter().find(|a| a.name == name)
    }
}

/// Bridge identity and per-thread defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bridge.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Topic used by chats that never switched topics.
    #[serde(default = "default_topic")]
    pub default_topic: String,

    /// Agent used by threads that never switched agents.
    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Reply language used by threads that never selected one.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages accepted by `/lang`.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Pause between poll cycles after a transport error, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            default_topic: default_topic(),
            default_agent: default_agent(),
            default_language: default_language(),
            languages: default_languages(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_agent_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_topic() -> String {
    "general".to_string()
}

fn default_agent() -> String {
    "assistant".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "ko".to_string(), "ja".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    3000
}

/// A named agent persona.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSpecConfig {
    /// Unique agent name used in `/agent <name>`.
    pub name: String,

    /// Persona instruction embedded in the system prompt.
    #[serde(default)]
    pub persona: String,
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the Telegram transport.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat ids allowed to use the bridge. Empty allows every chat.
    #[serde(default)]
    pub allowed_chats: Vec<i64>,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_chats: Vec::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_poll_timeout_secs() -> u32 {
    30
}

/// Completion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Primary API key. `None` together with no fallback disables auto-replies.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Secondary API key tried when the primary one is refused.
    #[serde(default)]
    pub fallback_api_key: Option<String>,

    /// Chat-completions URL of an OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used by threads that never selected one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-attempt request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Path of the JSON model catalog.
    #[serde(default = "default_model_catalog_path")]
    pub model_catalog_path: String,

    /// Model ids used to seed the catalog and to drive discovery.
    #[serde(default = "default_seed_models")]
    pub seed_models: Vec<String>,
}

impl CompletionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Seed models followed by the default model, without duplicates.
    pub fn catalog_seeds(&self) -> Vec<String> {
        let mut seeds = self.seed_models.clone();
        if !seeds.contains(&self.default_model) {
            seeds.push(self.default_model.clone());
        }
        seeds
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            fallback_api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            model_catalog_path: default_model_catalog_path(),
            seed_models: default_seed_models(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_model_catalog_path() -> String {
    data_path("models.json")
}

fn default_seed_models() -> Vec<String> {
    vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()]
}

/// Retry policy for completion calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts allowed per reply, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff interval, doubled after every failed attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Wall-clock budget for the whole call including backoff, in seconds.
    #[serde(default = "default_total_budget_secs")]
    pub total_budget_secs: u64,

    /// Remaining budget below which no further attempt is started.
    #[serde(default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn total_budget(&self) -> Duration {
        Duration::from_secs(self.total_budget_secs)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            total_budget_secs: default_total_budget_secs(),
            safety_margin_ms: default_safety_margin_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_total_budget_secs() -> u64 {
    90
}

fn default_safety_margin_ms() -> u64 {
    2000
}

/// Per-thread throttling of completion calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Minimum interval between calls for the same thread. `0` disables waiting.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

fn default_min_interval_ms() -> u64 {
    1500
}

/// Conversation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Maximum messages kept per thread.
    #[serde(default = "default_max_messages_per_thread")]
    pub max_messages_per_thread: usize,

    /// Maximum message age in days. `0` keeps messages regardless of age.
    #[serde(default)]
    pub max_message_age_days: u32,

    /// Number of recent messages included verbatim in the continuation context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            max_messages_per_thread: default_max_messages_per_thread(),
            max_message_age_days: 0,
            context_window: default_context_window(),
        }
    }
}

fn default_database_path() -> String {
    data_path("parley.db")
}

fn default_wal_mode() -> bool {
    true
}

fn default_max_messages_per_thread() -> usize {
    500
}

fn default_context_window() -> usize {
    12
}

/// Usage accounting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostConfig {
    /// Append-only JSON lines usage log.
    #[serde(default = "default_usage_log_path")]
    pub usage_log_path: String,

    /// USD per million prompt tokens.
    #[serde(default)]
    pub input_price_per_mtok: f64,

    /// USD per million completion tokens.
    #[serde(default)]
    pub output_price_per_mtok: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            usage_log_path: default_usage_log_path(),
            input_price_per_mtok: 0.0,
            output_price_per_mtok: 0.0,
        }
    }
}

fn default_usage_log_path() -> String {
    data_path("usage.jsonl")
}

/// Uploaded document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentsConfig {
    /// Directory where uploaded documents are stored.
    #[serde(default = "default_documents_dir")]
    pub storage_dir: String,

    /// Characters of leading text kept as a document summary.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_documents_dir(),
            summary_chars: default_summary_chars(),
        }
    }
}

fn default_documents_dir() -> String {
    data_path("documents")
}

fn default_summary_chars() -> usize {
    600
}

/// Resolves a file name under the platform data directory (`~/.local/share/parley`).
fn data_path(file: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join(file))
        .unwrap_or_else(|| std::path::PathBuf::from(file))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_defaults_come_from_agent_and_completion() {
        let mut config = ParleyConfig::default();
        config.agent.default_topic = "inbox".into();
        config.completion.default_model = "gpt-x".into();

        let defaults = config.thread_defaults();
        assert_eq!(defaults.topic, "inbox");
        assert_eq!(defaults.agent, "assistant");
        assert_eq!(defaults.model, "gpt-x");
        assert_eq!(defaults.language, "en");
    }

    #[test]
    fn duration_helpers_convert_units() {
        let retry = RetryConfig::default();
        assert_eq!(retry.base_delay(), Duration::from_secs(1));
        assert_eq!(retry.total_budget(), Duration::from_secs(90));
        assert_eq!(retry.safety_margin(), Duration::from_secs(2));
        assert_eq!(
            RateLimitConfig::default().min_interval(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn catalog_seeds_include_default_model_once() {
        let mut completion = CompletionConfig::default();
        assert_eq!(completion.catalog_seeds(), vec!["gpt-4o-mini", "gpt-4o"]);

        completion.default_model = "local-llama".into();
        assert_eq!(
            completion.catalog_seeds(),
            vec!["gpt-4o-mini", "gpt-4o", "local-llama"]
        );
    }

    #[test]
    fn agent_spec_lookup() {
        let toml_str = r#"
[[agents]]
name = "coder"
persona = "You write Rust."
"#;
        let config: ParleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent_spec("coder").unwrap().persona, "You write Rust.");
        assert!(config.agent_spec("poet").is_none());
    }
}
