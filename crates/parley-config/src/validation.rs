// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the numeric bounds of the retry, rate limit and retention settings
//! and the cross-field constraints serde cannot express. All failures are
//! collected; validation does not stop at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_retry(config, &mut errors);
    validate_storage(config, &mut errors);
    validate_agents(config, &mut errors);

    if config.completion.default_model.trim().is_empty() {
        errors.push(ConfigError::validation(
            "completion.default_model must not be empty",
        ));
    }
    if config.completion.max_tokens == 0 {
        errors.push(ConfigError::validation(
            "completion.max_tokens must be at least 1",
        ));
    }

    for (name, price) in [
        ("cost.input_price_per_mtok", config.cost.input_price_per_mtok),
        ("cost.output_price_per_mtok", config.cost.output_price_per_mtok),
    ] {
        if price.is_nan() || price < 0.0 {
            errors.push(ConfigError::validation(format!(
                "{name} must be non-negative, got {price}"
            )));
        }
    }

    for (name, path) in [
        ("storage.database_path", &config.storage.database_path),
        ("cost.usage_log_path", &config.cost.usage_log_path),
        ("completion.model_catalog_path", &config.completion.model_catalog_path),
        ("documents.storage_dir", &config.documents.storage_dir),
    ] {
        if path.trim().is_empty() {
            errors.push(ConfigError::validation(format!("{name} must not be empty")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(config: &ParleyConfig, errors: &mut Vec<ConfigError>) {
    let retry = &config.retry;

    if !(1..=10).contains(&retry.max_retries) {
        errors.push(ConfigError::validation(format!(
            "retry.max_retries must be between 1 and 10, got {}",
            retry.max_retries
        )));
    }
    if retry.base_delay_ms == 0 {
        errors.push(ConfigError::validation(
            "retry.base_delay_ms must be greater than 0",
        ));
    }
    if config.completion.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "completion.request_timeout_secs must be greater than 0",
        ));
    }
    if retry.total_budget() < config.completion.request_timeout() {
        errors.push(ConfigError::validation(format!(
            "retry.total_budget_secs ({}) must be at least completion.request_timeout_secs ({})",
            retry.total_budget_secs, config.completion.request_timeout_secs
        )));
    }
    if retry.safety_margin() >= retry.total_budget() {
        errors.push(ConfigError::validation(format!(
            "retry.safety_margin_ms ({}) must be smaller than the total budget ({}s)",
            retry.safety_margin_ms, retry.total_budget_secs
        )));
    }
}

fn validate_storage(config: &ParleyConfig, errors: &mut Vec<ConfigError>) {
    if config.storage.max_messages_per_thread == 0 {
        errors.push(ConfigError::validation(
            "storage.max_messages_per_thread must be at least 1",
        ));
    }
    if config.storage.context_window == 0 {
        errors.push(ConfigError::validation(
            "storage.context_window must be at least 1",
        ));
    }
}

fn validate_agents(config: &ParleyConfig, errors: &mut Vec<ConfigError>) {
    let agent = &config.agent;

    if agent.default_topic.trim().is_empty() {
        errors.push(ConfigError::validation("agent.default_topic must not be empty"));
    }
    if !agent.languages.contains(&agent.default_language) {
        errors.push(ConfigError::validation(format!(
            "agent.default_language `{}` is not listed in agent.languages",
            agent.default_language
        )));
    }

    let mut seen_names = HashSet::new();
    for (i, spec) in config.agents.iter().enumerate() {
        if spec.name.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "agents[{i}].name must not be empty"
            )));
        } else if !seen_names.insert(spec.name.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate agent name `{}` in [[agents]] array",
                spec.name
            )));
        }
    }

    if !config.agents.is_empty() && config.agent_spec(&agent.default_agent).is_none() {
        errors.push(ConfigError::validation(format!(
            "agent.default_agent `{}` is not defined in [[agents]]",
            agent.default_agent
        )));
    }
}
