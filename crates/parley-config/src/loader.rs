// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./parley.toml` > `~/.config/parley/parley.toml` > `/etc/parley/parley.toml`
//! with environment variable overrides via `PARLEY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParleyConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/parley/parley.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "parley.toml";

/// Config sections addressable from `PARLEY_<SECTION>_<KEY>` variables.
/// Longer names first so that `rate_limit_` wins over any shorter prefix.
const ENV_SECTIONS: &[&str] = &[
    "rate_limit",
    "completion",
    "documents",
    "telegram",
    "storage",
    "agent",
    "retry",
    "cost",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml` (system-wide)
/// 3. `~/.config/parley/parley.toml` (user XDG config)
/// 4. `./parley.toml` (local directory)
/// 5. `PARLEY_*` environment variables
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config file specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading config file");
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `~/.config/parley/parley.toml`, when the platform has a config dir.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parley/parley.toml"))
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Only the section prefix is split off, so `PARLEY_TELEGRAM_BOT_TOKEN` maps to
/// `telegram.bot_token` and `PARLEY_RATE_LIMIT_MIN_INTERVAL_MS` maps to
/// `rate_limit.min_interval_ms`.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
