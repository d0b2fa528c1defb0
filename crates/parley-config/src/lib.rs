// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Parley chat bridge.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `PARLEY_*` environment variable overrides, and
//! diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use parley_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Default topic: {}", config.agent.default_topic);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ParleyConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted into diagnostics with source spans and typo
/// suggestions; semantic errors come from [`validation::validate_config`].
pub fn load_and_validate() -> Result<ParleyConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ParleyConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ParleyConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

fn finish(
    loaded: Result<ParleyConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<ParleyConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG_PATH))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG_PATH.into());

    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG_PATH.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
