// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Deserialization failures become [`ConfigError`] diagnostics that point at
//! the offending key in the TOML source and, for misspelled keys, suggest the
//! closest valid key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(parley::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(parley::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(parley::config::missing_key),
        help("add `{key} = <value>` to your parley.toml")
    )]
    MissingKey { key: String },

    /// A value deserialized fine but violates a semantic bound.
    #[error("validation error: {message}")]
    #[diagnostic(code(parley::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(parley::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `toml_sources` pairs a source name with its content and is used to attach
/// source spans when the failing file can be identified.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let suggestion = suggest_key(field, expected);
                    let (span, src) = locate(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion,
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.clone().into_owned(),
                },
                Kind::InvalidType(actual, expected) => {
                    // The last path element is the key itself.
                    let (span, src) = match section.split_last() {
                        Some((field, parent)) => locate(&error, parent, field, toml_sources),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: section.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Resolve the TOML source an error came from and the span of `field` within it.
fn locate(
    error: &figment::error::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .map(|s| match s {
            figment::Source::File(path) => path.display().to_string(),
            _ => "<inline>".to_string(),
        });

    let source = origin
        .and_then(|name| toml_sources.iter().find(|(p, _)| *p == name))
        .or_else(|| match toml_sources {
            [only] => Some(only),
            _ => None,
        });

    if let Some((name, content)) = source
        && let Some(offset) = find_key_offset(content, section, field)
    {
        let span = SourceSpan::new(offset.into(), field.len());
        return (Some(span), Some(NamedSource::new(name, content.clone())));
    }

    (None, None)
}

/// Byte offset of `field` in TOML content, searched after the `[section]` header.
///
/// Top-level fields (empty `path`) are searched from the start of the content.
/// `[[section]]` array headers are matched as well.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = match path.first() {
        None => 0,
        Some(section) => {
            let table = format!("[{section}]");
            let array = format!("[[{section}]]");
            content
                .find(&array)
                .map(|pos| pos + array.len())
                .or_else(|| content.find(&table).map(|pos| pos + table.len()))?
        }
    };

    let mut line_start = search_start;
    for line in content[search_start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(line_start + (line.len() - trimmed.len()));
        }
        line_start += line.len();
    }

    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
