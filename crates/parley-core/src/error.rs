// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat bridge.

use strum::{Display, EnumString};
use thiserror::Error;

/// Failure classes that a completion retry can never fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The credential was rejected or lacks access to the requested model.
    Auth,
    /// The requested model does not exist on the endpoint.
    UnknownModel,
    /// The prompt exceeded the model's context window.
    ContextLength,
    /// The request itself was malformed.
    InvalidRequest,
}

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, numeric bounds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (unreachable API, bad payloads, download failures).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion endpoint errors. `status` carries the HTTP status when one was received.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// User input failed validation (unknown model, missing argument, ...).
    #[error("{0}")]
    Validation(String),

    /// A completion failure that retrying cannot fix.
    #[error("completion failed ({kind}): {message}")]
    NonRetryable { kind: FailureKind, message: String },

    /// Every allowed attempt failed, or the wall-clock budget ran out.
    #[error("completion failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The completion gateway has no usable credential.
    #[error("completion gateway is disabled (no credential configured)")]
    Disabled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wraps any error as a storage error.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ParleyError::Storage {
            source: source.into(),
        }
    }

    /// Builds a provider error without an underlying source.
    pub fn provider(message: impl Into<String>, status: Option<u16>) -> Self {
        ParleyError::Provider {
            message: message.into(),
            status,
            source: None,
        }
    }

    /// Builds a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        ParleyError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for storage-layer failures.
    pub fn is_storage(&self) -> bool {
        matches!(self, ParleyError::Storage { .. })
    }
}
