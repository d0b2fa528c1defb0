// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits completion failures into retryable and terminal ones.

use parley_core::{FailureKind, ParleyError};

/// Returns the terminal failure class of `err`, or `None` when a retry may succeed.
///
/// Timeouts, rate limiting (429), server errors (5xx), and transport failures
/// without a status are retryable. Auth refusals, unknown models, context
/// overflows and other malformed requests are not.
pub fn classify(err: &ParleyError) -> Option<FailureKind> {
    match err {
        ParleyError::NonRetryable { kind, .. } => Some(*kind),
        ParleyError::Disabled => Some(FailureKind::Auth),
        ParleyError::Config(_) | ParleyError::Validation(_) => Some(FailureKind::InvalidRequest),
        ParleyError::Provider {
            message, status, ..
        } => classify_provider(message, *status),
        ParleyError::Timeout { .. }
        | ParleyError::RetriesExhausted { .. }
        | ParleyError::Storage { .. }
        | ParleyError::Channel { .. }
        | ParleyError::Internal(_) => None,
    }
}

fn classify_provider(message: &str, status: Option<u16>) -> Option<FailureKind> {
    let status = status?;
    // Body text only refines client errors; 429 and 5xx stay retryable whatever they say.
    if (400..500).contains(&status) && status != 429 {
        let lower = message.to_lowercase();
        if lower.contains("context_length") || lower.contains("maximum context length") {
            return Some(FailureKind::ContextLength);
        }
        if lower.contains("model_not_found") || lower.contains("does not exist") {
            return Some(FailureKind::UnknownModel);
        }
    }
    match status {
        401 | 403 => Some(FailureKind::Auth),
        404 => Some(FailureKind::UnknownModel),
        400 | 413 | 422 => Some(FailureKind::InvalidRequest),
        _ => None,
    }
}
