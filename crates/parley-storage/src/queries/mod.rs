// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs on the
//! connection's background thread.

pub mod messages;
pub mod offset;
pub mod topic_state;

/// ISO 8601 UTC timestamp with millisecond precision; sorts lexically.
pub(crate) fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

pub(crate) fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
