// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite conversation store for the Parley chat bridge.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations over the
//! message log, per-thread key/value state, and the update-offset watermark.

pub mod adapter;
pub mod continuation;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use queries::messages::Retention;
