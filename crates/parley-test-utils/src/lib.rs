// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a chat service or a completion endpoint.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted completion endpoint with call counting
//! - [`MockChannel`] - scripted update batches and captured replies
//! - [`TestHarness`] - the full bridge on a temp database and a manual clock

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::{MockChannel, document_update, text_update};
pub use mock_provider::{MockOutcome, MockProvider};
