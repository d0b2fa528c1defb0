// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting for the Parley chat bridge.
//!
//! This crate provides:
//! - **Usage log**: append-only JSON lines record of every completion outcome
//! - **Pricing**: per-million-token cost calculation and the character-based
//!   token estimate used when the endpoint reports no usage

pub mod pricing;
pub mod usage;

pub use pricing::{ModelPricing, calculate_cost, estimate_tokens, estimate_usage};
pub use usage::{CallLabels, UsageLog, UsageRecord, UsageStatus};
