// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing for inbound chat messages.
//!
//! This crate provides:
//! - [`CommandRouter`]: ordered, pattern-based classification into [`Command`]s
//! - [`ProfileResolver`]: three-tier resolution of the session profile
//! - [`RateLimiter`]: minimum spacing between completion calls per thread

pub mod command;
pub mod limiter;
pub mod profile;

pub use command::{Command, CommandRouter, Intent, Overrides};
pub use limiter::RateLimiter;
pub use profile::ProfileResolver;
