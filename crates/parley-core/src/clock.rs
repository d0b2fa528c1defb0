// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable monotonic clock and sleep.
//!
//! The rate limiter and the completion gateway never call `Instant::now()` or
//! `tokio::time::sleep` directly; they go through a [`Clock`] so that tests can
//! simulate elapsed time deterministically with [`ManualClock`].

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Source of monotonic time and cooperative suspension.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `std::time::Instant` and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Deterministic clock: `sleep` advances time instantly and is recorded.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Moves time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.lock().offset += by;
    }

    /// Total simulated time since construction.
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    /// Every duration passed to [`Clock::sleep`], in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().offset
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_sleep_advances_time() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(250)).await;
        clock.advance(Duration::from_millis(50));

        assert_eq!(clock.now() - start, Duration::from_millis(300));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn system_clock_zero_sleep_returns_immediately() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::ZERO).await;
        assert!(clock.now() >= start);
    }
}
