// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread minimum spacing between completion calls.
//!
//! Independent of the retry backoff inside the gateway. State lives only for
//! the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_core::{Clock, ThreadKey};
use tokio::sync::Mutex;
use tracing::debug;

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_call: Mutex<HashMap<ThreadKey, Instant>>,
}

impl RateLimiter {
    /// A zero `min_interval` disables waiting.
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            min_interval,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until `min_interval` has passed since the last call for `key`,
    /// then records the current time as that key's last call.
    ///
    /// Returns how long the caller was suspended.
    pub async fn acquire(&self, key: &ThreadKey) -> Duration {
        let wait = self.pending_wait(key).await;
        if !wait.is_zero() {
            debug!(thread = %key, wait_ms = wait.as_millis() as u64, "rate limiting completion call");
            self.clock.sleep(wait).await;
        }
        let now = self.clock.now();
        self.last_call.lock().await.insert(key.clone(), now);
        wait
    }

    /// Remaining delay before `key` may call again, without waiting.
    pub async fn pending_wait(&self, key: &ThreadKey) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }
        let last_call = self.last_call.lock().await;
        match last_call.get(key) {
            Some(last) => {
                let elapsed = self.clock.now().saturating_duration_since(*last);
                self.min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Number of keys seen so far.
    pub async fn tracked(&self) -> usize {
        self.last_call.lock().await.len()
    }
}
