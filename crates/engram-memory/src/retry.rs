// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit retry policy with exponential backoff.
//!
//! The fact extractor composes this with its heuristic fallback: the policy
//! governs only the LLM call, and the fallback runs once retries exhaust.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use engram_core::EngramError;

/// Bounded exponential backoff: attempt `n` (zero-based) is preceded by a
/// sleep of `base_delay * 2^(n-1)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retry attempt `attempt` (1-based retry count).
    fn delay_before(&self, attempt: usize) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1) as u32)
    }

    /// Run `op` until it succeeds or `max_attempts` is exhausted.
    ///
    /// Returns the last error when every attempt fails.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, EngramError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngramError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.delay_before(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after failure");
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| EngramError::Internal("retry loop made no attempts".into())))
    }
}
