// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounded retry with exponential backoff for transient device errors.

use crate::BridgeError;
use std::future::Future;
use std::time::Duration;

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Errors that may succeed when the same operation is attempted again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for BridgeError {
    fn is_transient(&self) -> bool {
        BridgeError::is_transient(self)
    }
}

/// How often and how patiently to retry a transient failure.
///
/// Attempt `n` (1-based) that fails transiently is followed by a sleep of
/// `base_delay * 2^(n-1)` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Returns the sleep that follows failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1u32 << shift)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up. The last error is returned.
///
/// Sleeps use `tokio::time`, so a paused test clock makes backoff instant
/// and deterministic.
pub async fn retry_transient<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.attempts() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{what}: attempt {attempt}/{} failed ({e}); retrying in {}ms",
                    policy.attempts(),
                    delay.as_millis(),
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
