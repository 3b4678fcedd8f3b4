// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateless exponential backoff schedule.
//!
//! A schedule is a value, not shared mutable state: callers hold their own
//! attempt counter, so two workflows polling at the same time never couple
//! their delays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential delay schedule: `step * 2^attempt`, bounded by `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    /// Delay for attempt 0, in milliseconds.
    pub step_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub cap_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            step_ms: 1_000,
            cap_ms: 5_000,
        }
    }
}

impl Backoff {
    pub fn new(step: Duration, cap: Duration) -> Self {
        Self {
            step_ms: step.as_millis() as u64,
            cap_ms: cap.as_millis() as u64,
        }
    }

    /// Schedule with zero delays, for tests that drive retries directly.
    pub fn none() -> Self {
        Self { step_ms: 0, cap_ms: 0 }
    }

    /// Delay before the given retry attempt (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.step_ms.saturating_mul(factor).min(self.cap_ms);
        Duration::from_millis(ms)
    }

    /// Largest delay the schedule will ever produce.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.cap_ms)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
