// ABOUTME: Backoff policy for analysis status polling
// ABOUTME: Computes capped fixed or exponential delays with optional jitter and retry-after hints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence_core::constants::polling;
use rand::Rng;
use std::time::Duration;

/// Delay schedule and attempt limit for one poll job
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first status read
    pub initial_delay: Duration,
    /// Ceiling for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Status reads before giving up
    pub max_attempts: u32,
    /// Scale each delay by a random factor in `[0.5, 1.0]`
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(
            Duration::from_millis(polling::DEFAULT_INITIAL_DELAY_MS),
            Duration::from_millis(polling::DEFAULT_MAX_DELAY_MS),
            polling::DEFAULT_MULTIPLIER,
            polling::DEFAULT_MAX_ATTEMPTS,
        )
    }
}

impl BackoffPolicy {
    /// Poll at a constant interval
    #[must_use]
    pub const fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: interval,
            max_delay: interval,
            multiplier: 1.0,
            max_attempts,
            jitter: false,
        }
    }

    /// Grow the delay by `multiplier` after every attempt, capped at `max_delay`
    #[must_use]
    pub const fn exponential(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_attempts: u32,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            max_attempts,
            jitter: false,
        }
    }

    /// Enable or disable jitter
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Nominal delay before `attempt` (1-based), without jitter
    ///
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`; attempt `0`
    /// is treated as the first attempt.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let scaled = self.initial_delay.as_secs_f64() * factor;
        let cap = self.max_delay.max(self.initial_delay);
        if !scaled.is_finite() || scaled >= cap.as_secs_f64() {
            return cap;
        }
        Duration::from_secs_f64(scaled)
    }

    /// Delay before `attempt`, with jitter applied when enabled
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        base.mul_f64(factor)
    }

    /// Delay before `attempt`, raised to honour a backend retry-after hint
    ///
    /// The hint never pushes a delay past `max_delay`.
    #[must_use]
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.delay_for(attempt);
        retry_after.map_or(delay, |hint| delay.max(hint.min(self.max_delay)))
    }

    /// Sum of nominal delays across every attempt
    #[must_use]
    pub fn total_budget(&self) -> Duration {
        (1..=self.max_attempts).map(|attempt| self.base_delay(attempt)).sum()
    }
}
