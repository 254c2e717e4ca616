// ABOUTME: Analysis polling configuration loaded from the environment
// ABOUTME: Converts delays, attempt limits, and stall tolerance into a backoff policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::environment::{parse_flag, parse_or};
use crate::analysis::BackoffPolicy;
use cadence_core::constants::{env_keys, polling};
use cadence_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling behaviour for analysis jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay before the first status read in milliseconds
    pub initial_delay_ms: u64,
    /// Ceiling for any single delay in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays; `1.0` polls at a fixed interval
    pub multiplier: f64,
    /// Status reads before the job times out
    pub max_attempts: u32,
    /// Randomize each delay within `[0.5, 1.0]` of its nominal value
    pub jitter: bool,
    /// Consecutive missing or unknown statuses before the row is reset
    pub stall_threshold: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: polling::DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: polling::DEFAULT_MAX_DELAY_MS,
            multiplier: polling::DEFAULT_MULTIPLIER,
            max_attempts: polling::DEFAULT_MAX_ATTEMPTS,
            jitter: false,
            stall_threshold: polling::DEFAULT_STALL_THRESHOLD,
        }
    }
}

impl PollingConfig {
    pub(crate) fn from_lookup<F>(lookup: &F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            initial_delay_ms: parse_or(
                lookup,
                env_keys::POLL_INITIAL_DELAY_MS,
                defaults.initial_delay_ms,
            )?,
            max_delay_ms: parse_or(lookup, env_keys::POLL_MAX_DELAY_MS, defaults.max_delay_ms)?,
            multiplier: parse_or(lookup, env_keys::POLL_MULTIPLIER, defaults.multiplier)?,
            max_attempts: parse_or(lookup, env_keys::POLL_MAX_ATTEMPTS, defaults.max_attempts)?,
            jitter: parse_flag(lookup, env_keys::POLL_JITTER, defaults.jitter)?,
            stall_threshold: parse_or(
                lookup,
                env_keys::STALL_THRESHOLD,
                defaults.stall_threshold,
            )?,
        })
    }

    /// Check polling constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for zero attempts, a shrinking or non-finite
    /// multiplier, an initial delay above the ceiling, or a zero stall threshold
    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::config(format!(
                "{} must be at least 1",
                env_keys::POLL_MAX_ATTEMPTS
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(AppError::config(format!(
                "{} must be a finite number >= 1.0, got {}",
                env_keys::POLL_MULTIPLIER,
                self.multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(AppError::config(format!(
                "{} ({}) must not exceed {} ({})",
                env_keys::POLL_INITIAL_DELAY_MS,
                self.initial_delay_ms,
                env_keys::POLL_MAX_DELAY_MS,
                self.max_delay_ms
            )));
        }
        if self.stall_threshold == 0 {
            return Err(AppError::config(format!(
                "{} must be at least 1",
                env_keys::STALL_THRESHOLD
            )));
        }
        Ok(())
    }

    /// Backoff policy described by this configuration
    #[must_use]
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::exponential(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.multiplier,
            self.max_attempts,
        )
        .with_jitter(self.jitter)
    }
}
