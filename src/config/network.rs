// ABOUTME: Network configuration for the shared HTTP client and the backend circuit breaker
// ABOUTME: Handles request timeouts, connect timeouts, and failure thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::environment::parse_or;
use cadence_backend::{CircuitBreakerConfig, HttpTimeouts};
use cadence_core::constants::{env_keys, timeouts};
use cadence_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client and circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Shared HTTP client request timeout in seconds
    pub http_timeout_secs: u64,
    /// Shared HTTP client connect timeout in seconds
    pub http_connect_timeout_secs: u64,
    /// Consecutive retryable failures before the circuit opens
    pub circuit_failure_threshold: u32,
    /// Seconds the circuit stays open before probing
    pub circuit_recovery_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: timeouts::HTTP_CLIENT_TIMEOUT_SECS,
            http_connect_timeout_secs: timeouts::HTTP_CLIENT_CONNECT_TIMEOUT_SECS,
            circuit_failure_threshold: CircuitBreakerConfig::default().failure_threshold,
            circuit_recovery_secs: CircuitBreakerConfig::default().recovery_timeout.as_secs(),
        }
    }
}

impl NetworkConfig {
    pub(crate) fn from_lookup<F>(lookup: &F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            http_timeout_secs: parse_or(
                lookup,
                env_keys::HTTP_CLIENT_TIMEOUT_SECS,
                defaults.http_timeout_secs,
            )?,
            http_connect_timeout_secs: parse_or(
                lookup,
                env_keys::HTTP_CLIENT_CONNECT_TIMEOUT_SECS,
                defaults.http_connect_timeout_secs,
            )?,
            circuit_failure_threshold: parse_or(
                lookup,
                env_keys::CIRCUIT_BREAKER_FAILURE_THRESHOLD,
                defaults.circuit_failure_threshold,
            )?,
            circuit_recovery_secs: parse_or(
                lookup,
                env_keys::CIRCUIT_BREAKER_RECOVERY_SECS,
                defaults.circuit_recovery_secs,
            )?,
        })
    }

    /// Check network constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for zero timeouts or a zero failure threshold
    pub fn validate(&self) -> AppResult<()> {
        if self.http_timeout_secs == 0 || self.http_connect_timeout_secs == 0 {
            return Err(AppError::config("HTTP timeouts must be at least 1 second"));
        }
        if self.circuit_failure_threshold == 0 {
            return Err(AppError::config(format!(
                "{} must be at least 1",
                env_keys::CIRCUIT_BREAKER_FAILURE_THRESHOLD
            )));
        }
        Ok(())
    }

    /// Timeouts for the shared HTTP client
    #[must_use]
    pub const fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            request: Duration::from_secs(self.http_timeout_secs),
            connect: Duration::from_secs(self.http_connect_timeout_secs),
        }
    }

    /// Circuit breaker thresholds for the backend client
    #[must_use]
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_failure_threshold,
            recovery_timeout: Duration::from_secs(self.circuit_recovery_secs),
            ..CircuitBreakerConfig::default()
        }
    }
}
