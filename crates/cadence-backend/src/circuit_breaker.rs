// ABOUTME: Circuit breaker guarding Supabase REST and Edge Function calls
// ABOUTME: Fails fast while the backend is down so pollers back off instead of piling up
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence_core::errors::BackendError;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass through; consecutive retryable failures are counted
    Closed,
    /// Requests fail immediately until the recovery timeout elapses
    Open,
    /// Requests are let through to test recovery
    HalfOpen,
}

impl CircuitState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thresholds for opening and closing the circuit
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive retryable failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub recovery_timeout: Duration,
    /// Successful trial requests needed to close a half-open circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker configuration
    #[must_use]
    pub const fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
        }
    }
}

/// Lock-free circuit breaker shared by every request of one backend client
pub struct CircuitBreaker {
    service: String,
    state: AtomicU8,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    /// Millis since `created` when the circuit last opened
    opened_at_ms: AtomicU64,
    config: CircuitBreakerConfig,
    created: Instant,
}

impl CircuitBreaker {
    /// Create a breaker with default thresholds
    #[must_use]
    pub fn new(service: &str) -> Self {
        Self::with_config(service, CircuitBreakerConfig::default())
    }

    /// Create a breaker with custom thresholds
    #[must_use]
    pub fn with_config(service: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.to_owned(),
            state: AtomicU8::new(CircuitState::Closed.to_u8()),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            config,
            created: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures counted in the closed state
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Whether a request may be sent now
    ///
    /// An open circuit whose recovery timeout elapsed moves to half-open and
    /// admits the request as a trial.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => self.try_half_open(),
        }
    }

    fn try_half_open(&self) -> bool {
        if self.millis_open() < self.recovery_ms() {
            return false;
        }
        // Whoever wins the exchange logs; losers still see HalfOpen and proceed
        if self
            .state
            .compare_exchange(
                CircuitState::Open.to_u8(),
                CircuitState::HalfOpen.to_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            self.success_count.store(0, Ordering::SeqCst);
            info!(service = %self.service, "Circuit breaker half-open, probing recovery");
        }
        true
    }

    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u64 {
        self.created.elapsed().as_millis() as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn recovery_ms(&self) -> u64 {
        self.config.recovery_timeout.as_millis() as u64
    }

    fn millis_open(&self) -> u64 {
        self.now_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst))
    }

    fn open(&self) {
        self.state.store(CircuitState::Open.to_u8(), Ordering::SeqCst);
        self.opened_at_ms.store(self.now_ms(), Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    /// Record a successful request
    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => self.failure_count.store(0, Ordering::SeqCst),
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.reset_counters();
                    self.state
                        .store(CircuitState::Closed.to_u8(), Ordering::SeqCst);
                    info!(service = %self.service, "Circuit breaker closed, backend recovered");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a retryable failure
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        service = %self.service,
                        failures,
                        recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!(service = %self.service, "Circuit breaker re-opened, trial request failed");
            }
            CircuitState::Open => {
                self.opened_at_ms.store(self.now_ms(), Ordering::SeqCst);
            }
        }
    }

    /// Seconds until an open circuit admits a trial request, rounded up
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        self.recovery_ms()
            .saturating_sub(self.millis_open())
            .saturating_add(999)
            / 1000
    }

    /// Run `operation` under breaker protection
    ///
    /// Only retryable errors count as failures; a 404 or a rejected token
    /// says nothing about backend health.
    ///
    /// # Errors
    ///
    /// Returns `CircuitBreakerOpen` without running the operation while the
    /// circuit is open, otherwise the operation's own error.
    pub async fn call<F, T>(&self, operation: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        if !self.is_allowed() {
            return Err(BackendError::CircuitBreakerOpen {
                service: self.service.clone(),
                retry_after_secs: self.retry_after_secs(),
            });
        }

        match operation.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                if error.is_retryable() {
                    self.record_failure();
                } else {
                    self.record_success();
                }
                Err(error)
            }
        }
    }

    fn reset_counters(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    /// Force the circuit closed
    pub fn reset(&self) {
        self.reset_counters();
        self.state
            .store(CircuitState::Closed.to_u8(), Ordering::SeqCst);
        info!(service = %self.service, "Circuit breaker manually reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_error() -> BackendError {
        BackendError::NetworkError {
            service: "test".to_owned(),
            message: "connection refused".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits() {
        let breaker =
            CircuitBreaker::with_config("test", CircuitBreakerConfig::new(1, Duration::from_secs(60), 1));

        let first: Result<(), _> = breaker.call(async { Err(network_error()) }).await;
        assert!(first.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);

        let second = breaker.call(async { Ok::<_, BackendError>(()) }).await;
        assert!(matches!(
            second,
            Err(BackendError::CircuitBreakerOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_errors_do_not_trip() {
        let breaker =
            CircuitBreaker::with_config("test", CircuitBreakerConfig::new(1, Duration::from_secs(60), 1));

        let result: Result<(), _> = breaker
            .call(async {
                Err(BackendError::NotFound {
                    resource: "workouts row".to_owned(),
                    id: "w1".to_owned(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_closes_after_successful_trials() {
        let breaker =
            CircuitBreaker::with_config("test", CircuitBreakerConfig::new(1, Duration::ZERO, 2));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.is_allowed());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
