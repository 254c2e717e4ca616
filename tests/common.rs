// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides a scripted in-memory backend, fixtures, and quiet logging setup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `cadence`
//!
//! `ScriptedBackend` replays a per-workout list of status reads so poll loops
//! can be driven deterministically under paused tokio time.

use async_trait::async_trait;
use cadence::analysis::BackoffPolicy;
use cadence::backend::{AnalysisBackend, FunctionInvoker};
use cadence::errors::BackendError;
use cadence::models::{
    AnalysisReport, AnalysisStatusRow, Insight, InsightSeverity, WorkoutAnalysis, WorkoutId,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Workout id fixture
pub fn workout(id: &str) -> WorkoutId {
    WorkoutId::new(id).unwrap()
}

/// Fixed 1s interval, `max_attempts` reads
pub fn fast_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy::fixed(Duration::from_secs(1), max_attempts)
}

/// Report fixture with one warning insight
pub fn sample_analysis(workout_id: &WorkoutId) -> WorkoutAnalysis {
    WorkoutAnalysis {
        workout_id: workout_id.clone(),
        report: AnalysisReport {
            summary: Some("Steady aerobic run with a late fade".to_owned()),
            insights: vec![Insight {
                category: "pacing".to_owned(),
                title: "Positive split".to_owned(),
                message: "Second half 4% slower".to_owned(),
                severity: InsightSeverity::Warning,
            }],
            metrics: serde_json::json!({ "avg_hr": 148 }),
            analyzed_at: None,
        },
    }
}

/// One scripted response to `fetch_status`
#[derive(Debug, Clone)]
pub enum StatusStep {
    /// Row with this raw status (None = column null)
    Status(Option<&'static str>),
    /// Row marked failed with an error message
    FailedWith(&'static str),
    /// Retryable network failure
    NetworkError,
    /// 429 with a retry-after hint
    RateLimited(u64),
    /// Non-retryable auth failure
    AuthError,
    /// Row does not exist
    NotFound,
}

impl StatusStep {
    fn into_result(self, workout_id: &WorkoutId) -> Result<AnalysisStatusRow, BackendError> {
        let row = |status: Option<&str>, error: Option<&str>| AnalysisStatusRow {
            id: workout_id.clone(),
            analysis_status: status.map(str::to_owned),
            analysis_error: error.map(str::to_owned),
            updated_at: None,
        };
        match self {
            Self::Status(status) => Ok(row(status, None)),
            Self::FailedWith(message) => Ok(row(Some("failed"), Some(message))),
            Self::NetworkError => Err(BackendError::NetworkError {
                service: "scripted".to_owned(),
                message: "connection reset".to_owned(),
            }),
            Self::RateLimited(retry_after_secs) => Err(BackendError::RateLimitExceeded {
                service: "scripted".to_owned(),
                retry_after_secs,
            }),
            Self::AuthError => Err(BackendError::AuthenticationFailed {
                service: "scripted".to_owned(),
                reason: "JWT expired".to_owned(),
            }),
            Self::NotFound => Err(BackendError::NotFound {
                resource: "workout".to_owned(),
                id: workout_id.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct WorkoutScript {
    steps: VecDeque<StatusStep>,
    last: Option<StatusStep>,
    analysis: Option<WorkoutAnalysis>,
    hidden_analysis_reads: u32,
    trigger_fails: bool,
    reset_fails: bool,
}

/// In-memory backend replaying scripted status reads
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<WorkoutId, WorkoutScript>>,
    functions: Mutex<HashMap<String, VecDeque<Result<Value, u16>>>>,
    invocations: Mutex<Vec<(String, Value)>>,
    resets: Mutex<Vec<(WorkoutId, String)>>,
    pub trigger_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub analysis_calls: AtomicU32,
    pub invoke_delay: Mutex<Option<Duration>>,
    /// Resets are only recorded once this delay has elapsed
    pub reset_delay: Mutex<Option<Duration>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<R>(
        &self,
        workout_id: &WorkoutId,
        f: impl FnOnce(&mut WorkoutScript) -> R,
    ) -> R {
        let mut scripts = self.scripts.lock().unwrap();
        f(scripts.entry(workout_id.clone()).or_default())
    }

    /// Status reads replayed in order; the last one repeats forever
    pub fn script(&self, workout_id: &WorkoutId, steps: Vec<StatusStep>) {
        self.with_script(workout_id, |script| {
            script.steps = steps.into();
            script.last = None;
        });
    }

    /// Report returned once the status is complete
    pub fn set_analysis(&self, workout_id: &WorkoutId, analysis: WorkoutAnalysis) {
        self.with_script(workout_id, |script| script.analysis = Some(analysis));
    }

    /// The first `reads` report fetches return nothing
    pub fn hide_analysis_for(&self, workout_id: &WorkoutId, reads: u32) {
        self.with_script(workout_id, |script| script.hidden_analysis_reads = reads);
    }

    /// Make `trigger_analysis` fail with a server error
    pub fn fail_trigger(&self, workout_id: &WorkoutId) {
        self.with_script(workout_id, |script| script.trigger_fails = true);
    }

    /// Make `reset_analysis` fail with a permission error
    pub fn fail_reset(&self, workout_id: &WorkoutId) {
        self.with_script(workout_id, |script| script.reset_fails = true);
    }

    /// Queue an edge function response; `Err(status)` maps to an API error
    pub fn respond(&self, function: &str, response: Result<Value, u16>) {
        self.functions
            .lock()
            .unwrap()
            .entry(function.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Resets written so far
    pub fn resets(&self) -> Vec<(WorkoutId, String)> {
        self.resets.lock().unwrap().clone()
    }

    /// Edge function calls made so far
    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn status_reads(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn triggers(&self) -> u32 {
        self.trigger_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn trigger_analysis(&self, workout_id: &WorkoutId) -> Result<(), BackendError> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        if self.with_script(workout_id, |script| script.trigger_fails) {
            return Err(BackendError::ApiError {
                service: "scripted".to_owned(),
                status_code: 500,
                message: "edge function crashed".to_owned(),
                retryable: true,
            });
        }
        Ok(())
    }

    async fn fetch_status(
        &self,
        workout_id: &WorkoutId,
    ) -> Result<AnalysisStatusRow, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.with_script(workout_id, |script| {
            if let Some(step) = script.steps.pop_front() {
                script.last = Some(step.clone());
                step
            } else {
                script.last.clone().unwrap_or(StatusStep::Status(None))
            }
        });
        step.into_result(workout_id)
    }

    async fn fetch_analysis(
        &self,
        workout_id: &WorkoutId,
    ) -> Result<Option<WorkoutAnalysis>, BackendError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.with_script(workout_id, |script| {
            if script.hidden_analysis_reads > 0 {
                script.hidden_analysis_reads -= 1;
                None
            } else {
                script.analysis.clone()
            }
        }))
    }

    async fn reset_analysis(
        &self,
        workout_id: &WorkoutId,
        reason: &str,
    ) -> Result<(), BackendError> {
        let delay = *self.reset_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.with_script(workout_id, |script| script.reset_fails) {
            return Err(BackendError::ApiError {
                service: "scripted".to_owned(),
                status_code: 403,
                message: "row-level security denied update".to_owned(),
                retryable: false,
            });
        }
        self.resets
            .lock()
            .unwrap()
            .push((workout_id.clone(), reason.to_owned()));
        Ok(())
    }
}

#[async_trait]
impl FunctionInvoker for ScriptedBackend {
    async fn invoke(&self, function: &str, body: &Value) -> Result<Value, BackendError> {
        self.invocations
            .lock()
            .unwrap()
            .push((function.to_owned(), body.clone()));
        let delay = *self.invoke_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let response = self
            .functions
            .lock()
            .unwrap()
            .get_mut(function)
            .and_then(VecDeque::pop_front);
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(status_code)) => Err(BackendError::ApiError {
                service: "scripted".to_owned(),
                status_code,
                message: "edge function error".to_owned(),
                retryable: status_code >= 500,
            }),
            None => Err(BackendError::NotFound {
                resource: "function".to_owned(),
                id: function.to_owned(),
            }),
        }
    }
}
