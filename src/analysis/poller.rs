// ABOUTME: Poll loop that waits for a server-side analysis job to reach a terminal status
// ABOUTME: Applies backoff, stall detection with corrective reset, and cooperative cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::backoff::BackoffPolicy;
use super::cancel::PollCancellation;
use super::outcome::AnalysisOutcome;
use crate::logging::AnalysisLogger;
use cadence_backend::AnalysisBackend;
use cadence_core::constants::polling;
use cadence_core::errors::BackendError;
use cadence_core::models::{AnalysisStatus, StatusReading, WorkoutId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Progress of a single status read, reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    /// 1-based attempt number
    pub attempt: u32,
    /// Classified status column
    pub reading: StatusReading,
}

/// What the loop does after handling one status row
enum Step {
    Continue,
    Finish(AnalysisOutcome),
}

/// Waits for one workout's analysis to finish
#[derive(Clone)]
pub struct AnalysisPoller {
    backend: Arc<dyn AnalysisBackend>,
    policy: BackoffPolicy,
    stall_threshold: u32,
}

impl AnalysisPoller {
    /// Create a poller with the default stall threshold
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>, policy: BackoffPolicy) -> Self {
        Self {
            backend,
            policy,
            stall_threshold: polling::DEFAULT_STALL_THRESHOLD,
        }
    }

    /// Consecutive unexpected statuses tolerated before a reset
    #[must_use]
    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold.max(1);
        self
    }

    /// Backoff policy in use
    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Backend this poller reads from
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        &self.backend
    }

    /// Poll until the job reaches an outcome
    ///
    /// `on_progress` runs after every successful status read and never after
    /// cancellation has been observed.
    pub async fn poll<F>(
        &self,
        workout_id: &WorkoutId,
        cancellation: &PollCancellation,
        mut on_progress: F,
    ) -> AnalysisOutcome
    where
        F: FnMut(PollProgress) + Send,
    {
        let mut streak = 0_u32;
        let mut retry_hint: Option<Duration> = None;

        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_with_hint(attempt, retry_hint.take());
            if let Err(reason) = cancellation.guard(sleep(delay)).await {
                return AnalysisOutcome::Cancelled(reason);
            }

            let row = match cancellation.guard(self.backend.fetch_status(workout_id)).await
            {
                Err(reason) => return AnalysisOutcome::Cancelled(reason),
                Ok(Ok(row)) => row,
                Ok(Err(error)) if error.is_retryable() => {
                    AnalysisLogger::log_transient_error(workout_id, attempt, &error.to_string());
                    retry_hint = error.retry_after_secs().map(Duration::from_secs);
                    continue;
                }
                Ok(Err(error)) => return AnalysisOutcome::from_backend_error(&error),
            };

            let reading = row.reading();
            AnalysisLogger::log_poll(
                workout_id,
                attempt,
                &reading.label(),
                self.policy.base_delay(attempt + 1),
            );
            if cancellation.is_cancelled() {
                return AnalysisOutcome::Cancelled(cancellation.reason_or_requested());
            }
            on_progress(PollProgress {
                attempt,
                reading: reading.clone(),
            });

            let step = match reading {
                StatusReading::Known(AnalysisStatus::Complete) => {
                    streak = 0;
                    self.complete_step(workout_id, attempt, cancellation, &mut retry_hint)
                        .await
                }
                StatusReading::Known(AnalysisStatus::Failed) => {
                    Step::Finish(AnalysisOutcome::Failed {
                        message: row.failure_message(),
                    })
                }
                StatusReading::Known(AnalysisStatus::Pending | AnalysisStatus::Analyzing) => {
                    streak = 0;
                    Step::Continue
                }
                StatusReading::Missing | StatusReading::Unrecognized(_) => {
                    streak += 1;
                    if streak >= self.stall_threshold {
                        Step::Finish(self.reset_stalled(workout_id, &reading, cancellation).await)
                    } else {
                        Step::Continue
                    }
                }
            };

            if let Step::Finish(outcome) = step {
                return outcome;
            }
        }

        AnalysisOutcome::TimedOut {
            attempts: self.policy.max_attempts,
        }
    }

    /// Fetch the report after a `complete` status
    async fn complete_step(
        &self,
        workout_id: &WorkoutId,
        attempt: u32,
        cancellation: &PollCancellation,
        retry_hint: &mut Option<Duration>,
    ) -> Step {
        match cancellation.guard(self.backend.fetch_analysis(workout_id)).await {
            Err(reason) => Step::Finish(AnalysisOutcome::Cancelled(reason)),
            Ok(Ok(Some(analysis))) => Step::Finish(AnalysisOutcome::Complete(analysis)),
            Ok(Ok(None)) => {
                debug!(
                    workout.id = %workout_id,
                    poll.attempt = attempt,
                    "Status complete but report not visible yet"
                );
                Step::Continue
            }
            Ok(Err(error)) if error.is_retryable() => {
                AnalysisLogger::log_transient_error(workout_id, attempt, &error.to_string());
                *retry_hint = error.retry_after_secs().map(Duration::from_secs);
                Step::Continue
            }
            Ok(Err(error)) => Step::Finish(AnalysisOutcome::from_backend_error(&error)),
        }
    }

    /// Mark a stalled row failed so the next trigger starts from a clean state
    ///
    /// A cancelled job never writes the reset: its successor may already own
    /// the row.
    async fn reset_stalled(
        &self,
        workout_id: &WorkoutId,
        reading: &StatusReading,
        cancellation: &PollCancellation,
    ) -> AnalysisOutcome {
        if cancellation.is_cancelled() {
            return AnalysisOutcome::Cancelled(cancellation.reason_or_requested());
        }
        let last_status = reading.label();
        let reset = cancellation
            .guard(
                self.backend
                    .reset_analysis(workout_id, polling::STALL_RESET_MESSAGE),
            )
            .await;
        let reset_applied = match reset {
            Err(reason) => return AnalysisOutcome::Cancelled(reason),
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                log_reset_failure(workout_id, &error);
                false
            }
        };
        AnalysisLogger::log_stall_reset(workout_id, &last_status, reset_applied);
        AnalysisOutcome::Stalled {
            last_status,
            reset_applied,
        }
    }
}

fn log_reset_failure(workout_id: &WorkoutId, error: &BackendError) {
    warn!(
        workout.id = %workout_id,
        error = %error,
        "Corrective reset of stalled analysis failed"
    );
}

