// ABOUTME: Terminal outcomes of analysis jobs and the events broadcast while they run
// ABOUTME: Converts outcomes into application errors with dedicated error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence_core::errors::{AppError, AppResult, BackendError, ErrorCode};
use cadence_core::models::{WorkoutAnalysis, WorkoutId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a job stopped before reaching a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The caller cancelled the job
    Requested,
    /// A newer job for the same workout replaced this one
    Superseded,
    /// The tracker is shutting down
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Requested => "requested",
            Self::Superseded => "superseded",
            Self::Shutdown => "shutdown",
        })
    }
}

/// How an analysis job ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The report is available
    Complete(WorkoutAnalysis),
    /// The backend marked the job failed
    Failed {
        /// Error recorded on the row, or a default message
        message: String,
    },
    /// No terminal status within the attempt budget
    TimedOut {
        /// Status reads performed
        attempts: u32,
    },
    /// The status stayed missing or unrecognized; a reset was attempted
    Stalled {
        /// Last raw status observed
        last_status: String,
        /// Whether the corrective reset was written to the row
        reset_applied: bool,
    },
    /// A non-retryable backend error stopped polling
    Error {
        /// Error code of the backend failure
        code: ErrorCode,
        /// Error description
        message: String,
    },
    /// The job was cancelled before finishing
    Cancelled(CancelReason),
}

impl AnalysisOutcome {
    /// Outcome for a backend error that ends the job
    #[must_use]
    pub fn from_backend_error(error: &BackendError) -> Self {
        Self::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }

    /// Whether the report was retrieved
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Short machine-friendly label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Complete(_) => "complete",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Stalled { .. } => "stalled",
            Self::Error { .. } => "error",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Convert into a result for callers that only care about the report
    ///
    /// # Errors
    ///
    /// Every outcome except `Complete` maps to an error with a matching code
    pub fn into_result(self, workout_id: &WorkoutId) -> AppResult<WorkoutAnalysis> {
        let error = match self {
            Self::Complete(analysis) => return Ok(analysis),
            Self::Failed { message } => AppError::new(ErrorCode::AnalysisFailed, message),
            Self::TimedOut { attempts } => AppError::new(
                ErrorCode::AnalysisTimeout,
                format!("no terminal status after {attempts} attempts"),
            ),
            Self::Stalled {
                last_status,
                reset_applied,
            } => AppError::new(
                ErrorCode::AnalysisStalled,
                format!("status stuck at '{last_status}'"),
            )
            .with_details(serde_json::json!({ "reset_applied": reset_applied })),
            Self::Error { code, message } => AppError::new(code, message),
            Self::Cancelled(reason) => AppError::new(
                ErrorCode::AnalysisCancelled,
                format!("analysis cancelled ({reason})"),
            ),
        };
        Err(error.with_resource_id(workout_id.as_str()))
    }
}

/// Progress notifications broadcast by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// A job was registered (and the analysis function invoked, if requested)
    Started {
        /// Workout being analyzed
        workout_id: WorkoutId,
        /// Job generation
        generation: u64,
        /// Whether the analysis function was invoked
        triggered: bool,
    },
    /// A status read completed
    Polled {
        /// Workout being analyzed
        workout_id: WorkoutId,
        /// Job generation
        generation: u64,
        /// 1-based attempt number
        attempt: u32,
        /// Raw status label
        status: String,
    },
    /// The job reached its outcome
    Settled {
        /// Workout being analyzed
        workout_id: WorkoutId,
        /// Job generation
        generation: u64,
        /// Final outcome
        outcome: AnalysisOutcome,
    },
}

impl AnalysisEvent {
    /// Workout the event refers to
    #[must_use]
    pub const fn workout_id(&self) -> &WorkoutId {
        match self {
            Self::Started { workout_id, .. }
            | Self::Polled { workout_id, .. }
            | Self::Settled { workout_id, .. } => workout_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_map_to_error_codes() {
        let id = WorkoutId::new("w1").unwrap();
        let stalled = AnalysisOutcome::Stalled {
            last_status: "null".to_owned(),
            reset_applied: true,
        };
        let error = stalled.into_result(&id).unwrap_err();
        assert_eq!(error.code, ErrorCode::AnalysisStalled);

        let cancelled = AnalysisOutcome::Cancelled(CancelReason::Superseded)
            .into_result(&id)
            .unwrap_err();
        assert_eq!(cancelled.code, ErrorCode::AnalysisCancelled);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(AnalysisOutcome::TimedOut { attempts: 4 }).unwrap();
        assert_eq!(json["outcome"], "timed_out");
        assert_eq!(json["detail"]["attempts"], 4);
    }
}
