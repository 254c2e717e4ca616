// ABOUTME: Reconciles locally displayed analysis state with eventually consistent workout rows
// ABOUTME: Hydrates finished rows onto the board and resumes polling for in-flight rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::board::HydratedState;
use super::tracker::AnalysisTracker;
use cadence_core::errors::BackendError;
use cadence_core::models::{AnalysisStatus, StatusReading, WorkoutId};
use serde::Serialize;
use tracing::{debug, warn};

/// What reconciliation did for each workout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Rows with a finished report, now shown as ready
    pub ready: Vec<WorkoutId>,
    /// Rows marked failed, now shown as failed
    pub failed: Vec<WorkoutId>,
    /// In-flight rows for which polling was resumed
    pub resumed: Vec<WorkoutId>,
    /// Workouts that already had a running job
    pub already_active: Vec<WorkoutId>,
    /// Rows never analyzed
    pub idle: Vec<WorkoutId>,
    /// Rows that do not exist
    pub missing: Vec<WorkoutId>,
    /// Rows that could not be read
    pub errors: Vec<(WorkoutId, String)>,
}

impl ReconcileReport {
    /// Total workouts processed
    #[must_use]
    pub fn total(&self) -> usize {
        self.ready.len()
            + self.failed.len()
            + self.resumed.len()
            + self.already_active.len()
            + self.idle.len()
            + self.missing.len()
            + self.errors.len()
    }
}

enum Disposition {
    Ready,
    Failed,
    Resumed,
    AlreadyActive,
    Idle,
    Missing,
    Error(String),
}

impl AnalysisTracker {
    /// Bring the board in line with stored rows
    ///
    /// Running it again with the same ids changes nothing that already
    /// matches storage, and never starts a second job for a workout.
    pub async fn reconcile(&self, workout_ids: &[WorkoutId]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for workout_id in workout_ids {
            let disposition = self.reconcile_one(workout_id).await;
            let id = workout_id.clone();
            match disposition {
                Disposition::Ready => report.ready.push(id),
                Disposition::Failed => report.failed.push(id),
                Disposition::Resumed => report.resumed.push(id),
                Disposition::AlreadyActive => report.already_active.push(id),
                Disposition::Idle => report.idle.push(id),
                Disposition::Missing => report.missing.push(id),
                Disposition::Error(message) => report.errors.push((id, message)),
            }
        }
        debug!(
            reconcile.total = report.total(),
            reconcile.ready = report.ready.len(),
            reconcile.resumed = report.resumed.len(),
            reconcile.errors = report.errors.len(),
            "Reconciliation finished"
        );
        report
    }

    async fn reconcile_one(&self, workout_id: &WorkoutId) -> Disposition {
        if self.is_active(workout_id) {
            return Disposition::AlreadyActive;
        }

        let row = match self.backend().fetch_status(workout_id).await {
            Ok(row) => row,
            Err(BackendError::NotFound { .. }) => return Disposition::Missing,
            Err(error) => return read_error(workout_id, &error),
        };

        match row.reading() {
            StatusReading::Known(AnalysisStatus::Complete) => {
                match self.backend().fetch_analysis(workout_id).await {
                    Ok(Some(analysis)) => {
                        self.board()
                            .hydrate(workout_id, HydratedState::Ready(analysis));
                        Disposition::Ready
                    }
                    // Status landed before the report; poll until it is visible
                    Ok(None) => self.resume_polling(workout_id),
                    Err(error) => read_error(workout_id, &error),
                }
            }
            StatusReading::Known(AnalysisStatus::Failed) => {
                self.board()
                    .hydrate(workout_id, HydratedState::Failed(row.failure_message()));
                Disposition::Failed
            }
            StatusReading::Known(AnalysisStatus::Pending | AnalysisStatus::Analyzing)
            | StatusReading::Unrecognized(_) => self.resume_polling(workout_id),
            StatusReading::Missing => Disposition::Idle,
        }
    }

    fn resume_polling(&self, workout_id: &WorkoutId) -> Disposition {
        // A job started since the activity check keeps running untouched
        match self.resume_if_idle(workout_id.clone()) {
            Ok(Some(_handle)) => Disposition::Resumed,
            Ok(None) => Disposition::AlreadyActive,
            Err(error) => Disposition::Error(error.to_string()),
        }
    }
}

fn read_error(workout_id: &WorkoutId, error: &BackendError) -> Disposition {
    warn!(
        workout.id = %workout_id,
        error = %error,
        "Could not read workout row during reconciliation"
    );
    Disposition::Error(error.to_string())
}
