// ABOUTME: Per-workout analysis view that reconciles job progress, outcomes, and stored rows
// ABOUTME: Discards stale generations and surfaces every outcome at most once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Displayed analysis state
//!
//! Jobs, reconciliation and the user all write to the same view. Each write
//! carries the generation of the job it belongs to, so a late update from a
//! replaced job can never clobber its successor.

use super::outcome::{AnalysisOutcome, CancelReason};
use cadence_core::models::{WorkoutAnalysis, WorkoutId};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

/// What the view currently shows for a workout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Nothing running and nothing to show
    Idle,
    /// A job is polling
    Running {
        /// Status reads so far
        attempt: u32,
        /// Last status label observed
        last_status: Option<String>,
    },
    /// Report available
    Ready {
        /// The report
        analysis: WorkoutAnalysis,
    },
    /// Analysis failed or could not be read
    Failed {
        /// Reason shown to the user
        message: String,
    },
    /// Polling gave up
    TimedOut {
        /// Status reads performed
        attempts: u32,
    },
    /// Status never became recognizable
    Stalled {
        /// Last raw status observed
        last_status: String,
    },
}

impl AnalysisPhase {
    /// Short label for display
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Stalled { .. } => "stalled",
        }
    }
}

/// Snapshot of one workout's view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    /// Generation of the job that last wrote this view; `0` for hydrated rows
    pub generation: u64,
    /// Current phase
    pub phase: AnalysisPhase,
    /// When the view last changed
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    settled: bool,
}

impl AnalysisView {
    fn new(generation: u64, phase: AnalysisPhase, settled: bool) -> Self {
        Self {
            generation,
            phase,
            updated_at: Utc::now(),
            settled,
        }
    }

    /// Whether a job is still writing to this view
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !self.settled
    }
}

/// Terminal state read from a stored row during reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum HydratedState {
    /// Row holds a finished report
    Ready(WorkoutAnalysis),
    /// Row is marked failed
    Failed(String),
}

/// Concurrent map of workout views
#[derive(Debug, Default)]
pub struct AnalysisBoard {
    views: DashMap<WorkoutId, AnalysisView>,
}

impl AnalysisBoard {
    /// Empty board
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that job `generation` started; ignored if a newer job already wrote
    pub fn begin(&self, workout_id: &WorkoutId, generation: u64) -> bool {
        let running = || {
            AnalysisView::new(
                generation,
                AnalysisPhase::Running {
                    attempt: 0,
                    last_status: None,
                },
                false,
            )
        };
        match self.views.entry(workout_id.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.get().generation > generation {
                    return false;
                }
                slot.insert(running());
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(running());
                true
            }
        }
    }

    /// Record a status read of the current running job
    pub fn progress(
        &self,
        workout_id: &WorkoutId,
        generation: u64,
        attempt: u32,
        status: &str,
    ) -> bool {
        let Some(mut view) = self.views.get_mut(workout_id) else {
            return false;
        };
        if view.generation != generation || view.settled {
            return false;
        }
        view.phase = AnalysisPhase::Running {
            attempt,
            last_status: Some(status.to_owned()),
        };
        view.updated_at = Utc::now();
        true
    }

    /// Apply a job's outcome; returns whether the view changed
    ///
    /// Stale generations, repeated settles, and superseded outcomes are no-ops.
    pub fn settle(
        &self,
        workout_id: &WorkoutId,
        generation: u64,
        outcome: &AnalysisOutcome,
    ) -> bool {
        let Some(mut view) = self.views.get_mut(workout_id) else {
            return false;
        };
        if view.generation != generation || view.settled {
            return false;
        }
        let phase = match outcome {
            AnalysisOutcome::Cancelled(CancelReason::Superseded) => return false,
            AnalysisOutcome::Cancelled(CancelReason::Requested | CancelReason::Shutdown) => {
                AnalysisPhase::Idle
            }
            AnalysisOutcome::Complete(analysis) => AnalysisPhase::Ready {
                analysis: analysis.clone(),
            },
            AnalysisOutcome::Failed { message } | AnalysisOutcome::Error { message, .. } => {
                AnalysisPhase::Failed {
                    message: message.clone(),
                }
            }
            AnalysisOutcome::TimedOut { attempts } => AnalysisPhase::TimedOut {
                attempts: *attempts,
            },
            AnalysisOutcome::Stalled { last_status, .. } => AnalysisPhase::Stalled {
                last_status: last_status.clone(),
            },
        };
        *view = AnalysisView::new(generation, phase, true);
        true
    }

    /// Show a terminal state read from storage unless a job is running
    pub fn hydrate(&self, workout_id: &WorkoutId, state: HydratedState) -> bool {
        let phase = match state {
            HydratedState::Ready(analysis) => AnalysisPhase::Ready { analysis },
            HydratedState::Failed(message) => AnalysisPhase::Failed { message },
        };
        match self.views.entry(workout_id.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_running() {
                    return false;
                }
                let generation = slot.get().generation;
                slot.insert(AnalysisView::new(generation, phase, true));
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(AnalysisView::new(0, phase, true));
                true
            }
        }
    }

    /// Current view of a workout
    #[must_use]
    pub fn get(&self, workout_id: &WorkoutId) -> Option<AnalysisView> {
        self.views.get(workout_id).map(|view| view.clone())
    }

    /// Views of every known workout, sorted by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<(WorkoutId, AnalysisView)> {
        let mut views: Vec<_> = self
            .views
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        views.sort_by(|a, b| a.0.cmp(&b.0));
        views
    }

    /// Forget a workout
    pub fn remove(&self, workout_id: &WorkoutId) -> Option<AnalysisView> {
        self.views.remove(workout_id).map(|(_, view)| view)
    }

    /// Number of workouts on the board
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the board is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
