// ABOUTME: Registry of running analysis jobs keyed by workout id
// ABOUTME: Enforces one job per workout, supersedes older jobs, and cancels everything on shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Analysis job tracker
//!
//! [`AnalysisTracker::start`] invokes the analysis edge function and polls the
//! workout row until it settles. At most one job runs per workout: starting a
//! second one cancels the first with [`CancelReason::Superseded`] before the
//! new job is registered. Every job runs on a tracked task so
//! [`AnalysisTracker::shutdown`] can cancel and drain them all.

use super::board::AnalysisBoard;
use super::cancel::PollCancellation;
use super::outcome::{AnalysisEvent, AnalysisOutcome, CancelReason};
use super::poller::{AnalysisPoller, PollProgress};
use crate::config::PollingConfig;
use crate::logging::AnalysisLogger;
use cadence_backend::AnalysisBackend;
use cadence_core::errors::{AppError, AppResult, ErrorCode};
use cadence_core::models::WorkoutId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio_util::task::TaskTracker;
use tracing::info;

/// Capacity of the event channel; slow subscribers observe `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 256;

struct ActiveJob {
    generation: u64,
    cancellation: PollCancellation,
}

struct TrackerInner {
    poller: AnalysisPoller,
    jobs: DashMap<WorkoutId, ActiveJob>,
    board: AnalysisBoard,
    events: broadcast::Sender<AnalysisEvent>,
    generations: AtomicU64,
    tasks: TaskTracker,
}

/// Handle to one analysis job
#[derive(Debug)]
pub struct AnalysisHandle {
    workout_id: WorkoutId,
    generation: u64,
    cancellation: PollCancellation,
    receiver: oneshot::Receiver<AnalysisOutcome>,
}

impl AnalysisHandle {
    /// Workout being analyzed
    #[must_use]
    pub const fn workout_id(&self) -> &WorkoutId {
        &self.workout_id
    }

    /// Generation assigned to this job
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel this job; returns `false` if it was already cancelled
    pub fn cancel(&self) -> bool {
        self.cancellation.cancel(CancelReason::Requested)
    }

    /// Wait for the job's outcome; resolves exactly once
    pub async fn wait(self) -> AnalysisOutcome {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => AnalysisOutcome::Cancelled(
                self.cancellation.reason().unwrap_or(CancelReason::Shutdown),
            ),
        }
    }
}

/// Owns every running analysis job
#[derive(Clone)]
pub struct AnalysisTracker {
    inner: Arc<TrackerInner>,
}

impl AnalysisTracker {
    /// Create a tracker around a configured poller
    #[must_use]
    pub fn new(poller: AnalysisPoller) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(TrackerInner {
                poller,
                jobs: DashMap::new(),
                board: AnalysisBoard::new(),
                events,
                generations: AtomicU64::new(0),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Create a tracker from polling configuration
    #[must_use]
    pub fn from_config(backend: Arc<dyn AnalysisBackend>, config: &PollingConfig) -> Self {
        Self::new(
            AnalysisPoller::new(backend, config.backoff_policy())
                .with_stall_threshold(config.stall_threshold),
        )
    }

    /// Trigger analysis for a workout and poll until it settles
    ///
    /// Any job already running for the workout is superseded.
    ///
    /// # Errors
    ///
    /// Returns `ResourceUnavailable` once shutdown has begun
    pub fn start(&self, workout_id: WorkoutId) -> AppResult<AnalysisHandle> {
        self.spawn_replacing(workout_id, true)
    }

    /// Poll a workout whose analysis is already in flight, without triggering it
    ///
    /// # Errors
    ///
    /// Returns `ResourceUnavailable` once shutdown has begun
    pub fn resume(&self, workout_id: WorkoutId) -> AppResult<AnalysisHandle> {
        self.spawn_replacing(workout_id, false)
    }

    /// Poll an in-flight workout only if no job is running for it
    ///
    /// Returns `None` and leaves the running job untouched otherwise. The
    /// check and the registration happen under the same entry lock.
    ///
    /// # Errors
    ///
    /// Returns `ResourceUnavailable` once shutdown has begun
    pub fn resume_if_idle(&self, workout_id: WorkoutId) -> AppResult<Option<AnalysisHandle>> {
        self.spawn_job(workout_id, false, false)
    }

    /// Cancel the running job for a workout; returns whether one existed
    pub fn cancel(&self, workout_id: &WorkoutId) -> bool {
        let Some((_, job)) = self.inner.jobs.remove(workout_id) else {
            return false;
        };
        job.cancellation.cancel(CancelReason::Requested);
        true
    }

    /// Refuse new jobs, cancel every running job, and wait for all of them to finish
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        for job in self.inner.jobs.iter() {
            job.cancellation.cancel(CancelReason::Shutdown);
        }
        self.inner.tasks.wait().await;
        info!("Analysis tracker shut down");
    }

    /// Whether shutdown has begun
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.tasks.is_closed()
    }

    /// Whether a job is running for the workout
    #[must_use]
    pub fn is_active(&self, workout_id: &WorkoutId) -> bool {
        self.inner.jobs.contains_key(workout_id)
    }

    /// Generation of the running job for the workout
    #[must_use]
    pub fn active_generation(&self, workout_id: &WorkoutId) -> Option<u64> {
        self.inner.jobs.get(workout_id).map(|job| job.generation)
    }

    /// Number of running jobs
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.jobs.len()
    }

    /// Subscribe to job events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.inner.events.subscribe()
    }

    /// Displayed state of every workout this tracker has seen
    #[must_use]
    pub fn board(&self) -> &AnalysisBoard {
        &self.inner.board
    }

    /// Backend used for status reads
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        self.inner.poller.backend()
    }

    fn shutting_down_error(workout_id: &WorkoutId) -> AppError {
        AppError::new(
            ErrorCode::ResourceUnavailable,
            "analysis tracker is shutting down",
        )
        .with_resource_id(workout_id.as_str())
    }

    fn spawn_replacing(&self, workout_id: WorkoutId, trigger: bool) -> AppResult<AnalysisHandle> {
        let id = workout_id.clone();
        self.spawn_job(workout_id, trigger, true)?.ok_or_else(|| {
            AppError::internal("replacing job was not registered").with_resource_id(id.as_str())
        })
    }

    fn spawn_job(
        &self,
        workout_id: WorkoutId,
        trigger: bool,
        replace: bool,
    ) -> AppResult<Option<AnalysisHandle>> {
        if self.is_shutting_down() {
            return Err(Self::shutting_down_error(&workout_id));
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let cancellation = PollCancellation::new();
        let job = ActiveJob {
            generation,
            cancellation: cancellation.clone(),
        };

        // Swap under the shard lock so two starts cannot both survive
        let superseded = match self.inner.jobs.entry(workout_id.clone()) {
            Entry::Occupied(_) if !replace => return Ok(None),
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(job);
                previous.cancellation.cancel(CancelReason::Superseded);
                Some(previous.generation)
            }
            Entry::Vacant(slot) => {
                slot.insert(job);
                None
            }
        };

        // Shutdown may have swept the registry between the check and the insert
        if self.is_shutting_down() {
            self.inner
                .jobs
                .remove_if(&workout_id, |_, job| job.generation == generation);
            cancellation.cancel(CancelReason::Shutdown);
            return Err(Self::shutting_down_error(&workout_id));
        }

        if let Some(old_generation) = superseded {
            AnalysisLogger::log_job_superseded(&workout_id, old_generation, generation);
        }
        AnalysisLogger::log_job_started(&workout_id, generation, trigger);
        self.inner.board.begin(&workout_id, generation);
        // No subscribers is fine
        let _ = self.inner.events.send(AnalysisEvent::Started {
            workout_id: workout_id.clone(),
            generation,
            triggered: trigger,
        });

        let (sender, receiver) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let job_id = workout_id.clone();
        let job_cancellation = cancellation.clone();
        self.inner.tasks.spawn(async move {
            inner
                .run_job(job_id, generation, job_cancellation, trigger, sender)
                .await;
        });

        Ok(Some(AnalysisHandle {
            workout_id,
            generation,
            cancellation,
            receiver,
        }))
    }
}

impl TrackerInner {
    async fn run_job(
        &self,
        workout_id: WorkoutId,
        generation: u64,
        cancellation: PollCancellation,
        trigger: bool,
        sender: oneshot::Sender<AnalysisOutcome>,
    ) {
        let outcome = self.drive(&workout_id, generation, &cancellation, trigger).await;
        // A job cancelled mid-flight reports the cancellation, never a late result
        let outcome = match cancellation.reason() {
            Some(reason) => AnalysisOutcome::Cancelled(reason),
            None => outcome,
        };

        self.jobs
            .remove_if(&workout_id, |_, job| job.generation == generation);
        self.board.settle(&workout_id, generation, &outcome);
        AnalysisLogger::log_outcome(
            &workout_id,
            generation,
            outcome.label(),
            outcome.is_complete(),
        );
        let _ = self.events.send(AnalysisEvent::Settled {
            workout_id,
            generation,
            outcome: outcome.clone(),
        });
        // Receiver may have been dropped by a caller that stopped waiting
        let _ = sender.send(outcome);
    }

    async fn drive(
        &self,
        workout_id: &WorkoutId,
        generation: u64,
        cancellation: &PollCancellation,
        trigger: bool,
    ) -> AnalysisOutcome {
        if trigger {
            let backend = self.poller.backend();
            match cancellation.guard(backend.trigger_analysis(workout_id)).await {
                Err(reason) => return AnalysisOutcome::Cancelled(reason),
                Ok(Err(error)) => return AnalysisOutcome::from_backend_error(&error),
                Ok(Ok(())) => {}
            }
        }

        self.poller
            .poll(workout_id, cancellation, |progress: PollProgress| {
                let status = progress.reading.label();
                self.board
                    .progress(workout_id, generation, progress.attempt, &status);
                let _ = self.events.send(AnalysisEvent::Polled {
                    workout_id: workout_id.clone(),
                    generation,
                    attempt: progress.attempt,
                    status,
                });
            })
            .await
    }
}
