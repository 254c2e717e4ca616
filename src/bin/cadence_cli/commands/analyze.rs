// ABOUTME: Analyze command for cadence-cli
// ABOUTME: Triggers or resumes analysis, streams poll progress, and shuts down cleanly on Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::helpers::display;
use cadence::analysis::{AnalysisEvent, AnalysisTracker};
use cadence::backend::AnalysisBackend;
use cadence::config::CadenceConfig;
use cadence::errors::AppResult;
use cadence::models::WorkoutId;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Run one analysis job to completion
pub async fn run(
    backend: Arc<dyn AnalysisBackend>,
    config: &CadenceConfig,
    workout_id: &str,
    resume: bool,
    json: bool,
) -> AppResult<()> {
    let workout_id = WorkoutId::new(workout_id)?;
    let tracker = AnalysisTracker::from_config(backend, &config.polling);

    let mut events = tracker.subscribe();
    let handle = if resume {
        tracker.resume(workout_id.clone())?
    } else {
        tracker.start(workout_id.clone())?
    };
    if !json {
        display::print_started(&workout_id, resume, tracker_budget(config));
    }

    let wait = handle.wait();
    tokio::pin!(wait);
    let mut events_open = true;
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            event = events.recv(), if events_open => match event {
                Ok(AnalysisEvent::Polled { attempt, status, .. }) if !json => {
                    display::print_progress(attempt, &status);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => events_open = false,
            },
            result = signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                } else {
                    warn!("Interrupted, cancelling analysis");
                    tracker.shutdown().await;
                }
            }
        }
    };

    if json {
        display::print_json(&outcome)?;
    } else {
        display::print_outcome(&workout_id, &outcome);
    }
    outcome.into_result(&workout_id).map(|_| ())
}

fn tracker_budget(config: &CadenceConfig) -> Duration {
    config.polling.backoff_policy().total_budget()
}
