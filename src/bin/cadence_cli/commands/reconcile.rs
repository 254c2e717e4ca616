// ABOUTME: Reconcile command for cadence-cli
// ABOUTME: Hydrates finished workouts, resumes in-flight ones, and waits for resumed jobs to settle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::helpers::display;
use cadence::analysis::{AnalysisEvent, AnalysisTracker};
use cadence::backend::AnalysisBackend;
use cadence::config::CadenceConfig;
use cadence::errors::{AppError, AppResult};
use cadence::models::WorkoutId;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Reconcile `workout_ids` and wait for any resumed polling to finish
pub async fn run(
    backend: Arc<dyn AnalysisBackend>,
    config: &CadenceConfig,
    workout_ids: &[String],
    json: bool,
) -> AppResult<()> {
    let ids = workout_ids
        .iter()
        .map(WorkoutId::new)
        .collect::<AppResult<Vec<_>>>()?;

    let tracker = AnalysisTracker::from_config(backend, &config.polling);
    let mut events = tracker.subscribe();
    let report = tracker.reconcile(&ids).await;
    info!(
        total = report.total(),
        resumed = report.resumed.len(),
        errors = report.errors.len(),
        "Reconciliation pass finished"
    );

    if !report.resumed.is_empty() {
        if !json {
            println!("Waiting for {} resumed analyses...", report.resumed.len());
        }
        wait_for_jobs(&tracker, &mut events, json).await;
    }

    if json {
        let board = tracker.board().snapshot();
        display::print_json(&json!({ "report": report, "board": board }))?;
    } else {
        display::print_reconcile_report(&report);
        display::print_board(&tracker.board().snapshot());
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::external_service(
            "reconcile",
            format!("{} workouts could not be read", report.errors.len()),
        ))
    }
}

async fn wait_for_jobs(
    tracker: &AnalysisTracker,
    events: &mut tokio::sync::broadcast::Receiver<AnalysisEvent>,
    json: bool,
) {
    let mut interrupted = false;
    while tracker.active_count() > 0 {
        tokio::select! {
            event = events.recv() => match event {
                Ok(AnalysisEvent::Settled { workout_id, outcome, .. }) if !json => {
                    println!("  {workout_id}: {}", outcome.label());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            result = signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                } else {
                    warn!("Interrupted, cancelling resumed analyses");
                    tracker.shutdown().await;
                }
            }
        }
    }
}
