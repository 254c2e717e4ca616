// ABOUTME: Status command for cadence-cli
// ABOUTME: Reads the stored analysis status of one workout without triggering anything
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::helpers::display;
use cadence::backend::AnalysisBackend;
use cadence::errors::{AppError, AppResult};
use cadence::models::{AnalysisStatus, WorkoutId};
use serde_json::json;

/// Print the stored row, and the report when the analysis is complete
pub async fn run(backend: &dyn AnalysisBackend, workout_id: &str, json: bool) -> AppResult<()> {
    let workout_id = WorkoutId::new(workout_id)?;
    let row = backend
        .fetch_status(&workout_id)
        .await
        .map_err(AppError::from)?;

    let analysis = if row.reading().status() == Some(AnalysisStatus::Complete) {
        backend
            .fetch_analysis(&workout_id)
            .await
            .map_err(AppError::from)?
    } else {
        None
    };

    if json {
        return display::print_json(&json!({ "row": row, "analysis": analysis }));
    }

    display::print_status_row(&row);
    if let Some(analysis) = &analysis {
        display::print_analysis(analysis);
    }
    Ok(())
}
