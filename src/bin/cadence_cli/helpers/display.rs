// ABOUTME: Output formatting helpers for cadence-cli
// ABOUTME: Provides consistent display functions for outcomes, reports, rows, and errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence::analysis::{AnalysisOutcome, AnalysisPhase, AnalysisView, ReconcileReport};
use cadence::errors::{AppError, AppResult};
use cadence::models::{AnalysisStatusRow, InsightSeverity, WorkoutAnalysis, WorkoutId};
use serde::Serialize;
use std::time::Duration;

/// Pretty-print any serializable value to stdout
pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

/// Announce a job before polling starts
pub fn print_started(workout_id: &WorkoutId, resumed: bool, budget: Duration) {
    let verb = if resumed { "Resuming" } else { "Started" };
    eprintln!(
        "{verb} analysis for workout {workout_id} (gives up after ~{}s)",
        budget.as_secs()
    );
}

/// One line per status read
pub fn print_progress(attempt: u32, status: &str) {
    eprintln!("  attempt {attempt:>2}: {status}");
}

/// Human-readable outcome
pub fn print_outcome(workout_id: &WorkoutId, outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Complete(analysis) => {
            println!("\nAnalysis complete for workout {workout_id}");
            print_analysis(analysis);
        }
        AnalysisOutcome::Failed { message } => {
            println!("\nAnalysis failed for workout {workout_id}: {message}");
        }
        AnalysisOutcome::TimedOut { attempts } => {
            println!(
                "\nAnalysis for workout {workout_id} still running after {attempts} checks; try `cadence-cli analyze {workout_id} --resume` later"
            );
        }
        AnalysisOutcome::Stalled {
            last_status,
            reset_applied,
        } => {
            println!("\nAnalysis for workout {workout_id} stalled in '{last_status}'");
            if *reset_applied {
                println!("The row was reset; run `cadence-cli analyze {workout_id}` to retry");
            } else {
                println!("Resetting the row also failed; check the backend");
            }
        }
        AnalysisOutcome::Error { code, message } => {
            println!("\nAnalysis for workout {workout_id} could not be tracked ({code:?}): {message}");
        }
        AnalysisOutcome::Cancelled(reason) => {
            println!("\nAnalysis polling for workout {workout_id} cancelled ({reason})");
        }
    }
}

/// Summary and insights of a finished report
pub fn print_analysis(analysis: &WorkoutAnalysis) {
    println!("{}", "=".repeat(60));
    if let Some(summary) = &analysis.report.summary {
        println!("{summary}");
    }
    if let Some(analyzed_at) = analysis.report.analyzed_at {
        println!("Analyzed: {}", analyzed_at.format("%Y-%m-%d %H:%M UTC"));
    }
    if !analysis.report.insights.is_empty() {
        println!("\nInsights:");
        for insight in &analysis.report.insights {
            let marker = match insight.severity {
                InsightSeverity::Critical => "!!",
                InsightSeverity::Warning => "! ",
                InsightSeverity::Positive => "+ ",
                InsightSeverity::Info => "- ",
            };
            println!("  {marker} {}", insight.title);
            if !insight.message.is_empty() {
                println!("     {}", insight.message);
            }
        }
    }
    println!("{}", "=".repeat(60));
}

/// Stored status row
pub fn print_status_row(row: &AnalysisStatusRow) {
    println!("Workout: {}", row.id);
    println!("Status:  {}", row.reading().label());
    if let Some(error) = &row.analysis_error {
        println!("Error:   {error}");
    }
    if let Some(updated_at) = row.updated_at {
        println!("Updated: {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

/// Per-category reconciliation results
pub fn print_reconcile_report(report: &ReconcileReport) {
    println!("\nReconciled {} workouts", report.total());
    print_group("Ready", &report.ready);
    print_group("Failed", &report.failed);
    print_group("Resumed", &report.resumed);
    print_group("Already active", &report.already_active);
    print_group("Never analyzed", &report.idle);
    print_group("Missing", &report.missing);
    for (workout_id, error) in &report.errors {
        println!("  error    {workout_id}: {error}");
    }
}

fn print_group(label: &str, ids: &[WorkoutId]) {
    if ids.is_empty() {
        return;
    }
    let joined = ids
        .iter()
        .map(WorkoutId::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    println!("  {label}: {joined}");
}

/// Current board contents
pub fn print_board(views: &[(WorkoutId, AnalysisView)]) {
    if views.is_empty() {
        return;
    }
    println!("\n{:<40} {:<10} DETAIL", "WORKOUT", "PHASE");
    for (workout_id, view) in views {
        let detail = match &view.phase {
            AnalysisPhase::Running {
                attempt,
                last_status,
            } => format!(
                "attempt {attempt}, last status {}",
                last_status.as_deref().unwrap_or("-")
            ),
            AnalysisPhase::Ready { analysis } => {
                analysis.report.summary.clone().unwrap_or_default()
            }
            AnalysisPhase::Failed { message } => message.clone(),
            AnalysisPhase::TimedOut { attempts } => format!("{attempts} checks"),
            AnalysisPhase::Stalled { last_status } => format!("stuck in '{last_status}'"),
            AnalysisPhase::Idle => String::new(),
        };
        println!(
            "{:<40} {:<10} {detail}",
            workout_id.as_str(),
            view.phase.label()
        );
    }
}

/// Error message for a failed command
pub fn print_error(error: &AppError) {
    eprintln!("Error: {error}");
    if let Some(resource) = &error.context.resource_id {
        eprintln!("  resource: {resource}");
    }
}
