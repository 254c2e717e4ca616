// ABOUTME: Core data models for workouts and their server-side analysis
// ABOUTME: Re-exports workout identifiers, analysis statuses, rows, and reports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Analysis status, status rows, and analysis reports
pub mod analysis;
/// Workout identifiers
pub mod workout;

pub use analysis::{
    AnalysisReport, AnalysisStatus, AnalysisStatusRow, Insight, InsightSeverity, StatusReading,
    WorkoutAnalysis,
};
pub use workout::WorkoutId;
