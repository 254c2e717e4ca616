// ABOUTME: Workout analysis status, status rows, and analysis report models
// ABOUTME: Classifies raw status column values into known, missing, or unrecognized readings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::workout::WorkoutId;
use crate::constants::polling;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle of a server-side analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Queued, not yet picked up
    Pending,
    /// Worker is running
    Analyzing,
    /// Report has been written
    Complete,
    /// Worker gave up; see the error column
    Failed,
}

impl AnalysisStatus {
    /// Parse a status column value, accepting the aliases the backend has used
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Some(Self::Pending),
            "analyzing" | "processing" | "running" => Some(Self::Analyzing),
            "complete" | "completed" | "done" => Some(Self::Complete),
            "failed" | "error" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether polling stops at this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Canonical column value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpretation of a raw status column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReading {
    /// A recognized status
    Known(AnalysisStatus),
    /// Column was null
    Missing,
    /// Column held a value nobody recognizes
    Unrecognized(String),
}

impl StatusReading {
    /// Known status, if any
    #[must_use]
    pub const fn status(&self) -> Option<AnalysisStatus> {
        match self {
            Self::Known(status) => Some(*status),
            Self::Missing | Self::Unrecognized(_) => None,
        }
    }

    /// Missing and unrecognized readings both count towards a stall
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        !matches!(self, Self::Known(_))
    }

    /// Short label for logs and views
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Known(status) => status.as_str().to_owned(),
            Self::Missing => "null".to_owned(),
            Self::Unrecognized(raw) => raw.clone(),
        }
    }
}

/// Status columns of a workout row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStatusRow {
    /// Workout id
    pub id: WorkoutId,
    /// Raw status column
    #[serde(default)]
    pub analysis_status: Option<String>,
    /// Failure message written by the worker
    #[serde(default)]
    pub analysis_error: Option<String>,
    /// Last time the row changed
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AnalysisStatusRow {
    /// Classify the raw status column
    #[must_use]
    pub fn reading(&self) -> StatusReading {
        match self.analysis_status.as_deref() {
            None => StatusReading::Missing,
            Some(raw) if raw.trim().is_empty() => StatusReading::Missing,
            Some(raw) => AnalysisStatus::parse(raw)
                .map_or_else(|| StatusReading::Unrecognized(raw.to_owned()), StatusReading::Known),
        }
    }

    /// Failure message recorded by the worker, or a default when it left none
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.analysis_error
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map_or_else(|| polling::DEFAULT_FAILURE_MESSAGE.to_owned(), str::to_owned)
    }
}

/// How much attention an insight deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    /// Neutral observation
    #[default]
    Info,
    /// Something went well
    Positive,
    /// Worth keeping an eye on
    Warning,
    /// Needs action
    Critical,
}

impl InsightSeverity {
    /// Parse a severity label; unknown labels degrade to `Info`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" | "good" => Self::Positive,
            "warning" | "warn" => Self::Warning,
            "critical" | "alert" => Self::Critical,
            _ => Self::Info,
        }
    }
}

impl<'de> Deserialize<'de> for InsightSeverity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Info, Self::parse))
    }
}

/// A single observation produced by the analysis job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Grouping such as "pacing" or "heart_rate"
    #[serde(default)]
    pub category: String,
    /// Headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub message: String,
    /// Severity
    #[serde(default)]
    pub severity: InsightSeverity,
}

/// Report payload stored in the analysis column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// One-paragraph summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Ordered insights
    #[serde(default)]
    pub insights: Vec<Insight>,
    /// Server-computed metrics, passed through untouched
    #[serde(default)]
    pub metrics: serde_json::Value,
    /// When the worker produced the report
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Completed analysis for one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutAnalysis {
    /// Workout the report belongs to
    pub workout_id: WorkoutId,
    /// The report itself
    #[serde(flatten)]
    pub report: AnalysisReport,
}

impl WorkoutAnalysis {
    /// Insights at warning level or above
    pub fn flagged_insights(&self) -> impl Iterator<Item = &Insight> {
        self.report.insights.iter().filter(|insight| {
            matches!(
                insight.severity,
                InsightSeverity::Warning | InsightSeverity::Critical
            )
        })
    }
}
