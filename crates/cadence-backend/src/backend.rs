// ABOUTME: Backend traits consumed by the analysis engine and context resources
// ABOUTME: Separates job triggering, status reads, and function invocation from transport details
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use cadence_core::errors::BackendError;
use cadence_core::models::{AnalysisStatusRow, WorkoutAnalysis, WorkoutId};

/// Operations the analysis poller needs from the hosted backend
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently for different workouts.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Ask the backend to (re)run analysis for a workout
    ///
    /// # Errors
    ///
    /// Returns an error if the analysis job could not be queued
    async fn trigger_analysis(&self, workout_id: &WorkoutId) -> Result<(), BackendError>;

    /// Read the status columns of a workout
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not exist, or a transport error
    async fn fetch_status(&self, workout_id: &WorkoutId)
        -> Result<AnalysisStatusRow, BackendError>;

    /// Read the analysis report; `None` while the report is not visible yet
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not exist, or a transport/parse error
    async fn fetch_analysis(
        &self,
        workout_id: &WorkoutId,
    ) -> Result<Option<WorkoutAnalysis>, BackendError>;

    /// Force a stuck row into the `failed` state so it can be re-triggered
    ///
    /// # Errors
    ///
    /// Returns an error if the row could not be updated
    async fn reset_analysis(&self, workout_id: &WorkoutId, reason: &str)
        -> Result<(), BackendError>;
}

/// Invocation of edge functions returning pre-computed JSON
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Call `function` with a JSON body and return its JSON response
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response is not JSON
    async fn invoke(
        &self,
        function: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError>;
}
