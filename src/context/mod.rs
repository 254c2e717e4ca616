// ABOUTME: Training context resources backed by pre-computed edge functions
// ABOUTME: Named constructors for training, overall, weekly, and coach-week context blobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Training context resources
//!
//! Load ratios, readiness and weekly summaries are computed server-side.
//! These resources only fetch the resulting JSON and track its freshness;
//! payloads are passed through untouched.

/// Generic cached edge-function resource
pub mod resource;

pub use resource::{EdgeResource, ResourceSnapshot};

use cadence_backend::FunctionInvoker;
use cadence_core::constants::context_functions;
use chrono::{Datelike, Days, NaiveDate};
use serde_json::{json, Value};
use std::sync::Arc;

/// Opaque context payload
pub type ContextPayload = Value;

/// Daily training context for `date`
#[must_use]
pub fn training_context(
    invoker: Arc<dyn FunctionInvoker>,
    date: NaiveDate,
) -> EdgeResource<ContextPayload> {
    EdgeResource::new(
        invoker,
        context_functions::TRAINING_CONTEXT,
        json!({ "date": date.to_string() }),
    )
}

/// Overview of the last `weeks` weeks
#[must_use]
pub fn overall_context(
    invoker: Arc<dyn FunctionInvoker>,
    weeks: u32,
) -> EdgeResource<ContextPayload> {
    EdgeResource::new(
        invoker,
        context_functions::OVERALL_CONTEXT,
        json!({ "weeks": weeks.max(1) }),
    )
}

/// Summary of the training week containing `week_start`
#[must_use]
pub fn weekly_summary(
    invoker: Arc<dyn FunctionInvoker>,
    week_start: NaiveDate,
) -> EdgeResource<ContextPayload> {
    EdgeResource::new(
        invoker,
        context_functions::WEEKLY_SUMMARY,
        json!({ "week_start": week_start_of(week_start).to_string() }),
    )
}

/// Coach view of the training week containing `week_start`
#[must_use]
pub fn coach_week_context(
    invoker: Arc<dyn FunctionInvoker>,
    week_start: NaiveDate,
) -> EdgeResource<ContextPayload> {
    EdgeResource::new(
        invoker,
        context_functions::COACH_WEEK_CONTEXT,
        json!({ "week_start": week_start_of(week_start).to_string() }),
    )
}

/// Monday of the ISO week containing `date`
#[must_use]
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}
