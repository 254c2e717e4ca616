// ABOUTME: Context command for cadence-cli
// ABOUTME: Fetches a pre-computed training context blob and prints it as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::helpers::display;
use cadence::backend::FunctionInvoker;
use cadence::context::{
    coach_week_context, overall_context, training_context, weekly_summary, ContextPayload,
    EdgeResource,
};
use cadence::errors::AppResult;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

/// Context blob to fetch
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Training,
    Overall,
    Weekly,
    CoachWeek,
}

/// Fetch one context blob
pub async fn run(
    invoker: Arc<dyn FunctionInvoker>,
    kind: Kind,
    date: Option<NaiveDate>,
    weeks: u32,
) -> AppResult<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let resource: EdgeResource<ContextPayload> = match kind {
        Kind::Training => training_context(invoker, date),
        Kind::Overall => overall_context(invoker, weeks),
        Kind::Weekly => weekly_summary(invoker, date),
        Kind::CoachWeek => coach_week_context(invoker, date),
    };
    debug!(function = resource.function(), params = %resource.params(), "Fetching context");

    let payload = resource.refresh().await?;
    display::print_json(&payload)
}
