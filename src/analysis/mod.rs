// ABOUTME: Analysis engine that triggers server-side workout analysis and waits for results
// ABOUTME: Backoff, polling, cancellation, job tracking, and reconciliation of displayed state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Workout analysis engine
//!
//! - **backoff**: delay schedule between status reads
//! - **poller**: the poll loop for a single job
//! - **tracker**: one job per workout, superseding and shutdown
//! - **board**: generation-checked view of each workout's analysis
//! - **reconcile**: hydrate the board from stored rows

/// Delay schedule between status reads
pub mod backoff;
/// Per-workout analysis view
pub mod board;
/// Cancellation handle with reason
pub mod cancel;
/// Job outcomes and tracker events
pub mod outcome;
/// Poll loop for a single job
pub mod poller;
/// Reconciliation of the board with stored rows
pub mod reconcile;
/// Registry of running jobs
pub mod tracker;

pub use backoff::BackoffPolicy;
pub use board::{AnalysisBoard, AnalysisPhase, AnalysisView, HydratedState};
pub use cancel::PollCancellation;
pub use outcome::{AnalysisEvent, AnalysisOutcome, CancelReason};
pub use poller::{AnalysisPoller, PollProgress};
pub use reconcile::ReconcileReport;
pub use tracker::{AnalysisHandle, AnalysisTracker};
