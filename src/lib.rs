// ABOUTME: Main library entry point for the Cadence workout analysis client
// ABOUTME: Triggers server-side workout analysis, waits for results, and fetches training context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Cadence
//!
//! Client layer for a fitness tracker whose analytics run on a hosted
//! Supabase backend. Analysis is computed by an edge function and written
//! back to the workout row; Cadence triggers it, polls the row with backoff
//! until it settles, and reconciles what is displayed with what is stored.
//!
//! ## Architecture
//!
//! - **analysis**: backoff, poller, job tracker, and reconciliation board
//! - **backend**: Supabase client behind the `AnalysisBackend` and
//!   `FunctionInvoker` traits (from `cadence-backend`)
//! - **context**: cached training context blobs from edge functions
//! - **config**: environment-only configuration
//! - **logging**: tracing setup and structured analysis events
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence::analysis::AnalysisTracker;
//! use cadence::backend::SupabaseBackend;
//! use cadence::config::CadenceConfig;
//! use cadence::errors::AppResult;
//! use cadence::models::WorkoutId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = CadenceConfig::from_env()?;
//!     let backend = Arc::new(SupabaseBackend::new(config.supabase_config()?));
//!     let tracker = AnalysisTracker::from_config(backend, &config.polling);
//!
//!     let workout_id = WorkoutId::new("2f1c8a4e-9b7d-4c1e-8f3a-0d6b5e4c3a21")?;
//!     let outcome = tracker.start(workout_id.clone())?.wait().await;
//!     let analysis = outcome.into_result(&workout_id)?;
//!     println!("{:?}", analysis.report.summary);
//!     Ok(())
//! }
//! ```

pub use cadence_core::constants;
pub use cadence_core::errors;
pub use cadence_core::models;

/// Supabase backend client and backend traits
pub use cadence_backend as backend;

/// Analysis engine: backoff, polling, tracking, reconciliation
pub mod analysis;

/// Environment-only configuration
pub mod config;

/// Cached training context resources
pub mod context;

/// Logging configuration and structured analysis events
pub mod logging;
