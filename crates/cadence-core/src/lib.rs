// ABOUTME: Core types and constants for the Cadence workout analysis client
// ABOUTME: Foundation crate with error handling, analysis models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Cadence Core
//!
//! Foundation crate shared by the backend client and the analysis engine.
//! It changes rarely, which keeps incremental builds of the other crates fast.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and `BackendError`
//! - **constants**: backend names, environment keys, polling defaults
//! - **models**: workout ids, analysis statuses, and analysis reports

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Workout and analysis data models
pub mod models;
