// ABOUTME: Hosted backend access for the Cadence workout analysis client
// ABOUTME: Backend traits, circuit breaker, shared HTTP client, and the Supabase implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Backend client and core abstractions.
//!
//! The analysis engine only sees the [`AnalysisBackend`] and
//! [`FunctionInvoker`] traits; [`SupabaseBackend`] is the production
//! implementation and tests substitute in-memory ones.

// Re-export cadence-core modules so callers need a single dependency
pub use cadence_core::constants;
pub use cadence_core::errors;
pub use cadence_core::models;

/// Traits the analysis engine and context resources depend on
pub mod backend;
/// Circuit breaker pattern for backend resilience
pub mod circuit_breaker;
/// Shared HTTP client for backend calls
pub mod http_client;
/// Supabase REST and Edge Function client
pub mod supabase;

pub use backend::{AnalysisBackend, FunctionInvoker};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use http_client::{build_client, initialize_shared_client, shared_client, HttpTimeouts};
pub use supabase::{SupabaseBackend, SupabaseConfig};
