// ABOUTME: Configuration management module for the Cadence client
// ABOUTME: Groups Supabase, polling, and network settings loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module
//!
//! - **Environment**: Supabase connection and deployment environment
//! - **Polling**: analysis backoff and stall tolerance
//! - **Network**: HTTP timeouts and circuit breaker thresholds

/// Environment and top-level client configuration
pub mod environment;
/// HTTP client and circuit breaker configuration
pub mod network;
/// Analysis polling configuration
pub mod polling;

pub use environment::{CadenceConfig, Environment, SupabaseSettings};
pub use network::NetworkConfig;
pub use polling::PollingConfig;
