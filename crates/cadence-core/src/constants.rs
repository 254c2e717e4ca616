// ABOUTME: Application constants organized by domain
// ABOUTME: Backend names, environment variable keys, and polling defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain rather than kept in a single flat list.

/// Service names used in logs and error messages
pub mod service_names {
    /// Name reported by the logging layer
    pub const CADENCE: &str = "cadence";
    /// Supabase REST API (`PostgREST`)
    pub const SUPABASE_REST: &str = "supabase-rest";
    /// Supabase Edge Functions
    pub const SUPABASE_FUNCTIONS: &str = "supabase-functions";
}

/// Supabase tables, columns and edge function names
pub mod backend {
    /// Default table holding workouts and their analysis columns
    pub const DEFAULT_WORKOUTS_TABLE: &str = "workouts";
    /// Default edge function that runs workout analysis
    pub const DEFAULT_ANALYSIS_FUNCTION: &str = "analyze-workout";
    /// Column holding the analysis job status
    pub const STATUS_COLUMN: &str = "analysis_status";
    /// Column holding the failure message of the analysis job
    pub const ERROR_COLUMN: &str = "analysis_error";
    /// Column holding the analysis report as JSON
    pub const ANALYSIS_COLUMN: &str = "workout_analysis";
    /// REST path prefix
    pub const REST_PATH: &str = "rest/v1";
    /// Edge functions path prefix
    pub const FUNCTIONS_PATH: &str = "functions/v1";
}

/// Edge functions returning pre-computed context blobs
pub mod context_functions {
    /// Daily training context (acute/chronic load, readiness)
    pub const TRAINING_CONTEXT: &str = "training-context";
    /// Multi-week overview
    pub const OVERALL_CONTEXT: &str = "overall-context";
    /// Summary of a single training week
    pub const WEEKLY_SUMMARY: &str = "weekly-summary";
    /// Coach-facing view of a training week
    pub const COACH_WEEK_CONTEXT: &str = "coach-week-context";
}

/// Environment variable names
pub mod env_keys {
    /// Supabase project URL
    pub const SUPABASE_URL: &str = "SUPABASE_URL";
    /// Supabase anonymous (publishable) key
    pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
    /// Signed-in user's access token
    pub const SUPABASE_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";
    /// Analysis edge function name
    pub const ANALYSIS_FUNCTION: &str = "ANALYSIS_FUNCTION";
    /// Workouts table name
    pub const WORKOUTS_TABLE: &str = "WORKOUTS_TABLE";
    /// First poll delay in milliseconds
    pub const POLL_INITIAL_DELAY_MS: &str = "ANALYSIS_POLL_INITIAL_DELAY_MS";
    /// Poll delay ceiling in milliseconds
    pub const POLL_MAX_DELAY_MS: &str = "ANALYSIS_POLL_MAX_DELAY_MS";
    /// Exponential growth factor between polls
    pub const POLL_MULTIPLIER: &str = "ANALYSIS_POLL_MULTIPLIER";
    /// Maximum number of status reads
    pub const POLL_MAX_ATTEMPTS: &str = "ANALYSIS_POLL_MAX_ATTEMPTS";
    /// Randomize poll delays
    pub const POLL_JITTER: &str = "ANALYSIS_POLL_JITTER";
    /// Consecutive unexpected statuses before a reset
    pub const STALL_THRESHOLD: &str = "ANALYSIS_STALL_THRESHOLD";
    /// HTTP request timeout in seconds
    pub const HTTP_CLIENT_TIMEOUT_SECS: &str = "HTTP_CLIENT_TIMEOUT_SECS";
    /// HTTP connect timeout in seconds
    pub const HTTP_CLIENT_CONNECT_TIMEOUT_SECS: &str = "HTTP_CLIENT_CONNECT_TIMEOUT_SECS";
    /// Failures before the circuit opens
    pub const CIRCUIT_BREAKER_FAILURE_THRESHOLD: &str = "CIRCUIT_BREAKER_FAILURE_THRESHOLD";
    /// Seconds before a recovery trial request
    pub const CIRCUIT_BREAKER_RECOVERY_SECS: &str = "CIRCUIT_BREAKER_RECOVERY_SECS";
    /// Deployment environment
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
}

/// Polling defaults
pub mod polling {
    /// Delay before the first status read
    pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
    /// Upper bound on any single delay
    pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
    /// Growth factor between consecutive delays
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    /// Status reads before giving up
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
    /// Consecutive missing or unknown statuses tolerated
    pub const DEFAULT_STALL_THRESHOLD: u32 = 3;
    /// Message written to the row when a stalled job is reset
    pub const STALL_RESET_MESSAGE: &str =
        "Analysis stalled without a recognizable status and was reset by the client";
    /// Message used when the backend marks a job failed without details
    pub const DEFAULT_FAILURE_MESSAGE: &str = "Analysis failed without an error message";
}

/// HTTP client defaults
pub mod timeouts {
    /// Request timeout in seconds
    pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 30;
    /// Connect timeout in seconds
    pub const HTTP_CLIENT_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Fallback wait when a 429 carries no `Retry-After`
    pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
}
