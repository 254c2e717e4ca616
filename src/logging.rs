// ABOUTME: Logging configuration and structured logging setup for the Cadence client
// ABOUTME: Configures log levels, output format, and structured analysis events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging configuration
//!
//! Logs go to stderr so the CLI can print machine-readable results on stdout.

use anyhow::{anyhow, Result};
use cadence_core::constants::service_names;
use cadence_core::models::WorkoutId;
use serde_json::json;
use std::env;
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread information
    pub include_thread: bool,
    /// Include span information for tracing
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, testing, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for interactive CLI use
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: service_names::CADENCE.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: is_production || env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::CADENCE.into()),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment,
        }
    }

    /// Raise the level to `debug` unless `RUST_LOG` already asks for more
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose && matches!(self.level.as_str(), "info" | "warn" | "error") {
            self.level = "debug".into();
        }
        self
    }

    fn directive(raw: &str, fallback: Level) -> Directive {
        raw.parse().unwrap_or_else(|_| fallback.into())
    }

    /// Build the filter with noise reduction for the HTTP stack
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let filter = EnvFilter::new(&self.level)
            .add_directive(Self::directive("hyper=warn", Level::WARN))
            .add_directive(Self::directive("hyper_util=warn", Level::WARN))
            .add_directive(Self::directive("reqwest=warn", Level::WARN))
            .add_directive(Self::directive("rustls=warn", Level::WARN));

        // Full RUST_LOG directive strings already say what they want for our crates
        let Ok(level) = self.level.parse::<Level>() else {
            return filter;
        };
        filter
            .add_directive(Self::directive(&format!("cadence={level}"), level))
            .add_directive(Self::directive(&format!("cadence_backend={level}"), level))
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_thread_ids(self.include_thread)
                        .with_thread_names(self.include_thread)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(self.span_events()),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_thread_ids(self.include_thread)
                        .with_thread_names(self.include_thread)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(self.span_events()),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(io::stderr)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init(),
        };
        installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        let config_summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "features": {
                    "location": self.include_location,
                    "thread": self.include_thread,
                    "spans": self.include_spans
                }
            }
        });
        debug!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            "Logging initialized: {config_summary}"
        );
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events emitted by the analysis engine
pub struct AnalysisLogger;

impl AnalysisLogger {
    /// A new analysis job was registered
    pub fn log_job_started(workout_id: &WorkoutId, generation: u64, triggered: bool) {
        info!(
            workout.id = %workout_id,
            analysis.generation = generation,
            analysis.triggered = triggered,
            "Analysis job started"
        );
    }

    /// An older job for the same workout was cancelled in favour of a new one
    pub fn log_job_superseded(workout_id: &WorkoutId, old_generation: u64, new_generation: u64) {
        info!(
            workout.id = %workout_id,
            analysis.generation = new_generation,
            analysis.superseded = old_generation,
            "Analysis job superseded"
        );
    }

    /// One status read completed
    pub fn log_poll(workout_id: &WorkoutId, attempt: u32, status: &str, next_delay: Duration) {
        debug!(
            workout.id = %workout_id,
            poll.attempt = attempt,
            poll.status = %status,
            poll.next_delay_ms = next_delay.as_millis(),
            "Analysis status polled"
        );
    }

    /// A status read failed with an error worth retrying
    pub fn log_transient_error(workout_id: &WorkoutId, attempt: u32, error: &str) {
        warn!(
            workout.id = %workout_id,
            poll.attempt = attempt,
            error = %error,
            "Transient backend error while polling"
        );
    }

    /// A stalled row was forced into the failed state
    pub fn log_stall_reset(workout_id: &WorkoutId, last_status: &str, reset_applied: bool) {
        warn!(
            workout.id = %workout_id,
            poll.last_status = %last_status,
            analysis.reset_applied = reset_applied,
            "Analysis stalled on unexpected status"
        );
    }

    /// A job reached its outcome
    pub fn log_outcome(workout_id: &WorkoutId, generation: u64, outcome: &str, success: bool) {
        if success {
            info!(
                workout.id = %workout_id,
                analysis.generation = generation,
                analysis.outcome = %outcome,
                "Analysis settled"
            );
        } else {
            warn!(
                workout.id = %workout_id,
                analysis.generation = generation,
                analysis.outcome = %outcome,
                "Analysis settled"
            );
        }
    }
}
