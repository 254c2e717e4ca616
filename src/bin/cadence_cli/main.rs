// ABOUTME: Cadence CLI - trigger and watch workout analysis from the command line
// ABOUTME: Handles analyze, status, reconcile, and training context commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Trigger analysis and wait for the report
//! cadence-cli analyze 2f1c8a4e-9b7d-4c1e-8f3a-0d6b5e4c3a21
//!
//! # Keep waiting for an analysis that is already running
//! cadence-cli analyze 2f1c8a4e-9b7d-4c1e-8f3a-0d6b5e4c3a21 --resume --json
//!
//! # Show the stored status of a workout
//! cadence-cli status 2f1c8a4e-9b7d-4c1e-8f3a-0d6b5e4c3a21
//!
//! # Bring several workouts up to date, resuming any in-flight analysis
//! cadence-cli reconcile w1 w2 w3
//!
//! # Fetch pre-computed training context
//! cadence-cli context training --date 2025-03-14
//! cadence-cli context overall --weeks 8
//! ```

mod commands;
mod helpers;

use cadence::backend::{initialize_shared_client, SupabaseBackend};
use cadence::config::CadenceConfig;
use cadence::constants::env_keys;
use cadence::errors::{AppError, AppResult};
use cadence::logging::LoggingConfig;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "cadence-cli",
    about = "Cadence workout analysis CLI",
    long_about = "Trigger server-side workout analysis, wait for it with backoff, and fetch training context from Supabase."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Supabase project URL override
    #[arg(long, global = true)]
    supabase_url: Option<String>,

    /// User access token override
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Trigger analysis for a workout and wait for the result
    Analyze {
        /// Workout id
        workout_id: String,

        /// Poll an analysis that is already running instead of triggering a new one
        #[arg(long)]
        resume: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored analysis status of a workout
    Status {
        /// Workout id
        workout_id: String,

        /// Print the row as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile several workouts with their stored rows
    Reconcile {
        /// Workout ids
        #[arg(required = true, num_args = 1..)]
        workout_ids: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a pre-computed training context blob
    Context {
        /// Which context to fetch
        kind: ContextKind,

        /// Day (training) or any day of the week (weekly, coach-week); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Number of weeks for the overall context
        #[arg(long, default_value = "4")]
        weeks: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ContextKind {
    /// Daily training context
    Training,
    /// Multi-week overview
    Overall,
    /// Weekly summary
    Weekly,
    /// Coach view of a week
    CoachWeek,
}

fn load_config(cli: &Cli) -> AppResult<CadenceConfig> {
    let supabase_url = cli.supabase_url.clone();
    let access_token = cli.access_token.clone();
    CadenceConfig::from_lookup(|key| match key {
        env_keys::SUPABASE_URL if supabase_url.is_some() => supabase_url.clone(),
        env_keys::SUPABASE_ACCESS_TOKEN if access_token.is_some() => access_token.clone(),
        _ => env::var(key).ok(),
    })
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = load_config(&cli)?;
    debug!(config = ?config, "Configuration loaded");

    initialize_shared_client(config.network.http_timeouts());
    let backend = Arc::new(SupabaseBackend::new(config.supabase_config()?));

    match cli.command {
        Command::Analyze {
            workout_id,
            resume,
            json,
        } => commands::analyze::run(backend, &config, &workout_id, resume, json).await,
        Command::Status { workout_id, json } => {
            commands::status::run(backend.as_ref(), &workout_id, json).await
        }
        Command::Reconcile { workout_ids, json } => {
            commands::reconcile::run(backend, &config, &workout_ids, json).await
        }
        Command::Context { kind, date, weeks } => {
            commands::context::run(backend, kind.into(), date, weeks).await
        }
    }
}

impl From<ContextKind> for commands::context::Kind {
    fn from(kind: ContextKind) -> Self {
        match kind {
            ContextKind::Training => Self::Training,
            ContextKind::Overall => Self::Overall,
            ContextKind::Weekly => Self::Weekly,
            ContextKind::CoachWeek => Self::CoachWeek,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env().verbose(cli.verbose);
    if let Err(e) = logging.init() {
        eprintln!("Warning: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report_error(&error),
    }
}

fn report_error(error: &AppError) -> ExitCode {
    helpers::display::print_error(error);
    ExitCode::from(u8::try_from(error.code.exit_code()).unwrap_or(1))
}
