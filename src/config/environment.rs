// ABOUTME: Environment configuration for the Supabase connection and runtime behaviour
// ABOUTME: Loads every setting from environment variables with typed parse errors and validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration
//!
//! Cadence has no configuration file. Every value comes from an environment
//! variable (see [`env_keys`]) and falls back to a documented default. Values
//! that are present but malformed are errors, never silently replaced.

use super::network::NetworkConfig;
use super::polling::PollingConfig;
use cadence_backend::SupabaseConfig;
use cadence_core::constants::{backend, env_keys};
use cadence_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{self, Display};
use std::str::FromStr;
use url::Url;

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (default)
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Supabase project connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseSettings {
    /// Project URL
    pub url: String,
    /// Anonymous (publishable) key
    pub anon_key: String,
    /// Signed-in user's access token
    pub access_token: Option<String>,
    /// Edge function running workout analysis
    pub analysis_function: String,
    /// Table holding workouts
    pub workouts_table: String,
}

impl fmt::Debug for SupabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseSettings")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("analysis_function", &self.analysis_function)
            .field("workouts_table", &self.workouts_table)
            .finish()
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Supabase connection
    pub supabase: SupabaseSettings,
    /// Analysis polling behaviour
    pub polling: PollingConfig,
    /// HTTP timeouts and circuit breaker
    pub network: NetworkConfig,
    /// Deployment environment
    pub environment: Environment,
}

impl CadenceConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when a required variable is unset and
    /// `ConfigInvalid` when a value cannot be parsed or fails validation
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Same as [`CadenceConfig::from_env`]
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            supabase: SupabaseSettings {
                url: required(&lookup, env_keys::SUPABASE_URL)?,
                anon_key: required(&lookup, env_keys::SUPABASE_ANON_KEY)?,
                access_token: lookup(env_keys::SUPABASE_ACCESS_TOKEN)
                    .filter(|token| !token.trim().is_empty()),
                analysis_function: lookup(env_keys::ANALYSIS_FUNCTION)
                    .unwrap_or_else(|| backend::DEFAULT_ANALYSIS_FUNCTION.to_owned()),
                workouts_table: lookup(env_keys::WORKOUTS_TABLE)
                    .unwrap_or_else(|| backend::DEFAULT_WORKOUTS_TABLE.to_owned()),
            },
            polling: PollingConfig::from_lookup(&lookup)?,
            network: NetworkConfig::from_lookup(&lookup)?,
            environment: lookup(env_keys::ENVIRONMENT)
                .map(|value| Environment::from_str_or_default(&value))
                .unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` describing the first violated constraint
    pub fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.supabase.url).map_err(|e| {
            AppError::config(format!(
                "{} is not a valid URL: {e}",
                env_keys::SUPABASE_URL
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "{} must use http or https",
                env_keys::SUPABASE_URL
            )));
        }
        if self.supabase.anon_key.trim().is_empty() {
            return Err(AppError::config(format!(
                "{} must not be empty",
                env_keys::SUPABASE_ANON_KEY
            )));
        }
        if self.supabase.workouts_table.trim().is_empty()
            || self.supabase.analysis_function.trim().is_empty()
        {
            return Err(AppError::config(
                "workouts table and analysis function names must not be empty",
            ));
        }
        self.polling.validate()?;
        self.network.validate()
    }

    /// Build the Supabase client configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the URL or key is rejected by the client
    pub fn supabase_config(&self) -> AppResult<SupabaseConfig> {
        let mut config = SupabaseConfig::new(&self.supabase.url, self.supabase.anon_key.clone())
            .map_err(|e| AppError::config(e.to_string()))?
            .with_workouts_table(self.supabase.workouts_table.clone())
            .with_analysis_function(self.supabase.analysis_function.clone())
            .with_circuit_breaker(self.network.circuit_breaker_config());
        if let Some(token) = &self.supabase.access_token {
            config = config.with_access_token(token.clone());
        }
        Ok(config)
    }
}

fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::config_missing(key))
}

/// Parse an optional variable, falling back to `default` when unset
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}"))),
    }
}

/// Parse an optional boolean accepting `true/false`, `1/0`, `yes/no`, `on/off`
pub(crate) fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> AppResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!(
            "Invalid {key} value '{raw}': expected true or false"
        ))),
    }
}
