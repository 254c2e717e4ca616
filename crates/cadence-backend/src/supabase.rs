// ABOUTME: Supabase implementation of the analysis backend and function invoker traits
// ABOUTME: Talks to PostgREST for status rows and to Edge Functions for jobs and context blobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Supabase backend client
//!
//! Workout rows live in a `PostgREST` table; analysis jobs and context blobs
//! are served by Edge Functions. Every call shares one circuit breaker so a
//! backend outage makes all pollers back off together.

use crate::backend::{AnalysisBackend, FunctionInvoker};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::http_client::shared_client;
use async_trait::async_trait;
use cadence_core::constants::{backend, service_names, timeouts};
use cadence_core::errors::BackendError;
use cadence_core::models::{AnalysisReport, AnalysisStatusRow, WorkoutAnalysis, WorkoutId};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;
use url::Url;

/// Connection settings for a Supabase project
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    base_url: String,
    /// Anonymous (publishable) API key
    pub anon_key: String,
    /// Signed-in user's JWT; the anon key is used as bearer when absent
    pub access_token: Option<String>,
    /// Table holding workouts and their analysis columns
    pub workouts_table: String,
    /// Edge function that runs workout analysis
    pub analysis_function: String,
    /// Circuit breaker thresholds
    pub circuit_breaker: CircuitBreakerConfig,
}

impl SupabaseConfig {
    /// Create a configuration with default table and function names
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the URL is not an absolute http(s) URL
    /// or the anon key is empty
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, BackendError> {
        let parsed = Url::parse(url).map_err(|e| BackendError::ConfigurationError {
            service: service_names::SUPABASE_REST.to_owned(),
            details: format!("invalid Supabase URL '{url}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::ConfigurationError {
                service: service_names::SUPABASE_REST.to_owned(),
                details: format!("Supabase URL must use http or https, got '{}'", parsed.scheme()),
            });
        }
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(BackendError::ConfigurationError {
                service: service_names::SUPABASE_REST.to_owned(),
                details: "anon key must not be empty".to_owned(),
            });
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
            anon_key,
            access_token: None,
            workouts_table: backend::DEFAULT_WORKOUTS_TABLE.to_owned(),
            analysis_function: backend::DEFAULT_ANALYSIS_FUNCTION.to_owned(),
            circuit_breaker: CircuitBreakerConfig::default(),
        })
    }

    /// Project URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Use a user access token for row-level security
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Override the workouts table name
    #[must_use]
    pub fn with_workouts_table(mut self, table: impl Into<String>) -> Self {
        self.workouts_table = table.into();
        self
    }

    /// Override the analysis function name
    #[must_use]
    pub fn with_analysis_function(mut self, function: impl Into<String>) -> Self {
        self.analysis_function = function.into();
        self
    }

    /// Override circuit breaker thresholds
    #[must_use]
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }
}

/// Row shape returned when selecting the analysis column
#[derive(Debug, Deserialize)]
struct AnalysisRow {
    id: WorkoutId,
    #[serde(default)]
    workout_analysis: serde_json::Value,
}

/// Supabase client implementing [`AnalysisBackend`] and [`FunctionInvoker`]
pub struct SupabaseBackend {
    config: SupabaseConfig,
    client: Client,
    breaker: CircuitBreaker,
}

impl SupabaseBackend {
    /// Create a backend using the process-wide pooled HTTP client
    #[must_use]
    pub fn new(config: SupabaseConfig) -> Self {
        Self::with_client(config, shared_client().clone())
    }

    /// Create a backend with a caller-supplied HTTP client
    #[must_use]
    pub fn with_client(config: SupabaseConfig, client: Client) -> Self {
        let breaker = CircuitBreaker::with_config("supabase", config.circuit_breaker.clone());
        Self {
            config,
            client,
            breaker,
        }
    }

    /// Current circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Settings this backend was built with
    #[must_use]
    pub const fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url,
            backend::REST_PATH,
            self.config.workouts_table
        )
    }

    fn function_url(&self, function: &str) -> String {
        format!(
            "{}/{}/{function}",
            self.config.base_url,
            backend::FUNCTIONS_PATH
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// Send a request through the circuit breaker and return the raw body
    async fn execute(
        &self,
        service: &str,
        subject: &str,
        request: RequestBuilder,
    ) -> Result<String, BackendError> {
        self.breaker
            .call(async {
                let started = Instant::now();
                let response =
                    request
                        .send()
                        .await
                        .map_err(|e| BackendError::NetworkError {
                            service: service.to_owned(),
                            message: e.to_string(),
                        })?;
                let status = response.status();
                let retry_after = retry_after_secs(response.headers());
                let body = response
                    .text()
                    .await
                    .map_err(|e| BackendError::NetworkError {
                        service: service.to_owned(),
                        message: e.to_string(),
                    })?;

                debug!(
                    backend.service = %service,
                    backend.subject = %subject,
                    http.status = status.as_u16(),
                    http.duration_ms = started.elapsed().as_millis(),
                    "Backend request completed"
                );

                if status.is_success() {
                    Ok(body)
                } else {
                    Err(classify_failure(service, subject, status, retry_after, body))
                }
            })
            .await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        workout_id: &WorkoutId,
        columns: &str,
        field: &'static str,
    ) -> Result<T, BackendError> {
        let request = self.request(Method::GET, &self.table_url()).query(&[
            ("id", format!("eq.{workout_id}")),
            ("select", columns.to_owned()),
        ]);
        let body = self
            .execute(service_names::SUPABASE_REST, workout_id.as_str(), request)
            .await?;
        let rows: Vec<T> = parse_json(&body, field)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound {
                resource: format!("{} row", self.config.workouts_table),
                id: workout_id.to_string(),
            })
    }
}

#[async_trait]
impl AnalysisBackend for SupabaseBackend {
    async fn trigger_analysis(&self, workout_id: &WorkoutId) -> Result<(), BackendError> {
        let function = &self.config.analysis_function;
        let request = self
            .request(Method::POST, &self.function_url(function))
            .json(&serde_json::json!({ "workout_id": workout_id }));
        self.execute(service_names::SUPABASE_FUNCTIONS, function, request)
            .await?;
        Ok(())
    }

    async fn fetch_status(
        &self,
        workout_id: &WorkoutId,
    ) -> Result<AnalysisStatusRow, BackendError> {
        let columns = format!(
            "id,{},{},updated_at",
            backend::STATUS_COLUMN,
            backend::ERROR_COLUMN
        );
        self.select_one(workout_id, &columns, "analysis_status_row")
            .await
    }

    async fn fetch_analysis(
        &self,
        workout_id: &WorkoutId,
    ) -> Result<Option<WorkoutAnalysis>, BackendError> {
        let columns = format!("id,{}", backend::ANALYSIS_COLUMN);
        let row: AnalysisRow = self
            .select_one(workout_id, &columns, "workout_analysis_row")
            .await?;
        let report = decode_report(row.workout_analysis)?;
        Ok(report.map(|report| WorkoutAnalysis {
            workout_id: row.id,
            report,
        }))
    }

    async fn reset_analysis(
        &self,
        workout_id: &WorkoutId,
        reason: &str,
    ) -> Result<(), BackendError> {
        let mut patch = serde_json::Map::new();
        patch.insert(backend::STATUS_COLUMN.to_owned(), "failed".into());
        patch.insert(backend::ERROR_COLUMN.to_owned(), reason.into());

        let request = self
            .request(Method::PATCH, &self.table_url())
            .query(&[("id", format!("eq.{workout_id}"))])
            .header("Prefer", "return=minimal")
            .json(&patch);
        self.execute(service_names::SUPABASE_REST, workout_id.as_str(), request)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FunctionInvoker for SupabaseBackend {
    async fn invoke(
        &self,
        function: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let request = self
            .request(Method::POST, &self.function_url(function))
            .json(body);
        let text = self
            .execute(service_names::SUPABASE_FUNCTIONS, function, request)
            .await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        parse_json(&text, "function_response")
    }
}

fn parse_json<T: DeserializeOwned>(body: &str, field: &'static str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|source| BackendError::ParseError {
        service: service_names::SUPABASE_REST.to_owned(),
        field,
        source,
    })
}

/// Decode the analysis column; older rows store the report as a JSON string
fn decode_report(value: serde_json::Value) -> Result<Option<AnalysisReport>, BackendError> {
    let value = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(text) if text.trim().is_empty() => return Ok(None),
        serde_json::Value::String(text) => parse_json(&text, "workout_analysis")?,
        other => other,
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| BackendError::ParseError {
            service: service_names::SUPABASE_REST.to_owned(),
            field: "workout_analysis",
            source,
        })
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn classify_failure(
    service: &str,
    subject: &str,
    status: StatusCode,
    retry_after: Option<u64>,
    body: String,
) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::AuthenticationFailed {
            service: service.to_owned(),
            reason: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        },
        StatusCode::NOT_FOUND => BackendError::NotFound {
            resource: service.to_owned(),
            id: subject.to_owned(),
        },
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimitExceeded {
            service: service.to_owned(),
            retry_after_secs: retry_after.unwrap_or(timeouts::DEFAULT_RETRY_AFTER_SECS),
        },
        _ => BackendError::ApiError {
            service: service.to_owned(),
            status_code: status.as_u16(),
            message: body,
            retryable: status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT,
        },
    }
}
