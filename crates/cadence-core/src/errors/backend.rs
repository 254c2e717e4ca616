// ABOUTME: Structured error types for Supabase REST and Edge Function operations
// ABOUTME: Carries retry classification and rate limit hints used by the poller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Errors raised while talking to the hosted backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (DNS, TLS, connection reset, client timeout)
    #[error("Network error talking to {service}: {message}")]
    NetworkError {
        /// Backend service name
        service: String,
        /// Transport error message
        message: String,
    },

    /// Backend answered with a non-success status
    #[error("{service} returned HTTP {status_code}: {message}")]
    ApiError {
        /// Backend service name
        service: String,
        /// HTTP status code
        status_code: u16,
        /// Response body or summary
        message: String,
        /// Whether the same request may succeed later
        retryable: bool,
    },

    /// Backend throttled the caller
    #[error("{service} rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Backend service name
        service: String,
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Credentials were rejected
    #[error("Authentication with {service} failed: {reason}")]
    AuthenticationFailed {
        /// Backend service name
        service: String,
        /// Reason reported by the backend
        reason: String,
    },

    /// Requested row or function does not exist
    #[error("{resource} '{id}' not found")]
    NotFound {
        /// Kind of resource (table row, function)
        resource: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Response body could not be decoded
    #[error("Failed to parse {field} from {service}: {source}")]
    ParseError {
        /// Backend service name
        service: String,
        /// Field or payload being decoded
        field: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// Circuit breaker is open and requests fail fast
    #[error("Circuit breaker open for {service}, retry after {retry_after_secs}s")]
    CircuitBreakerOpen {
        /// Backend service name
        service: String,
        /// Seconds until a recovery trial request is allowed
        retry_after_secs: u64,
    },

    /// Client-side configuration problem (bad URL, invalid header value)
    #[error("Configuration error for {service}: {details}")]
    ConfigurationError {
        /// Backend service name
        service: String,
        /// What is wrong
        details: String,
    },
}

impl BackendError {
    /// Whether the failure is transient and polling should continue
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::RateLimitExceeded { .. }
            | Self::CircuitBreakerOpen { .. } => true,
            Self::ApiError { retryable, .. } => *retryable,
            Self::AuthenticationFailed { .. }
            | Self::NotFound { .. }
            | Self::ParseError { .. }
            | Self::ConfigurationError { .. } => false,
        }
    }

    /// Backend-suggested wait before the next attempt
    #[must_use]
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            }
            | Self::CircuitBreakerOpen {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Error code this failure maps to
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NetworkError { .. } | Self::CircuitBreakerOpen { .. } => {
                ErrorCode::ExternalServiceUnavailable
            }
            Self::ApiError { .. } => ErrorCode::ExternalServiceError,
            Self::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            Self::AuthenticationFailed { .. } => ErrorCode::AuthInvalid,
            Self::NotFound { .. } => ErrorCode::ResourceNotFound,
            Self::ParseError { .. } => ErrorCode::SerializationError,
            Self::ConfigurationError { .. } => ErrorCode::ConfigInvalid,
        }
    }
}

impl From<BackendError> for AppError {
    fn from(error: BackendError) -> Self {
        let code = error.code();
        let message = error.to_string();
        let app_error = Self::new(code, message);
        match error {
            BackendError::NotFound { id, .. } => app_error.with_resource_id(id),
            BackendError::RateLimitExceeded {
                retry_after_secs, ..
            } => app_error.with_details(serde_json::json!({
                "retry_after_secs": retry_after_secs
            })),
            other => app_error.with_source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let network = BackendError::NetworkError {
            service: "supabase".to_owned(),
            message: "connection reset".to_owned(),
        };
        assert!(network.is_retryable());

        let server = BackendError::ApiError {
            service: "supabase".to_owned(),
            status_code: 503,
            message: String::new(),
            retryable: true,
        };
        assert!(server.is_retryable());

        let auth = BackendError::AuthenticationFailed {
            service: "supabase".to_owned(),
            reason: "JWT expired".to_owned(),
        };
        assert!(!auth.is_retryable());
        assert_eq!(auth.code(), ErrorCode::AuthInvalid);
    }

    #[test]
    fn test_rate_limit_converts_with_details() {
        let error = BackendError::RateLimitExceeded {
            service: "supabase".to_owned(),
            retry_after_secs: 12,
        };
        assert_eq!(error.retry_after_secs(), Some(12));

        let app: AppError = error.into();
        assert_eq!(app.code, ErrorCode::RateLimitExceeded);
        assert_eq!(app.context.details["retry_after_secs"], 12);
    }
}
