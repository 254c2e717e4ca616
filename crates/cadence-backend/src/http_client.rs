// ABOUTME: Shared HTTP client with connection pooling for Supabase calls
// ABOUTME: Timeouts are configured once at startup and reused by every backend instance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence_core::constants::timeouts;
use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

/// Request and connect timeouts for the shared client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Whole-request timeout
    pub request: Duration,
    /// TCP/TLS connect timeout
    pub connect: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(timeouts::HTTP_CLIENT_TIMEOUT_SECS),
            connect: Duration::from_secs(timeouts::HTTP_CLIENT_CONNECT_TIMEOUT_SECS),
        }
    }
}

static CLIENT_TIMEOUTS: OnceLock<HttpTimeouts> = OnceLock::new();

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Record the timeouts used when the shared client is first built
///
/// Returns `false` if timeouts were already set; the first call wins.
pub fn initialize_shared_client(timeouts: HttpTimeouts) -> bool {
    CLIENT_TIMEOUTS.set(timeouts).is_ok()
}

/// Build a standalone client with the given timeouts
#[must_use]
pub fn build_client(timeouts: HttpTimeouts) -> Client {
    ClientBuilder::new()
        .timeout(timeouts.request)
        .connect_timeout(timeouts.connect)
        .user_agent(concat!("cadence/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Shared pooled client, falling back to default timeouts if never initialized
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| build_client(CLIENT_TIMEOUTS.get().copied().unwrap_or_default()))
}
