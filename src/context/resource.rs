// ABOUTME: Cached edge-function resource exposing data, loading, and error state
// ABOUTME: Keeps the last good payload when a refresh fails and serializes concurrent refreshes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use cadence_backend::FunctionInvoker;
use cadence_core::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Observable state of an [`EdgeResource`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot<T> {
    /// Last successfully fetched payload
    pub data: Option<T>,
    /// A refresh is in flight
    pub loading: bool,
    /// Error of the most recent refresh, cleared by the next success
    pub error: Option<String>,
    /// When `data` was fetched
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for ResourceSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            fetched_at: None,
        }
    }
}

/// Clears `loading` when a refresh ends, including when its future is dropped
struct LoadingGuard<'a, T> {
    state: &'a RwLock<ResourceSnapshot<T>>,
}

impl<'a, T> LoadingGuard<'a, T> {
    fn begin(state: &'a RwLock<ResourceSnapshot<T>>) -> Self {
        state.write().unwrap_or_else(PoisonError::into_inner).loading = true;
        Self { state }
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = false;
    }
}

/// JSON blob served by a named edge function with fixed parameters
pub struct EdgeResource<T> {
    invoker: Arc<dyn FunctionInvoker>,
    function: String,
    params: serde_json::Value,
    state: RwLock<ResourceSnapshot<T>>,
    refresh_lock: Mutex<()>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> EdgeResource<T>
where
    T: DeserializeOwned + Clone + Send + Sync,
{
    /// Resource backed by `function` called with `params`
    #[must_use]
    pub fn new(
        invoker: Arc<dyn FunctionInvoker>,
        function: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            invoker,
            function: function.into(),
            params,
            state: RwLock::new(ResourceSnapshot::default()),
            refresh_lock: Mutex::new(()),
            _payload: PhantomData,
        }
    }

    /// Edge function name
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Parameters sent with every call
    #[must_use]
    pub const fn params(&self) -> &serde_json::Value {
        &self.params
    }

    /// Current state
    #[must_use]
    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut ResourceSnapshot<T>)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }

    /// Fetch the payload again
    ///
    /// Concurrent calls run one after another. On failure the previous data
    /// stays visible and the error is recorded.
    ///
    /// # Errors
    ///
    /// Returns the backend or decoding error of this refresh
    pub async fn refresh(&self) -> AppResult<T> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Cached payload, fetching it first if nothing has been loaded yet
    ///
    /// # Errors
    ///
    /// Returns the refresh error when no payload is cached
    pub async fn get_or_load(&self) -> AppResult<T> {
        if let Some(data) = self.snapshot().data {
            return Ok(data);
        }
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have loaded it while we waited
        if let Some(data) = self.snapshot().data {
            return Ok(data);
        }
        self.refresh_locked().await
    }

    /// Refresh body; caller holds `refresh_lock`
    async fn refresh_locked(&self) -> AppResult<T> {
        let loading = LoadingGuard::begin(&self.state);
        let result = self.fetch().await;

        match &result {
            Ok(data) => {
                debug!(function = %self.function, "Edge resource refreshed");
                let data = data.clone();
                self.update(|state| {
                    state.data = Some(data);
                    state.error = None;
                    state.fetched_at = Some(Utc::now());
                });
            }
            Err(error) => {
                warn!(function = %self.function, error = %error, "Edge resource refresh failed");
                let message = error.to_string();
                self.update(|state| {
                    state.error = Some(message);
                });
            }
        }
        drop(loading);
        result
    }

    async fn fetch(&self) -> AppResult<T> {
        let value = self
            .invoker
            .invoke(&self.function, &self.params)
            .await
            .map_err(AppError::from)?;
        serde_json::from_value(value).map_err(|e| {
            AppError::from(e).with_resource_id(self.function.as_str())
        })
    }
}
