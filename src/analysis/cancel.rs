// ABOUTME: Cancellation handle shared between an analysis job and its tracker
// ABOUTME: Wraps a cancellation token and records why the job was cancelled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::outcome::CancelReason;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Cancellation signal carrying its reason; the first reason wins
#[derive(Debug, Clone, Default)]
pub struct PollCancellation {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl PollCancellation {
    /// Fresh, uncancelled handle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel with `reason`; returns `false` if already cancelled
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the first `cancel` call
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Reason to report when the job stops; `Requested` if none was recorded
    #[must_use]
    pub fn reason_or_requested(&self) -> CancelReason {
        self.reason().unwrap_or(CancelReason::Requested)
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Run `future` unless cancellation fires first
    ///
    /// # Errors
    ///
    /// Returns the cancel reason if cancellation wins the race
    pub async fn guard<F>(&self, future: F) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(self.reason_or_requested()),
            value = future => Ok(value),
        }
    }
}
