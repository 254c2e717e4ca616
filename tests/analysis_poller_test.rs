// ABOUTME: Integration tests for the analysis poll loop
// ABOUTME: Covers terminal statuses, timeouts, stall resets, transient errors, and cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use cadence::analysis::{
    AnalysisOutcome, AnalysisPoller, BackoffPolicy, CancelReason, PollCancellation,
};
use cadence::constants::polling;
use cadence::errors::ErrorCode;
use cadence::models::{AnalysisStatus, StatusReading};
use common::{fast_policy, sample_analysis, workout, ScriptedBackend, StatusStep};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn poller(backend: &Arc<ScriptedBackend>, policy: BackoffPolicy) -> AnalysisPoller {
    common::init_test_logging();
    AnalysisPoller::new(backend.clone(), policy)
}

#[tokio::test(start_paused = true)]
async fn test_completes_after_in_progress_statuses() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-complete");
    backend.script(
        &id,
        vec![
            StatusStep::Status(Some("pending")),
            StatusStep::Status(Some("analyzing")),
            StatusStep::Status(Some("complete")),
        ],
    );
    backend.set_analysis(&id, sample_analysis(&id));

    let mut seen = Vec::new();
    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |progress| {
            seen.push((progress.attempt, progress.reading));
        })
        .await;

    assert_eq!(outcome, AnalysisOutcome::Complete(sample_analysis(&id)));
    assert_eq!(backend.status_reads(), 3);
    assert_eq!(
        seen,
        vec![
            (1, StatusReading::Known(AnalysisStatus::Pending)),
            (2, StatusReading::Known(AnalysisStatus::Analyzing)),
            (3, StatusReading::Known(AnalysisStatus::Complete)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_first_read_waits_for_initial_delay() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-delay");
    backend.script(&id, vec![StatusStep::Status(Some("complete"))]);
    backend.set_analysis(&id, sample_analysis(&id));

    let started = Instant::now();
    let outcome = poller(&backend, fast_policy(3))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert!(outcome.is_complete());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_carries_row_error() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-failed");
    backend.script(
        &id,
        vec![
            StatusStep::Status(Some("analyzing")),
            StatusStep::FailedWith("GPS stream missing"),
        ],
    );

    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert_eq!(
        outcome,
        AnalysisOutcome::Failed {
            message: "GPS stream missing".to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_without_message_uses_default() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-failed-bare");
    backend.script(&id, vec![StatusStep::Status(Some("error"))]);

    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert_eq!(
        outcome,
        AnalysisOutcome::Failed {
            message: polling::DEFAULT_FAILURE_MESSAGE.to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_max_attempts() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-slow");
    backend.script(&id, vec![StatusStep::Status(Some("analyzing"))]);

    let outcome = poller(&backend, fast_policy(5))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert_eq!(outcome, AnalysisOutcome::TimedOut { attempts: 5 });
    assert_eq!(backend.status_reads(), 5);
    assert!(backend.resets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_status_stalls_and_resets_row() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-stalled");
    backend.script(&id, vec![StatusStep::Status(None)]);

    let outcome = poller(&backend, fast_policy(20))
        .with_stall_threshold(3)
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert_eq!(
        outcome,
        AnalysisOutcome::Stalled {
            last_status: "null".to_owned(),
            reset_applied: true,
        }
    );
    assert_eq!(backend.status_reads(), 3);
    assert_eq!(
        backend.resets(),
        vec![(id, polling::STALL_RESET_MESSAGE.to_owned())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_recognized_status_breaks_stall_streak() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-flaky-status");
    backend.script(
        &id,
        vec![
            StatusStep::Status(Some("mystery")),
            StatusStep::Status(Some("mystery")),
            StatusStep::Status(Some("pending")),
            StatusStep::Status(Some("mystery")),
            StatusStep::Status(Some("mystery")),
            StatusStep::Status(Some("done")),
        ],
    );
    backend.set_analysis(&id, sample_analysis(&id));

    let outcome = poller(&backend, fast_policy(20))
        .with_stall_threshold(3)
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert!(outcome.is_complete());
    assert!(backend.resets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_keep_polling() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-transient");
    backend.script(
        &id,
        vec![
            StatusStep::NetworkError,
            StatusStep::NetworkError,
            StatusStep::Status(Some("complete")),
        ],
    );
    backend.set_analysis(&id, sample_analysis(&id));

    let mut attempts = Vec::new();
    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |progress| {
            attempts.push(progress.attempt);
        })
        .await;

    assert!(outcome.is_complete());
    // Failed reads still count against the budget
    assert_eq!(attempts, vec![3]);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_stretches_next_delay() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-throttled");
    backend.script(
        &id,
        vec![
            StatusStep::RateLimited(4),
            StatusStep::Status(Some("complete")),
        ],
    );
    backend.set_analysis(&id, sample_analysis(&id));
    let policy =
        BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10), 1.0, 5);

    let started = Instant::now();
    let outcome = poller(&backend, policy)
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert!(outcome.is_complete());
    // 1s before the throttled read, then the 4s hint instead of 1s
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_millis(5100));
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_stops_polling() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-auth");
    backend.script(&id, vec![StatusStep::AuthError]);

    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    match outcome {
        AnalysisOutcome::Error { code, message } => {
            assert_eq!(code, ErrorCode::AuthInvalid);
            assert!(message.contains("JWT expired"));
        }
        other => panic!("expected error outcome, got {other:?}"),
    }
    assert_eq!(backend.status_reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_complete_status_waits_for_visible_report() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-lagging-report");
    backend.script(&id, vec![StatusStep::Status(Some("complete"))]);
    backend.set_analysis(&id, sample_analysis(&id));
    backend.hide_analysis_for(&id, 2);

    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert!(outcome.is_complete());
    assert_eq!(backend.status_reads(), 3);
    assert_eq!(backend.analysis_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_progress_callbacks() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-cancel");
    backend.script(&id, vec![StatusStep::Status(Some("analyzing"))]);

    let cancellation = PollCancellation::new();
    let trigger = cancellation.clone();
    let mut calls = 0;
    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &cancellation, |progress| {
            calls += 1;
            if progress.attempt == 2 {
                trigger.cancel(CancelReason::Requested);
            }
        })
        .await;

    assert_eq!(outcome, AnalysisOutcome::Cancelled(CancelReason::Requested));
    assert_eq!(calls, 2);
    assert_eq!(backend.status_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_first_read() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-cancel-early");
    backend.script(&id, vec![StatusStep::Status(Some("analyzing"))]);

    let cancellation = PollCancellation::new();
    cancellation.cancel(CancelReason::Shutdown);
    let outcome = poller(&backend, fast_policy(10))
        .poll(&id, &cancellation, |_| panic!("no reads after cancellation"))
        .await;

    assert_eq!(outcome, AnalysisOutcome::Cancelled(CancelReason::Shutdown));
    assert_eq!(backend.status_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_reset_is_reported_and_polling_stops() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-locked-row");
    backend.script(&id, vec![StatusStep::Status(Some("mystery"))]);
    backend.fail_reset(&id);

    let outcome = poller(&backend, fast_policy(20))
        .with_stall_threshold(2)
        .poll(&id, &PollCancellation::new(), |_| {})
        .await;

    assert_eq!(
        outcome,
        AnalysisOutcome::Stalled {
            last_status: "mystery".to_owned(),
            reset_applied: false,
        }
    );
    assert_eq!(backend.status_reads(), 2);
    assert!(backend.resets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_reset_skips_the_write() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-reset-race");
    backend.script(&id, vec![StatusStep::Status(None)]);
    *backend.reset_delay.lock().unwrap() = Some(Duration::from_secs(5));

    let cancellation = PollCancellation::new();
    let job = {
        let poller = poller(&backend, fast_policy(20)).with_stall_threshold(1);
        let cancellation = cancellation.clone();
        let id = id.clone();
        tokio::spawn(async move { poller.poll(&id, &cancellation, |_| {}).await })
    };

    // First read at 1s, reset in flight until 6s
    tokio::time::sleep(Duration::from_secs(2)).await;
    cancellation.cancel(CancelReason::Superseded);

    assert_eq!(
        job.await.unwrap(),
        AnalysisOutcome::Cancelled(CancelReason::Superseded)
    );
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(backend.resets().is_empty());
    assert_eq!(backend.status_reads(), 1);
}
