// ABOUTME: Integration tests for reconciliation and the analysis board
// ABOUTME: Validates hydration rules, resume behavior, idempotency, and stale-update protection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use cadence::analysis::{
    AnalysisBoard, AnalysisEvent, AnalysisOutcome, AnalysisPhase, AnalysisPoller,
    AnalysisTracker, CancelReason, HydratedState, ReconcileReport,
};
use cadence::constants::polling;
use common::{fast_policy, sample_analysis, workout, ScriptedBackend, StatusStep};
use std::sync::Arc;

fn tracker(backend: &Arc<ScriptedBackend>) -> AnalysisTracker {
    common::init_test_logging();
    AnalysisTracker::new(AnalysisPoller::new(backend.clone(), fast_policy(1_000)))
}

// ============================================================================
// Board rules
// ============================================================================

#[test]
fn test_stale_generation_cannot_overwrite_newer_job() {
    let board = AnalysisBoard::new();
    let id = workout("w1");

    assert!(board.begin(&id, 1));
    assert!(board.begin(&id, 2));
    assert!(!board.begin(&id, 1));

    let done = AnalysisOutcome::Complete(sample_analysis(&id));
    assert!(!board.settle(&id, 1, &done));
    assert!(!board.progress(&id, 1, 3, "analyzing"));
    assert!(board.get(&id).unwrap().is_running());

    assert!(board.settle(&id, 2, &done));
    assert!(!board.settle(&id, 2, &AnalysisOutcome::TimedOut { attempts: 9 }));
    assert!(matches!(
        board.get(&id).unwrap().phase,
        AnalysisPhase::Ready { .. }
    ));
}

#[test]
fn test_superseded_settle_leaves_view_alone() {
    let board = AnalysisBoard::new();
    let id = workout("w1");
    board.begin(&id, 4);
    board.progress(&id, 4, 2, "pending");

    assert!(!board.settle(
        &id,
        4,
        &AnalysisOutcome::Cancelled(CancelReason::Superseded)
    ));
    assert_eq!(
        board.get(&id).unwrap().phase,
        AnalysisPhase::Running {
            attempt: 2,
            last_status: Some("pending".to_owned()),
        }
    );
}

#[test]
fn test_hydrate_never_overwrites_running_job() {
    let board = AnalysisBoard::new();
    let id = workout("w1");
    board.begin(&id, 7);

    assert!(!board.hydrate(&id, HydratedState::Failed("old failure".to_owned())));
    assert!(board.get(&id).unwrap().is_running());

    board.settle(&id, 7, &AnalysisOutcome::Cancelled(CancelReason::Requested));
    assert_eq!(board.get(&id).unwrap().phase, AnalysisPhase::Idle);
    assert!(board.hydrate(&id, HydratedState::Failed("old failure".to_owned())));
    assert_eq!(board.get(&id).unwrap().generation, 7);
}

#[test]
fn test_snapshot_is_sorted() {
    let board = AnalysisBoard::new();
    for id in ["w-c", "w-a", "w-b"] {
        board.hydrate(&workout(id), HydratedState::Failed("x".to_owned()));
    }
    let ids: Vec<_> = board
        .snapshot()
        .into_iter()
        .map(|(id, _)| id.to_string())
        .collect();
    assert_eq!(ids, vec!["w-a", "w-b", "w-c"]);
    assert_eq!(board.len(), 3);
    assert!(board.remove(&workout("w-a")).is_some());
    assert_eq!(board.len(), 2);
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reconcile_sorts_rows_by_stored_state() {
    let backend = Arc::new(ScriptedBackend::new());
    let ready = workout("w-ready");
    let failed = workout("w-failed");
    let failed_bare = workout("w-failed-bare");
    let running = workout("w-running");
    let never = workout("w-never");
    let gone = workout("w-gone");
    let denied = workout("w-denied");

    backend.script(&ready, vec![StatusStep::Status(Some("complete"))]);
    backend.set_analysis(&ready, sample_analysis(&ready));
    backend.script(&failed, vec![StatusStep::FailedWith("HR strap dropped")]);
    backend.script(&failed_bare, vec![StatusStep::Status(Some("failed"))]);
    backend.script(&running, vec![StatusStep::Status(Some("analyzing"))]);
    backend.script(&never, vec![StatusStep::Status(None)]);
    backend.script(&gone, vec![StatusStep::NotFound]);
    backend.script(&denied, vec![StatusStep::AuthError]);
    let tracker = tracker(&backend);

    let ids = vec![
        ready.clone(),
        failed.clone(),
        failed_bare.clone(),
        running.clone(),
        never.clone(),
        gone.clone(),
        denied.clone(),
    ];
    let report = tracker.reconcile(&ids).await;

    assert_eq!(report.ready, vec![ready.clone()]);
    assert_eq!(report.failed, vec![failed.clone(), failed_bare.clone()]);
    assert_eq!(report.resumed, vec![running.clone()]);
    assert_eq!(report.idle, vec![never.clone()]);
    assert_eq!(report.missing, vec![gone]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, denied);
    assert_eq!(report.total(), 7);

    let board = tracker.board();
    assert_eq!(
        board.get(&ready).unwrap().phase,
        AnalysisPhase::Ready {
            analysis: sample_analysis(&ready)
        }
    );
    assert_eq!(
        board.get(&failed).unwrap().phase,
        AnalysisPhase::Failed {
            message: "HR strap dropped".to_owned()
        }
    );
    assert_eq!(
        board.get(&failed_bare).unwrap().phase,
        AnalysisPhase::Failed {
            message: polling::DEFAULT_FAILURE_MESSAGE.to_owned()
        }
    );
    assert!(board.get(&running).unwrap().is_running());
    assert!(board.get(&never).is_none());

    assert!(tracker.is_active(&running));
    assert_eq!(backend.triggers(), 0);
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_twice_changes_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    let ready = workout("w-ready");
    let failed = workout("w-failed");
    let running = workout("w-running");
    backend.script(&ready, vec![StatusStep::Status(Some("complete"))]);
    backend.set_analysis(&ready, sample_analysis(&ready));
    backend.script(&failed, vec![StatusStep::FailedWith("corrupt FIT file")]);
    backend.script(&running, vec![StatusStep::Status(Some("pending"))]);
    let tracker = tracker(&backend);
    let ids = vec![ready.clone(), failed.clone(), running.clone()];

    let first = tracker.reconcile(&ids).await;
    let board_after_first: Vec<_> = tracker
        .board()
        .snapshot()
        .into_iter()
        .map(|(id, view)| (id, view.phase))
        .collect();
    let generation = tracker.active_generation(&running);

    let second = tracker.reconcile(&ids).await;
    let board_after_second: Vec<_> = tracker
        .board()
        .snapshot()
        .into_iter()
        .map(|(id, view)| (id, view.phase))
        .collect();

    assert_eq!(first.resumed, vec![running.clone()]);
    assert_eq!(
        second,
        ReconcileReport {
            ready: vec![ready],
            failed: vec![failed],
            already_active: vec![running.clone()],
            ..ReconcileReport::default()
        }
    );
    assert_eq!(tracker.active_count(), 1);
    assert_eq!(tracker.active_generation(&running), generation);
    assert_eq!(board_after_first, board_after_second);
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_skips_workout_with_running_job() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-busy");
    backend.script(&id, vec![StatusStep::Status(Some("analyzing"))]);
    let tracker = tracker(&backend);

    let handle = tracker.start(id.clone()).unwrap();
    let report = tracker.reconcile(std::slice::from_ref(&id)).await;

    assert_eq!(report.already_active, vec![id.clone()]);
    assert_eq!(tracker.active_generation(&id), Some(handle.generation()));
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_complete_row_without_report_resumes_polling() {
    let backend = Arc::new(ScriptedBackend::new());
    let id = workout("w-lagging");
    backend.script(&id, vec![StatusStep::Status(Some("complete"))]);
    backend.set_analysis(&id, sample_analysis(&id));
    backend.hide_analysis_for(&id, 1);
    let tracker = tracker(&backend);
    let mut events = tracker.subscribe();

    let report = tracker.reconcile(std::slice::from_ref(&id)).await;
    assert_eq!(report.resumed, vec![id.clone()]);

    // The resumed job sees the report on its first read
    loop {
        if let AnalysisEvent::Settled { outcome, .. } = events.recv().await.unwrap() {
            assert!(outcome.is_complete());
            break;
        }
    }
    assert!(matches!(
        tracker.board().get(&id).unwrap().phase,
        AnalysisPhase::Ready { .. }
    ));
}
