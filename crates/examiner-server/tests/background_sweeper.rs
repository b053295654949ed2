//! Tests for the background session sweeper.
//!
//! These tests verify:
//! - The sweeper is disabled when the idle timeout is 0
//! - Idle unfinished sessions are discarded and logged, nothing persisted
//! - Completed sessions are dropped from the registry once past the grace
//! - Active sessions survive a sweep

mod common;

use common::*;
use examiner_server::background::{start_session_sweeper, sweep_sessions, SweepSummary};
use examiner_server::registry::lock_session;
use examiner_types::CandidateIdentity;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn sweeper_disabled_when_timeout_zero() {
    let db = test_db();
    let state = Arc::new(state(&db));

    let handle = tokio::spawn(start_session_sweeper(state, 0));

    let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(
        result.is_ok(),
        "sweeper with idle_timeout_secs=0 should return immediately"
    );
    result
        .expect("timeout should not occur")
        .expect("task should not panic");
}

#[test]
fn idle_sessions_are_discarded() {
    let db = test_db();
    let state = state(&db);
    let identity = CandidateIdentity::new("went.quiet@example.com").unwrap();

    let session = state.open_session(identity.clone());
    let session_id = lock_session(&session).session_id();
    lock_session(&session)
        .identify_candidate()
        .expect("identify");

    // Nothing has been idle for an hour yet.
    let summary = sweep_sessions(&state, Duration::from_secs(3_600), Duration::from_secs(60));
    assert_eq!(summary, SweepSummary::default());
    assert_eq!(state.sessions.len(), 1);

    let summary = sweep_sessions(&state, Duration::ZERO, Duration::ZERO);
    assert_eq!(
        summary,
        SweepSummary {
            expired: 1,
            completed: 0
        }
    );
    assert!(state.sessions.get(session_id).is_none());
    assert_eq!(count_events(&db.pool, "SESSION_DISCARDED"), 1);
    assert!(state.history().get_history(&identity).unwrap().is_empty());

    let conn = db.pool.get().unwrap();
    let payload: String = conn
        .query_row(
            "SELECT payload_json FROM exam_event_log WHERE event_type = 'SESSION_DISCARDED'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(payload["reason"], "idle_timeout");
    assert_eq!(payload["state"], "phase1");
}

#[tokio::test]
async fn completed_sessions_leave_the_registry_without_a_discard() {
    let db = test_db();
    let state = state(&db);
    let app = examiner_server::app(state.clone());

    let session_id = start_session(&app, "finished@example.com").await;
    let transcript = run_interview(&app, &session_id).await;
    let reply = call_tool(
        &app,
        &session_id,
        serde_json::json!({"tool": "finalize_and_score", "payload": result_payload(transcript)}),
    )
    .await;
    assert_eq!(reply["reply"]["test_number"], 1);
    assert_eq!(state.sessions.len(), 1);

    // Still inside the grace period.
    let summary = sweep_sessions(&state, Duration::ZERO, Duration::from_secs(3_600));
    assert_eq!(summary, SweepSummary::default());

    let summary = sweep_sessions(&state, Duration::ZERO, Duration::ZERO);
    assert_eq!(
        summary,
        SweepSummary {
            expired: 0,
            completed: 1
        }
    );
    assert!(state.sessions.is_empty());
    assert_eq!(count_events(&db.pool, "SESSION_DISCARDED"), 0);
}
