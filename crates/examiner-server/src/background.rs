//! Background tasks for the examiner server.
//!
//! Includes:
//! - Sweeping idle and completed sessions out of the registry.

use crate::registry::lock_session;
use crate::AppState;
use examiner_session::SessionState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// How long a completed session stays reachable so a driver retrying its
/// last call still gets the stored test number.
const COMPLETED_SESSION_GRACE: Duration = Duration::from_secs(60);

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Unfinished sessions discarded for inactivity.
    pub expired: usize,
    /// Completed sessions dropped from the registry.
    pub completed: usize,
}

/// Removes sessions idle for at least `idle_timeout`, and completed sessions
/// idle for at least `completed_grace`.
///
/// Expired sessions are discarded (`SESSION_DISCARDED`, reason
/// `idle_timeout`). Only a validated result left over from a failed write
/// is persisted for them, on one last attempt. Blocking.
pub fn sweep_sessions(
    state: &AppState,
    idle_timeout: Duration,
    completed_grace: Duration,
) -> SweepSummary {
    let mut summary = SweepSummary::default();

    for (session_id, session) in state.sessions.snapshot() {
        let mut controller = lock_session(&session);
        let idle = controller.idle_for();

        if controller.state() == SessionState::Completed {
            if idle >= completed_grace {
                state.sessions.remove(session_id);
                summary.completed += 1;
            }
        } else if idle >= idle_timeout {
            tracing::info!(
                %session_id,
                state = %controller.state(),
                idle_secs = idle.as_secs(),
                "expiring idle session"
            );
            controller.discard("idle_timeout");
            state.record_events(&mut controller);
            state.sessions.remove(session_id);
            summary.expired += 1;
        }
    }

    summary
}

/// Starts the session sweeper.
///
/// Runs indefinitely, every `idle_timeout_secs / 2` seconds (clamped to
/// 1..=60).
pub async fn start_session_sweeper(state: Arc<AppState>, idle_timeout_secs: u64) {
    if idle_timeout_secs == 0 {
        tracing::warn!("session sweeper disabled (idle_timeout_secs=0)");
        return;
    }

    let interval_seconds = (idle_timeout_secs / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);
    let idle_timeout = Duration::from_secs(idle_timeout_secs);
    let completed_grace = COMPLETED_SESSION_GRACE.min(idle_timeout);

    tracing::info!(
        idle_timeout_secs,
        interval_seconds,
        "starting session sweeper"
    );

    loop {
        sleep(interval).await;

        let state = Arc::clone(&state);
        let res = tokio::task::spawn_blocking(move || {
            sweep_sessions(&state, idle_timeout, completed_grace)
        })
        .await;

        match res {
            Ok(summary) => {
                if summary != SweepSummary::default() {
                    tracing::info!(
                        expired = summary.expired,
                        completed = summary.completed,
                        "swept sessions"
                    );
                }
            }
            Err(e) => {
                tracing::error!("session sweeper join error: {}", e);
            }
        }
    }
}
