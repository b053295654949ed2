//! HTTP service exposing the examiner's tool surface to a conversation
//! driver.
//!
//! Each session lives in the in-process [`SessionRegistry`]. The driver
//! starts a session with the transport-verified candidate identity, then
//! posts one [`examiner_session::ToolCall`] at a time to
//! `/api/sessions/{id}/tools`. Session events are written to the operator
//! event log after every call.

pub mod api;
pub mod api_events;
pub mod api_history;
pub mod api_sessions;
pub mod background;
pub mod config;
pub mod middleware;
pub mod registry;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use examiner_db::DbPool;
use examiner_history::{HistoryStore, ResultWriter};
use examiner_observe::ExamEvent;
use examiner_questions::{QuestionBank, QuestionSelector};
use examiner_session::SessionController;
use examiner_types::{CandidateIdentity, ExamPolicy, SessionId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use registry::{SessionRegistry, SharedSession};

/// Result payloads carry full transcripts; 2 MiB leaves ample headroom.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared application state. Clones share the pool, store and registry.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (event log and history).
    pub pool: DbPool,
    /// Question selection over the loaded bank.
    pub selector: QuestionSelector,
    /// Retrying result writer over the history store.
    pub writer: ResultWriter,
    /// Active exam policy.
    pub policy: ExamPolicy,
    /// Live sessions.
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        store: Arc<dyn HistoryStore>,
        bank: Arc<QuestionBank>,
        policy: ExamPolicy,
    ) -> Self {
        Self {
            pool,
            selector: QuestionSelector::new(bank, &policy),
            writer: ResultWriter::new(store, &policy),
            policy,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        self.writer.store()
    }

    /// Creates and registers a controller for `identity`, flushing its
    /// start event.
    pub fn open_session(&self, identity: CandidateIdentity) -> SharedSession {
        let mut controller = SessionController::new(
            SessionId::new(),
            identity,
            self.selector.clone(),
            self.writer.clone(),
            StdRng::from_entropy(),
        );
        self.record_events(&mut controller);
        self.sessions.insert(controller)
    }

    /// Drains the controller's buffered events into the event log.
    ///
    /// Blocking. A failed write is logged and the event dropped; the exam
    /// itself never fails because the log is unavailable. Events an
    /// operator must act on are logged in full at error level instead.
    pub fn record_events(&self, controller: &mut SessionController) {
        let events = controller.take_events();
        if events.is_empty() {
            return;
        }
        let session_id = controller.session_id();

        let conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, dropped = events.len(), "event log unavailable");
                for event in &events {
                    log_unrecorded(session_id, event, &e.to_string());
                }
                return;
            }
        };
        let candidate = controller.candidate().cloned();
        for event in &events {
            if let Err(e) =
                examiner_observe::emit_event(&conn, session_id, candidate.as_ref(), event)
            {
                tracing::warn!(
                    %session_id,
                    event_type = event.event_type(),
                    error = %e,
                    "failed to write event"
                );
                log_unrecorded(session_id, event, &e.to_string());
            }
        }
    }
}

/// Leaves the only remaining copy of an unwritten operator event in the
/// process log.
fn log_unrecorded(session_id: SessionId, event: &ExamEvent, error: &str) {
    if !event.needs_attention() {
        return;
    }
    let payload = serde_json::to_string(event).unwrap_or_default();
    tracing::error!(
        %session_id,
        event_type = event.event_type(),
        error,
        payload = %payload,
        "operator event could not be written to the event log"
    );
}

/// Health check handler.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let session_start = Router::new()
        .route("/api/sessions", post(api_sessions::create_session_handler))
        .layer(axum::middleware::from_fn(
            middleware::transport_identity_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/sessions/{session_id}",
            get(api_sessions::get_session_handler).delete(api_sessions::delete_session_handler),
        )
        .route(
            "/api/sessions/{session_id}/tools",
            post(api_sessions::tool_handler),
        )
        .route(
            "/api/candidates/{identity}/history",
            get(api_history::get_history_handler),
        )
        .route("/api/events", get(api_events::get_events_handler))
        .merge(session_start)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
