//! Operator event log API.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    Json,
};
use examiner_observe::{query_events, EventFilter, EventRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for `GET /api/events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Filter by event type (e.g., `RESULT_PERSIST_FAILED`).
    pub event_type: Option<String>,
    /// Filter by session id.
    pub session_id: Option<String>,
    /// Filter by candidate identity.
    pub candidate: Option<String>,
    /// Return events that occurred at or after this ISO 8601 timestamp.
    pub since: Option<String>,
    /// Maximum number of events to return (default: 100, max: 1000).
    pub limit: Option<i64>,
}

/// Response wrapper for event retrieval.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    /// The matching events in chronological order.
    pub events: Vec<EventRecord>,
    /// The number of events returned.
    pub count: usize,
}

/// Handler for `GET /api/events`.
pub async fn get_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let filter = EventFilter {
        event_type: params.event_type,
        session_id: params.session_id,
        candidate: params.candidate,
        since: params.since,
        limit: Some(limit),
    };

    let events = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
        query_events(&conn, &filter).map_err(|e| ApiError::InternalServerError(e.to_string()))
    })
    .await
    .map_err(ApiError::join)??;

    let count = events.len();
    Ok(Json(EventsResponse { events, count }))
}
