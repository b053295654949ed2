//! Session lifecycle and tool dispatch handlers.

use crate::api::ApiError;
use crate::middleware::TransportIdentity;
use crate::registry::lock_session;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use examiner_session::{PromptContext, SessionError, ToolCall, ToolResponse};
use examiner_types::SessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response for `POST /api/sessions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub context: PromptContext,
}

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|e: examiner_types::IdentifierError| ApiError::BadRequest(e.to_string()))
}

fn unknown_session(session_id: SessionId) -> ApiError {
    ApiError::NotFound(format!("session {} not found", session_id))
}

/// Handler for `POST /api/sessions`.
///
/// Opens a session for the identity in `X-Candidate-Identity`. The
/// candidate is not identified until the driver calls `identify_candidate`.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(TransportIdentity(identity)): Extension<TransportIdentity>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let context = tokio::task::spawn_blocking(move || {
        let session = state.open_session(identity);
        let controller = lock_session(&session);
        controller.context()
    })
    .await
    .map_err(ApiError::join)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: context.session_id,
            context,
        }),
    ))
}

/// Handler for `GET /api/sessions/{session_id}`.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<PromptContext>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| unknown_session(session_id))?;

    let context = tokio::task::spawn_blocking(move || {
        let controller = lock_session(&session);
        controller.context()
    })
    .await
    .map_err(ApiError::join)?;

    Ok(Json(context))
}

/// Handler for `POST /api/sessions/{session_id}/tools`.
///
/// Always answers 200 with a [`ToolResponse`] once the session exists;
/// tool failures are reported in the envelope. A configuration failure
/// ends the session.
pub async fn tool_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(call): Json<ToolCall>,
) -> Result<Json<ToolResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| unknown_session(session_id))?;

    let response = tokio::task::spawn_blocking(move || {
        let mut controller = lock_session(&session);
        let result = controller.dispatch(call);

        if matches!(result, Err(SessionError::Configuration(_))) {
            controller.discard("configuration_error");
            state.sessions.remove(session_id);
        }
        state.record_events(&mut controller);

        ToolResponse::from(&result)
    })
    .await
    .map_err(ApiError::join)?;

    Ok(Json(response))
}

/// Handler for `DELETE /api/sessions/{session_id}`.
///
/// Called when the transport disconnects. Nothing is persisted for a
/// session that has not completed, except a validated result whose earlier
/// write failed: that gets one last attempt.
pub async fn delete_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .remove(session_id)
        .ok_or_else(|| unknown_session(session_id))?;

    tokio::task::spawn_blocking(move || {
        let mut controller = lock_session(&session);
        controller.discard("disconnected");
        state.record_events(&mut controller);
    })
    .await
    .map_err(ApiError::join)?;

    Ok(StatusCode::NO_CONTENT)
}
