//! Read-only candidate history.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    Json,
};
use examiner_types::{CandidateHistory, CandidateIdentity};
use std::sync::Arc;

/// Handler for `GET /api/candidates/{identity}/history`.
///
/// Unknown candidates get an empty history rather than 404: a candidate
/// exists for the examiner as soon as the transport names them.
pub async fn get_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(identity): Path<String>,
) -> Result<Json<CandidateHistory>, ApiError> {
    let identity =
        CandidateIdentity::new(&identity).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let history = tokio::task::spawn_blocking(move || {
        state.history().get_history(&identity).map_err(|e| {
            tracing::error!(candidate = %identity, error = %e, "history read failed");
            ApiError::InternalServerError(e.to_string())
        })
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(history))
}
