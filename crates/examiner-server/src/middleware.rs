//! Transport identity extraction.

use crate::api::ApiError;
use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use examiner_types::CandidateIdentity;

/// Header carrying the verified candidate identity from the transport layer.
pub const IDENTITY_HEADER: &str = "X-Candidate-Identity";

/// Identity established by the transport, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct TransportIdentity(pub CandidateIdentity);

/// Rejects requests without a usable `X-Candidate-Identity` header.
///
/// The examiner trusts whoever sits in front of it to have verified the
/// value; it only refuses to open a session without one.
pub async fn transport_identity_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = req
        .headers()
        .get(IDENTITY_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", IDENTITY_HEADER)))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("unreadable {} header", IDENTITY_HEADER)))?;

    let identity =
        CandidateIdentity::new(raw).map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    req.extensions_mut().insert(TransportIdentity(identity));
    Ok(next.run(req).await)
}
