//! Error types for the history store and result writer.

use examiner_types::{CandidateIdentity, SessionId};

/// Errors raised by a [`HistoryStore`](crate::HistoryStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A database operation failed.
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("history connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored result document could not be (de)serialized.
    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session key was already used for a different candidate.
    #[error("session {session_id} already recorded a result for another candidate than {identity}")]
    SessionConflict {
        session_id: SessionId,
        identity: CandidateIdentity,
    },

    /// The backend is temporarily unable to serve the request.
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// A validated result could not be durably appended.
///
/// Raised by [`ResultWriter`](crate::ResultWriter) only after every allowed
/// attempt has failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("result not persisted after {attempts} attempt(s): {last_error}")]
pub struct PersistenceError {
    pub attempts: u32,
    pub last_error: String,
}
