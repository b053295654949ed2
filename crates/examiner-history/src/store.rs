//! The history store abstraction.

use examiner_types::{Assessment, CandidateHistory, CandidateIdentity, SessionId};

use crate::error::HistoryError;

/// Durable, per-candidate result history.
///
/// Implementations must serialise appends per candidate: two sessions for
/// the same identity finishing at the same time receive consecutive test
/// numbers, never the same one.
pub trait HistoryStore: Send + Sync {
    /// Returns the candidate's results ordered by test number. A first-time
    /// candidate yields an empty history.
    fn get_history(&self, identity: &CandidateIdentity) -> Result<CandidateHistory, HistoryError>;

    /// Appends an assessment as the candidate's next result and returns its
    /// test number.
    ///
    /// `session_id` is the idempotency key: appending again for a session
    /// that already has a result returns the existing test number and writes
    /// nothing.
    fn append_result(
        &self,
        identity: &CandidateIdentity,
        session_id: SessionId,
        assessment: &Assessment,
    ) -> Result<u32, HistoryError>;
}
