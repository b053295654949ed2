//! Read-only session snapshot for building the driver's prompt.

use examiner_questions::SessionQuestions;
use examiner_types::{CandidateIdentity, InterviewPhase, SessionId, Tier};
use serde::{Deserialize, Serialize};

use crate::state::SessionState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub session_id: SessionId,
    pub state: SessionState,
    pub candidate: Option<CandidateIdentity>,
    pub tier: Option<Tier>,
    /// Results already in the candidate's history before this session.
    pub prior_attempts: usize,
    pub last_band_score: Option<f64>,
    pub questions: Option<SessionQuestions>,
    pub active_phase: Option<InterviewPhase>,
    /// Question indices of the active phase that still need a response.
    pub unanswered: Vec<usize>,
    /// Set once the result is stored.
    pub test_number: Option<u32>,
    /// A validated result is waiting for a successful write.
    pub awaiting_persistence: bool,
    pub stale_operations: u32,
}
