//! The tool surface exposed to the conversation driver.

use examiner_questions::SessionQuestions;
use examiner_scoring::RawResultPayload;
use examiner_types::{CandidateIdentity, InterviewPhase, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;
use crate::state::SessionState;

/// One driver-invoked operation.
///
/// ```json
/// {"tool": "record_response", "phase": "phase1", "question_index": 0, "response_text": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    IdentifyCandidate,
    RecordResponse {
        phase: InterviewPhase,
        question_index: usize,
        response_text: String,
    },
    AdvancePhase,
    FinalizeAndScore { payload: RawResultPayload },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdentifyCandidate => "identify_candidate",
            Self::RecordResponse { .. } => "record_response",
            Self::AdvancePhase => "advance_phase",
            Self::FinalizeAndScore { .. } => "finalize_and_score",
        }
    }
}

/// Successful outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolReply {
    Identified {
        candidate: CandidateIdentity,
        tier: Tier,
        prior_attempts: usize,
        last_band_score: Option<f64>,
        questions: SessionQuestions,
    },
    Recorded {
        phase: InterviewPhase,
        question_index: usize,
        /// Slots of the phase still without a response.
        remaining: usize,
    },
    Advanced {
        from: SessionState,
        to: SessionState,
    },
    /// The session's result is stored. Returned for every call once the
    /// session is complete.
    Completed { test_number: u32 },
}

/// Serialisable failure body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: String,
    pub retryable: bool,
    pub message: String,
    pub details: Value,
}

impl From<&SessionError> for ToolFailure {
    fn from(err: &SessionError) -> Self {
        Self {
            kind: err.kind().to_string(),
            retryable: err.retryable(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

/// The envelope returned to the driver for every tool call:
/// `{"ok": true, "reply": {...}}` or `{"ok": false, "error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ToolReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl From<&Result<ToolReply, SessionError>> for ToolResponse {
    fn from(result: &Result<ToolReply, SessionError>) -> Self {
        match result {
            Ok(reply) => Self {
                ok: true,
                reply: Some(reply.clone()),
                error: None,
            },
            Err(err) => Self {
                ok: false,
                reply: None,
                error: Some(ToolFailure::from(err)),
            },
        }
    }
}
