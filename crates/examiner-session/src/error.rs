//! Typed failures returned to the conversation driver.

use examiner_history::PersistenceError;
use examiner_questions::QuestionBankError;
use examiner_scoring::ValidationError;
use examiner_types::InterviewPhase;
use serde_json::{json, Value};

use crate::state::SessionState;

/// A tool call that did not take effect.
///
/// Every variant is returned to the driver as data; none of them ends the
/// conversation by itself. [`kind`](Self::kind) and
/// [`retryable`](Self::retryable) let the driver react without parsing the
/// message.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The question bank cannot supply this session. Fatal to the session.
    #[error("session cannot start: {0}")]
    Configuration(#[from] QuestionBankError),

    /// Some question slots of the active phase have no response yet.
    #[error("{phase} is not complete: question(s) {missing:?} have no recorded response")]
    IncompletePhase {
        phase: InterviewPhase,
        missing: Vec<usize>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The call targets a phase that is not active. Nothing was changed.
    #[error("{requested} is not active (session is in {active})")]
    StaleOperation {
        requested: InterviewPhase,
        active: SessionState,
    },

    /// The validated result could not be stored after every retry. The
    /// session keeps it, and the next `finalize_and_score` writes it again.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{operation} is not allowed while the session is in {state}")]
    OutOfOrder {
        operation: &'static str,
        state: SessionState,
    },

    #[error("{phase} has {count} question(s); index {index} does not exist")]
    InvalidQuestion {
        phase: InterviewPhase,
        index: usize,
        count: usize,
    },

    #[error("candidate history unavailable: {0}")]
    HistoryUnavailable(String),
}

impl SessionError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::IncompletePhase { .. } => "incomplete_phase",
            Self::Validation(_) => "validation_error",
            Self::StaleOperation { .. } => "stale_operation",
            Self::Persistence(_) => "persistence_error",
            Self::OutOfOrder { .. } => "out_of_order",
            Self::InvalidQuestion { .. } => "invalid_question",
            Self::HistoryUnavailable(_) => "history_unavailable",
        }
    }

    /// Whether repeating the call (after fixing its input, or after the
    /// candidate has answered) can succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::IncompletePhase { .. }
                | Self::Validation(_)
                | Self::HistoryUnavailable(_)
                | Self::Persistence(_)
        )
    }

    /// Errors after which the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Structured details for the driver.
    pub fn details(&self) -> Value {
        match self {
            Self::IncompletePhase { phase, missing } => json!({
                "phase": phase,
                "missing_questions": missing,
            }),
            Self::Validation(e) => json!({
                "missing_fields": e.missing_fields,
                "malformed_fields": e.malformed_fields,
            }),
            Self::StaleOperation { requested, active } => json!({
                "requested": requested,
                "active": active,
            }),
            Self::Persistence(e) => json!({ "attempts": e.attempts }),
            Self::OutOfOrder { operation, state } => json!({
                "operation": operation,
                "state": state,
            }),
            Self::InvalidQuestion {
                phase,
                index,
                count,
            } => json!({
                "phase": phase,
                "question_index": index,
                "question_count": count,
            }),
            Self::Configuration(_) | Self::HistoryUnavailable(_) => Value::Null,
        }
    }
}
