//! Event payload and record types for the operator event log.

use examiner_types::Tier;
use serde::{Deserialize, Serialize};

/// Structured payloads, one variant per event type.
///
/// Serialised to JSON into the `payload_json` column; the `event` tag
/// repeats the `event_type` column so a payload is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamEvent {
    /// A session was opened for a transport-supplied identity.
    SessionStarted {
        /// Identity reported by the transport at session start.
        transport_identity: String,
    },

    /// The candidate was identified and a question set was selected.
    CandidateIdentified {
        tier: Tier,
        bank_version: String,
        /// Number of results already in the candidate's history.
        prior_attempts: usize,
    },

    /// The session moved from one state to the next.
    PhaseAdvanced { from: String, to: String },

    /// A scoring payload failed validation.
    ScoringRejected {
        missing_fields: Vec<String>,
        malformed_fields: Vec<String>,
    },

    /// A validated result was appended to history.
    ResultPersisted { test_number: u32, band_score: f64 },

    /// A validated result could not be appended after all retries.
    ///
    /// This is the record an operator uses to recover a lost assessment.
    ResultPersistFailed {
        attempts: u32,
        last_error: String,
        /// The validated assessment document that was not stored.
        assessment: serde_json::Value,
    },

    /// The session was dropped without a persisted result.
    SessionDiscarded {
        /// `disconnected`, `idle_timeout` or `configuration_error`.
        reason: String,
        /// State the session was in when dropped.
        state: String,
        /// Validated assessment that could still not be written.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unsaved_assessment: Option<serde_json::Value>,
    },
}

impl ExamEvent {
    /// Returns the canonical event type string for this payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "SESSION_STARTED",
            Self::CandidateIdentified { .. } => "CANDIDATE_IDENTIFIED",
            Self::PhaseAdvanced { .. } => "PHASE_ADVANCED",
            Self::ScoringRejected { .. } => "SCORING_REJECTED",
            Self::ResultPersisted { .. } => "RESULT_PERSISTED",
            Self::ResultPersistFailed { .. } => "RESULT_PERSIST_FAILED",
            Self::SessionDiscarded { .. } => "SESSION_DISCARDED",
        }
    }

    /// Failures an operator has to act on.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            Self::ResultPersistFailed { .. }
                | Self::SessionDiscarded {
                    unsaved_assessment: Some(_),
                    ..
                }
        )
    }
}

/// A single row from the `exam_event_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Auto-incremented row ID.
    pub id: i64,
    /// The specific event type (e.g., `PHASE_ADVANCED`).
    pub event_type: String,
    pub session_id: String,
    /// Candidate identity, once known.
    pub candidate: Option<String>,
    /// Monotonically increasing sequence number across the log.
    pub seq: i64,
    /// The structured event payload as a JSON string.
    pub payload_json: String,
    /// ISO 8601 timestamp of when the event occurred.
    pub occurred_at: String,
}

impl EventRecord {
    /// Decodes the stored payload.
    pub fn payload(&self) -> Result<ExamEvent, serde_json::Error> {
        serde_json::from_str(&self.payload_json)
    }
}
