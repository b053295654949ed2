//! Session lifecycle states.

use std::fmt;

use examiner_types::InterviewPhase;
use serde::{Deserialize, Serialize};

/// Where a session is in the exam.
///
/// `Identifying → Phase1 → Phase2 → Phase3 → Scoring → Completed`. There is
/// no failed state: a failing operation leaves the state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Identifying,
    #[serde(rename = "phase1")]
    Phase1Active,
    #[serde(rename = "phase2")]
    Phase2Active,
    #[serde(rename = "phase3")]
    Phase3Active,
    Scoring,
    /// Terminal. The result has been durably appended.
    Completed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifying => "identifying",
            Self::Phase1Active => "phase1",
            Self::Phase2Active => "phase2",
            Self::Phase3Active => "phase3",
            Self::Scoring => "scoring",
            Self::Completed => "completed",
        }
    }

    /// The interview phase that is accepting responses, if any.
    pub fn active_phase(self) -> Option<InterviewPhase> {
        match self {
            Self::Phase1Active => Some(InterviewPhase::Phase1),
            Self::Phase2Active => Some(InterviewPhase::Phase2),
            Self::Phase3Active => Some(InterviewPhase::Phase3),
            _ => None,
        }
    }

    pub fn for_phase(phase: InterviewPhase) -> Self {
        match phase {
            InterviewPhase::Phase1 => Self::Phase1Active,
            InterviewPhase::Phase2 => Self::Phase2Active,
            InterviewPhase::Phase3 => Self::Phase3Active,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
