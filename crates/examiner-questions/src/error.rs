//! Error types for the question bank and selector.

use examiner_types::{InterviewPhase, Tier};

/// Errors that can occur loading the bank or selecting a session's questions.
///
/// Every variant is a configuration problem: a session cannot start until
/// the bank or policy is fixed.
#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question bank: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate question id: {0}")]
    DuplicateId(String),

    #[error("question {0} has empty text")]
    EmptyText(String),

    #[error("question bank has no {phase} questions for tier {tier}")]
    EmptyPhase { phase: InterviewPhase, tier: Tier },

    #[error("policy requests zero questions for {0}")]
    ZeroQuestionCount(InterviewPhase),
}
