//! Examination policy configuration.

use serde::{Deserialize, Serialize};

/// Tunables shared by the selector, the controller and the result writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamPolicy {
    /// Number of personal-interview questions per session.
    #[serde(default = "default_phase_questions")]
    pub phase1_questions: usize,
    /// Number of discussion questions per session.
    #[serde(default = "default_phase_questions")]
    pub phase3_questions: usize,
    /// Total write attempts for one validated result before giving up.
    #[serde(default = "default_persist_max_attempts")]
    pub persist_max_attempts: u32,
    /// Base delay between write attempts; attempt `n` waits `n * backoff`.
    #[serde(default = "default_persist_backoff_ms")]
    pub persist_backoff_ms: u64,
}

fn default_phase_questions() -> usize {
    4
}

fn default_persist_max_attempts() -> u32 {
    3
}

fn default_persist_backoff_ms() -> u64 {
    50
}

impl Default for ExamPolicy {
    fn default() -> Self {
        Self {
            phase1_questions: default_phase_questions(),
            phase3_questions: default_phase_questions(),
            persist_max_attempts: default_persist_max_attempts(),
            persist_backoff_ms: default_persist_backoff_ms(),
        }
    }
}
