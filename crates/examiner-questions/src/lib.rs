//! Question bank and per-session question selection.
//!
//! The bank is a static, versioned catalog of interview prompts grouped by
//! phase and difficulty tier. It ships compiled into the binary and can be
//! replaced by a TOML file at start-up. The selector draws one complete,
//! non-empty question set per session from it.
//!
//! # Selection rules
//!
//! - Phase 1 and phase 3 receive the number of prompts set in
//!   [`ExamPolicy`](examiner_types::ExamPolicy); phase 2 one cue card.
//! - Prompts from the candidate's most recent session are avoided while the
//!   tier still has alternatives.
//! - Discussion questions linked to the chosen cue card are preferred.
//! - A phase with no entries for the tier is a configuration error.

mod bank;
mod error;
mod selector;

pub use bank::{BankQuestion, QuestionBank};
pub use error::QuestionBankError;
pub use selector::{CueCard, Prompt, QuestionSelector, SessionQuestions};
