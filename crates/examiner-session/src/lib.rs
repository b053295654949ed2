//! The examination session controller.
//!
//! A [`SessionController`] sequences one spoken exam through
//! identification, three interview phases and scoring, and guarantees that
//! a completed session appends exactly one result to the candidate's
//! history no matter how often the driver repeats its calls.
//!
//! The conversation driver talks to the controller only through
//! [`ToolCall`]s. Each call returns either a [`ToolReply`] or a typed
//! [`SessionError`]; [`ToolResponse`] is the serialised envelope for both.
//!
//! # Lifecycle
//!
//! ```text
//! Identifying ─identify_candidate─▶ Phase1 ─advance_phase─▶ Phase2 ─advance_phase─▶ Phase3
//!                                                                                     │
//!           Completed ◀─finalize_and_score (stored)─ Scoring ◀─advance_phase / finalize┘
//! ```
//!
//! A phase can only be left once every question slot has a recorded
//! response; an empty response counts as recorded.

mod context;
mod controller;
mod error;
mod state;
mod tools;

pub use context::PromptContext;
pub use controller::SessionController;
pub use error::SessionError;
pub use state::SessionState;
pub use tools::{ToolCall, ToolFailure, ToolReply, ToolResponse};
