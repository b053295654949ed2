//! Operator event log for the examiner service.
//!
//! Every session lifecycle step is appended to `exam_event_log` with a
//! global, monotonically increasing sequence number. The log is the
//! human-visible channel for failures the service cannot repair on its own:
//! a validated assessment that could not be persisted is recorded as
//! `RESULT_PERSIST_FAILED`, together with the assessment document itself.
//!
//! | Event type | Emitted when |
//! |------------|--------------|
//! | `SESSION_STARTED` | a transport opens a session |
//! | `CANDIDATE_IDENTIFIED` | history was read and questions selected |
//! | `PHASE_ADVANCED` | the session moved to its next state |
//! | `SCORING_REJECTED` | a result payload failed validation |
//! | `RESULT_PERSISTED` | a result was appended to history |
//! | `RESULT_PERSIST_FAILED` | appending failed after every retry |
//! | `SESSION_DISCARDED` | a session was dropped without a result |

mod error;
mod event;
mod store;

pub use error::ObserveError;
pub use event::{EventRecord, ExamEvent};
pub use store::{emit_event, query_events, EventFilter};

#[cfg(test)]
mod tests;
