//! Candidate result history and bounded-retry result persistence.
//!
//! A candidate's history is an ordered list of [`ExamResult`]s numbered
//! `1..=n` without gaps. The [`HistoryStore`] trait is the persistence seam:
//!
//! - [`SqliteHistoryStore`] keeps results in the `exam_results` table and
//!   assigns test numbers inside an `IMMEDIATE` transaction.
//! - [`MemoryHistoryStore`] keeps them in process memory behind a
//!   per-candidate mutex.
//!
//! [`ResultWriter`] sits in front of a store and retries failed appends
//! with the same session key, so a retry can never produce a second entry
//! for the same session.
//!
//! [`ExamResult`]: examiner_types::ExamResult

mod error;
mod memory;
mod sqlite;
mod store;
mod writer;

pub use error::{HistoryError, PersistenceError};
pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
pub use store::HistoryStore;
pub use writer::ResultWriter;
