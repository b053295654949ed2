//! Result payload validation and normalization.
//!
//! At the end of an exam the driver submits a loosely structured JSON
//! assessment. This crate turns it into a typed
//! [`Assessment`](examiner_types::Assessment) or rejects it with a
//! [`ValidationError`] listing every missing and malformed field.
//!
//! # Normalization
//!
//! - Field names are matched through a synonym table after case and
//!   punctuation normalization, so `Fluency & Coherence`, `fluencyCoherence`
//!   and `fluency` all name the same skill.
//! - The overall band is rounded to the nearest 0.5 and clamped to 0–9.
//! - Skill scores must already lie within 0–9.
//! - The embedded transcript must match what the session recorded.
//!
//! Validation is pure: the same payload and transcript always yield the same
//! outcome.

mod error;
mod payload;
mod validation;

pub use error::ValidationError;
pub use payload::{normalize_key, skill_for_key, RawResultPayload};
pub use validation::{normalize_band, validate_and_normalize};
