//! Error type for the scoring assembler.

use serde::{Deserialize, Serialize};

/// A rejected result payload.
///
/// Field paths use dots and indices (`feedback.pronunciation`,
/// `transcript.phase1.responses[2]`) so the driver can repair exactly the
/// offending parts and resubmit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error(
    "invalid result payload (missing: [{}]; malformed: [{}])",
    .missing_fields.join(", "),
    .malformed_fields.join(", ")
)]
pub struct ValidationError {
    /// Required fields that are absent or blank.
    pub missing_fields: Vec<String>,
    /// Fields that are present but have the wrong type, range or content.
    pub malformed_fields: Vec<String>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.missing_fields.is_empty() && self.malformed_fields.is_empty()
    }

    pub(crate) fn missing(&mut self, field: impl Into<String>) {
        self.missing_fields.push(field.into());
    }

    pub(crate) fn malformed(&mut self, field: impl Into<String>) {
        self.malformed_fields.push(field.into());
    }
}
