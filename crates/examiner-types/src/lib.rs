//! Shared types, error definitions, and constants for the examiner workspace.
//!
//! This crate provides the foundational types used across all examiner
//! crates: candidate and session identifiers, interview phases, difficulty
//! tiers, the four rubric skill dimensions, and the durable result record
//! that is appended to a candidate's history.
//!
//! No crate in the workspace depends on anything *except* `examiner-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

mod policy;
mod result;

pub use policy::ExamPolicy;
pub use result::{
    Assessment, CandidateHistory, ExamResult, LongTurnTranscript, PhaseTranscript, SkillScores,
    Transcript,
};

/// Lowest possible band or skill score.
pub const MIN_SCORE: f64 = 0.0;

/// Highest possible band or skill score.
pub const MAX_SCORE: f64 = 9.0;

/// Errors raised when constructing identifiers from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("candidate identity must not be empty")]
    EmptyIdentity,
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
    #[error("unknown interview phase: {0}")]
    UnknownPhase(String),
}

/// Opaque, stable identifier for one candidate across sessions.
///
/// Supplied by the transport layer (for example a verified e-mail address);
/// the examiner never derives it from conversation content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CandidateIdentity(String);

impl CandidateIdentity {
    /// Creates an identity, trimming surrounding whitespace.
    ///
    /// Returns [`IdentifierError::EmptyIdentity`] for blank input.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::EmptyIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CandidateIdentity {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CandidateIdentity> for String {
    fn from(identity: CandidateIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for CandidateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one examination session.
///
/// Also the idempotency key for result persistence: a session appends at
/// most one result no matter how often the write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidSessionId(s.to_string()))
    }
}

/// The three fixed segments of the spoken exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterviewPhase {
    /// Short personal-interview questions.
    #[serde(rename = "phase1")]
    Phase1,
    /// One extended individual response on a cue-card topic.
    #[serde(rename = "phase2")]
    Phase2,
    /// Abstract two-way discussion questions.
    #[serde(rename = "phase3")]
    Phase3,
}

impl InterviewPhase {
    /// All phases in interview order.
    pub const ALL: [InterviewPhase; 3] = [Self::Phase1, Self::Phase2, Self::Phase3];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phase1 => "phase1",
            Self::Phase2 => "phase2",
            Self::Phase3 => "phase3",
        }
    }

    /// Human-readable name used in prompt context.
    pub fn label(self) -> &'static str {
        match self {
            Self::Phase1 => "personal interview",
            Self::Phase2 => "individual long turn",
            Self::Phase3 => "two-way discussion",
        }
    }

    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Phase1 => Some(Self::Phase2),
            Self::Phase2 => Some(Self::Phase3),
            Self::Phase3 => None,
        }
    }
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewPhase {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phase1" => Ok(Self::Phase1),
            "phase2" => Ok(Self::Phase2),
            "phase3" => Ok(Self::Phase3),
            _ => Err(IdentifierError::UnknownPhase(s.to_string())),
        }
    }
}

/// Difficulty tier used to pick questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Foundation,
    /// Default for first-time candidates.
    #[default]
    Intermediate,
    Advanced,
}

impl Tier {
    /// Derives the tier from a candidate's most recent band score.
    pub fn from_band(band_score: f64) -> Self {
        if band_score < 5.0 {
            Self::Foundation
        } else if band_score < 7.0 {
            Self::Intermediate
        } else {
            Self::Advanced
        }
    }

    /// Picks the tier for a candidate: derived from the latest result when
    /// one exists, the default tier otherwise.
    pub fn for_history(history: Option<&CandidateHistory>) -> Self {
        history
            .and_then(CandidateHistory::latest)
            .map(|r| Self::from_band(r.band_score))
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four fixed rubric dimensions scored for every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillDimension {
    FluencyCoherence,
    LexicalResource,
    GrammaticalRange,
    Pronunciation,
}

impl SkillDimension {
    pub const ALL: [SkillDimension; 4] = [
        Self::FluencyCoherence,
        Self::LexicalResource,
        Self::GrammaticalRange,
        Self::Pronunciation,
    ];

    /// Canonical field name in the persisted result document.
    pub fn key(self) -> &'static str {
        match self {
            Self::FluencyCoherence => "fluency_coherence",
            Self::LexicalResource => "lexical_resource",
            Self::GrammaticalRange => "grammatical_range",
            Self::Pronunciation => "pronunciation",
        }
    }
}

impl fmt::Display for SkillDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
