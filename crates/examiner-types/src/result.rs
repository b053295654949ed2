//! The durable result record and the per-candidate history document.
//!
//! Field names here are the persisted document layout. Downstream reporting
//! reads them back verbatim, so renaming a field is a breaking change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandidateIdentity, SkillDimension};

/// One value per rubric skill dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScores<T> {
    pub fluency_coherence: T,
    pub lexical_resource: T,
    pub grammatical_range: T,
    pub pronunciation: T,
}

impl<T> SkillScores<T> {
    /// Returns the value for one dimension.
    pub fn get(&self, dimension: SkillDimension) -> &T {
        match dimension {
            SkillDimension::FluencyCoherence => &self.fluency_coherence,
            SkillDimension::LexicalResource => &self.lexical_resource,
            SkillDimension::GrammaticalRange => &self.grammatical_range,
            SkillDimension::Pronunciation => &self.pronunciation,
        }
    }

    /// Iterates dimensions in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (SkillDimension, &T)> {
        SkillDimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Questions and responses of a multi-question phase, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTranscript {
    pub questions: Vec<String>,
    pub responses: Vec<String>,
}

/// The cue-card topic and the candidate's extended response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongTurnTranscript {
    pub topic: String,
    pub response: String,
}

/// Finalized transcript of all three phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub phase1: PhaseTranscript,
    pub phase2: LongTurnTranscript,
    pub phase3: PhaseTranscript,
}

impl Transcript {
    /// Every prompt text asked in this transcript, phase order.
    pub fn prompts(&self) -> impl Iterator<Item = &str> {
        self.phase1
            .questions
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.phase2.topic.as_str()))
            .chain(self.phase3.questions.iter().map(String::as_str))
    }
}

/// A validated, normalized assessment that has not been numbered yet.
///
/// Produced by the scoring assembler. `assessed_at` becomes the result's
/// `test_date`, so every persistence retry writes the same timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub band_score: f64,
    pub detailed_scores: SkillScores<f64>,
    pub feedback: SkillScores<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub transcript: Transcript,
    pub assessed_at: DateTime<Utc>,
}

/// The final, immutable record of one completed exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    /// Overall band, 0–9 in 0.5 steps.
    pub band_score: f64,
    pub detailed_scores: SkillScores<f64>,
    pub feedback: SkillScores<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub transcript: Transcript,
    /// 1-based position in the candidate's history.
    pub test_number: u32,
    pub test_date: DateTime<Utc>,
}

impl ExamResult {
    /// Numbers an assessment for appending to history.
    pub fn from_assessment(assessment: Assessment, test_number: u32) -> Self {
        Self {
            band_score: assessment.band_score,
            detailed_scores: assessment.detailed_scores,
            feedback: assessment.feedback,
            strengths: assessment.strengths,
            improvements: assessment.improvements,
            transcript: assessment.transcript,
            test_number,
            test_date: assessment.assessed_at,
        }
    }
}

/// Ordered results of one candidate, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateHistory {
    pub identity: CandidateIdentity,
    pub results: Vec<ExamResult>,
}

impl CandidateHistory {
    pub fn empty(identity: CandidateIdentity) -> Self {
        Self {
            identity,
            results: Vec::new(),
        }
    }

    /// The most recent result, if any.
    pub fn latest(&self) -> Option<&ExamResult> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Sequence number the next appended result receives.
    pub fn next_test_number(&self) -> u32 {
        u32::try_from(self.results.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_result() -> ExamResult {
        ExamResult {
            band_score: 6.5,
            detailed_scores: SkillScores {
                fluency_coherence: 6.0,
                lexical_resource: 6.0,
                grammatical_range: 7.0,
                pronunciation: 7.0,
            },
            feedback: SkillScores {
                fluency_coherence: "Some hesitation.".to_string(),
                lexical_resource: "Adequate range.".to_string(),
                grammatical_range: "Mostly accurate.".to_string(),
                pronunciation: "Clear.".to_string(),
            },
            strengths: vec!["Good fluency on familiar topics".to_string()],
            improvements: vec!["Use more idioms".to_string()],
            transcript: Transcript {
                phase1: PhaseTranscript {
                    questions: vec!["Where do you live?".to_string()],
                    responses: vec!["In Lyon.".to_string()],
                },
                phase2: LongTurnTranscript {
                    topic: "Describe a book you enjoyed.".to_string(),
                    response: "I read Dune last year.".to_string(),
                },
                phase3: PhaseTranscript {
                    questions: vec!["Do people read less today?".to_string()],
                    responses: vec![String::new()],
                },
            },
            test_number: 1,
            test_date: Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn result_document_uses_stable_field_names() {
        let value = serde_json::to_value(sample_result()).unwrap();
        for key in [
            "band_score",
            "detailed_scores",
            "feedback",
            "strengths",
            "improvements",
            "transcript",
            "test_number",
            "test_date",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["detailed_scores"]["grammatical_range"], 7.0);
        assert_eq!(value["transcript"]["phase2"]["topic"], "Describe a book you enjoyed.");
        assert_eq!(value["test_date"], "2026-03-01T10:30:00Z");
    }

    #[test]
    fn result_document_reads_back_without_loss() {
        let original = sample_result();
        let json = serde_json::to_string(&original).unwrap();
        let restored: ExamResult = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn history_numbering() {
        let mut history = CandidateHistory::empty(CandidateIdentity::new("a@b.c").unwrap());
        assert_eq!(history.next_test_number(), 1);
        assert!(history.latest().is_none());
        history.results.push(sample_result());
        assert_eq!(history.next_test_number(), 2);
        assert_eq!(history.latest().map(|r| r.band_score), Some(6.5));
    }

    #[test]
    fn transcript_prompts_in_phase_order() {
        let result = sample_result();
        let prompts: Vec<&str> = result.transcript.prompts().collect();
        assert_eq!(
            prompts,
            vec![
                "Where do you live?",
                "Describe a book you enjoyed.",
                "Do people read less today?"
            ]
        );
    }
}
