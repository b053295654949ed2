//! The raw, model-produced result payload and field-name resolution.
//!
//! The payload comes from a language model whose field names drift between
//! calls: `detailed_scores` vs `scores`, `Fluency & Coherence` vs
//! `fluencyCoherence` vs `fluency`. Keys are first normalized to snake case
//! with `and` tokens removed, then matched against a fixed synonym table.

use examiner_types::{InterviewPhase, SkillDimension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An unvalidated result payload exactly as the driver sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawResultPayload(pub Value);

impl RawResultPayload {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawResultPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Canonical top-level fields of a result payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    BandScore,
    DetailedScores,
    Feedback,
    Strengths,
    Improvements,
    Transcript,
}

impl Field {
    pub(crate) fn key(self) -> &'static str {
        match self {
            Self::BandScore => "band_score",
            Self::DetailedScores => "detailed_scores",
            Self::Feedback => "feedback",
            Self::Strengths => "strengths",
            Self::Improvements => "improvements",
            Self::Transcript => "transcript",
        }
    }

    pub(crate) fn resolve(normalized: &str) -> Option<Self> {
        match normalized {
            "band_score" | "band" | "overall_band" | "overall_band_score" | "overall_score"
            | "overall" => Some(Self::BandScore),
            "detailed_scores" | "scores" | "skill_scores" | "criteria_scores" | "criteria"
            | "band_scores" => Some(Self::DetailedScores),
            "feedback" | "detailed_feedback" | "skill_feedback" | "feedback_by_skill"
            | "comments" => Some(Self::Feedback),
            "strengths" | "strong_points" | "strength" => Some(Self::Strengths),
            "improvements" | "areas_for_improvement" | "improvement_areas" | "weaknesses"
            | "areas_to_improve" | "improvement" => Some(Self::Improvements),
            "transcript" | "conversation" | "transcription" => Some(Self::Transcript),
            _ => None,
        }
    }
}

/// Maps a (raw) skill key to its dimension, if it is a known synonym.
pub fn skill_for_key(raw: &str) -> Option<SkillDimension> {
    match normalize_key(raw).as_str() {
        "fluency_coherence" | "fluency" | "coherence" | "fluency_cohesion" | "fc" => {
            Some(SkillDimension::FluencyCoherence)
        }
        "lexical_resource" | "lexical" | "lexis" | "vocabulary" | "lexical_range" | "lr" => {
            Some(SkillDimension::LexicalResource)
        }
        "grammatical_range" | "grammatical_range_accuracy" | "grammatical_accuracy"
        | "grammar" | "grammar_accuracy" | "grammatical" | "gra" => {
            Some(SkillDimension::GrammaticalRange)
        }
        "pronunciation" | "pronounciation" | "pron" => Some(SkillDimension::Pronunciation),
        _ => None,
    }
}

pub(crate) fn phase_for_key(normalized: &str) -> Option<InterviewPhase> {
    match normalized.replace('_', "").as_str() {
        "phase1" | "part1" => Some(InterviewPhase::Phase1),
        "phase2" | "part2" => Some(InterviewPhase::Phase2),
        "phase3" | "part3" => Some(InterviewPhase::Phase3),
        _ => None,
    }
}

/// Normalizes a field name: camelCase and punctuation become snake case,
/// and standalone `and` tokens are dropped.
///
/// `"Fluency & Coherence"`, `"fluencyAndCoherence"` and
/// `"fluency_and_coherence"` all become `"fluency_coherence"`.
pub fn normalize_key(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch.is_uppercase() && prev_lower {
            spaced.push('_');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        if ch.is_alphanumeric() {
            spaced.extend(ch.to_lowercase());
        } else {
            spaced.push('_');
        }
    }
    spaced
        .split('_')
        .filter(|t| !t.is_empty() && *t != "and")
        .collect::<Vec<_>>()
        .join("_")
}

/// Result of looking a canonical field up among its spellings.
#[derive(Debug)]
pub(crate) enum Lookup<'a> {
    Absent,
    Found(&'a Value),
    /// Several spellings present with different values.
    Conflict,
}

/// Finds the value for `wanted` in `obj`, accepting any key that `resolve`
/// maps to it. Null values count as absent.
pub(crate) fn lookup<'a, K: Copy + PartialEq>(
    obj: &'a Map<String, Value>,
    resolve: impl Fn(&str) -> Option<K>,
    wanted: K,
) -> Lookup<'a> {
    let mut found: Option<&Value> = None;
    for (key, value) in obj {
        if value.is_null() || resolve(&normalize_key(key)) != Some(wanted) {
            continue;
        }
        match found {
            Some(prev) if prev != value => return Lookup::Conflict,
            _ => found = Some(value),
        }
    }
    found.map_or(Lookup::Absent, Lookup::Found)
}

/// Looks up one of a fixed list of plain (already normalized) names.
pub(crate) fn lookup_named<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Lookup<'a> {
    lookup(obj, |k| names.iter().any(|n| *n == k).then_some(()), ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_key_variants() {
        assert_eq!(normalize_key("Fluency & Coherence"), "fluency_coherence");
        assert_eq!(normalize_key("fluencyAndCoherence"), "fluency_coherence");
        assert_eq!(normalize_key("fluency_and_coherence"), "fluency_coherence");
        assert_eq!(
            normalize_key("GrammaticalRangeAndAccuracy"),
            "grammatical_range_accuracy"
        );
        assert_eq!(normalize_key("  band-score "), "band_score");
        assert_eq!(normalize_key("Part 1"), "part_1");
    }

    #[test]
    fn skill_synonyms_resolve() {
        assert_eq!(
            skill_for_key("Fluency and Coherence"),
            Some(SkillDimension::FluencyCoherence)
        );
        assert_eq!(skill_for_key("vocabulary"), Some(SkillDimension::LexicalResource));
        assert_eq!(
            skill_for_key("grammatical_range_and_accuracy"),
            Some(SkillDimension::GrammaticalRange)
        );
        assert_eq!(skill_for_key("Pronunciation"), Some(SkillDimension::Pronunciation));
        assert_eq!(skill_for_key("overall"), None);
    }

    #[test]
    fn phase_keys_resolve() {
        assert_eq!(phase_for_key(&normalize_key("Part 2")), Some(InterviewPhase::Phase2));
        assert_eq!(phase_for_key("phase_3"), Some(InterviewPhase::Phase3));
        assert_eq!(phase_for_key("phase4"), None);
    }

    #[test]
    fn lookup_detects_conflicting_spellings() {
        let value = json!({"band_score": 6.5, "overall_band": 7.0});
        let obj = value.as_object().unwrap();
        assert!(matches!(
            lookup(obj, Field::resolve, Field::BandScore),
            Lookup::Conflict
        ));

        let value = json!({"band_score": 6.5, "overallBand": 6.5});
        let obj = value.as_object().unwrap();
        assert!(matches!(
            lookup(obj, Field::resolve, Field::BandScore),
            Lookup::Found(v) if v == &json!(6.5)
        ));
    }

    #[test]
    fn lookup_treats_null_as_absent() {
        let value = json!({"strengths": null});
        let obj = value.as_object().unwrap();
        assert!(matches!(
            lookup(obj, Field::resolve, Field::Strengths),
            Lookup::Absent
        ));
    }
}
