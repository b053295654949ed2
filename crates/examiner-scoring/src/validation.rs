//! Validation and normalization of result payloads.
//!
//! Every problem in a payload is collected before returning, so one
//! rejection tells the driver everything it has to fix.

use chrono::{DateTime, Utc};
use examiner_types::{
    Assessment, InterviewPhase, LongTurnTranscript, PhaseTranscript, SkillDimension, SkillScores,
    Transcript, MAX_SCORE, MIN_SCORE,
};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::payload::{
    lookup, lookup_named, phase_for_key, skill_for_key, Field, Lookup, RawResultPayload,
};

/// Validates a payload against the recorded transcript and normalizes it.
///
/// - The band score is rounded to the nearest 0.5 and clamped to 0–9.
/// - Skill scores outside 0–9 are rejected, never clamped.
/// - Skill and field names may use any supported synonym.
/// - The embedded transcript must agree with `recorded` (whitespace aside);
///   the returned assessment always carries `recorded` itself.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming every missing and malformed field.
pub fn validate_and_normalize(
    payload: &RawResultPayload,
    recorded: &Transcript,
    assessed_at: DateTime<Utc>,
) -> Result<Assessment, ValidationError> {
    let mut errors = ValidationError::default();

    let Some(obj) = payload.as_value().as_object() else {
        errors.malformed("payload");
        return Err(errors);
    };

    let band_score = read_band_score(obj, &mut errors);
    let (detailed_scores, embedded_feedback) = read_detailed_scores(obj, &mut errors);
    let feedback = read_feedback(obj, embedded_feedback, &mut errors);
    let strengths = read_statements(obj, Field::Strengths, &mut errors);
    let improvements = read_statements(obj, Field::Improvements, &mut errors);
    check_transcript(obj, recorded, &mut errors);

    match (band_score, detailed_scores, feedback, strengths, improvements) {
        (Some(band_score), Some(detailed_scores), Some(feedback), Some(strengths), Some(improvements))
            if errors.is_empty() =>
        {
            Ok(Assessment {
                band_score,
                detailed_scores,
                feedback,
                strengths,
                improvements,
                transcript: recorded.clone(),
                assessed_at,
            })
        }
        _ => {
            tracing::debug!(
                missing = ?errors.missing_fields,
                malformed = ?errors.malformed_fields,
                "result payload rejected"
            );
            Err(errors)
        }
    }
}

/// Rounds a band score to the nearest half band and clamps it to 0–9.
pub fn normalize_band(raw: f64) -> f64 {
    let stepped = (raw * 2.0).round() / 2.0;
    if stepped <= MIN_SCORE {
        MIN_SCORE
    } else if stepped >= MAX_SCORE {
        MAX_SCORE
    } else {
        stepped
    }
}

fn skill_index(dimension: SkillDimension) -> usize {
    match dimension {
        SkillDimension::FluencyCoherence => 0,
        SkillDimension::LexicalResource => 1,
        SkillDimension::GrammaticalRange => 2,
        SkillDimension::Pronunciation => 3,
    }
}

/// Accepts JSON numbers and numeric strings such as `"6.5"`.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn read_band_score(obj: &Map<String, Value>, errors: &mut ValidationError) -> Option<f64> {
    let key = Field::BandScore.key();
    match lookup(obj, Field::resolve, Field::BandScore) {
        Lookup::Absent => {
            errors.missing(key);
            None
        }
        Lookup::Conflict => {
            errors.malformed(key);
            None
        }
        Lookup::Found(value) => match as_number(value) {
            Some(raw) => Some(normalize_band(raw)),
            None => {
                errors.malformed(key);
                None
            }
        },
    }
}

/// Reads the four skill scores. A skill entry may also be an object such as
/// `{"score": 6, "feedback": "..."}`; its feedback text is returned so it can
/// stand in for a missing `feedback` entry.
fn read_detailed_scores(
    obj: &Map<String, Value>,
    errors: &mut ValidationError,
) -> (Option<SkillScores<f64>>, [Option<String>; 4]) {
    let mut embedded: [Option<String>; 4] = Default::default();
    let base = Field::DetailedScores.key();

    let scores_obj = match lookup(obj, Field::resolve, Field::DetailedScores) {
        Lookup::Absent => {
            errors.missing(base);
            return (None, embedded);
        }
        Lookup::Conflict => {
            errors.malformed(base);
            return (None, embedded);
        }
        Lookup::Found(Value::Object(map)) => map,
        Lookup::Found(_) => {
            errors.malformed(base);
            return (None, embedded);
        }
    };

    let mut scores = [None; 4];
    for dimension in SkillDimension::ALL {
        let path = format!("{base}.{}", dimension.key());
        let entry = match lookup(scores_obj, skill_for_key, dimension) {
            Lookup::Absent => {
                errors.missing(path);
                continue;
            }
            Lookup::Conflict => {
                errors.malformed(path);
                continue;
            }
            Lookup::Found(value) => value,
        };

        let score_value = match entry {
            Value::Object(inner) => {
                if let Lookup::Found(Value::String(text)) =
                    lookup_named(inner, &["feedback", "comment", "comments"])
                {
                    embedded[skill_index(dimension)] = non_blank(text);
                }
                match lookup_named(inner, &["score", "band", "value", "rating"]) {
                    Lookup::Found(v) => Some(v),
                    _ => None,
                }
            }
            other => Some(other),
        };

        match score_value.and_then(as_number) {
            Some(score) if (MIN_SCORE..=MAX_SCORE).contains(&score) => {
                scores[skill_index(dimension)] = Some(score);
            }
            _ => errors.malformed(path),
        }
    }

    match scores {
        [Some(fc), Some(lr), Some(gr), Some(pr)] => (
            Some(SkillScores {
                fluency_coherence: fc,
                lexical_resource: lr,
                grammatical_range: gr,
                pronunciation: pr,
            }),
            embedded,
        ),
        _ => (None, embedded),
    }
}

fn read_feedback(
    obj: &Map<String, Value>,
    embedded: [Option<String>; 4],
    errors: &mut ValidationError,
) -> Option<SkillScores<String>> {
    let base = Field::Feedback.key();
    let feedback_obj = match lookup(obj, Field::resolve, Field::Feedback) {
        Lookup::Absent => None,
        Lookup::Found(Value::Object(map)) => Some(map),
        Lookup::Found(_) | Lookup::Conflict => {
            errors.malformed(base);
            return None;
        }
    };

    let mut texts: [Option<String>; 4] = Default::default();
    for dimension in SkillDimension::ALL {
        let idx = skill_index(dimension);
        let path = format!("{base}.{}", dimension.key());
        let explicit = feedback_obj.map(|map| lookup(map, skill_for_key, dimension));
        match explicit {
            Some(Lookup::Found(Value::String(text))) => match non_blank(text) {
                Some(text) => texts[idx] = Some(text),
                None => errors.missing(path),
            },
            Some(Lookup::Found(_)) | Some(Lookup::Conflict) => errors.malformed(path),
            Some(Lookup::Absent) | None => match &embedded[idx] {
                Some(text) => texts[idx] = Some(text.clone()),
                None => errors.missing(path),
            },
        }
    }

    match texts {
        [Some(fc), Some(lr), Some(gr), Some(pr)] => Some(SkillScores {
            fluency_coherence: fc,
            lexical_resource: lr,
            grammatical_range: gr,
            pronunciation: pr,
        }),
        _ => None,
    }
}

/// Reads a non-empty list of statements. A single string counts as a
/// one-item list; blank entries are dropped.
fn read_statements(
    obj: &Map<String, Value>,
    field: Field,
    errors: &mut ValidationError,
) -> Option<Vec<String>> {
    let key = field.key();
    let statements = match lookup(obj, Field::resolve, field) {
        Lookup::Absent => {
            errors.missing(key);
            return None;
        }
        Lookup::Conflict => {
            errors.malformed(key);
            return None;
        }
        Lookup::Found(Value::String(text)) => non_blank(text).into_iter().collect(),
        Lookup::Found(Value::Array(items)) => {
            let mut statements = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(text) => statements.extend(non_blank(text)),
                    _ => errors.malformed(format!("{key}[{i}]")),
                }
            }
            statements
        }
        Lookup::Found(_) => {
            errors.malformed(key);
            return None;
        }
    };

    if statements.is_empty() {
        errors.missing(key);
        return None;
    }
    Some(statements)
}

fn check_transcript(obj: &Map<String, Value>, recorded: &Transcript, errors: &mut ValidationError) {
    let base = Field::Transcript.key();
    let transcript = match lookup(obj, Field::resolve, Field::Transcript) {
        Lookup::Absent => {
            errors.missing(base);
            return;
        }
        Lookup::Found(Value::Object(map)) => map,
        Lookup::Found(_) | Lookup::Conflict => {
            errors.malformed(base);
            return;
        }
    };

    for phase in InterviewPhase::ALL {
        let path = format!("{base}.{phase}");
        let section = match lookup(transcript, phase_for_key, phase) {
            Lookup::Absent => {
                errors.missing(path);
                continue;
            }
            Lookup::Found(Value::Object(map)) => map,
            Lookup::Found(_) | Lookup::Conflict => {
                errors.malformed(path);
                continue;
            }
        };
        match phase {
            InterviewPhase::Phase1 => check_phase(section, &path, &recorded.phase1, errors),
            InterviewPhase::Phase2 => check_long_turn(section, &path, &recorded.phase2, errors),
            InterviewPhase::Phase3 => check_phase(section, &path, &recorded.phase3, errors),
        }
    }
}

fn check_phase(
    section: &Map<String, Value>,
    path: &str,
    recorded: &PhaseTranscript,
    errors: &mut ValidationError,
) {
    check_list(
        lookup_named(section, &["questions", "prompts"]),
        &format!("{path}.questions"),
        &recorded.questions,
        errors,
    );
    check_list(
        lookup_named(section, &["responses", "answers"]),
        &format!("{path}.responses"),
        &recorded.responses,
        errors,
    );
}

fn check_long_turn(
    section: &Map<String, Value>,
    path: &str,
    recorded: &LongTurnTranscript,
    errors: &mut ValidationError,
) {
    check_text(
        lookup_named(section, &["topic", "cue_card", "prompt", "question"]),
        &format!("{path}.topic"),
        &recorded.topic,
        errors,
    );
    check_text(
        lookup_named(section, &["response", "answer"]),
        &format!("{path}.response"),
        &recorded.response,
        errors,
    );
}

fn check_list(found: Lookup<'_>, path: &str, recorded: &[String], errors: &mut ValidationError) {
    let items = match found {
        Lookup::Absent => {
            errors.missing(path);
            return;
        }
        Lookup::Found(Value::Array(items)) if items.len() == recorded.len() => items,
        Lookup::Found(_) | Lookup::Conflict => {
            errors.malformed(path);
            return;
        }
    };
    for (i, (item, expected)) in items.iter().zip(recorded).enumerate() {
        match item {
            Value::String(text) if same_text(text, expected) => {}
            _ => errors.malformed(format!("{path}[{i}]")),
        }
    }
}

fn check_text(found: Lookup<'_>, path: &str, recorded: &str, errors: &mut ValidationError) {
    match found {
        Lookup::Absent => errors.missing(path),
        Lookup::Found(Value::String(text)) if same_text(text, recorded) => {}
        Lookup::Found(_) | Lookup::Conflict => errors.malformed(path),
    }
}

/// Text equality ignoring differences in whitespace.
fn same_text(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
