//! The static, versioned question catalog.

use std::collections::HashSet;
use std::path::Path;

use examiner_types::{InterviewPhase, Tier};
use serde::{Deserialize, Serialize};

use crate::error::QuestionBankError;

const BUILTIN_BANK: &str = include_str!("questions.toml");

/// One catalog entry.
///
/// Phase 2 entries are cue cards: `text` is the topic and `points` are the
/// bullet prompts shown to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub id: String,
    pub phase: InterviewPhase,
    pub tier: Tier,
    pub text: String,
    /// Links a cue card to its follow-up discussion questions.
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BankFile {
    version: String,
    #[serde(default)]
    questions: Vec<BankQuestion>,
}

/// Read-only question catalog shared by all sessions.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    version: String,
    questions: Vec<BankQuestion>,
}

impl QuestionBank {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_toml_str(BUILTIN_BANK)
    }

    /// Loads a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, QuestionBankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a TOML catalog.
    ///
    /// Ids must be unique and every text non-blank. A catalog may still lack
    /// questions for some phase/tier; that only fails at selection time.
    pub fn from_toml_str(contents: &str) -> Result<Self, QuestionBankError> {
        let file: BankFile = toml::from_str(contents)?;
        Self::new(file.version, file.questions)
    }

    pub fn new(version: String, questions: Vec<BankQuestion>) -> Result<Self, QuestionBankError> {
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(QuestionBankError::DuplicateId(q.id.clone()));
            }
            if q.text.trim().is_empty() {
                return Err(QuestionBankError::EmptyText(q.id.clone()));
            }
        }
        Ok(Self { version, questions })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Entries for one phase and tier, in catalog order.
    pub fn questions_for(
        &self,
        phase: InterviewPhase,
        tier: Tier,
    ) -> impl Iterator<Item = &BankQuestion> {
        self.questions
            .iter()
            .filter(move |q| q.phase == phase && q.tier == tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bank_covers_every_phase_and_tier() {
        let bank = QuestionBank::builtin().expect("built-in bank should parse");
        assert!(!bank.version().is_empty());
        for tier in [Tier::Foundation, Tier::Intermediate, Tier::Advanced] {
            for phase in InterviewPhase::ALL {
                let count = bank.questions_for(phase, tier).count();
                assert!(count > 0, "no {phase} questions for {tier}");
            }
            // Enough phase 1 material to avoid repeating a full default session.
            assert!(bank.questions_for(InterviewPhase::Phase1, tier).count() >= 8);
        }
    }

    #[test]
    fn builtin_cue_cards_have_points_and_topics() {
        let bank = QuestionBank::builtin().unwrap();
        for tier in [Tier::Foundation, Tier::Intermediate, Tier::Advanced] {
            for card in bank.questions_for(InterviewPhase::Phase2, tier) {
                assert!(!card.points.is_empty(), "{} has no points", card.id);
                assert!(card.topic.is_some(), "{} has no topic", card.id);
            }
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let toml = r#"
            version = "t"
            [[questions]]
            id = "x"
            phase = "phase1"
            tier = "foundation"
            text = "One?"
            [[questions]]
            id = "x"
            phase = "phase1"
            tier = "foundation"
            text = "Two?"
        "#;
        match QuestionBank::from_toml_str(toml) {
            Err(QuestionBankError::DuplicateId(id)) => assert_eq!(id, "x"),
            other => panic!("expected duplicate id error, got {other:?}"),
        }
    }

    #[test]
    fn blank_text_is_rejected() {
        let toml = r#"
            version = "t"
            [[questions]]
            id = "blank"
            phase = "phase3"
            tier = "advanced"
            text = "   "
        "#;
        assert!(matches!(
            QuestionBank::from_toml_str(toml),
            Err(QuestionBankError::EmptyText(_))
        ));
    }

    #[test]
    fn unknown_phase_is_a_parse_error() {
        let toml = r#"
            version = "t"
            [[questions]]
            id = "p"
            phase = "phase9"
            tier = "advanced"
            text = "Hm?"
        "#;
        assert!(matches!(
            QuestionBank::from_toml_str(toml),
            Err(QuestionBankError::Parse(_))
        ));
    }
}
