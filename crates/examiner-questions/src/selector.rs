//! Per-session question selection.
//!
//! Selection avoids every prompt the candidate was asked in their most
//! recent session while the tier still has alternatives, and falls back to
//! repeats rather than failing when it does not.

use std::collections::HashSet;
use std::sync::Arc;

use examiner_types::{CandidateHistory, ExamPolicy, InterviewPhase, Tier};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bank::{BankQuestion, QuestionBank};
use crate::error::QuestionBankError;

/// A single interview prompt assigned to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub text: String,
}

/// The phase 2 cue card assigned to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueCard {
    pub id: String,
    pub topic: String,
    pub points: Vec<String>,
}

/// The immutable question set for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuestions {
    pub bank_version: String,
    pub tier: Tier,
    pub phase1: Vec<Prompt>,
    pub phase2: CueCard,
    pub phase3: Vec<Prompt>,
}

impl SessionQuestions {
    /// Number of response slots in a phase. Phase 2 always has one.
    pub fn slot_count(&self, phase: InterviewPhase) -> usize {
        match phase {
            InterviewPhase::Phase1 => self.phase1.len(),
            InterviewPhase::Phase2 => 1,
            InterviewPhase::Phase3 => self.phase3.len(),
        }
    }

    /// Prompt texts of a phase in asking order.
    pub fn prompt_texts(&self, phase: InterviewPhase) -> Vec<String> {
        match phase {
            InterviewPhase::Phase1 => self.phase1.iter().map(|p| p.text.clone()).collect(),
            InterviewPhase::Phase2 => vec![self.phase2.topic.clone()],
            InterviewPhase::Phase3 => self.phase3.iter().map(|p| p.text.clone()).collect(),
        }
    }
}

/// Chooses non-repeating question sets from a shared bank.
#[derive(Debug, Clone)]
pub struct QuestionSelector {
    bank: Arc<QuestionBank>,
    phase1_count: usize,
    phase3_count: usize,
}

impl QuestionSelector {
    pub fn new(bank: Arc<QuestionBank>, policy: &ExamPolicy) -> Self {
        Self {
            bank,
            phase1_count: policy.phase1_questions,
            phase3_count: policy.phase3_questions,
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Selects a complete three-phase question set.
    ///
    /// `history` is only used to avoid the prompts of the candidate's most
    /// recent session. Phases with fewer bank entries than requested use all
    /// entries available.
    ///
    /// # Errors
    ///
    /// Returns [`QuestionBankError::EmptyPhase`] when the bank has nothing
    /// for a phase at this tier, and [`QuestionBankError::ZeroQuestionCount`]
    /// when the policy asks for an empty phase. Either must abort session
    /// start.
    pub fn select<R: Rng + ?Sized>(
        &self,
        history: Option<&CandidateHistory>,
        tier: Tier,
        rng: &mut R,
    ) -> Result<SessionQuestions, QuestionBankError> {
        if self.phase1_count == 0 {
            return Err(QuestionBankError::ZeroQuestionCount(InterviewPhase::Phase1));
        }
        if self.phase3_count == 0 {
            return Err(QuestionBankError::ZeroQuestionCount(InterviewPhase::Phase3));
        }

        let recent: HashSet<&str> = history
            .and_then(CandidateHistory::latest)
            .map(|r| r.transcript.prompts().collect())
            .unwrap_or_default();

        let phase1_pool = self.pool(InterviewPhase::Phase1, tier)?;
        let phase2_pool = self.pool(InterviewPhase::Phase2, tier)?;
        let phase3_pool = self.pool(InterviewPhase::Phase3, tier)?;

        let phase1 = pick(phase1_pool, self.phase1_count, &recent, |_| false, rng);

        let card = pick(phase2_pool, 1, &recent, |_| false, rng)
            .into_iter()
            .next()
            .ok_or(QuestionBankError::EmptyPhase {
                phase: InterviewPhase::Phase2,
                tier,
            })?;

        let card_topic = card.topic.clone();
        let phase3 = pick(
            phase3_pool,
            self.phase3_count,
            &recent,
            |q| card_topic.is_some() && q.topic == card_topic,
            rng,
        );

        tracing::debug!(
            tier = %tier,
            bank_version = self.bank.version(),
            phase1 = phase1.len(),
            phase3 = phase3.len(),
            avoided = recent.len(),
            "selected session questions"
        );

        Ok(SessionQuestions {
            bank_version: self.bank.version().to_string(),
            tier,
            phase1: phase1.into_iter().map(to_prompt).collect(),
            phase2: CueCard {
                id: card.id.clone(),
                topic: card.text.clone(),
                points: card.points.clone(),
            },
            phase3: phase3.into_iter().map(to_prompt).collect(),
        })
    }

    fn pool(
        &self,
        phase: InterviewPhase,
        tier: Tier,
    ) -> Result<Vec<&BankQuestion>, QuestionBankError> {
        let pool: Vec<&BankQuestion> = self.bank.questions_for(phase, tier).collect();
        if pool.is_empty() {
            return Err(QuestionBankError::EmptyPhase { phase, tier });
        }
        Ok(pool)
    }
}

fn to_prompt(q: &BankQuestion) -> Prompt {
    Prompt {
        id: q.id.clone(),
        text: q.text.clone(),
    }
}

/// Picks up to `count` entries, in priority order: unused and preferred,
/// unused, recently used and preferred, recently used.
fn pick<'a, R: Rng + ?Sized>(
    pool: Vec<&'a BankQuestion>,
    count: usize,
    recent: &HashSet<&str>,
    preferred: impl Fn(&BankQuestion) -> bool,
    rng: &mut R,
) -> Vec<&'a BankQuestion> {
    let mut buckets: [Vec<&BankQuestion>; 4] = Default::default();
    for q in pool {
        let repeat = recent.contains(q.text.as_str());
        let bucket = match (repeat, preferred(q)) {
            (false, true) => 0,
            (false, false) => 1,
            (true, true) => 2,
            (true, false) => 3,
        };
        buckets[bucket].push(q);
    }

    let mut picked = Vec::with_capacity(count);
    for mut bucket in buckets {
        bucket.shuffle(rng);
        let room = count - picked.len();
        picked.extend(bucket.into_iter().take(room));
        if picked.len() == count {
            break;
        }
    }
    picked
}
