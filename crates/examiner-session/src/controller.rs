//! The per-session exam state machine.

use std::time::{Duration, Instant};

use chrono::Utc;
use examiner_history::ResultWriter;
use examiner_observe::ExamEvent;
use examiner_questions::{QuestionSelector, SessionQuestions};
use examiner_scoring::{validate_and_normalize, RawResultPayload};
use examiner_types::{
    Assessment, CandidateIdentity, InterviewPhase, LongTurnTranscript, PhaseTranscript, SessionId,
    Tier, Transcript,
};
use rand::rngs::StdRng;

use crate::context::PromptContext;
use crate::error::SessionError;
use crate::state::SessionState;
use crate::tools::{ToolCall, ToolReply};

/// What identification established about the candidate.
#[derive(Debug, Clone)]
struct Identification {
    candidate: CandidateIdentity,
    tier: Tier,
    prior_attempts: usize,
    last_band_score: Option<f64>,
    questions: SessionQuestions,
}

impl Identification {
    fn reply(&self) -> ToolReply {
        ToolReply::Identified {
            candidate: self.candidate.clone(),
            tier: self.tier,
            prior_attempts: self.prior_attempts,
            last_band_score: self.last_band_score,
            questions: self.questions.clone(),
        }
    }
}

fn slot_index(phase: InterviewPhase) -> usize {
    match phase {
        InterviewPhase::Phase1 => 0,
        InterviewPhase::Phase2 => 1,
        InterviewPhase::Phase3 => 2,
    }
}

/// Drives one exam from identification to a stored result.
///
/// Owned by exactly one caller at a time; the server wraps each controller
/// in its own mutex. All operations are synchronous and may block on the
/// history store, so async callers run them on a blocking thread.
///
/// Once a result is stored every operation answers
/// [`ToolReply::Completed`] with the same test number and changes nothing.
pub struct SessionController {
    session_id: SessionId,
    transport_identity: CandidateIdentity,
    selector: QuestionSelector,
    writer: ResultWriter,
    rng: StdRng,
    state: SessionState,
    identification: Option<Identification>,
    /// Response slots per phase, index-aligned with the questions.
    slots: [Vec<Option<String>>; 3],
    /// Validated result whose write failed; reused by the next finalize.
    pending: Option<Assessment>,
    test_number: Option<u32>,
    stale_operations: u32,
    last_activity: Instant,
    events: Vec<ExamEvent>,
}

impl SessionController {
    /// Opens a session for the identity supplied by the transport layer.
    pub fn new(
        session_id: SessionId,
        transport_identity: CandidateIdentity,
        selector: QuestionSelector,
        writer: ResultWriter,
        rng: StdRng,
    ) -> Self {
        tracing::info!(%session_id, "session started");
        let events = vec![ExamEvent::SessionStarted {
            transport_identity: transport_identity.to_string(),
        }];
        Self {
            session_id,
            transport_identity,
            selector,
            writer,
            rng,
            state: SessionState::Identifying,
            identification: None,
            slots: Default::default(),
            pending: None,
            test_number: None,
            stale_operations: 0,
            last_activity: Instant::now(),
            events,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The identified candidate, once `identify_candidate` has succeeded.
    pub fn candidate(&self) -> Option<&CandidateIdentity> {
        self.identification.as_ref().map(|i| &i.candidate)
    }

    pub fn test_number(&self) -> Option<u32> {
        self.test_number
    }

    pub fn stale_operations(&self) -> u32 {
        self.stale_operations
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Drains lifecycle events produced since the last call.
    pub fn take_events(&mut self) -> Vec<ExamEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs one tool call.
    pub fn dispatch(&mut self, call: ToolCall) -> Result<ToolReply, SessionError> {
        self.touch();
        let tool = call.name();
        let result = match call {
            ToolCall::IdentifyCandidate => self.identify_candidate(),
            ToolCall::RecordResponse {
                phase,
                question_index,
                response_text,
            } => self.record_response(phase, question_index, response_text),
            ToolCall::AdvancePhase => self.advance_phase(),
            ToolCall::FinalizeAndScore { payload } => self.finalize_and_score(&payload),
        };
        match &result {
            Ok(_) => tracing::debug!(session_id = %self.session_id, tool, state = %self.state, "tool call handled"),
            Err(e) => tracing::info!(
                session_id = %self.session_id,
                tool,
                kind = e.kind(),
                error = %e,
                "tool call failed"
            ),
        }
        result
    }

    /// Resolves the candidate and selects the session's questions.
    ///
    /// Repeated calls return the first identification unchanged.
    pub fn identify_candidate(&mut self) -> Result<ToolReply, SessionError> {
        if let Some(reply) = self.completed_reply() {
            return Ok(reply);
        }
        if let Some(identification) = &self.identification {
            return Ok(identification.reply());
        }

        let candidate = self.transport_identity.clone();
        let history = self.writer.store().get_history(&candidate).map_err(|e| {
            tracing::warn!(session_id = %self.session_id, candidate = %candidate, error = %e, "history read failed");
            SessionError::HistoryUnavailable(e.to_string())
        })?;

        let tier = Tier::for_history(Some(&history));
        let questions = self
            .selector
            .select(Some(&history), tier, &mut self.rng)
            .map_err(|e| {
                tracing::error!(session_id = %self.session_id, %tier, error = %e, "question selection failed");
                SessionError::from(e)
            })?;

        let identification = Identification {
            candidate,
            tier,
            prior_attempts: history.len(),
            last_band_score: history.latest().map(|r| r.band_score),
            questions,
        };
        self.slots = InterviewPhase::ALL.map(|p| vec![None; identification.questions.slot_count(p)]);

        tracing::info!(
            session_id = %self.session_id,
            candidate = %identification.candidate,
            %tier,
            prior_attempts = identification.prior_attempts,
            "candidate identified"
        );
        self.events.push(ExamEvent::CandidateIdentified {
            tier,
            bank_version: identification.questions.bank_version.clone(),
            prior_attempts: identification.prior_attempts,
        });

        let reply = identification.reply();
        self.identification = Some(identification);
        self.transition(SessionState::Phase1Active);
        Ok(reply)
    }

    /// Stores (or overwrites) the response for one question of the active
    /// phase. An empty response still counts as recorded.
    pub fn record_response(
        &mut self,
        phase: InterviewPhase,
        question_index: usize,
        response_text: String,
    ) -> Result<ToolReply, SessionError> {
        if let Some(reply) = self.completed_reply() {
            return Ok(reply);
        }
        if self.state == SessionState::Identifying {
            return Err(SessionError::OutOfOrder {
                operation: "record_response",
                state: self.state,
            });
        }
        if self.state.active_phase() != Some(phase) {
            self.stale_operations += 1;
            tracing::warn!(
                session_id = %self.session_id,
                requested = %phase,
                active = %self.state,
                stale_operations = self.stale_operations,
                "stale record_response ignored"
            );
            return Err(SessionError::StaleOperation {
                requested: phase,
                active: self.state,
            });
        }

        let slots = &mut self.slots[slot_index(phase)];
        let count = slots.len();
        let slot = slots
            .get_mut(question_index)
            .ok_or(SessionError::InvalidQuestion {
                phase,
                index: question_index,
                count,
            })?;
        *slot = Some(response_text);
        let remaining = slots.iter().filter(|s| s.is_none()).count();

        tracing::debug!(session_id = %self.session_id, %phase, question_index, remaining, "response recorded");
        Ok(ToolReply::Recorded {
            phase,
            question_index,
            remaining,
        })
    }

    /// Completes the active phase and moves to the next one; after phase 3
    /// the session moves to scoring.
    pub fn advance_phase(&mut self) -> Result<ToolReply, SessionError> {
        if let Some(reply) = self.completed_reply() {
            return Ok(reply);
        }
        let Some(phase) = self.state.active_phase() else {
            return Err(SessionError::OutOfOrder {
                operation: "advance_phase",
                state: self.state,
            });
        };
        self.ensure_complete(phase)?;

        let from = self.state;
        let to = phase
            .next()
            .map_or(SessionState::Scoring, SessionState::for_phase);
        self.transition(to);
        Ok(ToolReply::Advanced { from, to })
    }

    /// Validates the driver's assessment and stores it as the candidate's
    /// next result.
    ///
    /// Callable from phase 3 (once complete) or scoring. A rejected payload
    /// leaves the session in scoring for another attempt. If the write
    /// fails after validation, the validated result is kept and the next
    /// call retries that same result, ignoring its own payload.
    pub fn finalize_and_score(
        &mut self,
        payload: &RawResultPayload,
    ) -> Result<ToolReply, SessionError> {
        if let Some(reply) = self.completed_reply() {
            return Ok(reply);
        }
        match self.state {
            SessionState::Phase3Active => {
                self.ensure_complete(InterviewPhase::Phase3)?;
                self.transition(SessionState::Scoring);
            }
            SessionState::Scoring => {}
            state => {
                return Err(SessionError::OutOfOrder {
                    operation: "finalize_and_score",
                    state,
                })
            }
        }
        let Some(candidate) = self.candidate().cloned() else {
            return Err(SessionError::OutOfOrder {
                operation: "finalize_and_score",
                state: self.state,
            });
        };

        let assessment = match self.pending.take() {
            Some(cached) => {
                tracing::info!(session_id = %self.session_id, "retrying write of validated result");
                cached
            }
            None => match validate_and_normalize(payload, &self.transcript(), Utc::now()) {
                Ok(assessment) => assessment,
                Err(e) => {
                    tracing::info!(
                        session_id = %self.session_id,
                        missing = e.missing_fields.len(),
                        malformed = e.malformed_fields.len(),
                        "result payload rejected"
                    );
                    self.events.push(ExamEvent::ScoringRejected {
                        missing_fields: e.missing_fields.clone(),
                        malformed_fields: e.malformed_fields.clone(),
                    });
                    return Err(e.into());
                }
            },
        };

        match self.writer.persist(&candidate, self.session_id, &assessment) {
            Ok(test_number) => Ok(self.complete(&candidate, test_number, &assessment)),
            Err(e) => {
                let document = serde_json::to_value(&assessment).unwrap_or_default();
                tracing::error!(
                    session_id = %self.session_id,
                    candidate = %candidate,
                    attempts = e.attempts,
                    error = %e.last_error,
                    assessment = %document,
                    "validated result could not be persisted"
                );
                self.events.push(ExamEvent::ResultPersistFailed {
                    attempts: e.attempts,
                    last_error: e.last_error.clone(),
                    assessment: document,
                });
                self.pending = Some(assessment);
                Err(e.into())
            }
        }
    }

    /// Records that the session is being dropped without a stored result.
    ///
    /// A validated result still waiting to be written gets one last write
    /// attempt. If that succeeds the session completes instead and nothing
    /// is discarded; otherwise the discard event carries the assessment.
    pub fn discard(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }

        let mut unsaved_assessment = None;
        if let (Some(assessment), Some(candidate)) = (self.pending.take(), self.candidate().cloned()) {
            match self.writer.persist(&candidate, self.session_id, &assessment) {
                Ok(test_number) => {
                    self.complete(&candidate, test_number, &assessment);
                    return;
                }
                Err(e) => {
                    let document = serde_json::to_value(&assessment).unwrap_or_default();
                    tracing::error!(
                        session_id = %self.session_id,
                        candidate = %candidate,
                        reason,
                        error = %e.last_error,
                        assessment = %document,
                        "discarding session with an unsaved validated result"
                    );
                    unsaved_assessment = Some(document);
                }
            }
        }

        tracing::info!(session_id = %self.session_id, state = %self.state, reason, "session discarded");
        self.events.push(ExamEvent::SessionDiscarded {
            reason: reason.to_string(),
            state: self.state.as_str().to_string(),
            unsaved_assessment,
        });
    }

    /// The transcript recorded so far. Unanswered slots read as empty.
    pub fn transcript(&self) -> Transcript {
        let Some(identification) = &self.identification else {
            return Transcript::default();
        };
        let responses = |phase: InterviewPhase| -> Vec<String> {
            self.slots[slot_index(phase)]
                .iter()
                .map(|s| s.clone().unwrap_or_default())
                .collect()
        };
        let questions = &identification.questions;
        Transcript {
            phase1: PhaseTranscript {
                questions: questions.prompt_texts(InterviewPhase::Phase1),
                responses: responses(InterviewPhase::Phase1),
            },
            phase2: LongTurnTranscript {
                topic: questions.phase2.topic.clone(),
                response: responses(InterviewPhase::Phase2)
                    .into_iter()
                    .next()
                    .unwrap_or_default(),
            },
            phase3: PhaseTranscript {
                questions: questions.prompt_texts(InterviewPhase::Phase3),
                responses: responses(InterviewPhase::Phase3),
            },
        }
    }

    /// Snapshot for the driver's prompt.
    pub fn context(&self) -> PromptContext {
        let identification = self.identification.as_ref();
        let active_phase = self.state.active_phase();
        PromptContext {
            session_id: self.session_id,
            state: self.state,
            candidate: identification.map(|i| i.candidate.clone()),
            tier: identification.map(|i| i.tier),
            prior_attempts: identification.map_or(0, |i| i.prior_attempts),
            last_band_score: identification.and_then(|i| i.last_band_score),
            questions: identification.map(|i| i.questions.clone()),
            active_phase,
            unanswered: active_phase.map(|p| self.unanswered(p)).unwrap_or_default(),
            test_number: self.test_number,
            awaiting_persistence: self.pending.is_some(),
            stale_operations: self.stale_operations,
        }
    }

    fn complete(
        &mut self,
        candidate: &CandidateIdentity,
        test_number: u32,
        assessment: &Assessment,
    ) -> ToolReply {
        self.test_number = Some(test_number);
        self.events.push(ExamEvent::ResultPersisted {
            test_number,
            band_score: assessment.band_score,
        });
        self.transition(SessionState::Completed);
        tracing::info!(
            session_id = %self.session_id,
            candidate = %candidate,
            test_number,
            band_score = assessment.band_score,
            "session completed"
        );
        ToolReply::Completed { test_number }
    }

    fn completed_reply(&self) -> Option<ToolReply> {
        self.test_number
            .map(|test_number| ToolReply::Completed { test_number })
    }

    fn unanswered(&self, phase: InterviewPhase) -> Vec<usize> {
        self.slots[slot_index(phase)]
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    fn ensure_complete(&self, phase: InterviewPhase) -> Result<(), SessionError> {
        let missing = self.unanswered(phase);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SessionError::IncompletePhase { phase, missing })
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        self.state = to;
        tracing::info!(session_id = %self.session_id, %from, %to, "session state changed");
        self.events.push(ExamEvent::PhaseAdvanced {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
}
