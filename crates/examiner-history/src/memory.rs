//! In-memory history store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use examiner_types::{Assessment, CandidateHistory, CandidateIdentity, ExamResult, SessionId};

use crate::error::HistoryError;
use crate::store::HistoryStore;

#[derive(Debug, Default)]
struct CandidateRecord {
    results: Vec<ExamResult>,
    sessions: HashMap<SessionId, u32>,
}

/// Process-local history store for tests and ephemeral deployments.
///
/// Each candidate has its own mutex; the outer map lock is held only long
/// enough to find or create that entry, so appends for different
/// candidates never wait on each other.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    candidates: Mutex<HashMap<CandidateIdentity, Arc<Mutex<CandidateRecord>>>>,
    session_owners: Mutex<HashMap<SessionId, CandidateIdentity>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, identity: &CandidateIdentity) -> Arc<Mutex<CandidateRecord>> {
        let mut candidates = self.candidates.lock().unwrap_or_else(|e| e.into_inner());
        candidates.entry(identity.clone()).or_default().clone()
    }

    fn existing_record(&self, identity: &CandidateIdentity) -> Option<Arc<Mutex<CandidateRecord>>> {
        let candidates = self.candidates.lock().unwrap_or_else(|e| e.into_inner());
        candidates.get(identity).cloned()
    }

    /// Claims `session_id` for `identity`, failing if another candidate owns it.
    fn claim_session(
        &self,
        identity: &CandidateIdentity,
        session_id: SessionId,
    ) -> Result<(), HistoryError> {
        let mut owners = self.session_owners.lock().unwrap_or_else(|e| e.into_inner());
        let owner = owners.entry(session_id).or_insert_with(|| identity.clone());
        if owner != identity {
            return Err(HistoryError::SessionConflict {
                session_id,
                identity: identity.clone(),
            });
        }
        Ok(())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn get_history(&self, identity: &CandidateIdentity) -> Result<CandidateHistory, HistoryError> {
        let mut history = CandidateHistory::empty(identity.clone());
        if let Some(record) = self.existing_record(identity) {
            let record = record.lock().unwrap_or_else(|e| e.into_inner());
            history.results = record.results.clone();
        }
        Ok(history)
    }

    fn append_result(
        &self,
        identity: &CandidateIdentity,
        session_id: SessionId,
        assessment: &Assessment,
    ) -> Result<u32, HistoryError> {
        self.claim_session(identity, session_id)?;

        let record = self.record(identity);
        let mut record = record.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(&test_number) = record.sessions.get(&session_id) {
            return Ok(test_number);
        }

        let test_number = u32::try_from(record.results.len() + 1)
            .map_err(|_| HistoryError::Unavailable(format!("history for {identity} is full")))?;
        record
            .results
            .push(ExamResult::from_assessment(assessment.clone(), test_number));
        record.sessions.insert(session_id, test_number);

        tracing::info!(%session_id, candidate = %identity, test_number, "result appended");
        Ok(test_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_assessment;
    use std::thread;

    #[test]
    fn unknown_candidate_reads_empty() {
        let store = MemoryHistoryStore::new();
        let id = CandidateIdentity::new("a@b.c").unwrap();
        assert!(store.get_history(&id).unwrap().is_empty());
    }

    #[test]
    fn retry_with_same_session_is_idempotent() {
        let store = MemoryHistoryStore::new();
        let id = CandidateIdentity::new("a@b.c").unwrap();
        let session = SessionId::new();
        assert_eq!(store.append_result(&id, session, &sample_assessment(6.0)).unwrap(), 1);
        assert_eq!(store.append_result(&id, session, &sample_assessment(6.0)).unwrap(), 1);
        assert_eq!(store.append_result(&id, SessionId::new(), &sample_assessment(6.0)).unwrap(), 2);
        assert_eq!(store.get_history(&id).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_appends_get_distinct_consecutive_numbers() {
        let store = Arc::new(MemoryHistoryStore::new());
        let id = CandidateIdentity::new("a@b.c").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || {
                    store
                        .append_result(&id, SessionId::new(), &sample_assessment(6.5))
                        .unwrap()
                })
            })
            .collect();

        let mut numbers: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=8).collect::<Vec<u32>>());
        assert_eq!(store.get_history(&id).unwrap().len(), 8);
    }
}
