//! Bounded-retry result persistence.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use examiner_types::{Assessment, CandidateIdentity, ExamPolicy, SessionId};

use crate::error::PersistenceError;
use crate::store::HistoryStore;

/// Appends validated assessments to history, retrying failed writes.
///
/// Every attempt sends the same assessment under the same session key, so
/// a write that succeeded but whose acknowledgement was lost is not
/// duplicated by the retry. Attempt `n` is preceded by a pause of
/// `(n - 1) * backoff`.
///
/// Blocking: call from a blocking context.
#[derive(Clone)]
pub struct ResultWriter {
    store: Arc<dyn HistoryStore>,
    max_attempts: u32,
    backoff: Duration,
}

impl ResultWriter {
    pub fn new(store: Arc<dyn HistoryStore>, policy: &ExamPolicy) -> Self {
        Self {
            store,
            max_attempts: policy.persist_max_attempts.max(1),
            backoff: Duration::from_millis(policy.persist_backoff_ms),
        }
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Persists `assessment` as the candidate's next result.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] once all attempts have failed.
    pub fn persist(
        &self,
        identity: &CandidateIdentity,
        session_id: SessionId,
        assessment: &Assessment,
    ) -> Result<u32, PersistenceError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                thread::sleep(self.backoff * (attempt - 1));
            }
            match self.store.append_result(identity, session_id, assessment) {
                Ok(test_number) => {
                    if attempt > 1 {
                        tracing::info!(%session_id, attempt, test_number, "result persisted after retry");
                    }
                    return Ok(test_number);
                }
                Err(e) => {
                    tracing::warn!(
                        %session_id,
                        candidate = %identity,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "result append failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(PersistenceError {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::memory::MemoryHistoryStore;
    use crate::testing::sample_assessment;
    use examiner_types::CandidateHistory;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` appends, then delegates.
    struct FlakyStore {
        inner: MemoryHistoryStore,
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryHistoryStore::new(),
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl HistoryStore for FlakyStore {
        fn get_history(
            &self,
            identity: &CandidateIdentity,
        ) -> Result<CandidateHistory, HistoryError> {
            self.inner.get_history(identity)
        }

        fn append_result(
            &self,
            identity: &CandidateIdentity,
            session_id: SessionId,
            assessment: &Assessment,
        ) -> Result<u32, HistoryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(HistoryError::Unavailable(format!("injected failure {call}")));
            }
            self.inner.append_result(identity, session_id, assessment)
        }
    }

    fn policy(attempts: u32) -> ExamPolicy {
        ExamPolicy {
            persist_max_attempts: attempts,
            persist_backoff_ms: 1,
            ..ExamPolicy::default()
        }
    }

    #[test]
    fn transient_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let writer = ResultWriter::new(store.clone(), &policy(3));
        let id = CandidateIdentity::new("a@b.c").unwrap();

        let n = writer.persist(&id, SessionId::new(), &sample_assessment(6.5)).unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get_history(&id).unwrap().len(), 1);
    }

    #[test]
    fn exhausted_attempts_report_the_last_error() {
        let store = Arc::new(FlakyStore::new(5));
        let writer = ResultWriter::new(store.clone(), &policy(2));
        let id = CandidateIdentity::new("a@b.c").unwrap();

        let err = writer
            .persist(&id, SessionId::new(), &sample_assessment(6.5))
            .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert!(err.last_error.contains("injected failure 2"));
        assert!(store.get_history(&id).unwrap().is_empty());
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let store = Arc::new(MemoryHistoryStore::new());
        let writer = ResultWriter::new(store, &policy(0));
        let id = CandidateIdentity::new("a@b.c").unwrap();
        assert_eq!(writer.persist(&id, SessionId::new(), &sample_assessment(5.0)), Ok(1));
    }
}
