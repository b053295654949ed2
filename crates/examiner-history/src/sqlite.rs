//! SQLite-backed history store.

use chrono::SecondsFormat;
use examiner_db::DbPool;
use examiner_types::{Assessment, CandidateHistory, CandidateIdentity, ExamResult, SessionId};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::error::HistoryError;
use crate::store::HistoryStore;

/// Production history store over the shared connection pool.
///
/// Appends run in an `IMMEDIATE` transaction, so the read of the current
/// highest test number and the insert of the next one happen under
/// SQLite's write lock. Concurrent writers wait for the lock (bounded by
/// the pool's busy timeout) instead of racing.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: DbPool,
}

impl SqliteHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get_history(&self, identity: &CandidateIdentity) -> Result<CandidateHistory, HistoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT result_json FROM exam_results
             WHERE candidate = ?1
             ORDER BY test_number ASC",
        )?;
        let rows = stmt.query_map(params![identity.as_str()], |row| row.get::<_, String>(0))?;

        let mut history = CandidateHistory::empty(identity.clone());
        for row in rows {
            let result: ExamResult = serde_json::from_str(&row?)?;
            history.results.push(result);
        }
        Ok(history)
    }

    fn append_result(
        &self,
        identity: &CandidateIdentity,
        session_id: SessionId,
        assessment: &Assessment,
    ) -> Result<u32, HistoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let session_key = session_id.to_string();

        tx.execute(
            "INSERT OR IGNORE INTO candidates (identity) VALUES (?1)",
            params![identity.as_str()],
        )?;

        let existing: Option<(String, u32)> = tx
            .query_row(
                "SELECT candidate, test_number FROM exam_results WHERE session_id = ?1",
                params![session_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((candidate, test_number)) = existing {
            if candidate != identity.as_str() {
                return Err(HistoryError::SessionConflict {
                    session_id,
                    identity: identity.clone(),
                });
            }
            tracing::debug!(
                %session_id,
                candidate = %identity,
                test_number,
                "result already recorded for session"
            );
            return Ok(test_number);
        }

        let test_number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(test_number), 0) + 1 FROM exam_results WHERE candidate = ?1",
            params![identity.as_str()],
            |row| row.get(0),
        )?;

        let result = ExamResult::from_assessment(assessment.clone(), test_number);
        let result_json = serde_json::to_string(&result)?;

        tx.execute(
            "INSERT INTO exam_results (candidate, session_id, test_number, result_json, test_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity.as_str(),
                session_key,
                test_number,
                result_json,
                result.test_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            ],
        )?;
        tx.commit()?;

        tracing::info!(%session_id, candidate = %identity, test_number, "result appended");
        Ok(test_number)
    }
}
