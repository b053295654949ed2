//! Persistence operations for the operator event log.
//!
//! All writes go through [`emit_event`], which serialises the payload,
//! assigns a monotonically increasing sequence number, and inserts into
//! the `exam_event_log` table in a single statement.

use examiner_types::{CandidateIdentity, SessionId};
use rusqlite::{params, Connection};

use crate::error::ObserveError;
use crate::event::{EventRecord, ExamEvent};

/// Writes a single event to the log.
///
/// # Errors
///
/// Returns `ObserveError::Sql` on SQL failure or `ObserveError::Payload`
/// if the payload cannot be encoded.
pub fn emit_event(
    conn: &Connection,
    session_id: SessionId,
    candidate: Option<&CandidateIdentity>,
    event: &ExamEvent,
) -> Result<EventRecord, ObserveError> {
    let payload_json = serde_json::to_string(event)?;
    let event_type = event.event_type();
    let session_key = session_id.to_string();
    let candidate = candidate.map(|c| c.as_str().to_string());

    // seq is computed inside the INSERT so concurrent writers cannot
    // observe the same MAX(seq).
    let (id, seq, occurred_at) = conn.query_row(
        "INSERT INTO exam_event_log
            (event_type, session_id, candidate, seq, payload_json, occurred_at)
         VALUES (
            ?1, ?2, ?3,
            (SELECT COALESCE(MAX(seq), 0) + 1 FROM exam_event_log),
            ?4,
            strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         )
         RETURNING id, seq, occurred_at",
        params![event_type, session_key, candidate, payload_json],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?)),
    )?;

    if event.needs_attention() {
        tracing::error!(%session_id, seq, event_type, "operator attention required");
    }

    Ok(EventRecord {
        id,
        event_type: event_type.to_string(),
        session_id: session_key,
        candidate,
        seq,
        payload_json,
        occurred_at,
    })
}

/// Filter criteria for querying the event log.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by event type string.
    pub event_type: Option<String>,
    /// Filter by session.
    pub session_id: Option<String>,
    /// Filter by candidate identity.
    pub candidate: Option<String>,
    /// Return events that occurred at or after this ISO 8601 timestamp.
    pub since: Option<String>,
    /// Maximum number of events to return (default: 100).
    pub limit: Option<i64>,
}

/// Queries the log with optional filters, oldest first.
///
/// # Errors
///
/// Returns `ObserveError::Sql` on SQL failure.
pub fn query_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<EventRecord>, ObserveError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    let columns = [
        ("event_type = ", &filter.event_type),
        ("session_id = ", &filter.session_id),
        ("candidate = ", &filter.candidate),
        ("occurred_at >= ", &filter.since),
    ];
    for (condition, value) in columns {
        if let Some(value) = value {
            param_values.push(Box::new(value.clone()));
            clauses.push(format!("{condition}?{}", param_values.len()));
        }
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    param_values.push(Box::new(filter.limit.unwrap_or(100)));
    let sql = format!(
        "SELECT id, event_type, session_id, candidate, seq, payload_json, occurred_at
         FROM exam_event_log
         {where_clause}
         ORDER BY seq ASC
         LIMIT ?{}",
        param_values.len()
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values.iter().map(|p| &**p).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(EventRecord {
            id: row.get(0)?,
            event_type: row.get(1)?,
            session_id: row.get(2)?,
            candidate: row.get(3)?,
            seq: row.get(4)?,
            payload_json: row.get(5)?,
            occurred_at: row.get(6)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
