//! Unit tests for the operator event log.

use examiner_types::{CandidateIdentity, SessionId, Tier};
use rusqlite::Connection;

use crate::error::ObserveError;
use crate::event::ExamEvent;
use crate::store::{emit_event, query_events, EventFilter};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    examiner_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn candidate() -> CandidateIdentity {
    CandidateIdentity::new("sam@example.com").expect("valid identity")
}

#[test]
fn emit_event_inserts_row() {
    let conn = test_db();
    let session = SessionId::new();

    let record = emit_event(
        &conn,
        session,
        None,
        &ExamEvent::SessionStarted {
            transport_identity: "sam@example.com".to_string(),
        },
    )
    .expect("emit should succeed");

    assert!(record.id > 0);
    assert_eq!(record.seq, 1);
    assert_eq!(record.event_type, "SESSION_STARTED");
    assert_eq!(record.session_id, session.to_string());
    assert!(record.candidate.is_none());
    assert!(record.occurred_at.ends_with('Z'));

    let (event_type, stored_session): (String, String) = conn
        .query_row(
            "SELECT event_type, session_id FROM exam_event_log WHERE id = ?1",
            [record.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("should query inserted row");
    assert_eq!(event_type, "SESSION_STARTED");
    assert_eq!(stored_session, session.to_string());
}

#[test]
fn payload_round_trips_through_json() {
    let conn = test_db();
    let event = ExamEvent::CandidateIdentified {
        tier: Tier::Advanced,
        bank_version: "2026.2".to_string(),
        prior_attempts: 3,
    };

    let record = emit_event(&conn, SessionId::new(), Some(&candidate()), &event).unwrap();
    assert_eq!(record.candidate.as_deref(), Some("sam@example.com"));

    let decoded = record.payload().expect("payload should decode");
    assert_eq!(decoded, event);

    let raw: serde_json::Value = serde_json::from_str(&record.payload_json).unwrap();
    assert_eq!(raw["event"], "CANDIDATE_IDENTIFIED");
    assert_eq!(raw["tier"], "advanced");
}

#[test]
fn sequence_numbers_increase_across_sessions() {
    let conn = test_db();
    let mut seqs = Vec::new();
    for _ in 0..3 {
        let record = emit_event(
            &conn,
            SessionId::new(),
            Some(&candidate()),
            &ExamEvent::PhaseAdvanced {
                from: "phase1".to_string(),
                to: "phase2".to_string(),
            },
        )
        .unwrap();
        seqs.push(record.seq);
    }
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn event_type_strings_match_serde_tags() {
    let events = [
        ExamEvent::SessionStarted {
            transport_identity: "x".to_string(),
        },
        ExamEvent::ScoringRejected {
            missing_fields: vec!["strengths".to_string()],
            malformed_fields: vec![],
        },
        ExamEvent::ResultPersisted {
            test_number: 2,
            band_score: 6.5,
        },
        ExamEvent::ResultPersistFailed {
            attempts: 3,
            last_error: "disk I/O error".to_string(),
            assessment: serde_json::json!({"band_score": 6.5}),
        },
        ExamEvent::SessionDiscarded {
            reason: "disconnected".to_string(),
            state: "phase2".to_string(),
            unsaved_assessment: None,
        },
    ];
    for event in events {
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], event.event_type());
    }
}

#[test]
fn discard_with_unsaved_result_needs_attention() {
    let plain = ExamEvent::SessionDiscarded {
        reason: "disconnected".to_string(),
        state: "scoring".to_string(),
        unsaved_assessment: None,
    };
    assert!(!plain.needs_attention());
    assert!(serde_json::to_value(&plain)
        .unwrap()
        .get("unsaved_assessment")
        .is_none());

    let lost = ExamEvent::SessionDiscarded {
        reason: "disconnected".to_string(),
        state: "scoring".to_string(),
        unsaved_assessment: Some(serde_json::json!({"band_score": 6.5})),
    };
    assert!(lost.needs_attention());

    let conn = test_db();
    let record = emit_event(&conn, SessionId::new(), None, &lost).unwrap();
    assert_eq!(record.payload().unwrap(), lost);
}

#[test]
fn query_filters_by_type_and_session() {
    let conn = test_db();
    let session_a = SessionId::new();
    let session_b = SessionId::new();

    emit_event(
        &conn,
        session_a,
        None,
        &ExamEvent::SessionStarted {
            transport_identity: "a".to_string(),
        },
    )
    .unwrap();
    emit_event(
        &conn,
        session_b,
        None,
        &ExamEvent::SessionStarted {
            transport_identity: "b".to_string(),
        },
    )
    .unwrap();
    emit_event(
        &conn,
        session_a,
        Some(&candidate()),
        &ExamEvent::ResultPersistFailed {
            attempts: 3,
            last_error: "database is locked".to_string(),
            assessment: serde_json::json!({}),
        },
    )
    .unwrap();

    let all = query_events(&conn, &EventFilter::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].seq < w[1].seq));

    let failures = query_events(
        &conn,
        &EventFilter {
            event_type: Some("RESULT_PERSIST_FAILED".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].session_id, session_a.to_string());

    let for_b = query_events(
        &conn,
        &EventFilter {
            session_id: Some(session_b.to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(for_b.len(), 1);

    let for_candidate = query_events(
        &conn,
        &EventFilter {
            candidate: Some("sam@example.com".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(for_candidate.len(), 1);
}

#[test]
fn query_respects_limit_and_since() {
    let conn = test_db();
    for _ in 0..5 {
        emit_event(
            &conn,
            SessionId::new(),
            None,
            &ExamEvent::SessionStarted {
                transport_identity: "x".to_string(),
            },
        )
        .unwrap();
    }

    let limited = query_events(
        &conn,
        &EventFilter {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(limited.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);

    let future = query_events(
        &conn,
        &EventFilter {
            since: Some("2999-01-01T00:00:00Z".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(future.is_empty());
}

#[test]
fn write_without_schema_is_a_sql_error() {
    let conn = Connection::open_in_memory().unwrap();
    let err = emit_event(
        &conn,
        SessionId::new(),
        None,
        &ExamEvent::SessionStarted {
            transport_identity: "x".to_string(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, ObserveError::Sql(_)));
    assert!(err.to_string().starts_with("event log query failed"));
}
