//! Shared fixtures for server integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use examiner_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use examiner_history::SqliteHistoryStore;
use examiner_questions::QuestionBank;
use examiner_server::AppState;
use examiner_types::ExamPolicy;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

/// File-backed database so every pooled connection sees the same data.
pub struct TestDb {
    pub _file: tempfile::NamedTempFile,
    pub pool: DbPool,
}

pub fn test_db() -> TestDb {
    let file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    let path = file.path().to_str().expect("temp path should be utf-8");
    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");
    run_migrations(&pool.get().expect("failed to get connection")).expect("migrations failed");
    TestDb { _file: file, pool }
}

pub fn policy() -> ExamPolicy {
    ExamPolicy {
        phase1_questions: 3,
        phase3_questions: 2,
        persist_max_attempts: 2,
        persist_backoff_ms: 1,
    }
}

pub fn state_with_bank(db: &TestDb, bank: QuestionBank) -> AppState {
    let store = Arc::new(SqliteHistoryStore::new(db.pool.clone()));
    AppState::new(db.pool.clone(), store, Arc::new(bank), policy())
}

pub fn state(db: &TestDb) -> AppState {
    state_with_bank(db, QuestionBank::builtin().expect("built-in bank"))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn start_request(identity: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/sessions").method("POST");
    if let Some(identity) = identity {
        builder = builder.header("X-Candidate-Identity", identity);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn tool_request(session_id: &str, call: &Value) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/sessions/{}/tools", session_id))
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(call.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Starts a session and returns its id.
pub async fn start_session(app: &Router, identity: &str) -> String {
    let (status, body) = send(app, start_request(Some(identity))).await;
    assert_eq!(status, StatusCode::CREATED, "start failed: {body}");
    body["session_id"].as_str().unwrap().to_string()
}

pub async fn call_tool(app: &Router, session_id: &str, call: Value) -> Value {
    let (status, body) = send(app, tool_request(session_id, &call)).await;
    assert_eq!(status, StatusCode::OK, "tool call failed: {body}");
    body
}

pub fn answer(phase: &str, index: usize) -> String {
    format!("Answer to {phase} question {index}.")
}

/// Identifies, answers everything and advances into scoring. Returns the
/// transcript the session recorded, in result-document shape.
pub async fn run_interview(app: &Router, session_id: &str) -> Value {
    let identified = call_tool(app, session_id, json!({"tool": "identify_candidate"})).await;
    assert_eq!(identified["ok"], true, "{identified}");
    let questions = identified["reply"]["questions"].clone();

    let texts = |phase: &str| -> Vec<String> {
        questions[phase]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["text"].as_str().unwrap().to_string())
            .collect()
    };
    let phase1 = texts("phase1");
    let phase3 = texts("phase3");

    for (phase, count) in [("phase1", phase1.len()), ("phase2", 1), ("phase3", phase3.len())] {
        for index in 0..count {
            let reply = call_tool(
                app,
                session_id,
                json!({
                    "tool": "record_response",
                    "phase": phase,
                    "question_index": index,
                    "response_text": answer(phase, index)
                }),
            )
            .await;
            assert_eq!(reply["ok"], true, "{reply}");
        }
        let reply = call_tool(app, session_id, json!({"tool": "advance_phase"})).await;
        assert_eq!(reply["ok"], true, "{reply}");
    }

    json!({
        "phase1": {
            "questions": phase1,
            "responses": (0..phase1.len()).map(|i| answer("phase1", i)).collect::<Vec<_>>()
        },
        "phase2": {
            "topic": questions["phase2"]["topic"],
            "response": answer("phase2", 0)
        },
        "phase3": {
            "questions": phase3,
            "responses": (0..phase3.len()).map(|i| answer("phase3", i)).collect::<Vec<_>>()
        }
    })
}

pub fn result_payload(transcript: Value) -> Value {
    json!({
        "band_score": 7.0,
        "detailed_scores": {
            "fluency_coherence": 7,
            "lexical_resource": 7,
            "grammatical_range": 6.5,
            "pronunciation": 7.5
        },
        "feedback": {
            "fluency_coherence": "Speaks at length without noticeable effort.",
            "lexical_resource": "Flexible vocabulary with some less common items.",
            "grammatical_range": "Frequent error-free sentences.",
            "pronunciation": "Easy to understand throughout."
        },
        "strengths": ["Extended answers", "Natural linking"],
        "improvements": ["Idiomatic language"],
        "transcript": transcript
    })
}

pub fn count_events(pool: &DbPool, event_type: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM exam_event_log WHERE event_type = ?1",
        [event_type],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Renames `table` out of the way so every statement against it fails.
pub fn take_offline(pool: &DbPool, table: &str) {
    let conn = pool.get().unwrap();
    conn.execute_batch(&format!("ALTER TABLE {table} RENAME TO {table}_offline"))
        .unwrap();
}

pub fn bring_online(pool: &DbPool, table: &str) {
    let conn = pool.get().unwrap();
    conn.execute_batch(&format!("ALTER TABLE {table}_offline RENAME TO {table}"))
        .unwrap();
}

pub fn delete_request(session_id: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/sessions/{session_id}"))
        .method("DELETE")
        .body(Body::empty())
        .unwrap()
}
