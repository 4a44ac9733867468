//! End-to-end tests for the SSE generation stream.

mod common;

use axum::http::{StatusCode, header};
use serde_json::{Value, json};

use common::*;

async fn messages(app: &axum::Router, user: &str, session_id: &str) -> Vec<Value> {
    let response = send(app, get_as(user, &format!("/api/v1/chats/{session_id}/messages"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await.as_array().unwrap().clone()
}

async fn stream(app: &axum::Router, session_id: &str, message: &str) -> Vec<SseFrame> {
    let response = send(app, get_as(ALICE, &stream_uri(session_id, message))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    parse_sse(&body_text(response).await)
}

#[tokio::test]
async fn test_completed_generation_is_relayed_and_saved() {
    let backend = MockBackend::start(Reply::ndjson(&[
        json!({"type": "token", "content": "Hel"}),
        json!({"type": "token", "content": "lo"}),
        json!({"type": "complete", "content": "Hello", "tokens": 2}),
    ]))
    .await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    let frames = stream(&app, &id, "Hi").await;
    let payloads: Vec<&Value> = frames.iter().map(|f| &f.data).collect();
    assert_eq!(
        payloads,
        vec![
            &json!({"type": "token", "content": "Hel"}),
            &json!({"type": "token", "content": "lo"}),
            &json!({"type": "complete", "content": "Hello", "tokens": 2}),
        ]
    );
    assert!(frames.iter().all(|f| f.event.as_deref() == Some("message")));

    let saved = messages(&app, ALICE, &id).await;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0]["role"], "user");
    assert_eq!(saved[0]["content"], "Hi");
    assert_eq!(saved[1]["role"], "assistant");
    assert_eq!(saved[1]["content"], "Hello");
    assert_eq!(saved[1]["tokens"], 2);
    assert_eq!(saved[1]["is_incomplete"], false);
    assert!(saved[0]["sequence_number"].as_i64() < saved[1]["sequence_number"].as_i64());

    let request = &backend.requests()[0];
    assert_eq!(request["prompt"], "Hi");
    assert_eq!(request["model"], "phi-3-mini");
    assert_eq!(request["history"], json!([]));
}

#[tokio::test]
async fn test_stream_closed_early_saves_incomplete_reply() {
    let backend = MockBackend::start(Reply::ndjson(&[
        json!({"type": "token", "content": "Par", "tokens": 1}),
        json!({"type": "token", "content": "tial", "tokens": 2}),
    ]))
    .await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    let frames = stream(&app, &id, "Tell me a story").await;
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.data["type"] == "token"));

    let saved = messages(&app, ALICE, &id).await;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1]["content"], "Partial");
    assert_eq!(saved[1]["tokens"], 2);
    assert_eq!(saved[1]["is_incomplete"], true);
}

#[tokio::test]
async fn test_backend_error_event_is_forwarded() {
    let backend = MockBackend::start(Reply::ndjson(&[
        json!({"type": "token", "content": "Hal"}),
        json!({"type": "error", "content": "model crashed"}),
    ]))
    .await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    let frames = stream(&app, &id, "Hi").await;
    let last = frames.last().unwrap();
    assert_eq!(last.event.as_deref(), Some("error"));
    assert_eq!(last.data, json!({"type": "error", "content": "model crashed"}));

    let saved = messages(&app, ALICE, &id).await;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1]["content"], "Hal");
    assert_eq!(saved[1]["is_incomplete"], true);
}

#[tokio::test]
async fn test_backend_failure_status_yields_error_event_and_no_reply() {
    let backend = MockBackend::start(Reply::status(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    let frames = stream(&app, &id, "Hi").await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event.as_deref(), Some("error"));
    assert_eq!(frames[0].data["content"], "generation backend unavailable");

    let saved = messages(&app, ALICE, &id).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["role"], "user");
}

#[tokio::test]
async fn test_unreachable_backend_yields_error_event() {
    let app = test_app("http://127.0.0.1:9").await;
    let id = create_chat(&app, ALICE).await;

    let frames = stream(&app, &id, "Hi").await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data["type"], "error");

    let saved = messages(&app, ALICE, &id).await;
    assert_eq!(saved.len(), 1);
}

#[tokio::test]
async fn test_followup_carries_prior_turns_as_history() {
    let backend = MockBackend::start(Reply::ndjson(&[
        json!({"type": "token", "content": "Hello"}),
        json!({"type": "complete", "content": "Hello", "tokens": 1}),
    ]))
    .await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    stream(&app, &id, "Hi").await;

    backend.set_reply(Reply::ndjson(&[
        json!({"type": "token", "content": "Again"}),
        json!({"type": "complete", "content": "", "tokens": 1}),
    ]));
    let frames = stream(&app, &id, "Once more").await;
    assert_eq!(
        frames.last().unwrap().data,
        json!({"type": "complete", "content": "Again", "tokens": 1})
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1]["prompt"], "Once more");
    assert_eq!(
        requests[1]["history"],
        json!([
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hello"},
        ])
    );

    let saved = messages(&app, ALICE, &id).await;
    let sequence: Vec<i64> = saved
        .iter()
        .map(|m| m["sequence_number"].as_i64().unwrap())
        .collect();
    assert_eq!(saved.len(), 4);
    assert!(sequence.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(saved[3]["content"], "Again");
}

#[tokio::test]
async fn test_prompt_with_reserved_characters_is_delivered_intact() {
    let backend = MockBackend::start(Reply::ndjson(&[json!({"type": "complete", "content": "ok"})])).await;
    let app = test_app(&backend.base_url()).await;
    let id = create_chat(&app, ALICE).await;

    let prompt = "a&b=c? 100% \"quoted\" ünïcode";
    stream(&app, &id, prompt).await;

    assert_eq!(backend.requests()[0]["prompt"], prompt);
    assert_eq!(messages(&app, ALICE, &id).await[0]["content"], prompt);
}
