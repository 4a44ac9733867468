//! Shared fixtures for API integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use chatrelay::api::{AppState, create_router};
use chatrelay::auth::{AuthConfig, AuthState, DevUser};
use chatrelay::chat::{ChatRepository, ChatService};
use chatrelay::config::{GenerationConfig, RelayConfig};
use chatrelay::db::Database;
use chatrelay::generation::GenerationClient;

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

/// What the fake generation backend answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    /// A 200 response carrying one NDJSON line per event.
    pub fn ndjson(events: &[Value]) -> Self {
        let body = events
            .iter()
            .map(|event| format!("{event}\n"))
            .collect::<String>();
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: "backend exploded".to_string(),
        }
    }
}

#[derive(Clone)]
struct BackendState {
    reply: Arc<Mutex<Reply>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Generation backend stand-in bound to an ephemeral port.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: BackendState,
}

impl MockBackend {
    pub async fn start(reply: Reply) -> Self {
        let state = BackendState {
            reply: Arc::new(Mutex::new(reply)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/v1/generate/stream", post(generate_stream))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// Request bodies received so far, oldest first.
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn generate_stream(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body);
    let reply = state.reply.lock().unwrap().clone();
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        reply.body,
    )
        .into_response()
}

/// A router wired to an in-memory database and the given backend URL.
pub async fn test_app(backend_url: &str) -> Router {
    let db = Database::in_memory().await.unwrap();

    let generation = GenerationClient::new(&GenerationConfig {
        base_url: backend_url.to_string(),
        health_timeout_secs: 1,
        ..GenerationConfig::default()
    })
    .unwrap();

    let chats = ChatService::new(
        ChatRepository::new(db.pool().clone()),
        GenerationConfig::default().default_model,
    );

    let auth = AuthState::new(AuthConfig {
        dev_mode: true,
        dev_users: vec![dev_user(ALICE), dev_user(BOB)],
        ..AuthConfig::default()
    });

    let state = AppState::new(
        db,
        chats,
        generation,
        RelayConfig::default(),
        10,
        std::time::Duration::from_secs(5),
        auth,
    );
    create_router(state)
}

fn dev_user(id: &str) -> DevUser {
    DevUser {
        id: id.to_string(),
        name: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

pub fn get_as(user: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Dev-User", user)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json_as(user: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Dev-User", user)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete_as(user: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("X-Dev-User", user)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Create a session for `user` and return its id.
pub async fn create_chat(app: &Router, user: &str) -> String {
    let response = send(app, post_json_as(user, "/api/v1/chats", serde_json::json!({}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// URL for streaming `message` into `session_id`.
pub fn stream_uri(session_id: &str, message: &str) -> String {
    let encoded: String = url_encode(message);
    format!("/api/v1/stream/chat/{session_id}?message={encoded}")
}

fn url_encode(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// A server-sent event as read off the wire.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: Value,
}

/// Split an SSE body into frames, skipping keep-alive comments.
pub fn parse_sse(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data.push_str(payload.trim_start());
                }
            }
            if data.is_empty() {
                None
            } else {
                Some(SseFrame {
                    event,
                    data: serde_json::from_str(&data).unwrap(),
                })
            }
        })
        .collect()
}
