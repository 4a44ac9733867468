//! Streaming chat handler.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::generation::GenerationRequest;
use crate::relay::{Emitter, Relay, TranscriptFinalizer, sse_response};

use super::parse_session_id;

/// Longest prompt accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 32_000;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub message: String,
}

fn validate_message(message: &str) -> ApiResult<&str> {
    if message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(message)
}

/// Stream a reply to `message` as server-sent events.
///
/// GET /api/v1/stream/chat/{session_id}?message=...
///
/// Validation, ownership and the user turn are settled before the response
/// starts, so those failures are plain JSON errors. Everything after that is
/// reported in-stream.
#[instrument(skip(state, user, query), fields(user_id = %user.id()))]
pub async fn stream_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let session_id = parse_session_id(&session_id)?;
    let prompt = validate_message(&query.message)?;

    let session = state
        .store
        .lookup_session(session_id, user.id())
        .await?
        .ok_or_else(|| ApiError::not_found("Chat session not found"))?;

    // Read history first so it holds prior turns only.
    let history = state
        .store
        .recent_history(session_id, state.history_limit)
        .await?;

    state
        .store
        .persist_user_turn(session_id, user.id(), prompt)
        .await?;

    info!(
        session_id = %session_id,
        model = %session.model_used,
        history = history.len(),
        "starting generation stream"
    );

    let (emitter, rx) = Emitter::channel(state.relay.channel_capacity);
    let finalizer = TranscriptFinalizer::new(state.store.clone(), session_id);
    state.relays.spawn(
        Relay::new(session_id, state.source.clone(), finalizer, emitter),
        GenerationRequest {
            prompt: prompt.to_string(),
            history,
            model: session.model_used,
        },
    );

    Ok(sse_response(rx, state.relay.keep_alive()))
}
