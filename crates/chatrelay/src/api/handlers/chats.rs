//! Chat session handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::chat::{ChatSession, CreateChatSession, TranscriptRecord};

use super::parse_session_id;

/// Query parameters for listing sessions.
#[derive(Debug, Default, Deserialize)]
pub struct ListChatsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Create a chat session.
///
/// POST /api/v1/chats
#[instrument(skip(state, user, request), fields(user_id = %user.id()))]
pub async fn create_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateChatSession>,
) -> ApiResult<(StatusCode, Json<ChatSession>)> {
    let session = state.chats.create_session(user.id(), request).await?;
    info!(session_id = %session.id, model = %session.model_used, "created chat session");
    Ok((StatusCode::CREATED, Json(session)))
}

/// List the caller's sessions, most recently active first.
///
/// GET /api/v1/chats?include_archived=false
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn list_chats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListChatsQuery>,
) -> ApiResult<Json<Vec<ChatSession>>> {
    let sessions = state
        .chats
        .list_sessions(user.id(), query.include_archived)
        .await?;
    Ok(Json(sessions))
}

/// GET /api/v1/chats/{session_id}
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn get_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ChatSession>> {
    let session_id = parse_session_id(&session_id)?;
    let session = state.chats.get_session(session_id, user.id()).await?;
    Ok(Json(session))
}

/// Archive a session. Its transcript is kept.
///
/// DELETE /api/v1/chats/{session_id}
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn archive_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let session_id = parse_session_id(&session_id)?;
    state.chats.archive_session(session_id, user.id()).await?;
    info!(session_id = %session_id, "archived chat session");
    Ok(StatusCode::NO_CONTENT)
}

/// Full transcript in sequence order, including incomplete replies.
///
/// GET /api/v1/chats/{session_id}/messages
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn list_chat_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<TranscriptRecord>>> {
    let session_id = parse_session_id(&session_id)?;
    let messages = state.chats.list_messages(session_id, user.id()).await?;
    Ok(Json(messages))
}
