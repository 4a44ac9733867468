//! Chat service: session management and the relay's storage backend.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use super::models::{
    ChatSession, CreateChatSession, HistoryTurn, MessageRole, NewTurn, TranscriptRecord,
};
use super::repository::ChatRepository;
use super::traits::ChatStore;

/// Default title for sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

const MAX_TITLE_LEN: usize = 255;

/// Service wrapping the chat repository.
#[derive(Debug, Clone)]
pub struct ChatService {
    repo: ChatRepository,
    default_model: String,
}

impl ChatService {
    pub fn new(repo: ChatRepository, default_model: impl Into<String>) -> Self {
        Self {
            repo,
            default_model: default_model.into(),
        }
    }

    /// Model used when a session is created without one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Create a session for `user_id`.
    pub async fn create_session(
        &self,
        user_id: &str,
        request: CreateChatSession,
    ) -> Result<ChatSession> {
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
        if title.chars().count() > MAX_TITLE_LEN {
            bail!("Title must be at most {} characters", MAX_TITLE_LEN);
        }

        let model = request
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        self.repo.create_session(user_id, &title, &model).await
    }

    /// List sessions owned by `user_id`.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        include_archived: bool,
    ) -> Result<Vec<ChatSession>> {
        self.repo.list_sessions(user_id, include_archived).await
    }

    /// Get an owned session or fail with a "not found" error.
    pub async fn get_session(&self, session_id: Uuid, user_id: &str) -> Result<ChatSession> {
        self.repo
            .get_session_for_user(&session_id.to_string(), user_id)
            .await?
            .with_context(|| format!("Chat session not found: {}", session_id))
    }

    /// Archive an owned session.
    pub async fn archive_session(&self, session_id: Uuid, user_id: &str) -> Result<()> {
        if !self
            .repo
            .archive_session(&session_id.to_string(), user_id)
            .await?
        {
            bail!("Chat session not found: {}", session_id);
        }
        Ok(())
    }

    /// Full transcript of an owned session.
    pub async fn list_messages(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<Vec<TranscriptRecord>> {
        let session = self.get_session(session_id, user_id).await?;
        self.repo.list_messages(&session.id).await
    }

    async fn append(&self, session_id: Uuid, turn: NewTurn) -> Result<TranscriptRecord> {
        let id = session_id.to_string();
        let record = self.repo.insert_turn(&id, turn).await?;

        if let Err(err) = self.repo.touch_session(&id).await {
            warn!(session_id = %id, error = %err, "failed to update session timestamp");
        }

        Ok(record)
    }
}

#[async_trait]
impl ChatStore for ChatService {
    async fn lookup_session(&self, session_id: Uuid, user_id: &str) -> Result<Option<ChatSession>> {
        self.repo
            .get_session_for_user(&session_id.to_string(), user_id)
            .await
    }

    async fn recent_history(&self, session_id: Uuid, limit: i64) -> Result<Vec<HistoryTurn>> {
        let records = self
            .repo
            .last_messages(&session_id.to_string(), limit)
            .await?;
        Ok(records.into_iter().map(HistoryTurn::from).collect())
    }

    async fn persist_user_turn(
        &self,
        session_id: Uuid,
        user_id: &str,
        content: &str,
    ) -> Result<TranscriptRecord> {
        // Ownership is re-checked here so the store is safe to call on its own.
        self.get_session(session_id, user_id).await?;

        self.append(
            session_id,
            NewTurn {
                role: MessageRole::User,
                content: content.to_string(),
                tokens: 0,
                is_incomplete: false,
            },
        )
        .await
    }

    async fn persist_assistant_turn(
        &self,
        session_id: Uuid,
        content: &str,
        tokens: i64,
        is_incomplete: bool,
    ) -> Result<TranscriptRecord> {
        self.append(
            session_id,
            NewTurn {
                role: MessageRole::Assistant,
                content: content.to_string(),
                tokens,
                is_incomplete,
            },
        )
        .await
    }
}
