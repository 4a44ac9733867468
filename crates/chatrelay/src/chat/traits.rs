//! Narrow persistence interface consumed by the streaming relay.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::models::{ChatSession, HistoryTurn, TranscriptRecord};

/// Chat storage as seen by the relay.
///
/// The relay never touches SQL directly; tests substitute in-memory stores.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Resolve a session owned by `user_id`. `None` when missing or not owned.
    async fn lookup_session(&self, session_id: Uuid, user_id: &str) -> Result<Option<ChatSession>>;

    /// Up to `limit` most recent turns, oldest first.
    async fn recent_history(&self, session_id: Uuid, limit: i64) -> Result<Vec<HistoryTurn>>;

    /// Persist the user's prompt.
    async fn persist_user_turn(
        &self,
        session_id: Uuid,
        user_id: &str,
        content: &str,
    ) -> Result<TranscriptRecord>;

    /// Persist the assistant's reply.
    async fn persist_assistant_turn(
        &self,
        session_id: Uuid,
        content: &str,
        tokens: i64,
        is_incomplete: bool,
    ) -> Result<TranscriptRecord>;
}
