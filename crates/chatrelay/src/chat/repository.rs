//! Chat database repository.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{ChatSession, NewTurn, TranscriptRecord};

const SESSION_COLUMNS: &str =
    "id, user_id, title, model_used, is_archived, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, chat_session_id, role, content, tokens, is_incomplete, sequence_number, created_at";

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Repository for chat sessions and their transcripts.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========== Session Operations ==========

    /// Insert a new session and return it.
    pub async fn create_session(
        &self,
        user_id: &str,
        title: &str,
        model: &str,
    ) -> Result<ChatSession> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, user_id, title, model_used, is_archived, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(model)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("creating chat session")?;

        self.get_session(&id)
            .await?
            .context("chat session not found after insert")
    }

    /// Get a session by ID regardless of owner.
    pub async fn get_session(&self, id: &str) -> Result<Option<ChatSession>> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching chat session")
    }

    /// Get a session only if it belongs to `user_id`.
    pub async fn get_session_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ChatSession>> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching chat session for user")
    }

    /// List a user's sessions, most recently updated first.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        include_archived: bool,
    ) -> Result<Vec<ChatSession>> {
        let sql = if include_archived {
            format!(
                "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_id = ? ORDER BY updated_at DESC"
            )
        } else {
            format!(
                "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_id = ? AND is_archived = 0 ORDER BY updated_at DESC"
            )
        };

        sqlx::query_as::<_, ChatSession>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("listing chat sessions")
    }

    /// Mark a session archived. Returns false if no owned session matched.
    pub async fn archive_session(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET is_archived = 1, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(now_rfc3339())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("archiving chat session")?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump a session's `updated_at`.
    pub async fn touch_session(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("touching chat session")?;
        Ok(())
    }

    // ========== Message Operations ==========

    /// Append a turn, assigning the next sequence number for the session.
    ///
    /// The maximum is read and incremented inside the insert statement itself,
    /// so SQLite's write lock covers both halves.
    pub async fn insert_turn(&self, session_id: &str, turn: NewTurn) -> Result<TranscriptRecord> {
        let id = Uuid::new_v4().to_string();

        sqlx::query_as::<_, TranscriptRecord>(&format!(
            r#"
            INSERT INTO messages ({MESSAGE_COLUMNS})
            SELECT ?, ?, ?, ?, ?, ?, COALESCE(MAX(sequence_number), 0) + 1, ?
            FROM messages
            WHERE chat_session_id = ?
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(session_id)
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(turn.tokens)
        .bind(turn.is_incomplete)
        .bind(now_rfc3339())
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .context("inserting message")
    }

    /// Highest sequence number in a session (0 when empty).
    #[cfg(test)]
    async fn max_sequence(&self, session_id: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM messages WHERE chat_session_id = ?",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .context("reading max sequence number")
    }

    /// All turns of a session in sequence order.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<TranscriptRecord>> {
        sqlx::query_as::<_, TranscriptRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_session_id = ? ORDER BY sequence_number ASC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("listing messages")
    }

    /// The last `limit` turns of a session, oldest first.
    pub async fn last_messages(&self, session_id: &str, limit: i64) -> Result<Vec<TranscriptRecord>> {
        sqlx::query_as::<_, TranscriptRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE chat_session_id = ?
                ORDER BY sequence_number DESC
                LIMIT ?
            )
            ORDER BY sequence_number ASC
            "#
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching recent messages")
    }
}
