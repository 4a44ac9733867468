//! Chat data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// A chat session owned by one principal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    /// Session UUID
    pub id: String,
    /// Owning principal (JWT subject)
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Model identifier handed to the generation backend
    pub model_used: String,
    /// Soft-deleted sessions are hidden from default listings
    pub is_archived: bool,
    /// RFC 3339 creation time
    pub created_at: String,
    /// RFC 3339 time of the last persisted turn
    pub updated_at: String,
}

/// Input for creating a chat session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateChatSession {
    pub title: Option<String>,
    pub model: Option<String>,
}

/// One persisted turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TranscriptRecord {
    pub id: String,
    pub chat_session_id: String,
    pub role: String,
    pub content: String,
    pub tokens: i64,
    /// Captured before the backend signalled completion.
    pub is_incomplete: bool,
    /// Strictly increasing within a session.
    pub sequence_number: i64,
    pub created_at: String,
}

impl TranscriptRecord {
    /// Parsed role, if the stored value is one we know.
    pub fn role(&self) -> Option<MessageRole> {
        self.role.parse().ok()
    }
}

/// Input for inserting a transcript turn.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub role: MessageRole,
    pub content: String,
    pub tokens: i64,
    pub is_incomplete: bool,
}

/// A prior turn handed to the generation backend as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

impl From<TranscriptRecord> for HistoryTurn {
    fn from(record: TranscriptRecord) -> Self {
        Self {
            role: record.role,
            content: record.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            let parsed: MessageRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("narrator".parse::<MessageRole>().is_err());
        assert_eq!("ASSISTANT".parse::<MessageRole>(), Ok(MessageRole::Assistant));
    }

    #[test]
    fn test_history_turn_from_record() {
        let record = TranscriptRecord {
            id: "m1".to_string(),
            chat_session_id: "s1".to_string(),
            role: "assistant".to_string(),
            content: "Hello".to_string(),
            tokens: 2,
            is_incomplete: true,
            sequence_number: 4,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };
        assert_eq!(record.role(), Some(MessageRole::Assistant));

        let turn = HistoryTurn::from(record);
        assert_eq!(turn.role, "assistant");
        assert_eq!(turn.content, "Hello");
    }
}
