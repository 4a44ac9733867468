//! Wire types exchanged with the generation backend.

use serde::{Deserialize, Serialize};

use crate::chat::HistoryTurn;

/// Body of `POST /api/v1/generate/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub history: Vec<HistoryTurn>,
    pub model: String,
}

/// One decoded NDJSON line of the backend's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    /// Incremental text fragment, optionally with the running token count.
    Token {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<i64>,
    },
    /// Terminal success. Empty `content` means the fragments are authoritative.
    Complete {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<i64>,
    },
    /// Terminal failure reported by the backend itself.
    Error {
        #[serde(rename = "content", alias = "message", default)]
        message: String,
    },
}

impl TokenEvent {
    /// `Complete` and `Error` end the sequence.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Token { .. })
    }
}
