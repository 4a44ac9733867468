//! Chat sessions and transcripts.
//!
//! Sessions belong to one principal. Every turn (user prompt or assistant
//! reply) is stored with a per-session sequence number. The streaming relay
//! only sees this module through the [`ChatStore`] trait.

mod models;
mod repository;
mod service;
mod traits;

pub use models::{
    ChatSession, CreateChatSession, HistoryTurn, MessageRole, NewTurn, TranscriptRecord,
};
pub use repository::ChatRepository;
pub use service::{ChatService, DEFAULT_SESSION_TITLE};
pub use traits::ChatStore;
