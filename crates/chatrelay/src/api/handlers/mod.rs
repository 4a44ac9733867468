//! HTTP handlers.

mod chats;
mod health;
mod stream;

pub use chats::{archive_chat, create_chat, get_chat, list_chat_messages, list_chats};
pub use health::health;
pub use stream::{MAX_MESSAGE_CHARS, stream_chat};

use uuid::Uuid;

use super::error::{ApiError, ApiResult};

/// Parse a path segment as a session UUID.
fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid session ID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_id() {
        assert!(parse_session_id("6f9619ff-8b86-d011-b42d-00cf4fc964ff").is_ok());
        assert!(matches!(
            parse_session_id("not-a-uuid"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
