//! Generation backend error types.

use thiserror::Error;

/// Result type for generation backend operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors raised while talking to the generation backend.
///
/// A producer-reported failure is not an error here: it arrives as
/// [`TokenEvent::Error`](super::TokenEvent::Error).
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Connection or request failed before a response arrived.
    #[error("failed to connect to generation backend at {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Backend answered with a non-2xx status.
    #[error("generation backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A non-blank line was not a valid event object.
    #[error("malformed event from generation backend: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response body failed mid-read.
    #[error("generation stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Whether the backend could not be reached or refused the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ClientBuild(_) | Self::ConnectionFailed { .. } | Self::Status { .. }
        )
    }
}
