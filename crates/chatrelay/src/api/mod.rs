//! HTTP API module.
//!
//! JSON endpoints for chat sessions plus the SSE generation stream.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::MAX_MESSAGE_CHARS;
pub use routes::create_router;
pub use state::AppState;
