//! Authentication module.
//!
//! Resolves the calling principal from an HS256 bearer token, or from the
//! `X-Dev-User` header when dev mode is on. Credential issuance is external.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError, DevUser};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware};
