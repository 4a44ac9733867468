//! Upstream token source.
//!
//! Opens one streaming request against the generation backend and decodes
//! its NDJSON body into [`TokenEvent`]s.

mod client;
mod error;
mod source;
mod types;

pub use client::GenerationClient;
pub use error::{GenerationError, GenerationResult};
pub use source::{TokenSource, TokenStream, decode_lines};
pub use types::{GenerationRequest, TokenEvent};
