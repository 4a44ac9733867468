//! Generation-stream relay.
//!
//! One [`Relay`] per client request. It opens the backend stream, forwards
//! each event to the client through a bounded [`Emitter`] channel, and writes
//! at most one assistant record whatever way the exchange ends.
//! [`RelaySupervisor`] owns the spawned relays so shutdown can drain them.

mod emitter;
mod finalizer;
mod outcome;
mod pump;
mod supervisor;

pub use emitter::{ClientEvent, ClientGone, Emitter, EventReceiver, sse_response};
pub use finalizer::TranscriptFinalizer;
pub use outcome::{PendingTranscript, RelayOutcome, Termination};
pub use pump::{Relay, RelayReport};
pub use supervisor::RelaySupervisor;
