//! Ownership of in-flight relays.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use super::pump::{Relay, RelayReport};
use crate::generation::GenerationRequest;

/// Tracks every spawned relay so shutdown can stop them and wait for their
/// transcripts before the database closes.
#[derive(Debug, Clone, Default)]
pub struct RelaySupervisor {
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl RelaySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `relay` on its own tracked task.
    pub fn spawn(&self, relay: Relay, request: GenerationRequest) -> JoinHandle<RelayReport> {
        let relay = relay.with_shutdown(self.shutdown.child_token());
        self.tracker.spawn(relay.run(request))
    }

    /// Relays still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Ask every relay to stop. Each one ends as if its client left and
    /// commits what it has.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Cancel, then wait until every relay has finished committing.
    pub async fn shutdown(&self) {
        let active = self.active();
        if active > 0 {
            info!(active, "stopping in-flight relays");
        }
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
