//! Transcript finalizer.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::outcome::PendingTranscript;
use crate::chat::{ChatStore, TranscriptRecord};

/// Persists the assistant's reply for one session.
#[derive(Clone)]
pub struct TranscriptFinalizer {
    store: Arc<dyn ChatStore>,
    session_id: Uuid,
}

impl TranscriptFinalizer {
    pub fn new(store: Arc<dyn ChatStore>, session_id: Uuid) -> Self {
        Self { store, session_id }
    }

    /// Write the reply as an assistant turn.
    ///
    /// Failures are logged here and returned for bookkeeping only; callers
    /// must not surface them to the client.
    pub async fn finalize(&self, pending: PendingTranscript) -> Result<TranscriptRecord> {
        let result = self
            .store
            .persist_assistant_turn(
                self.session_id,
                &pending.content,
                pending.tokens,
                pending.is_incomplete,
            )
            .await;

        match &result {
            Ok(record) => debug!(
                session_id = %self.session_id,
                message_id = %record.id,
                sequence = record.sequence_number,
                is_incomplete = record.is_incomplete,
                "assistant reply saved"
            ),
            Err(e) => error!(
                session_id = %self.session_id,
                is_incomplete = pending.is_incomplete,
                error = ?e,
                "failed to save assistant reply"
            ),
        }

        result
    }
}
