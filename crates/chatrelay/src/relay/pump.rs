//! Relay core: pumps backend events to the client and persists the reply.

use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::emitter::{ClientEvent, Emitter};
use super::finalizer::TranscriptFinalizer;
use super::outcome::{RelayOutcome, Termination};
use crate::generation::{GenerationError, GenerationRequest, TokenEvent, TokenSource, TokenStream};

/// Summary of one finished relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub termination: Termination,
    pub fragments: usize,
    pub tokens: i64,
    /// Whether an assistant record was written.
    pub saved: bool,
}

enum Step {
    Upstream(Option<Result<TokenEvent, GenerationError>>),
    ClientClosed,
    ShuttingDown,
}

/// One generation exchange between the backend and a client.
pub struct Relay {
    session_id: Uuid,
    source: Arc<dyn TokenSource>,
    finalizer: TranscriptFinalizer,
    emitter: Emitter,
    shutdown: CancellationToken,
}

impl Relay {
    pub fn new(
        session_id: Uuid,
        source: Arc<dyn TokenSource>,
        finalizer: TranscriptFinalizer,
        emitter: Emitter,
    ) -> Self {
        Self {
            session_id,
            source,
            finalizer,
            emitter,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop early when `token` is cancelled, as if the client had left.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Open the backend stream and relay it to completion.
    ///
    /// The emitter is dropped when this returns, which ends the client's
    /// stream. Any record has been written by then.
    pub async fn run(self, request: GenerationRequest) -> RelayReport {
        let mut outcome = RelayOutcome::new();

        let opened = tokio::select! {
            biased;
            _ = self.emitter.closed() => None,
            _ = self.shutdown.cancelled() => None,
            opened = self.source.open(request) => Some(opened),
        };

        let mut saved = false;
        match opened {
            None => outcome.terminate(Termination::ClientGone),
            Some(Ok(stream)) => saved = self.pump(stream, &mut outcome).await,
            Some(Err(e)) => {
                warn!(session_id = %self.session_id, error = %e, "failed to open generation stream");
                outcome.terminate(Termination::TransportErrored);
                self.notify(ClientEvent::Error {
                    content: client_message(&e),
                })
                .await;
            }
        }

        // Paths that already committed are no-ops here.
        saved |= self.commit(&mut outcome).await;
        let termination = outcome.termination().unwrap_or(Termination::PartialClosed);

        info!(
            session_id = %self.session_id,
            termination = %termination,
            fragments = outcome.fragments(),
            tokens = outcome.token_count(),
            saved,
            "relay finished"
        );

        RelayReport {
            termination,
            fragments: outcome.fragments(),
            tokens: outcome.token_count(),
            saved,
        }
    }

    /// Returns whether a record was written.
    async fn pump(&self, mut stream: TokenStream, outcome: &mut RelayOutcome) -> bool {
        loop {
            let step = tokio::select! {
                biased;
                _ = self.emitter.closed() => Step::ClientClosed,
                _ = self.shutdown.cancelled() => Step::ShuttingDown,
                item = stream.next() => Step::Upstream(item),
            };

            let notice = match step {
                Step::Upstream(Some(Ok(TokenEvent::Token { content, tokens }))) => {
                    outcome.record_token(&content, tokens);
                    let event = ClientEvent::Token { content, tokens };
                    if self.emitter.send(event).await.is_ok() {
                        continue;
                    }
                    outcome.terminate(Termination::ClientGone);
                    None
                }
                Step::Upstream(Some(Ok(TokenEvent::Complete { content, tokens }))) => {
                    let (content, tokens) = outcome.complete(content, tokens);
                    Some(ClientEvent::Complete { content, tokens })
                }
                Step::Upstream(Some(Ok(TokenEvent::Error { message }))) => {
                    warn!(session_id = %self.session_id, message = %message, "generation backend reported an error");
                    outcome.terminate(Termination::ProducerErrored);
                    let content = if message.is_empty() {
                        "generation failed".to_string()
                    } else {
                        message
                    };
                    Some(ClientEvent::Error { content })
                }
                Step::Upstream(Some(Err(e))) => {
                    warn!(session_id = %self.session_id, error = %e, "generation stream failed");
                    outcome.terminate(Termination::TransportErrored);
                    Some(ClientEvent::Error {
                        content: client_message(&e),
                    })
                }
                Step::Upstream(None) => {
                    debug!(session_id = %self.session_id, "generation stream closed without a terminal event");
                    outcome.terminate(Termination::PartialClosed);
                    None
                }
                Step::ClientClosed => {
                    debug!(session_id = %self.session_id, "client disconnected");
                    outcome.terminate(Termination::ClientGone);
                    None
                }
                Step::ShuttingDown => {
                    debug!(session_id = %self.session_id, "relay cancelled by shutdown");
                    outcome.terminate(Termination::ClientGone);
                    None
                }
            };

            // Release the backend connection before writing anything.
            drop(stream);
            let saved = self.commit(outcome).await;
            if let Some(event) = notice {
                self.notify(event).await;
            }
            return saved;
        }
    }

    /// Persist the reply if this outcome still owes one. Returns whether a
    /// record was written by this call.
    async fn commit(&self, outcome: &mut RelayOutcome) -> bool {
        match outcome.take_pending() {
            Some(pending) => self.finalizer.finalize(pending).await.is_ok(),
            None => false,
        }
    }

    async fn notify(&self, event: ClientEvent) {
        if self.emitter.send(event).await.is_err() {
            debug!(session_id = %self.session_id, "client gone before final event");
        }
    }
}

fn client_message(err: &GenerationError) -> String {
    if err.is_unavailable() {
        "generation backend unavailable".to_string()
    } else {
        "generation stream failed".to_string()
    }
}
