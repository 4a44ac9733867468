//! Per-exchange relay state.

use std::fmt;

/// Why a relay stopped streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Backend sent `complete`.
    Completed,
    /// Backend closed the stream without a terminal event.
    PartialClosed,
    /// Backend sent `error`.
    ProducerErrored,
    /// Connection, status or decode failure.
    TransportErrored,
    /// Client stopped accepting events.
    ClientGone,
}

impl Termination {
    /// Anything but a clean completion leaves the reply incomplete.
    pub fn is_incomplete(self) -> bool {
        !matches!(self, Self::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartialClosed => "partial_closed",
            Self::ProducerErrored => "producer_errored",
            Self::TransportErrored => "transport_errored",
            Self::ClientGone => "client_gone",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assistant reply ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTranscript {
    pub content: String,
    pub tokens: i64,
    pub is_incomplete: bool,
}

/// Accumulated state of one relay. Owned by the relay task alone.
#[derive(Debug, Default)]
pub struct RelayOutcome {
    accumulated: String,
    token_count: i64,
    fragments: usize,
    /// Authoritative reply from a `complete` event, if one arrived.
    final_reply: Option<(String, i64)>,
    termination: Option<Termination>,
    finalized: bool,
}

impl RelayOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. `tokens` is the backend's running count, if sent.
    pub fn record_token(&mut self, content: &str, tokens: Option<i64>) {
        self.accumulated.push_str(content);
        self.fragments += 1;
        if let Some(tokens) = tokens {
            self.token_count = tokens;
        }
    }

    /// Enter `Completed` and return the reply the client should see.
    ///
    /// Empty `content` falls back to the accumulated fragments; a missing or
    /// zero count falls back to the running count.
    pub fn complete(&mut self, content: String, tokens: Option<i64>) -> (String, i64) {
        let content = if content.is_empty() {
            self.accumulated.clone()
        } else {
            content
        };
        let tokens = tokens.filter(|t| *t != 0).unwrap_or(self.token_count);

        self.final_reply = Some((content.clone(), tokens));
        self.terminate(Termination::Completed);
        (content, tokens)
    }

    /// Enter a terminal state. The first transition wins.
    pub fn terminate(&mut self, reason: Termination) {
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
    }

    /// Claim the single write for this exchange.
    ///
    /// Returns `None` if still streaming, already claimed, or the reply is
    /// empty. Only the first call after termination can return `Some`.
    pub fn take_pending(&mut self) -> Option<PendingTranscript> {
        let termination = self.termination?;
        if self.finalized {
            return None;
        }
        self.finalized = true;

        let (content, tokens) = match &self.final_reply {
            Some((content, tokens)) => (content.clone(), *tokens),
            None => (self.accumulated.clone(), self.token_count),
        };

        // Empty fragments carry nothing worth a transcript turn.
        if content.is_empty() {
            return None;
        }

        Some(PendingTranscript {
            content,
            tokens,
            is_incomplete: termination.is_incomplete(),
        })
    }

    pub fn token_count(&self) -> i64 {
        self.token_count
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    #[cfg(test)]
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}
