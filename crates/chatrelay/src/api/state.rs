//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthState;
use crate::chat::{ChatService, ChatStore};
use crate::config::RelayConfig;
use crate::db::Database;
use crate::generation::{GenerationClient, TokenSource};
use crate::relay::RelaySupervisor;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session CRUD.
    pub chats: ChatService,
    /// The same service, as the relay sees it.
    pub store: Arc<dyn ChatStore>,
    /// Backend client, used for health checks.
    pub generation: GenerationClient,
    /// Where relays open their streams.
    pub source: Arc<dyn TokenSource>,
    pub relay: RelayConfig,
    /// In-flight relays, drained on shutdown.
    pub relays: RelaySupervisor,
    /// Prior turns sent with each prompt.
    pub history_limit: i64,
    /// Deadline for non-streaming routes.
    pub request_timeout: Duration,
    pub auth: AuthState,
    pub db: Database,
}

impl AppState {
    pub fn new(
        db: Database,
        chats: ChatService,
        generation: GenerationClient,
        relay: RelayConfig,
        history_limit: i64,
        request_timeout: Duration,
        auth: AuthState,
    ) -> Self {
        Self {
            store: Arc::new(chats.clone()),
            source: Arc::new(generation.clone()),
            chats,
            generation,
            relay,
            relays: RelaySupervisor::new(),
            history_limit,
            request_timeout,
            auth,
            db,
        }
    }
}
