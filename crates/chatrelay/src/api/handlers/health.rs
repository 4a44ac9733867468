//! Health endpoint.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Database answers queries.
    pub database: bool,
    /// Generation backend answered its health check in time.
    pub generation: bool,
}

/// GET /health
///
/// Always 200; the flags report dependency reachability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (database, generation) = tokio::join!(state.db.is_healthy(), state.generation.health_check());

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
        generation,
    })
}
