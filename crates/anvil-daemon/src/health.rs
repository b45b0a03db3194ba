//! Minimal health/admin HTTP surface. Stands in for the externally-assumed
//! HTTP API named out of scope; it exposes only enough to let an operator
//! (or a liveness probe) confirm the process is up and see queue counts.

use anvil_storage::traits::QueueStore;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub queues: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let queues = state
        .storage
        .list_queues()
        .await
        .map(|q| q.len())
        .unwrap_or(0);
    Json(StatusResponse {
        queues,
        started_at: state.started_at,
    })
}
