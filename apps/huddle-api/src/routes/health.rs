use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Open WebSocket connections, authenticated or not.
    pub connections: usize,
    pub authenticated: usize,
    pub users: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.gateway.registry();
    Json(HealthResponse {
        status: "ok",
        connections: state.gateway.open_connections(),
        authenticated: registry.connection_count(),
        users: registry.user_count(),
    })
}
