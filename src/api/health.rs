use super::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    database_connected: bool,
    cache_enabled: bool,
    cache_connected: bool,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Cache state is reported but never degrades health
    let database_connected = state.health.ping().await;

    Json(HealthResponse {
        status: if database_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        database_connected,
        cache_enabled: state.cache.is_enabled(),
        cache_connected: state.cache.is_connected().await,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
