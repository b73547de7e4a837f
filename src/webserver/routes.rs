use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use super::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/signals", get(signals))
        .route("/api/positions", get(positions))
        .route("/api/history", get(history))
        .route("/api/premarket", get(premarket))
        .with_state(state)
}

/// Endpoint directory for anyone poking the root
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "biasbuster",
        "endpoints": [
            "/api/health",
            "/api/signals",
            "/api/positions",
            "/api/history",
            "/api/premarket",
        ],
    }))
}

/// Heartbeat plus uptime for staleness checks
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "uptime_seconds": state.uptime_seconds(),
        "last_cycle": snapshot.as_ref().map(|s| s.last_updated),
        "open_positions": state.positions.open_count().await,
    }))
}

/// Latest published snapshot; 503 until the first cycle completes
async fn signals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    match snapshot.as_ref() {
        Some(published) => (StatusCode::OK, Json(serde_json::json!(published))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "no cycle completed yet" })),
        ),
    }
}

/// The active-position set
async fn positions(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let positions = state.positions.all().await;
    Json(serde_json::json!(positions))
}

/// The capped signal history, oldest first
async fn history(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let events = state.history.recent().await;
    Json(serde_json::json!(events))
}

/// The cached pre-market report, if any
async fn premarket(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.premarket.cached_report() {
        Some(report) => (StatusCode::OK, Json(serde_json::json!(report))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no pre-market report cached" })),
        ),
    }
}
