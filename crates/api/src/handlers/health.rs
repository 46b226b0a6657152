use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// Router for the root-level health check.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
///
/// Liveness probe; no authentication, no dependencies.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
