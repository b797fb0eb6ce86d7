use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
///
/// Liveness probe: always 200, with a `store_healthy` flag reflecting the
/// persistence port's connectivity.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let store_healthy = state.service.health_check().await.is_ok();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "store_healthy": store_healthy,
    }))
}
