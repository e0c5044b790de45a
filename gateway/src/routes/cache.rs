//! POST /cache/clear - forget cached folders, descriptors and discovered routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cache/clear", post(clear))
}

async fn clear(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.registry.invalidate().await;
    state.discovery.invalidate(None).await;
    tracing::info!("Cleared registry and discovery caches");

    Json(json!({ "message": "Caches cleared" }))
}
