//! GET /health/{key} - probe one backend.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::Result;
use crate::health::HealthReport;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health/:key", get(health))
}

async fn health(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<HealthReport>> {
    Ok(Json(state.health.check(&key).await?))
}
