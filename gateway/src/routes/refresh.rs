//! POST /refresh - re-run backend discovery.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::refresh::RefreshOutput;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub result: RefreshOutput,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/refresh", post(refresh))
}

async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>> {
    let result = state.refresher.refresh().await.map_err(|e| {
        tracing::error!("Refresh failed: {}", e);
        e
    })?;

    Ok(Json(RefreshResponse {
        message: "Models refreshed",
        result,
    }))
}
