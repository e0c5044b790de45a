//! GET /endpoints/{key} - routes a backend exposes.
//! DELETE /endpoints/{key} - forget them so the manifest is fetched again.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::discovery::{default_endpoints, EndpointDescriptor};
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EndpointsResponse {
    pub endpoints: Vec<EndpointDescriptor>,
    pub status: &'static str,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/endpoints/:key", get(list_endpoints).delete(forget_endpoints))
}

/// Discovered routes, or the conventional ones when the backend publishes none.
async fn list_endpoints(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<EndpointsResponse>> {
    let record = state.registry.resolve(&key).await?;
    let Ok(port) = record.live_port() else {
        return Ok(Json(EndpointsResponse {
            endpoints: vec![],
            status: "model not running",
        }));
    };

    let discovered = state.discovery.discover(&key, port).await;
    let response = if discovered.is_empty() {
        EndpointsResponse {
            endpoints: default_endpoints(),
            status: "default endpoints",
        }
    } else {
        EndpointsResponse {
            endpoints: discovered.as_ref().clone(),
            status: "available",
        }
    };

    Ok(Json(response))
}

/// Drop the discovered routes of `key` so the next request refetches its manifest.
async fn forget_endpoints(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<Value> {
    let cleared = state.discovery.cached(&key).await.is_some();
    state.discovery.invalidate(Some(&key)).await;
    tracing::info!("Forgot discovered endpoints of {} (cached: {})", key, cleared);

    Json(json!({ "model": key, "cleared": cleared }))
}
