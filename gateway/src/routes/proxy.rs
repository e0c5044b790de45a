//! /api/{key}/{*subpath} - reverse proxy to a backend.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::{on, MethodFilter};
use axum::Router;

use crate::error::Result;
use crate::proxy::ProxyRequest;
use crate::state::AppState;

pub fn router(max_body_bytes: usize) -> Router<Arc<AppState>> {
    let methods = MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::DELETE)
        .or(MethodFilter::PATCH);

    Router::new()
        .route("/api/:key", on(methods, proxy_root))
        .route("/api/:key/", on(methods, proxy_root))
        .route("/api/:key/*path", on(methods, proxy_path))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn proxy_root(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let request = ProxyRequest {
        method,
        headers,
        query,
        body,
    };
    state.proxy.handle(&key, "", request).await
}

async fn proxy_path(
    State(state): State<Arc<AppState>>,
    Path((key, path)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let request = ProxyRequest {
        method,
        headers,
        query,
        body,
    };
    state.proxy.handle(&key, &path, request).await
}
