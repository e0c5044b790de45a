//! HTTP surface of the gateway.

pub mod cache;
pub mod endpoints;
pub mod health;
pub mod home;
pub mod proxy;
pub mod refresh;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the full router.
pub fn router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .merge(home::router())
        .merge(proxy::router(max_body_bytes))
        .merge(health::router())
        .merge(endpoints::router())
        .merge(refresh::router())
        .merge(cache::router())
        .with_state(state)
}
