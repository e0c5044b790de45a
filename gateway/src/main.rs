use std::env;
use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use model_gateway::{logging, routes, AppState, Config};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    if env::args().any(|a| a == "--version" || a == "-V") {
        println!("model-gateway {}", VERSION);
        return Ok(());
    }

    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check gateway.toml or the GATEWAY__* environment variables.",
            e
        )
    })?;

    logging::init(&config.logging.level);
    tracing::info!("Starting model gateway {}", VERSION);
    tracing::info!(
        "Status document: {}, models root: {}",
        config.registry.status_file.display(),
        config.registry.models_dir.display()
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config)?);

    let app = routes::router(state)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
