//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::discovery::EndpointDiscovery;
use crate::health::HealthChecker;
use crate::proxy::ProxyEngine;
use crate::refresh::{Refresher, ScriptRefresher};
use crate::registry::BackendRegistry;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<BackendRegistry>,
    pub discovery: Arc<EndpointDiscovery>,
    pub proxy: ProxyEngine,
    pub health: HealthChecker,
    pub refresher: Arc<dyn Refresher>,
}

impl AppState {
    /// Build the state, refreshing backends with the configured script.
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let refresher = Arc::new(ScriptRefresher::new(config.refresh.clone()));
        Self::with_refresher(config, refresher)
    }

    pub fn with_refresher(config: Config, refresher: Arc<dyn Refresher>) -> reqwest::Result<Self> {
        let registry = Arc::new(BackendRegistry::new(config.registry.clone()));
        let discovery = Arc::new(EndpointDiscovery::new(config.backends.clone())?);
        let proxy = ProxyEngine::new(config.backends.clone(), registry.clone(), discovery.clone())?;
        let health = HealthChecker::new(config.backends.clone(), registry.clone())?;

        Ok(Self {
            config,
            registry,
            discovery,
            proxy,
            health,
            refresher,
        })
    }
}
