//! Endpoint discovery.
//!
//! Fetches each backend's route manifest once and caches the declared routes.
//! Backends do not change their routes while running, so a successful fetch
//! is kept until the cache is explicitly cleared.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::BackendsConfig;

/// One route declared by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub method: String,
    pub summary: String,
    pub description: String,
}

impl EndpointDescriptor {
    fn fallback(path: &str, method: &str, summary: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            summary: summary.to_string(),
            description: description.to_string(),
        }
    }
}

/// Conventional routes assumed when a backend publishes no manifest.
pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::fallback("/", "GET", "Web Interface", "Model web interface"),
        EndpointDescriptor::fallback("/style-css", "GET", "CSS Styles", "Stylesheet for web interface"),
        EndpointDescriptor::fallback("/main-js", "GET", "JavaScript", "JavaScript for web interface"),
        EndpointDescriptor::fallback("/config", "GET", "Model Config", "Get model configuration"),
        EndpointDescriptor::fallback("/infer/", "POST", "Single Inference", "Run single prediction"),
        EndpointDescriptor::fallback("/infer-csv/", "POST", "Batch Inference", "Run batch predictions from CSV"),
        EndpointDescriptor::fallback("/docs", "GET", "API Documentation", "Auto-generated API docs"),
    ]
}

/// Flatten a `{"paths": {<path>: {<method>: {...}}}}` manifest.
///
/// Entries that are not method objects (e.g. shared `parameters`) are skipped.
pub fn parse_manifest(manifest: &Value) -> Vec<EndpointDescriptor> {
    let Some(paths) = manifest.get("paths").and_then(Value::as_object) else {
        return vec![];
    };

    let text = |details: &Value, key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    paths
        .iter()
        .filter_map(|(path, methods)| Some((path, methods.as_object()?)))
        .flat_map(|(path, methods)| {
            methods
                .iter()
                .filter(|(_, details)| details.is_object())
                .map(move |(method, details)| EndpointDescriptor {
                    path: path.clone(),
                    method: method.to_uppercase(),
                    summary: text(details, "summary"),
                    description: text(details, "description"),
                })
        })
        .collect()
}

/// Per-backend cache of discovered routes.
pub struct EndpointDiscovery {
    http_client: Client,
    backends: BackendsConfig,
    cache: RwLock<HashMap<String, Arc<Vec<EndpointDescriptor>>>>,
}

impl EndpointDiscovery {
    pub fn new(backends: BackendsConfig) -> reqwest::Result<Self> {
        Ok(Self {
            http_client: Client::builder().timeout(backends.probe_timeout()).build()?,
            backends,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Routes declared by the backend `key` listening on `port`.
    ///
    /// Any failure yields an empty list, meaning no rewriting metadata.
    pub async fn discover(&self, key: &str, port: u16) -> Arc<Vec<EndpointDescriptor>> {
        if let Some(cached) = self.cache.read().await.get(key) {
            return cached.clone();
        }

        match self.fetch(port).await {
            Ok(endpoints) => {
                tracing::debug!("Discovered {} endpoints for {}", endpoints.len(), key);
                let endpoints = Arc::new(endpoints);
                self.cache
                    .write()
                    .await
                    .insert(key.to_string(), endpoints.clone());
                endpoints
            }
            Err(reason) => {
                tracing::warn!("Error getting endpoints for {}: {}", key, reason);
                Arc::new(vec![])
            }
        }
    }

    async fn fetch(&self, port: u16) -> std::result::Result<Vec<EndpointDescriptor>, String> {
        let url = format!(
            "{}{}",
            self.backends.base_url(port),
            self.backends.manifest_path
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status() != StatusCode::OK {
            return Err(format!("manifest returned HTTP {}", response.status()));
        }

        let manifest: Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(parse_manifest(&manifest))
    }

    /// Cached routes for `key`, without fetching.
    pub async fn cached(&self, key: &str) -> Option<Arc<Vec<EndpointDescriptor>>> {
        self.cache.read().await.get(key).cloned()
    }

    /// Forget discovered routes of one backend, or of all when `key` is `None`.
    pub async fn invalidate(&self, key: Option<&str>) {
        let mut cache = self.cache.write().await;
        match key {
            Some(key) => {
                cache.remove(key);
            }
            None => cache.clear(),
        }
    }
}
