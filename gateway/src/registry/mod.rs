//! Backend registry.
//!
//! Resolves a backend key to its connection info and its descriptor:
//! - liveness comes from the status document, re-read on every call
//! - folders and descriptors are looked up once per key, misses included, and
//!   cached until `invalidate`

mod descriptor;
mod status;

pub use descriptor::parse_descriptor;
pub use status::{BackendRecord, BackendStatus, StatusDocument};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use model_gateway_common::Descriptor;
use tokio::sync::RwLock;

use crate::config::RegistryConfig;
use crate::error::{GatewayError, Result};

/// Descriptor of one backend, plus where it lives on disk.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Actual folder name under the models root.
    pub folder_name: String,
    pub dir: PathBuf,
    pub descriptor: Descriptor,
}

/// Fold a key or folder name for case/punctuation-insensitive matching.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace(['-', '.'], "_")
}

/// Registry of backends known to the gateway.
#[derive(Debug)]
pub struct BackendRegistry {
    config: RegistryConfig,
    folders: RwLock<HashMap<String, Option<PathBuf>>>,
    configs: RwLock<HashMap<String, Option<Arc<BackendConfig>>>>,
}

impl BackendRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            folders: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Read the status document.
    ///
    /// An absent, unreadable or malformed document is an empty registry.
    pub async fn load_status(&self) -> StatusDocument {
        let path = &self.config.status_file;
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Status document {} not found", path.display());
                return StatusDocument::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read status document {}: {}", path.display(), e);
                return StatusDocument::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!("Malformed status document {}: {}", path.display(), e);
            StatusDocument::default()
        })
    }

    /// Resolve a backend by key from a fresh read of the status document.
    pub async fn resolve(&self, key: &str) -> Result<BackendRecord> {
        self.load_status()
            .await
            .record(key)
            .ok_or_else(|| GatewayError::model_not_found(key))
    }

    /// All registered backends.
    pub async fn records(&self) -> Vec<BackendRecord> {
        self.load_status().await.records()
    }

    /// Locate the folder of a backend under the models root.
    pub async fn folder(&self, key: &str) -> Option<PathBuf> {
        let normalized = normalize_key(key);
        if let Some(dir) = self.folders.read().await.get(&normalized) {
            return dir.clone();
        }

        let dir = self.scan_for_folder(&normalized).await;
        self.folders.write().await.insert(normalized, dir.clone());
        dir
    }

    async fn scan_for_folder(&self, normalized: &str) -> Option<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.config.models_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(
                    "Cannot scan models dir {}: {}",
                    self.config.models_dir.display(),
                    e
                );
                return None;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && normalize_key(&entry.file_name().to_string_lossy()) == normalized {
                return Some(entry.path());
            }
        }
        None
    }

    /// Descriptor of a backend, if one can be found and parsed.
    ///
    /// Invalid descriptors are logged once and treated as absent.
    pub async fn config(&self, key: &str) -> Option<Arc<BackendConfig>> {
        let normalized = normalize_key(key);
        if let Some(config) = self.configs.read().await.get(&normalized) {
            return config.clone();
        }

        let config = self.load_config(key).await.map(Arc::new);
        self.configs.write().await.insert(normalized, config.clone());
        config
    }

    async fn load_config(&self, key: &str) -> Option<BackendConfig> {
        let dir = self.folder(key).await?;
        let path = dir.join(&self.config.descriptor);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("No descriptor for {} at {}: {}", key, path.display(), e);
                return None;
            }
        };

        let descriptor = match parse_descriptor(&text) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::error!("Error loading config for {} from {}: {}", key, path.display(), e);
                return None;
            }
        };

        Some(BackendConfig {
            folder_name: dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| key.to_string()),
            dir,
            descriptor,
        })
    }

    /// Drop cached folders and descriptors.
    pub async fn invalidate(&self) {
        self.folders.write().await.clear();
        self.configs.write().await.clear();
    }
}
