//! Fixtures shared by unit and integration tests.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{BackendsConfig, Config, RegistryConfig};
use crate::refresh::{RefreshError, RefreshOutput, Refresher};
use crate::state::AppState;

/// Config whose status document and models root live under `root`.
pub fn test_config(root: &Path) -> Config {
    Config {
        registry: RegistryConfig {
            status_file: root.join("model_status.json"),
            models_dir: root.join("models"),
            ..RegistryConfig::default()
        },
        backends: BackendsConfig {
            host: "127.0.0.1".to_string(),
            ..BackendsConfig::default()
        },
        ..Config::default()
    }
}

/// Write `{"models": models}` as the status document under `root`.
pub fn write_status(root: &Path, models: Value) -> io::Result<()> {
    fs::write(
        root.join("model_status.json"),
        json!({ "models": models }).to_string(),
    )
}

/// Write a file at `models/<folder>/<relative>` under `root`.
pub fn write_model_file(
    root: &Path,
    folder: &str,
    relative: &str,
    contents: impl AsRef<[u8]>,
) -> io::Result<()> {
    let path = root.join("models").join(folder).join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Refresher that returns canned output, or fails to launch.
pub struct CannedRefresher {
    pub output: Option<RefreshOutput>,
}

#[async_trait]
impl Refresher for CannedRefresher {
    async fn refresh(&self) -> Result<RefreshOutput, RefreshError> {
        self.output.clone().ok_or_else(|| RefreshError::Launch {
            command: "refresh".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        })
    }
}

/// State over `root` with a canned refresher.
pub fn create_test_state(root: &Path, refresh: Option<RefreshOutput>) -> Arc<AppState> {
    create_state_with_config(test_config(root), refresh)
}

/// State over an explicit config with a canned refresher.
pub fn create_state_with_config(config: Config, refresh: Option<RefreshOutput>) -> Arc<AppState> {
    let refresher = Arc::new(CannedRefresher { output: refresh });
    match AppState::with_refresher(config, refresher) {
        Ok(state) => Arc::new(state),
        Err(e) => panic!("failed to build test state: {}", e),
    }
}
