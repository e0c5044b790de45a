//! Configuration for the model gateway.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest inbound body accepted on proxy routes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Where backend state and descriptors live on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Status document written by the external orchestrator.
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    /// Root directory holding one folder per backend.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Descriptor location relative to a backend folder.
    #[serde(default = "default_descriptor")]
    pub descriptor: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            models_dir: default_models_dir(),
            descriptor: default_descriptor(),
        }
    }
}

/// How backends are reached.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    /// Host every backend port is bound on.
    #[serde(default = "default_backend_host")]
    pub host: String,
    #[serde(default = "default_proxy_timeout")]
    pub proxy_timeout_secs: u64,
    /// Timeout for route-manifest fetches and health probes.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Route-manifest path exposed by every backend.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
}

impl BackendsConfig {
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Base URL of the backend listening on `port`.
    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{}", self.host, port)
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            proxy_timeout_secs: default_proxy_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            manifest_path: default_manifest_path(),
        }
    }
}

/// External discovery process re-run by `POST /refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            command: default_refresh_command(),
            args: vec![],
            working_dir: default_working_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8092
}
fn default_max_body_bytes() -> usize {
    100 * 1024 * 1024
}
fn default_status_file() -> PathBuf {
    PathBuf::from("model_status.json")
}
fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_descriptor() -> PathBuf {
    PathBuf::from("utils/config.toml")
}
fn default_backend_host() -> String {
    "localhost".to_string()
}
fn default_proxy_timeout() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    10
}
fn default_manifest_path() -> String {
    "/openapi.json".to_string()
}
fn default_refresh_command() -> String {
    "./run_models.sh".to_string()
}
fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (GATEWAY__SECTION__KEY format)
    /// 2. gateway.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("gateway").required(false))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("refresh.args")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
