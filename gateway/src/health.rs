//! Liveness probing of backends.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use serde::Serialize;

use crate::config::BackendsConfig;
use crate::error::Result;
use crate::registry::BackendRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Unhealthy,
}

/// Outcome of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Health,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Round trip of the probe, e.g. `"12ms"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthReport {
    fn unhealthy(key: &str, port: Option<u16>, reason: String) -> Self {
        Self {
            status: Health::Unhealthy,
            model: key.to_string(),
            port,
            http_status: None,
            response_time: None,
            reason: Some(reason),
        }
    }
}

pub struct HealthChecker {
    http_client: Client,
    backends: BackendsConfig,
    registry: Arc<BackendRegistry>,
}

impl HealthChecker {
    pub fn new(backends: BackendsConfig, registry: Arc<BackendRegistry>) -> reqwest::Result<Self> {
        Ok(Self {
            http_client: Client::builder().timeout(backends.probe_timeout()).build()?,
            backends,
            registry,
        })
    }

    /// Probe the root of backend `key`.
    ///
    /// Only an unknown key is an error; probe failures are reported as unhealthy.
    pub async fn check(&self, key: &str) -> Result<HealthReport> {
        let record = self.registry.resolve(key).await?;
        let Ok(port) = record.live_port() else {
            return Ok(HealthReport::unhealthy(key, None, "not running".to_string()));
        };

        let url = format!("{}/", self.backends.base_url(port));
        let started = Instant::now();
        let report = match self.http_client.get(&url).send().await {
            Ok(response) => {
                let code = response.status();
                HealthReport {
                    status: if code.as_u16() < 400 {
                        Health::Healthy
                    } else {
                        Health::Unhealthy
                    },
                    model: key.to_string(),
                    port: Some(port),
                    http_status: Some(code.as_u16()),
                    response_time: Some(format!("{}ms", started.elapsed().as_millis())),
                    reason: None,
                }
            }
            Err(e) => {
                tracing::warn!("Health probe of {} on port {} failed: {}", key, port, e);
                HealthReport::unhealthy(key, Some(port), format!("connection failed: {}", e))
            }
        };

        Ok(report)
    }
}
