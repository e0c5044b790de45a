//! Status document written by the external orchestrator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Liveness reported for a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Success,
    Failed,
    #[default]
    Unknown,
}

impl BackendStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `{"models": {<key>: {"status": ..., "port": ...}}}`
///
/// Entries are kept as raw JSON so one malformed entry only degrades its own backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusDocument {
    #[serde(default)]
    pub models: BTreeMap<String, Value>,
}

impl StatusDocument {
    pub fn record(&self, key: &str) -> Option<BackendRecord> {
        self.models
            .get(key)
            .map(|entry| BackendRecord::from_entry(key, entry))
    }

    pub fn records(&self) -> Vec<BackendRecord> {
        self.models
            .iter()
            .map(|(key, entry)| BackendRecord::from_entry(key, entry))
            .collect()
    }
}

/// Connection info for one registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRecord {
    pub key: String,
    pub status: BackendStatus,
    pub port: Option<u16>,
}

impl BackendRecord {
    /// Non-string or unknown status is `Unknown`; a port that is not an
    /// integer in 1..=65535 is absent.
    fn from_entry(key: &str, entry: &Value) -> Self {
        Self {
            key: key.to_string(),
            status: entry
                .get("status")
                .and_then(Value::as_str)
                .map(BackendStatus::from_wire)
                .unwrap_or_default(),
            port: entry
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p > 0),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == BackendStatus::Success && self.port.is_some()
    }

    /// Port of a running backend, or why it cannot be reached.
    pub fn live_port(&self) -> Result<u16, GatewayError> {
        if self.status != BackendStatus::Success {
            return Err(GatewayError::Unavailable(format!(
                "Model {} is not running",
                self.key
            )));
        }
        self.port.ok_or_else(|| {
            GatewayError::Unavailable(format!("Model {} has no port assigned", self.key))
        })
    }
}
