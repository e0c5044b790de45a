//! Re-running the external discovery process.
//!
//! The process rewrites the status document; nothing here touches in-memory
//! caches, the next registry lookup simply reads the new document.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::config::RefreshConfig;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Failed to run {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of one refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutput {
    pub output: String,
    pub errors: String,
}

/// Anything able to re-run backend discovery.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshOutput, RefreshError>;
}

/// Runs the configured script and waits for it to exit.
pub struct ScriptRefresher {
    config: RefreshConfig,
}

impl ScriptRefresher {
    pub fn new(config: RefreshConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Refresher for ScriptRefresher {
    async fn refresh(&self) -> Result<RefreshOutput, RefreshError> {
        tracing::info!("Running refresh command {}", self.config.command);

        let output = Command::new(&self.config.command)
            .args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RefreshError::Launch {
                command: self.config.command.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::warn!(
                "Refresh command {} exited with {}",
                self.config.command,
                output.status
            );
        }

        Ok(RefreshOutput {
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            errors: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
