//! Builder pattern for FleetOrchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::FleetConfig;
use crate::error::ConfigError;
use crate::launcher::{LogFileLauncher, ProcessLauncher};
use crate::role::local_hostname;

use super::executor::FleetOrchestrator;

/// Builder for creating a FleetOrchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .config(FleetConfig::load("fleet.toml")?)
///     .local_host("H20-GPU-02")
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: FleetConfig,
    launcher: Option<Arc<dyn ProcessLauncher>>,
    local_host: Option<String>,
    rollback_grace: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: FleetConfig::default(),
            launcher: None,
            local_host: None,
            rollback_grace: None,
        }
    }

    /// Set the fleet configuration
    pub fn config(mut self, config: FleetConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the launcher (defaults to a [`LogFileLauncher`] for the config)
    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Set the local host name (defaults to the OS hostname)
    pub fn local_host(mut self, host: impl Into<String>) -> Self {
        self.local_host = Some(host.into());
        self
    }

    /// Override `[supervisor].rollback_grace_ms`
    pub fn rollback_grace(mut self, grace: Duration) -> Self {
        self.rollback_grace = Some(grace);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails. Topology is
    /// checked per batch, not here.
    pub fn build(self) -> Result<FleetOrchestrator, ConfigError> {
        self.config.validate()?;

        let launcher = self
            .launcher
            .unwrap_or_else(|| Arc::new(LogFileLauncher::from_config(&self.config)));
        let local_host = self.local_host.unwrap_or_else(local_hostname);
        let rollback_grace = self
            .rollback_grace
            .unwrap_or_else(|| self.config.supervisor.rollback_grace());

        Ok(FleetOrchestrator::new(
            self.config,
            launcher,
            local_host,
            rollback_grace,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
