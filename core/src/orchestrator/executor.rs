//! Orchestrator execution logic

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::FleetConfig;
use crate::descriptor::{build_transfer_batch, build_write_bw_batch, InstanceDescriptor};
use crate::error::{ConfigError, FleetResult};
use crate::launcher::{BatchStamp, CommandLine, ProcessLauncher};
use crate::role::Role;
use crate::supervisor::stop_all;

use super::Batch;

/// Launches batches of benchmark instances on the local host
///
/// Use [`super::OrchestratorBuilder`] to construct one.
pub struct FleetOrchestrator {
    /// Fleet configuration
    pub(crate) config: FleetConfig,

    /// Process launcher
    pub(crate) launcher: Arc<dyn ProcessLauncher>,

    /// Name this host advertises to its peers
    pub(crate) local_host: String,

    /// Grace period when rolling back a failed batch
    pub(crate) rollback_grace: Duration,

    /// Batches launched so far; numbers each batch's stamp
    batches: AtomicU32,
}

impl FleetOrchestrator {
    /// Create an orchestrator
    pub fn new(
        config: FleetConfig,
        launcher: Arc<dyn ProcessLauncher>,
        local_host: impl Into<String>,
        rollback_grace: Duration,
    ) -> Self {
        Self {
            config,
            launcher,
            local_host: local_host.into(),
            rollback_grace,
            batches: AtomicU32::new(0),
        }
    }

    /// The fleet configuration
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Local host name
    pub fn local_host(&self) -> &str {
        &self.local_host
    }

    /// The launcher in use
    pub fn launcher(&self) -> &dyn ProcessLauncher {
        self.launcher.as_ref()
    }

    /// Descriptors of a transfer-engine batch, without launching anything
    pub fn plan_transfer_batch(
        &self,
        role: Role,
        block_size: u64,
        batch_size: u64,
    ) -> Result<Vec<InstanceDescriptor>, ConfigError> {
        build_transfer_batch(&self.config, &self.local_host, role, block_size, batch_size)
    }

    /// Descriptors of a write-bandwidth batch, without launching anything
    pub fn plan_write_bw_batch(&self, role: Role) -> Result<Vec<InstanceDescriptor>, ConfigError> {
        build_write_bw_batch(&self.config, role)
    }

    /// Command lines a set of descriptors renders to, in slot order
    pub fn render(&self, descriptors: &[InstanceDescriptor]) -> Vec<CommandLine> {
        descriptors.iter().map(|d| self.launcher.command(d)).collect()
    }

    /// Launch one transfer-engine instance per topology slot
    pub async fn run_transfer_batch(
        &self,
        role: Role,
        block_size: u64,
        batch_size: u64,
    ) -> FleetResult<Batch> {
        let descriptors = self.plan_transfer_batch(role, block_size, batch_size)?;
        tracing::info!(
            role = %role,
            block_size,
            batch_size,
            instances = descriptors.len(),
            "Starting transfer-engine batch"
        );
        self.launch_all(descriptors).await
    }

    /// Launch the write-bandwidth fleet for a role
    pub async fn run_write_bw_batch(&self, role: Role) -> FleetResult<Batch> {
        let descriptors = self.plan_write_bw_batch(role)?;
        tracing::info!(
            role = %role,
            instances = descriptors.len(),
            use_accelerator = self.config.write_bw.use_accelerator,
            "Starting write-bandwidth batch"
        );
        self.launch_all(descriptors).await
    }

    /// Launch descriptors in slot order, rolling back on the first failure
    ///
    /// On error, every process this call started has been stopped and reaped.
    /// Each call numbers its stamp, so batches of one run never share logs.
    pub async fn launch_all(&self, descriptors: Vec<InstanceDescriptor>) -> FleetResult<Batch> {
        let seq = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        let stamp = BatchStamp::now().numbered(seq);
        self.check_log_paths(&descriptors, &stamp)?;

        let mut handles = Vec::with_capacity(descriptors.len());
        for (slot, descriptor) in descriptors.into_iter().enumerate() {
            match self.launcher.launch(slot, descriptor, &stamp) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::error!(
                        slot,
                        error = %err,
                        started = handles.len(),
                        "Launch failed, rolling back batch"
                    );
                    let report = stop_all(&mut handles, self.rollback_grace).await;
                    if !report.all_stopped() {
                        tracing::error!(
                            failures = report.failures.len(),
                            "Rollback could not confirm every process stopped"
                        );
                    }
                    return Err(err.into());
                }
            }
        }

        tracing::info!(
            instances = handles.len(),
            stamp = %stamp,
            launcher = self.launcher.name(),
            "Batch launched"
        );
        Ok(Batch::new(stamp, handles))
    }

    /// Reject batches where two slots would share a log file
    fn check_log_paths(
        &self,
        descriptors: &[InstanceDescriptor],
        stamp: &BatchStamp,
    ) -> Result<(), ConfigError> {
        let mut seen: HashMap<PathBuf, usize> = HashMap::with_capacity(descriptors.len());
        for (slot, descriptor) in descriptors.iter().enumerate() {
            let path = self.launcher.log_path(slot, descriptor, stamp);
            if let Some(&first) = seen.get(&path) {
                return Err(ConfigError::DuplicateLogPath {
                    first,
                    second: slot,
                    path,
                });
            }
            seen.insert(path, slot);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FleetOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetOrchestrator")
            .field("local_host", &self.local_host)
            .field("launcher", &self.launcher.name())
            .field("rollback_grace", &self.rollback_grace)
            .field("batches", &self.batches.load(Ordering::Relaxed))
            .finish()
    }
}
