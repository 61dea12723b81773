//! Fleet orchestrator
//!
//! Builds every descriptor of a batch, then launches them one at a time in
//! slot order. A batch is all or nothing: if any launch fails, every process
//! already started is stopped before the error is returned.
//!
//! # Example
//!
//! ```ignore
//! use fleet_bench_core::{FleetConfig, OrchestratorBuilder, Role, Supervisor};
//!
//! let config = FleetConfig::load("fleet.toml")?;
//! let orchestrator = OrchestratorBuilder::new().config(config).build()?;
//!
//! let batch = orchestrator.run_transfer_batch(Role::Target, 4 * 1024 * 1024, 100).await?;
//! let mut supervisor = Supervisor::new(Duration::from_secs(5));
//! supervisor.adopt(batch);
//! ```

mod builder;
mod executor;

use std::path::Path;

use crate::launcher::{BatchStamp, ProcessHandle};

pub use builder::OrchestratorBuilder;
pub use executor::FleetOrchestrator;

/// Handles of one fully launched batch, in slot order
#[derive(Debug)]
pub struct Batch {
    stamp: BatchStamp,
    handles: Vec<ProcessHandle>,
}

impl Batch {
    pub(crate) fn new(stamp: BatchStamp, handles: Vec<ProcessHandle>) -> Self {
        Self { stamp, handles }
    }

    /// Timestamp shared by the batch's log files
    pub fn stamp(&self) -> &BatchStamp {
        &self.stamp
    }

    /// Handles in slot order
    pub fn handles(&self) -> &[ProcessHandle] {
        &self.handles
    }

    /// Number of processes
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Log files in slot order
    pub fn log_paths(&self) -> impl Iterator<Item = &Path> {
        self.handles.iter().map(|h| h.log_path())
    }

    /// Take the handles
    pub fn into_handles(self) -> Vec<ProcessHandle> {
        self.handles
    }
}
