//! Lifecycle supervisor
//!
//! Owns the handles of launched batches until they exit or are stopped.
//! Stopping is always best effort: SIGTERM to the process group, a bounded
//! wait, then SIGKILL. Results are aggregated into a [`StopReport`].

mod report;
mod signal;
mod stop;

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use futures::future::join_all;

use crate::config::SupervisorConfig;
use crate::launcher::ProcessHandle;
use crate::orchestrator::Batch;

pub use report::{aggregate_stop_results, StopRecord, StopReport};
pub use signal::{ShutdownSignal, ShutdownSignals};
pub use stop::{stop, stop_all, StopOutcome};

/// Exit of one supervised process
#[derive(Debug)]
pub struct ExitRecord {
    /// Slot index
    pub slot: usize,
    /// Process id
    pub pid: u32,
    /// Log file of the process
    pub log_path: PathBuf,
    /// Exit status, or the error that prevented reaping
    pub status: io::Result<ExitStatus>,
}

impl ExitRecord {
    /// Whether the process exited successfully
    pub fn success(&self) -> bool {
        self.status.as_ref().is_ok_and(|s| s.success())
    }
}

/// How supervision of the owned handles ended
#[derive(Debug)]
pub enum Supervision {
    /// Every process exited on its own
    Completed(Vec<ExitRecord>),
    /// A termination signal arrived and everything was stopped
    Interrupted {
        /// The signal received
        signal: ShutdownSignal,
        /// Result of stopping the remaining processes
        report: StopReport,
    },
}

/// Owner of running benchmark processes
#[derive(Debug)]
pub struct Supervisor {
    handles: Vec<ProcessHandle>,
    stop_grace: Duration,
}

impl Supervisor {
    /// Supervisor with the given stop grace period
    pub fn new(stop_grace: Duration) -> Self {
        Self {
            handles: Vec::new(),
            stop_grace,
        }
    }

    /// Supervisor configured from `[supervisor]`
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(config.stop_grace())
    }

    /// Take ownership of a launched batch
    pub fn adopt(&mut self, batch: Batch) {
        self.handles.extend(batch.into_handles());
    }

    /// Owned handles
    pub fn handles(&self) -> &[ProcessHandle] {
        &self.handles
    }

    /// Number of owned handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is owned
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every owned process and release the handles
    pub async fn stop_all(&mut self) -> StopReport {
        let report = stop_all(&mut self.handles, self.stop_grace).await;
        self.handles.clear();
        report
    }

    /// Wait for every owned process to exit on its own
    ///
    /// Handles are only released once all of them have exited, so dropping
    /// this future part way leaves every handle stoppable.
    pub async fn wait_all(&mut self) -> Vec<ExitRecord> {
        let records = join_all(self.handles.iter_mut().map(|handle| async move {
            let status = handle.wait().await;
            ExitRecord {
                slot: handle.slot(),
                pid: handle.pid(),
                log_path: handle.log_path().to_path_buf(),
                status,
            }
        }))
        .await;

        for record in &records {
            match &record.status {
                Ok(status) if status.success() => {
                    tracing::info!(slot = record.slot, pid = record.pid, %status, "Benchmark exited")
                }
                Ok(status) => tracing::warn!(
                    slot = record.slot,
                    pid = record.pid,
                    %status,
                    log_path = %record.log_path.display(),
                    "Benchmark exited with failure"
                ),
                Err(err) => tracing::error!(
                    slot = record.slot,
                    pid = record.pid,
                    error = %err,
                    "Failed to wait for benchmark"
                ),
            }
        }

        self.handles.clear();
        records
    }

    /// Wait for the owned processes, stopping all of them on SIGINT/SIGTERM
    pub async fn supervise(&mut self, signals: &mut ShutdownSignals) -> Supervision {
        let signal = {
            let waiting = self.wait_all();
            tokio::pin!(waiting);
            tokio::select! {
                records = &mut waiting => return Supervision::Completed(records),
                signal = signals.recv() => signal,
            }
        };

        tracing::info!(%signal, running = self.len(), "Received termination signal, stopping all processes");
        let report = self.stop_all().await;
        Supervision::Interrupted { signal, report }
    }

    /// Give up ownership without stopping anything
    ///
    /// The processes keep running in their own process groups.
    pub fn release(&mut self) -> Vec<ProcessHandle> {
        std::mem::take(&mut self.handles)
    }
}
