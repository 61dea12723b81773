//! Handles to running benchmark processes

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Child;

use crate::descriptor::InstanceDescriptor;
use crate::launcher::CommandLine;

/// A started benchmark process
///
/// Keeps the originating descriptor and command for diagnostics. The process
/// leads its own process group, so `pid` is also the group id.
pub struct ProcessHandle {
    slot: usize,
    pid: u32,
    child: Child,
    descriptor: InstanceDescriptor,
    command: CommandLine,
    log_path: PathBuf,
}

impl ProcessHandle {
    /// Wrap a freshly spawned child
    pub fn new(
        slot: usize,
        pid: u32,
        child: Child,
        descriptor: InstanceDescriptor,
        command: CommandLine,
        log_path: PathBuf,
    ) -> Self {
        Self {
            slot,
            pid,
            child,
            descriptor,
            command,
            log_path,
        }
    }

    /// Slot index within the batch
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Process id (and process group id)
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Descriptor the process was started from
    pub fn descriptor(&self) -> &InstanceDescriptor {
        &self.descriptor
    }

    /// Command line the process was started with
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Log file receiving stdout and stderr
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Exit status if the process has exited, without blocking
    pub fn try_status(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Send SIGKILL to the process itself (not its group)
    pub(crate) fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("slot", &self.slot)
            .field("pid", &self.pid)
            .field("device", &self.descriptor.device_name())
            .field("log_path", &self.log_path)
            .finish()
    }
}
