//! Process launcher
//!
//! Turns an [`InstanceDescriptor`] into a running subprocess:
//!
//! 1. Render the descriptor into a [`CommandLine`]
//! 2. Create the instance's log file and write the command as its first line
//! 3. Spawn the benchmark in its own process group with stdout and stderr
//!    redirected to the log
//! 4. Hand back a [`ProcessHandle`]
//!
//! The orchestrator only talks to the [`ProcessLauncher`] trait, so tests can
//! wrap the real [`LogFileLauncher`] and inject failures at chosen slots.

mod command;
mod handle;
mod log_file;

use std::fmt;
use std::path::PathBuf;

use crate::descriptor::InstanceDescriptor;
use crate::error::LaunchError;

pub use command::CommandLine;
pub use handle::ProcessHandle;
pub use log_file::{BenchmarkBinaries, LogFileLauncher};

/// Timestamp shared by every log file of one batch
///
/// `%Y%m%d_%H%M%S`, followed by `_b<NN>` once numbered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchStamp(String);

impl BatchStamp {
    /// Stamp for the current local time
    pub fn now() -> Self {
        Self(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Append the batch's sequence number within a run
    pub fn numbered(self, seq: u32) -> Self {
        Self(format!("{}_b{seq:02}", self.0))
    }

    /// Stamp from a fixed string
    pub fn fixed(stamp: impl Into<String>) -> Self {
        Self(stamp.into())
    }

    /// The formatted stamp
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Starts benchmark processes
///
/// Implementations must be cheap to call repeatedly; the orchestrator calls
/// `log_path` for every slot before launching anything.
pub trait ProcessLauncher: Send + Sync {
    /// Launcher identifier, for diagnostics
    fn name(&self) -> &str;

    /// Command line a descriptor renders to
    fn command(&self, descriptor: &InstanceDescriptor) -> CommandLine;

    /// Log file a slot writes to
    fn log_path(&self, slot: usize, descriptor: &InstanceDescriptor, stamp: &BatchStamp)
        -> PathBuf;

    /// Start one process
    ///
    /// Must be called from within a tokio runtime.
    fn launch(
        &self,
        slot: usize,
        descriptor: InstanceDescriptor,
        stamp: &BatchStamp,
    ) -> Result<ProcessHandle, LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_stamp_format() {
        let stamp = BatchStamp::now();
        assert_eq!(stamp.as_str().len(), "20250101_120000".len());
        assert_eq!(stamp.as_str().as_bytes()[8], b'_');
    }

    #[test]
    fn test_fixed_stamp() {
        assert_eq!(BatchStamp::fixed("x").to_string(), "x");
    }
}
