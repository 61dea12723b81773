//! Error types for fleet-bench-core

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors
///
/// Always raised before any process of a batch is launched, so there is
/// never anything to clean up when one is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Hostname is in neither the target nor the initiator list
    #[error("unexpected hostname `{hostname}`: not listed as a target or initiator host")]
    UnknownHost {
        /// The hostname that was looked up
        hostname: String,
    },

    /// Hostname appears in both host lists
    #[error("host `{0}` is listed as both a target and an initiator")]
    AmbiguousHost(String),

    /// Accelerator and device lists differ in length
    #[error(
        "number of accelerators ({accelerators}) does not match number of devices ({devices})"
    )]
    TopologyMismatch {
        /// Number of accelerator ids
        accelerators: usize,
        /// Number of device names
        devices: usize,
    },

    /// Port list does not cover every slot
    #[error("number of ports ({ports}) does not match number of slots ({slots})")]
    PortCountMismatch {
        /// Number of ports
        ports: usize,
        /// Number of topology slots
        slots: usize,
    },

    /// A topology list is empty
    #[error("topology has no {0}")]
    EmptyTopology(&'static str),

    /// A required field was never set
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field holds a value outside its domain
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name, as it appears in the config file
        field: &'static str,
        /// Human readable reason
        reason: String,
    },

    /// Two slots of one batch would write to the same log file
    #[error("slots {first} and {second} would both log to {}", path.display())]
    DuplicateLogPath {
        /// Slot that claimed the path first
        first: usize,
        /// Slot that collided with it
        second: usize,
        /// The shared path
        path: PathBuf,
    },

    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for [`crate::FleetConfig`]
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure to start one benchmark instance
///
/// Triggers rollback of the whole batch before it reaches the caller.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The log file (or its directory) could not be created or written
    #[error("slot {slot}: failed to prepare log file {}: {source}", path.display())]
    LogFile {
        /// Slot index within the batch
        slot: usize,
        /// Log file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The benchmark executable could not be spawned
    #[error("slot {slot}: failed to start `{program}` on {device}: {source}")]
    Spawn {
        /// Slot index within the batch
        slot: usize,
        /// Executable that failed to start
        program: String,
        /// Network device of the slot
        device: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Slot whose launch failed
    pub fn slot(&self) -> usize {
        match self {
            Self::LogFile { slot, .. } | Self::Spawn { slot, .. } => *slot,
        }
    }
}

/// Failure to stop one process
///
/// Stop is best effort: these are logged and aggregated, never propagated.
#[derive(Error, Debug)]
pub enum StopError {
    /// Querying the exit status failed
    #[error("slot {slot} (pid {pid}): failed to query process status: {source}")]
    Status {
        /// Slot index
        slot: usize,
        /// Process id
        pid: u32,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Delivering a signal to the process group failed
    #[error("slot {slot} (pid {pid}): failed to send {signal}: {source}")]
    Signal {
        /// Slot index
        slot: usize,
        /// Process id
        pid: u32,
        /// Signal name
        signal: &'static str,
        /// OS error from `killpg`
        #[source]
        source: io::Error,
    },

    /// Reaping the process failed
    #[error("slot {slot} (pid {pid}): failed to wait for exit: {source}")]
    Wait {
        /// Slot index
        slot: usize,
        /// Process id
        pid: u32,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Process was still not reaped after SIGKILL
    #[error("slot {slot} (pid {pid}): still running after SIGKILL")]
    Unreaped {
        /// Slot index
        slot: usize,
        /// Process id
        pid: u32,
    },
}

/// Top-level error type for batch orchestration
#[derive(Error, Debug)]
pub enum FleetError {
    /// Invalid configuration; nothing was launched
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A launch failed; the batch has already been rolled back
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),
}

impl FleetError {
    /// Whether this error was raised before any process was launched
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias
pub type FleetResult<T> = std::result::Result<T, FleetError>;
