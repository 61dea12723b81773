//! Instance descriptors
//!
//! A descriptor is the immutable parameter set of exactly one benchmark
//! subprocess. Descriptors are built for a whole batch before anything is
//! launched, consumed by the launcher, and hold no runtime state.
//!
//! Two benchmarks are supported:
//!
//! - the RDMA transfer engine ([`TransferEngineDescriptor`]), the primary
//!   fleet with one instance per topology slot
//! - the perftest write-bandwidth tool ([`WriteBwDescriptor`])

mod batch;
mod transfer_engine;
mod write_bw;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use batch::{build_transfer_batch, build_write_bw_batch, write_bw_slot_count};
pub use transfer_engine::{TransferEngineDescriptor, TransferEngineDescriptorBuilder};
pub use write_bw::WriteBwDescriptor;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Initiator reads from the target segment
    Read,
    /// Initiator writes into the target segment
    #[default]
    Write,
}

impl Operation {
    /// Name used on benchmark command lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Operation::Read),
            "write" => Ok(Operation::Write),
            other => Err(ConfigError::invalid(
                "operation",
                format!("`{other}` is not one of `read`, `write`"),
            )),
        }
    }
}

/// Which external benchmark a descriptor drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BenchmarkKind {
    /// RDMA transfer-engine benchmark
    TransferEngine,
    /// perftest `ib_write_bw`
    WriteBandwidth,
}

impl BenchmarkKind {
    /// Prefix of log file names
    pub fn log_prefix(&self) -> &'static str {
        match self {
            BenchmarkKind::TransferEngine => "transfer_engine",
            BenchmarkKind::WriteBandwidth => "ib_write_bw",
        }
    }
}

/// Descriptor of one benchmark instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceDescriptor {
    /// Transfer-engine instance
    TransferEngine(TransferEngineDescriptor),
    /// Write-bandwidth instance
    WriteBandwidth(WriteBwDescriptor),
}

impl InstanceDescriptor {
    /// Benchmark this descriptor drives
    pub fn kind(&self) -> BenchmarkKind {
        match self {
            InstanceDescriptor::TransferEngine(_) => BenchmarkKind::TransferEngine,
            InstanceDescriptor::WriteBandwidth(_) => BenchmarkKind::WriteBandwidth,
        }
    }

    /// RDMA device the instance runs on
    pub fn device_name(&self) -> &str {
        match self {
            InstanceDescriptor::TransferEngine(d) => d.device_name(),
            InstanceDescriptor::WriteBandwidth(d) => &d.device_name,
        }
    }

    /// Accelerator the instance is pinned to, if any
    pub fn accelerator_id(&self) -> Option<u32> {
        match self {
            InstanceDescriptor::TransferEngine(d) => d.accelerator_id(),
            InstanceDescriptor::WriteBandwidth(d) => d.accelerator_id,
        }
    }

    /// Command-line arguments (without the program)
    pub fn args(&self) -> Vec<String> {
        match self {
            InstanceDescriptor::TransferEngine(d) => d.args(),
            InstanceDescriptor::WriteBandwidth(d) => d.args(),
        }
    }

    /// Per-instance part of the log file name: accelerator id, else device
    pub fn discriminator(&self) -> String {
        match self.accelerator_id() {
            Some(id) => format!("gpu{id}"),
            None => self.device_name().to_string(),
        }
    }
}

impl From<TransferEngineDescriptor> for InstanceDescriptor {
    fn from(d: TransferEngineDescriptor) -> Self {
        InstanceDescriptor::TransferEngine(d)
    }
}

impl From<WriteBwDescriptor> for InstanceDescriptor {
    fn from(d: WriteBwDescriptor) -> Self {
        InstanceDescriptor::WriteBandwidth(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_from_str() {
        assert_eq!("read".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("write".parse::<Operation>().unwrap(), Operation::Write);
        assert!("Write".parse::<Operation>().is_err());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Read.to_string(), "read");
        assert_eq!(Operation::default(), Operation::Write);
    }

    #[test]
    fn test_discriminator_prefers_accelerator() {
        let with_gpu: InstanceDescriptor = WriteBwDescriptor {
            device_name: "mlx5_0".into(),
            accelerator_id: Some(3),
            ..WriteBwDescriptor::for_device("mlx5_0", 6667)
        }
        .into();
        assert_eq!(with_gpu.discriminator(), "gpu3");

        let cpu_only: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_0", 6667).into();
        assert_eq!(cpu_only.discriminator(), "mlx5_0");
        assert_eq!(cpu_only.kind(), BenchmarkKind::WriteBandwidth);
    }
}
