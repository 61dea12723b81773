//! fleet-bench-core: launching and supervising fleets of RDMA benchmarks
//!
//! One host of a two-host pair runs this to start a fleet of benchmark
//! processes, one per (accelerator, network device, port) slot:
//!
//! - Role resolution from the local hostname
//! - Topology table and per-slot instance descriptors
//! - Process launcher with per-instance log files and detached process groups
//! - All-or-nothing batch orchestration
//! - Lifecycle supervision with graceful, then forced, termination

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod launcher;
pub mod orchestrator;
pub mod role;
pub mod supervisor;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{
    FleetConfig, HostsConfig, NetworkConfig, OutputConfig, SupervisorConfig, TopologyConfig,
    TransferEngineConfig, WriteBwConfig,
};
pub use descriptor::{
    BenchmarkKind, InstanceDescriptor, Operation, TransferEngineDescriptor, WriteBwDescriptor,
};
pub use error::*;
pub use launcher::{
    BatchStamp, BenchmarkBinaries, CommandLine, LogFileLauncher, ProcessHandle, ProcessLauncher,
};
pub use orchestrator::{Batch, FleetOrchestrator, OrchestratorBuilder};
pub use role::{local_hostname, Role, RoleResolver};
pub use supervisor::{
    ShutdownSignal, ShutdownSignals, StopOutcome, StopReport, Supervision, Supervisor,
};
pub use topology::{Slot, TopologyTable};
