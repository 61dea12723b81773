//! Fleet configuration
//!
//! Everything a run needs (host lists, topology, benchmark parameters,
//! supervisor timings) lives in one immutable [`FleetConfig`] that is handed
//! to the orchestrator at construction time. It is loaded from TOML; every
//! section is optional and falls back to the stock two-host, eight-GPU lab
//! layout.
//!
//! ```toml
//! [hosts]
//! targets = ["H20-GPU-01"]
//! initiators = ["H20-GPU-02"]
//!
//! [topology]
//! accelerators = [0, 1]
//! devices = ["mlx5_3", "mlx5_2"]
//! ports = [12345, 12346]
//!
//! [transfer_engine]
//! batch_sizes = [100, 1000]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::Operation;
use crate::error::ConfigError;

/// Default port of the metadata (etcd) service
pub const DEFAULT_METADATA_PORT: u16 = 2379;

/// Default transfer-engine block size (4 MiB)
pub const DEFAULT_BLOCK_SIZE: u64 = 512 * 8192;

/// Default transfer-engine buffer size (10 GiB)
pub const DEFAULT_BUFFER_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Which hosts play which role
    pub hosts: HostsConfig,
    /// Addresses of the metadata service and the peer
    pub network: NetworkConfig,
    /// Accelerator / device / port slots
    pub topology: TopologyConfig,
    /// Transfer-engine benchmark parameters
    pub transfer_engine: TransferEngineConfig,
    /// Write-bandwidth benchmark parameters
    pub write_bw: WriteBwConfig,
    /// Stop timings
    pub supervisor: SupervisorConfig,
    /// Where logs go
    pub output: OutputConfig,
}

impl FleetConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override the results directory
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.results_dir = dir.into();
        self
    }

    /// Override the topology
    pub fn with_topology(mut self, topology: TopologyConfig) -> Self {
        self.topology = topology;
        self
    }

    /// `host:port` of the metadata service
    ///
    /// The host defaults to the first target host.
    pub fn meta_server_address(&self) -> Result<String, ConfigError> {
        let host = match &self.network.meta_server {
            Some(host) => host.as_str(),
            None => self.first_target()?,
        };
        Ok(format!("{host}:{}", self.network.metadata_port))
    }

    /// Address of the target host as seen from the initiator
    ///
    /// Defaults to the first target host.
    pub fn remote_address(&self) -> Result<&str, ConfigError> {
        match &self.network.remote_address {
            Some(addr) => Ok(addr),
            None => self.first_target(),
        }
    }

    /// Server address passed to the write-bandwidth client
    pub fn write_bw_server_address(&self) -> Result<&str, ConfigError> {
        match &self.write_bw.server_address {
            Some(addr) => Ok(addr),
            None => self.remote_address(),
        }
    }

    fn first_target(&self) -> Result<&str, ConfigError> {
        self.hosts
            .targets
            .first()
            .map(String::as_str)
            .ok_or(ConfigError::MissingField("hosts.targets"))
    }

    /// Validate the configuration
    ///
    /// Topology shape is checked per batch, since the rules differ between
    /// benchmarks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.targets.is_empty() {
            return Err(ConfigError::MissingField("hosts.targets"));
        }
        if self.hosts.initiators.is_empty() {
            return Err(ConfigError::MissingField("hosts.initiators"));
        }
        if let Some(host) = self
            .hosts
            .targets
            .iter()
            .find(|h| self.hosts.initiators.contains(h))
        {
            return Err(ConfigError::AmbiguousHost(host.clone()));
        }

        require_non_empty("network.meta_server", self.network.meta_server.as_deref())?;
        require_non_empty(
            "network.remote_address",
            self.network.remote_address.as_deref(),
        )?;
        if self.network.metadata_port == 0 {
            return Err(ConfigError::invalid(
                "network.metadata_port",
                "port must be non-zero",
            ));
        }

        let te = &self.transfer_engine;
        if te.binary.trim().is_empty() {
            return Err(ConfigError::MissingField("transfer_engine.binary"));
        }
        require_positive("transfer_engine.block_size", te.block_size)?;
        require_positive("transfer_engine.buffer_size", te.buffer_size)?;
        if te.batch_sizes.is_empty() {
            return Err(ConfigError::MissingField("transfer_engine.batch_sizes"));
        }
        for &batch_size in &te.batch_sizes {
            require_positive("transfer_engine.batch_sizes", batch_size)?;
        }

        let wb = &self.write_bw;
        if wb.binary.trim().is_empty() {
            return Err(ConfigError::MissingField("write_bw.binary"));
        }
        require_non_empty("write_bw.server_address", wb.server_address.as_deref())?;
        require_positive("write_bw.message_size", wb.message_size)?;
        require_positive("write_bw.iterations", wb.iterations)?;
        require_positive("write_bw.duration_secs", wb.duration_secs)?;

        if self.supervisor.stop_grace_ms == 0 {
            return Err(ConfigError::invalid(
                "supervisor.stop_grace_ms",
                "grace period must be at least 1ms",
            ));
        }

        Ok(())
    }
}

fn require_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be positive"));
    }
    Ok(())
}

fn require_non_empty(field: &'static str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::invalid(field, "must not be empty")),
        _ => Ok(()),
    }
}

/// `[hosts]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostsConfig {
    /// Hosts acting as target (server)
    pub targets: Vec<String>,
    /// Hosts acting as initiator (client)
    pub initiators: Vec<String>,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            targets: vec!["H20-GPU-01".into()],
            initiators: vec!["H20-GPU-02".into()],
        }
    }
}

/// `[network]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Host of the metadata service (defaults to the first target)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_server: Option<String>,
    /// Port of the metadata service
    pub metadata_port: u16,
    /// Address initiators use for the target (defaults to the first target)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            meta_server: None,
            metadata_port: DEFAULT_METADATA_PORT,
            remote_address: None,
        }
    }
}

/// `[topology]` section
///
/// Entry `i` of each list belongs to slot `i`. Keep accelerators and
/// devices in matching PCIe locality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyConfig {
    /// Accelerator (GPU) ids
    pub accelerators: Vec<u32>,
    /// RDMA device names
    pub devices: Vec<String>,
    /// Transfer-engine listen ports
    pub ports: Vec<u16>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            accelerators: (0..8).collect(),
            devices: [
                "mlx5_3", "mlx5_2", "mlx5_1", "mlx5_0", "mlx5_5", "mlx5_4", "mlx5_7", "mlx5_6",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ports: (12345..12353).collect(),
        }
    }
}

/// `[transfer_engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferEngineConfig {
    /// Benchmark executable
    pub binary: String,
    /// Read or write
    pub operation: Operation,
    /// Register accelerator memory instead of host memory
    pub use_accelerator: bool,
    /// Bytes per transfer block
    pub block_size: u64,
    /// Batch sizes to sweep, one fleet per entry
    pub batch_sizes: Vec<u64>,
    /// Bytes of registered buffer
    pub buffer_size: u64,
}

impl Default for TransferEngineConfig {
    fn default() -> Self {
        Self {
            binary: "transfer_engine_bench".into(),
            operation: Operation::Write,
            use_accelerator: true,
            block_size: DEFAULT_BLOCK_SIZE,
            batch_sizes: vec![100],
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// `[write_bw]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteBwConfig {
    /// Benchmark executable
    pub binary: String,
    /// Listen ports, reused cyclically when shorter than the device list
    pub ports: Vec<u16>,
    /// Server address for the client side (defaults to `network.remote_address`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    /// Message size in bytes (`-s`)
    pub message_size: u64,
    /// Iteration count (`-n`)
    pub iterations: u64,
    /// Test duration in seconds (`-D`)
    pub duration_secs: u64,
    /// Retry count (`-x`)
    pub retry_count: u32,
    /// Pass `--use_cuda=<id>` for each slot
    pub use_accelerator: bool,
    /// Launch one extra cyclic instance on the client side
    pub client_probe: bool,
    /// Extra arguments appended verbatim
    pub extra_args: Vec<String>,
}

impl Default for WriteBwConfig {
    fn default() -> Self {
        Self {
            binary: "ib_write_bw".into(),
            ports: (6667..6675).collect(),
            server_address: None,
            message_size: 65536,
            iterations: 1000,
            duration_secs: 10,
            retry_count: 3,
            use_accelerator: true,
            client_probe: true,
            extra_args: Vec::new(),
        }
    }
}

/// `[supervisor]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Grace period between SIGTERM and SIGKILL on shutdown
    pub stop_grace_ms: u64,
    /// Grace period used when rolling back a failed batch
    pub rollback_grace_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: 5000,
            rollback_grace_ms: 1000,
        }
    }
}

impl SupervisorConfig {
    /// Shutdown grace period
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Rollback grace period
    pub fn rollback_grace(&self) -> Duration {
        Duration::from_millis(self.rollback_grace_ms)
    }
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving one log per instance
    pub results_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FleetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topology.accelerators.len(), 8);
        assert_eq!(config.topology.devices.len(), 8);
        assert_eq!(config.topology.ports.len(), 8);
        assert_eq!(config.transfer_engine.block_size, 4 * 1024 * 1024);
    }

    #[test]
    fn test_meta_server_defaults_to_first_target() {
        let config = FleetConfig::default();
        assert_eq!(config.meta_server_address().unwrap(), "H20-GPU-01:2379");
        assert_eq!(config.remote_address().unwrap(), "H20-GPU-01");
        assert_eq!(config.write_bw_server_address().unwrap(), "H20-GPU-01");
    }

    #[test]
    fn test_explicit_addresses_win() {
        let mut config = FleetConfig::default();
        config.network.meta_server = Some("etcd-host".into());
        config.network.metadata_port = 2380;
        config.network.remote_address = Some("10.0.0.2".into());
        config.write_bw.server_address = Some("10.6.131.2".into());

        assert_eq!(config.meta_server_address().unwrap(), "etcd-host:2380");
        assert_eq!(config.remote_address().unwrap(), "10.0.0.2");
        assert_eq!(config.write_bw_server_address().unwrap(), "10.6.131.2");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FleetConfig = toml::from_str(
            r#"
            [hosts]
            targets = ["a"]
            initiators = ["b"]

            [transfer_engine]
            operation = "read"
            batch_sizes = [10, 20]
            "#,
        )
        .unwrap();

        assert_eq!(config.hosts.targets, vec!["a"]);
        assert_eq!(config.transfer_engine.operation, Operation::Read);
        assert_eq!(config.transfer_engine.batch_sizes, vec![10, 20]);
        assert_eq!(config.transfer_engine.binary, "transfer_engine_bench");
        assert_eq!(config.topology, TopologyConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_operation_rejected() {
        let result: Result<FleetConfig, _> = toml::from_str(
            r#"
            [transfer_engine]
            operation = "copy"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<FleetConfig, _> = toml::from_str(
            r#"
            [topology]
            gpus = [0, 1]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_overlapping_hosts() {
        let mut config = FleetConfig::default();
        config.hosts.initiators.push("H20-GPU-01".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AmbiguousHost(_))
        ));
    }

    #[test]
    fn test_validation_zero_block_size() {
        let mut config = FleetConfig::default();
        config.transfer_engine.block_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_batch_size() {
        let mut config = FleetConfig::default();
        config.transfer_engine.batch_sizes = vec![100, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_meta_server() {
        let mut config = FleetConfig::default();
        config.network.meta_server = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_missing_targets() {
        let mut config = FleetConfig::default();
        config.hosts.targets.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField("hosts.targets"))
        ));
        assert!(config.meta_server_address().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FleetConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        std::fs::write(
            &path,
            "[supervisor]\nstop_grace_ms = 250\n[output]\nresults_dir = \"/tmp/r\"\n",
        )
        .unwrap();

        let config = FleetConfig::load(&path).unwrap();
        assert_eq!(config.supervisor.stop_grace(), Duration::from_millis(250));
        assert_eq!(config.output.results_dir, PathBuf::from("/tmp/r"));
    }

    #[test]
    fn test_load_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[hosts\n").unwrap();

        let err = FleetConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let example: FleetConfig =
            toml::from_str(include_str!("../../fleet.example.toml")).unwrap();
        assert_eq!(example, FleetConfig::default());
    }
}
