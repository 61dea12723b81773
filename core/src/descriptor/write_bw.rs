//! Write-bandwidth (`ib_write_bw`) descriptor

use crate::config::WriteBwConfig;
use crate::error::ConfigError;

/// Parameters of one `ib_write_bw` process
///
/// The server side runs without `server_address`; the client passes the
/// server as the trailing positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBwDescriptor {
    /// RDMA device (`-d`)
    pub device_name: String,
    /// Port (`-p`)
    pub port: u16,
    /// Message size in bytes (`-s`)
    pub message_size: u64,
    /// Iterations (`-n`)
    pub iterations: u64,
    /// Duration in seconds (`-D`)
    pub duration_secs: u64,
    /// Retry count (`-x`)
    pub retry_count: u32,
    /// CUDA device (`--use_cuda`)
    pub accelerator_id: Option<u32>,
    /// Server to connect to (client side only)
    pub server_address: Option<String>,
    /// Extra arguments, appended verbatim
    pub extra_args: Vec<String>,
}

impl WriteBwDescriptor {
    /// Server-side descriptor with default benchmark parameters
    pub fn for_device(device_name: impl Into<String>, port: u16) -> Self {
        Self::from_config(device_name, port, &WriteBwConfig::default())
    }

    /// Server-side descriptor with parameters from config
    pub fn from_config(device_name: impl Into<String>, port: u16, config: &WriteBwConfig) -> Self {
        Self {
            device_name: device_name.into(),
            port,
            message_size: config.message_size,
            iterations: config.iterations,
            duration_secs: config.duration_secs,
            retry_count: config.retry_count,
            accelerator_id: None,
            server_address: None,
            extra_args: config.extra_args.clone(),
        }
    }

    /// Check required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::invalid("write_bw.device", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("write_bw.ports", "port must be non-zero"));
        }
        if self.message_size == 0 || self.iterations == 0 || self.duration_secs == 0 {
            return Err(ConfigError::invalid(
                "write_bw",
                "message size, iterations and duration must be positive",
            ));
        }
        if matches!(&self.server_address, Some(addr) if addr.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "write_bw.server_address",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Render command-line arguments
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            self.device_name.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-s".to_string(),
            self.message_size.to_string(),
            "-n".to_string(),
            self.iterations.to_string(),
            "--report_gbits".to_string(),
            "-F".to_string(),
            "-D".to_string(),
            self.duration_secs.to_string(),
            "-x".to_string(),
            self.retry_count.to_string(),
        ];

        if let Some(id) = self.accelerator_id {
            args.push(format!("--use_cuda={id}"));
        }
        if let Some(server) = &self.server_address {
            args.push(server.clone());
        }
        args.extend(self.extra_args.iter().cloned());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_args() {
        let d = WriteBwDescriptor::for_device("mlx5_3", 6667);
        assert_eq!(
            d.args().join(" "),
            "-d mlx5_3 -p 6667 -s 65536 -n 1000 --report_gbits -F -D 10 -x 3"
        );
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_client_args_with_cuda() {
        let d = WriteBwDescriptor {
            accelerator_id: Some(1),
            server_address: Some("10.6.131.2".into()),
            extra_args: vec!["-q".into(), "2".into()],
            ..WriteBwDescriptor::for_device("mlx5_2", 6668)
        };
        let args = d.args();
        let tail: Vec<&str> = args[args.len() - 4..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["--use_cuda=1", "10.6.131.2", "-q", "2"]);
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let d = WriteBwDescriptor::for_device("mlx5_0", 0);
        assert!(d.validate().is_err());
    }
}
