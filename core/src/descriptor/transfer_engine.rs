//! Transfer-engine descriptor and its builder

use crate::descriptor::Operation;
use crate::error::ConfigError;
use crate::role::Role;

/// Parameters of one transfer-engine benchmark process
///
/// Constructed through [`TransferEngineDescriptor::builder`], which enforces
/// the required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEngineDescriptor {
    role: Option<Role>,
    meta_server: String,
    local_address: String,
    device_name: String,
    use_accelerator: bool,
    accelerator_id: Option<u32>,
    operation: Operation,
    block_size: u64,
    batch_size: u64,
    buffer_size: u64,
    segment_id: Option<String>,
}

impl TransferEngineDescriptor {
    /// Start building a descriptor
    pub fn builder() -> TransferEngineDescriptorBuilder {
        TransferEngineDescriptorBuilder::default()
    }

    /// Role flag, `None` for symmetric setups
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// `host:port` of the metadata service
    pub fn meta_server(&self) -> &str {
        &self.meta_server
    }

    /// `host:port` this instance binds
    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    /// RDMA device name
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Whether accelerator memory is registered
    pub fn use_accelerator(&self) -> bool {
        self.use_accelerator
    }

    /// Accelerator id
    pub fn accelerator_id(&self) -> Option<u32> {
        self.accelerator_id
    }

    /// Read or write
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Block size in bytes
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Blocks per batch
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Registered buffer size in bytes
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    /// Remote segment this instance addresses (initiators only)
    pub fn segment_id(&self) -> Option<&str> {
        self.segment_id.as_deref()
    }

    /// Render command-line arguments
    ///
    /// `--mode` is only passed when a role is set, `-gpu_id` only when the
    /// accelerator is used, `--segment_id` only when one is present.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(12);

        if let Some(role) = self.role {
            args.push(format!("--mode={role}"));
        }
        args.push(format!("--metadata_server={}", self.meta_server));
        args.push(format!("--local_server_name={}", self.local_address));
        args.push(format!("--device_name={}", self.device_name));
        args.push(format!("-use_vram={}", self.use_accelerator));
        args.push(format!("-operation={}", self.operation));
        args.push(format!("-block_size={}", self.block_size));
        args.push(format!("-batch_size={}", self.batch_size));
        args.push(format!("-buffer_size={}", self.buffer_size));

        if self.use_accelerator {
            if let Some(id) = self.accelerator_id {
                args.push(format!("-gpu_id={id}"));
            }
        }
        if let Some(segment_id) = &self.segment_id {
            args.push(format!("--segment_id={segment_id}"));
        }

        args
    }
}

/// Builder for [`TransferEngineDescriptor`]
///
/// # Example
/// ```ignore
/// let descriptor = TransferEngineDescriptor::builder()
///     .role(Role::Initiator)
///     .meta_server("H20-GPU-01:2379")
///     .local_address("H20-GPU-02:12345")
///     .device_name("mlx5_3")
///     .accelerator(0)
///     .block_size(4 << 20)
///     .batch_size(100)
///     .buffer_size(10 << 30)
///     .segment_id("H20-GPU-01:12345")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransferEngineDescriptorBuilder {
    role: Option<Role>,
    meta_server: Option<String>,
    local_address: Option<String>,
    device_name: Option<String>,
    use_accelerator: bool,
    accelerator_id: Option<u32>,
    operation: Operation,
    block_size: Option<u64>,
    batch_size: Option<u64>,
    buffer_size: Option<u64>,
    segment_id: Option<String>,
}

impl TransferEngineDescriptorBuilder {
    /// Set the role
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the metadata server `host:port`
    pub fn meta_server(mut self, addr: impl Into<String>) -> Self {
        self.meta_server = Some(addr.into());
        self
    }

    /// Set the local bind `host:port`
    pub fn local_address(mut self, addr: impl Into<String>) -> Self {
        self.local_address = Some(addr.into());
        self
    }

    /// Set the RDMA device
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Record the slot's accelerator id
    pub fn accelerator_id(mut self, id: u32) -> Self {
        self.accelerator_id = Some(id);
        self
    }

    /// Toggle accelerator memory
    pub fn use_accelerator(mut self, enabled: bool) -> Self {
        self.use_accelerator = enabled;
        self
    }

    /// Use accelerator memory on the given accelerator
    pub fn accelerator(self, id: u32) -> Self {
        self.accelerator_id(id).use_accelerator(true)
    }

    /// Set the operation (defaults to write)
    pub fn operation(mut self, op: Operation) -> Self {
        self.operation = op;
        self
    }

    /// Set the block size in bytes
    pub fn block_size(mut self, bytes: u64) -> Self {
        self.block_size = Some(bytes);
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, blocks: u64) -> Self {
        self.batch_size = Some(blocks);
        self
    }

    /// Set the buffer size in bytes
    pub fn buffer_size(mut self, bytes: u64) -> Self {
        self.buffer_size = Some(bytes);
        self
    }

    /// Address a remote segment
    pub fn segment_id(mut self, id: impl Into<String>) -> Self {
        self.segment_id = Some(id.into());
        self
    }

    /// Set or clear the remote segment
    pub fn maybe_segment_id(mut self, id: Option<String>) -> Self {
        self.segment_id = id;
        self
    }

    /// Build the descriptor
    ///
    /// # Errors
    /// Returns an error if a required field is missing or empty, or a size
    /// is zero.
    pub fn build(self) -> Result<TransferEngineDescriptor, ConfigError> {
        let meta_server = required("meta_server", self.meta_server)?;
        let local_address = required("local_address", self.local_address)?;
        let device_name = required("device_name", self.device_name)?;
        let block_size = positive("block_size", self.block_size)?;
        let batch_size = positive("batch_size", self.batch_size)?;
        let buffer_size = positive("buffer_size", self.buffer_size)?;

        if matches!(&self.segment_id, Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::invalid("segment_id", "must not be empty"));
        }

        Ok(TransferEngineDescriptor {
            role: self.role,
            meta_server,
            local_address,
            device_name,
            use_accelerator: self.use_accelerator,
            accelerator_id: self.accelerator_id,
            operation: self.operation,
            block_size,
            batch_size,
            buffer_size,
            segment_id: self.segment_id,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        None => Err(ConfigError::MissingField(field)),
        Some(v) if v.trim().is_empty() => Err(ConfigError::invalid(field, "must not be empty")),
        Some(v) => Ok(v),
    }
}

fn positive(field: &'static str, value: Option<u64>) -> Result<u64, ConfigError> {
    match value {
        None => Err(ConfigError::MissingField(field)),
        Some(0) => Err(ConfigError::invalid(field, "must be positive")),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TransferEngineDescriptorBuilder {
        TransferEngineDescriptor::builder()
            .meta_server("meta:2379")
            .local_address("host-b:12345")
            .device_name("mlx5_3")
            .block_size(4096)
            .batch_size(100)
            .buffer_size(1 << 20)
    }

    #[test]
    fn test_builder_missing_device() {
        let err = TransferEngineDescriptor::builder()
            .meta_server("meta:2379")
            .local_address("host:1")
            .block_size(1)
            .batch_size(1)
            .buffer_size(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("device_name")));
    }

    #[test]
    fn test_builder_empty_meta_server() {
        let err = base().meta_server("").build().unwrap_err();
        assert!(err.to_string().contains("meta_server"));
    }

    #[test]
    fn test_builder_zero_batch_size() {
        assert!(base().batch_size(0).build().is_err());
    }

    #[test]
    fn test_builder_empty_segment_id() {
        assert!(base().segment_id("").build().is_err());
    }

    #[test]
    fn test_minimal_args() {
        let d = base().build().unwrap();
        assert_eq!(
            d.args(),
            vec![
                "--metadata_server=meta:2379",
                "--local_server_name=host-b:12345",
                "--device_name=mlx5_3",
                "-use_vram=false",
                "-operation=write",
                "-block_size=4096",
                "-batch_size=100",
                "-buffer_size=1048576",
            ]
        );
    }

    #[test]
    fn test_full_initiator_args() {
        let d = base()
            .role(Role::Initiator)
            .accelerator(2)
            .operation(Operation::Read)
            .segment_id("host-a:12345")
            .build()
            .unwrap();
        let args = d.args();

        assert_eq!(args.first().unwrap(), "--mode=initiator");
        assert!(args.contains(&"-use_vram=true".to_string()));
        assert!(args.contains(&"-operation=read".to_string()));
        assert!(args.contains(&"-gpu_id=2".to_string()));
        assert_eq!(args.last().unwrap(), "--segment_id=host-a:12345");
    }

    #[test]
    fn test_gpu_id_requires_accelerator() {
        let d = base().accelerator_id(5).build().unwrap();
        assert_eq!(d.accelerator_id(), Some(5));
        assert!(!d.args().iter().any(|a| a.starts_with("-gpu_id")));
    }
}
