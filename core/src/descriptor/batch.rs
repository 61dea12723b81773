//! Batch construction
//!
//! Pure functions turning a config, a role and the local host into the full
//! descriptor list of one batch, in slot order. Nothing here touches the
//! process table; any error means nothing has been launched.

use crate::config::FleetConfig;
use crate::descriptor::{InstanceDescriptor, TransferEngineDescriptor, WriteBwDescriptor};
use crate::error::ConfigError;
use crate::role::Role;
use crate::topology::TopologyTable;

/// Build a transfer-engine batch: one descriptor per topology slot
///
/// Initiators address the target's segment at the matching slot
/// (`remote:port`); targets expose a segment and address nothing.
pub fn build_transfer_batch(
    config: &FleetConfig,
    local_host: &str,
    role: Role,
    block_size: u64,
    batch_size: u64,
) -> Result<Vec<InstanceDescriptor>, ConfigError> {
    if local_host.trim().is_empty() {
        return Err(ConfigError::MissingField("local_host"));
    }
    let topology = TopologyTable::from_config(&config.topology)?;
    topology.require_port_per_slot()?;

    let meta_server = config.meta_server_address()?;
    let remote = config.remote_address()?;
    let te = &config.transfer_engine;

    topology
        .slots()
        .map(|slot| {
            let segment_id = match role {
                Role::Initiator => Some(format!("{remote}:{}", slot.port)),
                Role::Target => None,
            };

            TransferEngineDescriptor::builder()
                .role(role)
                .meta_server(meta_server.clone())
                .local_address(format!("{local_host}:{}", slot.port))
                .device_name(slot.device_name)
                .accelerator_id(slot.accelerator_id)
                .use_accelerator(te.use_accelerator)
                .operation(te.operation)
                .block_size(block_size)
                .batch_size(batch_size)
                .buffer_size(te.buffer_size)
                .maybe_segment_id(segment_id)
                .build()
                .map(InstanceDescriptor::from)
        })
        .collect()
}

/// Number of write-bandwidth instances for a role
///
/// The client side runs one extra instance when `client_probe` is set,
/// reusing slot 0 cyclically.
pub fn write_bw_slot_count(role: Role, devices: usize, client_probe: bool) -> usize {
    match role {
        Role::Target => devices,
        Role::Initiator if client_probe => devices + 1,
        Role::Initiator => devices,
    }
}

/// Build a write-bandwidth batch
///
/// Ports come from `[write_bw].ports` and are reused cyclically. With
/// `use_accelerator`, each instance gets its slot's accelerator.
pub fn build_write_bw_batch(
    config: &FleetConfig,
    role: Role,
) -> Result<Vec<InstanceDescriptor>, ConfigError> {
    let wb = &config.write_bw;
    let topology = TopologyTable::with_ports(&config.topology, wb.ports.clone())?;
    let server = match role {
        Role::Initiator => Some(config.write_bw_server_address()?.to_string()),
        Role::Target => None,
    };

    let count = write_bw_slot_count(role, topology.slot_count(), wb.client_probe);

    (0..count)
        .map(|i| -> Result<InstanceDescriptor, ConfigError> {
            let slot = topology.cyclic_slot(i);
            let descriptor = WriteBwDescriptor {
                accelerator_id: wb.use_accelerator.then_some(slot.accelerator_id),
                server_address: server.clone(),
                ..WriteBwDescriptor::from_config(slot.device_name, slot.port, wb)
            };
            descriptor.validate()?;
            Ok(descriptor.into())
        })
        .collect()
}
