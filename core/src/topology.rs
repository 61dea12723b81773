//! Slot topology
//!
//! A slot binds one accelerator, one network device and one port together
//! for a single benchmark instance.

use crate::config::TopologyConfig;
use crate::error::ConfigError;

/// One position in the topology table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Position in the table (wrapped for cyclic lookups)
    pub index: usize,
    /// Accelerator id
    pub accelerator_id: u32,
    /// RDMA device name
    pub device_name: String,
    /// Port number
    pub port: u16,
}

/// Read-only table of slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyTable {
    accelerators: Vec<u32>,
    devices: Vec<String>,
    ports: Vec<u16>,
}

impl TopologyTable {
    /// Build a table
    ///
    /// Accelerator and device lists must have equal, non-zero length. Ports
    /// must be non-zero. The port list may be shorter; ports are then reused
    /// cyclically. Use
    /// [`TopologyTable::require_port_per_slot`] where that is not allowed.
    pub fn new(
        accelerators: Vec<u32>,
        devices: Vec<String>,
        ports: Vec<u16>,
    ) -> Result<Self, ConfigError> {
        if accelerators.len() != devices.len() {
            return Err(ConfigError::TopologyMismatch {
                accelerators: accelerators.len(),
                devices: devices.len(),
            });
        }
        if devices.is_empty() {
            return Err(ConfigError::EmptyTopology("devices"));
        }
        if ports.is_empty() {
            return Err(ConfigError::EmptyTopology("ports"));
        }
        if let Some(pos) = devices.iter().position(|d| d.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "topology.devices",
                format!("device name of slot {pos} is empty"),
            ));
        }
        if let Some(pos) = ports.iter().position(|&p| p == 0) {
            return Err(ConfigError::invalid(
                "ports",
                format!("port {pos} of the list is zero"),
            ));
        }

        Ok(Self {
            accelerators,
            devices,
            ports,
        })
    }

    /// Table from the `[topology]` section
    pub fn from_config(config: &TopologyConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.accelerators.clone(),
            config.devices.clone(),
            config.ports.clone(),
        )
    }

    /// Table from the `[topology]` section with a different port list
    pub fn with_ports(config: &TopologyConfig, ports: Vec<u16>) -> Result<Self, ConfigError> {
        Self::new(config.accelerators.clone(), config.devices.clone(), ports)
    }

    /// Fail unless every slot has its own port
    pub fn require_port_per_slot(&self) -> Result<(), ConfigError> {
        if self.ports.len() != self.slot_count() {
            return Err(ConfigError::PortCountMismatch {
                ports: self.ports.len(),
                slots: self.slot_count(),
            });
        }
        Ok(())
    }

    /// Number of slots (one per device)
    pub fn slot_count(&self) -> usize {
        self.devices.len()
    }

    /// Slot `i`, or `None` past the end
    pub fn slot(&self, i: usize) -> Option<Slot> {
        (i < self.slot_count()).then(|| self.cyclic_slot(i))
    }

    /// Slot `i` with every list wrapped around
    pub fn cyclic_slot(&self, i: usize) -> Slot {
        let n = self.slot_count();
        Slot {
            index: i % n,
            accelerator_id: self.accelerators[i % n],
            device_name: self.devices[i % n].clone(),
            port: self.ports[i % self.ports.len()],
        }
    }

    /// All slots in declaration order
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.slot_count()).map(|i| self.cyclic_slot(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slots_in_order() {
        let table = TopologyTable::new(vec![0, 1], devs(&["devA", "devB"]), vec![100, 101]).unwrap();
        assert_eq!(table.slot_count(), 2);

        let slot = table.slot(1).unwrap();
        assert_eq!(slot.index, 1);
        assert_eq!(slot.accelerator_id, 1);
        assert_eq!(slot.device_name, "devB");
        assert_eq!(slot.port, 101);

        assert!(table.slot(2).is_none());
        assert_eq!(table.slots().count(), 2);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = TopologyTable::new(vec![0, 1, 2], devs(&["a", "b"]), vec![1, 2]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TopologyMismatch {
                accelerators: 3,
                devices: 2
            }
        ));
    }

    #[test]
    fn test_empty_tables_rejected() {
        assert!(matches!(
            TopologyTable::new(vec![], vec![], vec![1]),
            Err(ConfigError::EmptyTopology("devices"))
        ));
        assert!(matches!(
            TopologyTable::new(vec![0], devs(&["a"]), vec![]),
            Err(ConfigError::EmptyTopology("ports"))
        ));
    }

    #[test]
    fn test_blank_device_rejected() {
        assert!(TopologyTable::new(vec![0, 1], devs(&["a", " "]), vec![1, 2]).is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = TopologyTable::new(vec![0, 1], devs(&["a", "b"]), vec![12345, 0]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "ports", .. }));
        assert!(err.to_string().contains("port 1"));
    }

    #[test]
    fn test_short_port_list_is_cyclic() {
        let table = TopologyTable::new(vec![0, 1, 2], devs(&["a", "b", "c"]), vec![7, 8]).unwrap();
        let ports: Vec<u16> = table.slots().map(|s| s.port).collect();
        assert_eq!(ports, vec![7, 8, 7]);
        assert!(matches!(
            table.require_port_per_slot(),
            Err(ConfigError::PortCountMismatch { ports: 2, slots: 3 })
        ));
    }

    #[test]
    fn test_cyclic_slot_wraps() {
        let table = TopologyTable::new(vec![4, 5], devs(&["a", "b"]), vec![7, 8]).unwrap();
        let slot = table.cyclic_slot(2);
        assert_eq!(slot.index, 0);
        assert_eq!(slot.accelerator_id, 4);
        assert_eq!(slot.device_name, "a");
        assert_eq!(slot.port, 7);
    }

    #[test]
    fn test_default_config_is_strict() {
        let table = TopologyTable::from_config(&TopologyConfig::default()).unwrap();
        assert_eq!(table.slot_count(), 8);
        assert!(table.require_port_per_slot().is_ok());
        assert_eq!(table.slot(0).unwrap().device_name, "mlx5_3");
    }
}
