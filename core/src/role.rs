//! Host role resolution
//!
//! A benchmark pair consists of a target host, which exposes memory
//! segments, and an initiator host, which addresses them and drives the
//! transfers. Which side this machine plays is decided by its hostname.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HostsConfig;
use crate::error::ConfigError;

/// Role of a host (and of the benchmark instances it runs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Server side: exposes a segment and waits
    Target,
    /// Client side: addresses the peer's segment
    Initiator,
}

impl Role {
    /// Name used on benchmark command lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Target => "target",
            Role::Initiator => "initiator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps hostnames to roles
#[derive(Debug, Clone)]
pub struct RoleResolver {
    targets: HashSet<String>,
    initiators: HashSet<String>,
}

impl RoleResolver {
    /// Create a resolver from the two host lists
    ///
    /// # Errors
    /// Returns [`ConfigError::AmbiguousHost`] if a host is in both lists.
    pub fn new<T, I>(targets: T, initiators: I) -> Result<Self, ConfigError>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let targets: HashSet<String> = targets.into_iter().map(Into::into).collect();
        let initiators: HashSet<String> = initiators.into_iter().map(Into::into).collect();

        if let Some(host) = targets.intersection(&initiators).next() {
            return Err(ConfigError::AmbiguousHost(host.clone()));
        }

        Ok(Self {
            targets,
            initiators,
        })
    }

    /// Create a resolver from the `[hosts]` config section
    pub fn from_config(hosts: &HostsConfig) -> Result<Self, ConfigError> {
        Self::new(hosts.targets.iter().cloned(), hosts.initiators.iter().cloned())
    }

    /// Resolve the role of `hostname`
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownHost`] if the host is in neither list.
    pub fn resolve(&self, hostname: &str) -> Result<Role, ConfigError> {
        if self.targets.contains(hostname) {
            Ok(Role::Target)
        } else if self.initiators.contains(hostname) {
            Ok(Role::Initiator)
        } else {
            Err(ConfigError::UnknownHost {
                hostname: hostname.to_string(),
            })
        }
    }
}

/// Hostname of the current machine
pub fn local_hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}
