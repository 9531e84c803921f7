// # Node State
//
// The entity every component reads and mutates. One `NodeState` belongs
// to exactly one node monitor; components borrow it for the duration of a
// cycle, so exclusive access is checked by the compiler rather than by a
// lock.

use std::net::IpAddr;
use std::time::Duration;

use super::NetworkFamily;
use crate::{Error, Result};

/// Stable identity of a monitored node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Instance name at the cloud provider
    pub instance_name: String,
    /// Domain whose record points at the node
    pub domain: String,
    /// Address family, fixed for the node's lifetime
    pub family: NetworkFamily,
    /// TCP port to probe
    pub port: u16,
    /// Reserved static IP cycled to force IPv4 renewal
    pub static_ip_name: String,
}

/// Mutable per-node state
#[derive(Debug, Clone)]
pub struct NodeState {
    identity: NodeIdentity,
    timeout: Duration,
    /// Last known address. Always a literal of `identity.family` when set.
    address: Option<IpAddr>,
}

impl NodeState {
    /// Create state with no known address yet
    pub fn new(identity: NodeIdentity, timeout: Duration) -> Self {
        Self {
            identity,
            timeout,
            address: None,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn instance_name(&self) -> &str {
        &self.identity.instance_name
    }

    pub fn domain(&self) -> &str {
        &self.identity.domain
    }

    pub fn family(&self) -> NetworkFamily {
        self.identity.family
    }

    pub fn port(&self) -> u16 {
        self.identity.port
    }

    /// Dial timeout used by the connectivity probe
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Cached address, if one has been resolved
    pub fn address(&self) -> Option<IpAddr> {
        self.address
    }

    /// Overwrite the cached address
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `ip` is not of the node's family.
    /// The previous address is kept in that case.
    pub fn set_address(&mut self, ip: IpAddr) -> Result<()> {
        if !self.identity.family.matches(&ip) {
            return Err(Error::invalid_input(format!(
                "{ip} is not a {} address",
                self.identity.family
            )));
        }
        self.address = Some(ip);
        Ok(())
    }
}
