// # Cloud Instance Control
//
// Defines the interface to the cloud provider that owns a monitored node.
//
// ## Implementations
//
// - Lightsail: `lsmon-cloud-lightsail` crate
//
// Providers of this class have no "rotate my address" call. The core
// forces a new address by toggling an associated resource (a reserved
// static IP for IPv4, dual-stack networking for IPv6) and reading the
// instance back afterwards.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Addresses currently assigned to an instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Public IPv4 address, if any
    pub public_ipv4: Option<Ipv4Addr>,
    /// IPv6 addresses in provider order
    pub ipv6_addresses: Vec<Ipv6Addr>,
}

/// Trait for cloud instance control implementations
///
/// Every method performs a single API call. Retry and settle timing are
/// owned by the core's address renewer.
#[async_trait]
pub trait CloudInstanceApi: Send + Sync {
    /// Fetch the instance's current addresses
    async fn get_instance(&self, instance_name: &str) -> Result<InstanceInfo, crate::Error>;

    /// Attach a reserved static address to the instance
    async fn attach_static_ip(
        &self,
        instance_name: &str,
        static_ip_name: &str,
    ) -> Result<(), crate::Error>;

    /// Detach a reserved static address from whatever it is attached to
    async fn detach_static_ip(&self, static_ip_name: &str) -> Result<(), crate::Error>;

    /// Enable or disable dual-stack networking on a resource
    async fn set_dual_stack(&self, resource_name: &str, enabled: bool)
    -> Result<(), crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing cloud clients from node configuration
pub trait CloudApiFactory: Send + Sync {
    /// Create a client holding the node's credentials and region
    fn create(
        &self,
        config: &crate::config::NodeConfig,
    ) -> Result<Arc<dyn CloudInstanceApi>, crate::Error>;
}
