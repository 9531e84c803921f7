//! Address renewal
//!
//! Forces the cloud provider to hand the node a new public address, then
//! refreshes the cached address from the instance.
//!
//! ## Strategies
//!
//! ```text
//! IPv4: attach static IP ── settle ── detach static IP ── read public IPv4
//! IPv6: dual-stack off  ── settle ── dual-stack on    ── read first IPv6
//! ```
//!
//! Provider errors are logged and never returned. The probe that follows a
//! renewal is what decides whether it helped.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::node::{NetworkFamily, NodeIdentity, NodeState};
use crate::traits::CloudInstanceApi;

/// How a new address is forced for a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalStrategy {
    /// Attach then detach a reserved static IPv4 address
    StaticIpCycle {
        /// Name of the reserved static IP
        static_ip_name: String,
    },
    /// Disable then re-enable dual-stack networking
    DualStackToggle,
}

impl RenewalStrategy {
    /// Strategy for a node's family
    pub fn for_node(identity: &NodeIdentity) -> Self {
        match identity.family {
            NetworkFamily::V4 => Self::StaticIpCycle {
                static_ip_name: identity.static_ip_name.clone(),
            },
            NetworkFamily::V6 => Self::DualStackToggle,
        }
    }
}

/// Talks to the cloud provider to rotate a node's address
pub struct AddressRenewer {
    cloud: Arc<dyn CloudInstanceApi>,
    strategy: RenewalStrategy,
    settle_delay: Duration,
}

impl AddressRenewer {
    pub fn new(
        cloud: Arc<dyn CloudInstanceApi>,
        strategy: RenewalStrategy,
        settle_delay: Duration,
    ) -> Self {
        Self {
            cloud,
            strategy,
            settle_delay,
        }
    }

    /// Run one renewal and overwrite the cached address
    pub async fn renew(&self, state: &mut NodeState) {
        let instance = state.instance_name().to_string();
        let provider = self.cloud.provider_name();

        match &self.strategy {
            RenewalStrategy::StaticIpCycle { static_ip_name } => {
                debug!("Attach static IP {}", static_ip_name);
                if let Err(e) = self.cloud.attach_static_ip(&instance, static_ip_name).await {
                    error!("{}: attach static IP failed: {}", provider, e);
                }

                tokio::time::sleep(self.settle_delay).await;

                debug!("Detach static IP {}", static_ip_name);
                if let Err(e) = self.cloud.detach_static_ip(static_ip_name).await {
                    error!("{}: detach static IP failed: {}", provider, e);
                }
            }
            RenewalStrategy::DualStackToggle => {
                debug!("Disable dual-stack network");
                if let Err(e) = self.cloud.set_dual_stack(&instance, false).await {
                    error!("{}: disable dual-stack failed: {}", provider, e);
                }

                tokio::time::sleep(self.settle_delay).await;

                debug!("Enable dual-stack network");
                if let Err(e) = self.cloud.set_dual_stack(&instance, true).await {
                    error!("{}: enable dual-stack failed: {}", provider, e);
                }
            }
        }

        self.refresh(state).await;
    }

    /// Re-read the instance and cache its current address
    ///
    /// The cached address is left untouched when the lookup fails or the
    /// instance reports no address of the node's family.
    pub async fn refresh(&self, state: &mut NodeState) {
        let instance = match self.cloud.get_instance(state.instance_name()).await {
            Ok(instance) => instance,
            Err(e) => {
                error!("{}: get instance failed: {}", self.cloud.provider_name(), e);
                return;
            }
        };

        let Some(ip) = state.family().select_address(&instance) else {
            warn!(
                "Instance {} reports no {} address",
                state.instance_name(),
                state.family()
            );
            return;
        };

        if state.address() != Some(ip) {
            info!(previous = ?state.address(), current = %ip, "Address changed");
        }
        if let Err(e) = state.set_address(ip) {
            error!("Rejected provider address: {}", e);
        }
    }
}
