//! Monitored node
//!
//! A [`Node`] owns its [`NodeState`] together with one instance of every
//! component that operates on it. It exposes the per-cycle entry points:
//!
//! - [`Node::is_blocked`]: probe and classify
//! - [`Node::renew_ip`]: remediate, notify, reconcile DNS
//! - [`Node::update_domain_ip`]: standalone DNS staleness check
//! - [`Node::run_cycle`]: one complete check-and-remediate cycle
//!
//! ## Concurrency
//!
//! Cycles that touch the cached address take `&mut self`, so one node can
//! never run two overlapping cycles. Different nodes share nothing and can
//! be driven from separate tasks.

mod family;
mod state;

pub use family::NetworkFamily;
pub use state::{NodeIdentity, NodeState};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::Result;
use crate::config::RemediationPolicy;
use crate::detector::is_blocked;
use crate::notify::OutcomeNotifier;
use crate::probe::{ConnectivityProbe, TcpDialer};
use crate::remediation::{RemediationController, RemediationReport, StepOutcome};
use crate::renewer::{AddressRenewer, RenewalStrategy};
use crate::sync::{DomainSynchronizer, SyncAction};
use crate::traits::{CloudInstanceApi, DdnsClient, Dialer, Notifier};

/// Outcome of one check cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The node was not blocked. `latency_ms` is `None` when the probe
    /// failed in a way that does not count as a block.
    Healthy {
        latency_ms: Option<u64>,
        dns: StepOutcome,
    },
    /// The node was blocked and remediation ran
    Remediated(RemediationReport),
}

/// A monitored node and its components
pub struct Node {
    state: NodeState,
    policy: RemediationPolicy,
    probe: ConnectivityProbe,
    renewer: AddressRenewer,
    sync: DomainSynchronizer,
    notifier: OutcomeNotifier,
}

impl Node {
    /// Register a node
    ///
    /// Performs one instance lookup to seed the cached address. A failed
    /// lookup is logged and leaves the address empty; the node can still
    /// be renewed later.
    pub async fn new(
        identity: NodeIdentity,
        cloud: Arc<dyn CloudInstanceApi>,
        policy: RemediationPolicy,
    ) -> Self {
        let state = NodeState::new(identity, policy.dial_timeout());
        let renewer = AddressRenewer::new(
            cloud,
            RenewalStrategy::for_node(state.identity()),
            policy.settle_delay(),
        );

        let mut node = Self {
            probe: ConnectivityProbe::new(Arc::new(TcpDialer), &policy),
            sync: DomainSynchronizer::new(None, &policy),
            notifier: OutcomeNotifier::new(None, policy.renew_attempts),
            renewer,
            state,
            policy,
        };

        node.renewer.refresh(&mut node.state).await;
        if node.state.address().is_none() {
            warn!(
                "Node {} registered without a known address",
                node.state.domain()
            );
        }

        node
    }

    /// Replace the transport used by the connectivity probe
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.probe = ConnectivityProbe::new(dialer, &self.policy);
        self
    }

    pub fn with_ddns_client(mut self, client: Arc<dyn DdnsClient>) -> Self {
        self.set_ddns_client(client);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.set_notifier(notifier);
        self
    }

    pub fn set_ddns_client(&mut self, client: Arc<dyn DdnsClient>) {
        self.sync.set_client(client);
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier.set_notifier(notifier);
    }

    /// Set the dial timeout in seconds
    ///
    /// Zero would fail every dial immediately, so it is raised to one second.
    pub fn set_timeout(&mut self, seconds: u64) {
        if seconds == 0 {
            warn!("Dial timeout of 0s is not supported, using 1s");
        }
        self.state.set_timeout(Duration::from_secs(seconds.max(1)));
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Probe the node and report whether it is blocked
    #[tracing::instrument(skip_all, fields(domain = %self.state.domain()))]
    pub async fn is_blocked(&self) -> bool {
        match self.probe.probe(&self.state).await {
            Ok(latency) => {
                info!("Tcping: {} ms", latency);
                false
            }
            Err(e) => {
                let blocked = is_blocked(Some(&e));
                if blocked {
                    error!("{}", e);
                }
                blocked
            }
        }
    }

    /// Force a new address, verify it, then notify and reconcile DNS
    #[tracing::instrument(skip_all, fields(domain = %self.state.domain()))]
    pub async fn renew_ip(&mut self) -> RemediationReport {
        RemediationController::new(
            &self.renewer,
            &self.probe,
            &self.notifier,
            &self.sync,
            self.policy.renew_attempts,
        )
        .run(&mut self.state)
        .await
    }

    /// Update DNS if it does not already publish the cached address
    #[tracing::instrument(skip_all, fields(domain = %self.state.domain()))]
    pub async fn update_domain_ip(&self) -> Result<SyncAction> {
        self.sync.sync_if_stale(&self.state).await
    }

    /// One check cycle: remediate when blocked, otherwise make sure DNS
    /// is current
    #[tracing::instrument(skip_all, fields(domain = %self.state.domain()))]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let latency_ms = match self.probe.probe(&self.state).await {
            Ok(latency) => {
                info!("Tcping: {} ms", latency);
                Some(latency)
            }
            Err(e) if is_blocked(Some(&e)) => {
                error!("{}", e);
                return CycleOutcome::Remediated(self.renew_ip().await);
            }
            Err(_) => None,
        };

        let result = self.sync.sync_if_stale(&self.state).await;
        if let Err(e) = &result {
            warn!("Domain check failed: {}", e);
        }

        CycleOutcome::Healthy {
            latency_ms,
            dns: StepOutcome::from_result(result),
        }
    }
}
