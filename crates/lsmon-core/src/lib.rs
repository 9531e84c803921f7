// # lsmon-core
//
// Core library for checking that cloud nodes are reachable and repairing
// them when they are not.
//
// ## Architecture Overview
//
// - **ConnectivityProbe**: Dials `address:port` with a small retry budget
// - **BlockDetector**: Decides whether a probe failure is a transport-level block
// - **AddressRenewer**: Makes the cloud provider assign a new public address
// - **RemediationController**: Renew → re-probe loop, then notify and reconcile DNS
// - **DomainSynchronizer**: Keeps the DNS record on the node's current address
// - **OutcomeNotifier**: Best-effort report of the remediation result
// - **Node**: Owns a node's state and components, exposes the cycle entry points
//
// ## Design Principles
//
// 1. **Core-owned policy**: Every retry budget and delay lives here; providers are single-shot
// 2. **Partial failure is local**: A failed provider call, notification or DNS update never aborts a cycle
// 3. **Exclusive state**: A node's cached address is mutated only through `&mut Node`
// 4. **Plugin-based**: Integrations register factories, no hard-coded provider switch

pub mod config;
pub mod detector;
pub mod error;
pub mod node;
pub mod notify;
pub mod probe;
pub mod registry;
pub mod remediation;
pub mod renewer;
pub mod sync;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, MonitorConfig, NodeConfig, NotifierConfig, RemediationPolicy};
pub use detector::is_blocked;
pub use error::{Error, Result};
pub use node::{CycleOutcome, NetworkFamily, Node, NodeIdentity, NodeState};
pub use notify::OutcomeNotifier;
pub use probe::{ConnectivityProbe, NetOpError, ProbeError, TcpDialer};
pub use registry::ClientRegistry;
pub use remediation::{RemediationController, RemediationReport, RemediationState, StepOutcome};
pub use renewer::{AddressRenewer, RenewalStrategy};
pub use sync::{DomainSynchronizer, SyncAction};
pub use traits::{CloudInstanceApi, DdnsClient, Dialer, Notifier};
