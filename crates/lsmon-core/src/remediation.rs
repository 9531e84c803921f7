//! Remediation controller
//!
//! The central state machine of a check cycle:
//!
//! ```text
//!             ┌──────────┐
//!             │ Probing  │
//!             └──────────┘
//!              │        │
//!      healthy ▼        ▼ blocked
//!     ┌─────────┐   ┌─────────────┐   renew ── probe, up to N times
//!     │ Healthy │   │ Remediating │◄──────────────┐
//!     └─────────┘   └─────────────┘───────────────┘
//!                     │         │
//!            probe ok ▼         ▼ budget spent
//!              ┌──────────┐  ┌───────────┐
//!              │ Verified │  │ Exhausted │
//!              └──────────┘  └───────────┘
//! ```
//!
//! Iterations are strictly sequential: each renewal settles and is
//! re-measured before another one is considered. After the loop the
//! controller always notifies and always reconciles DNS, each
//! independently; a failure in one never blocks the other.

use std::net::IpAddr;
use tracing::{error, info, warn};

use crate::Error;
use crate::node::NodeState;
use crate::notify::OutcomeNotifier;
use crate::probe::ConnectivityProbe;
use crate::renewer::AddressRenewer;
use crate::sync::DomainSynchronizer;

/// Terminal state of a remediation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationState {
    /// A post-renewal probe succeeded
    Verified,
    /// Every renewal was followed by a failed probe
    Exhausted,
}

/// Result of a best-effort follow-up step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step succeeded
    Completed,
    /// The step's capability is not configured
    Skipped(String),
    /// The step ran and failed
    Failed(String),
}

impl StepOutcome {
    /// Map a step result, treating missing capabilities as skipped
    pub fn from_result<T>(result: Result<T, Error>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(e) if e.is_unavailable() => Self::Skipped(e.to_string()),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// What a remediation run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    /// Terminal state
    pub state: RemediationState,
    /// Renewal iterations performed
    pub attempts: usize,
    /// Cached address after the run
    pub address: Option<IpAddr>,
    /// Latency of the successful post-renewal probe
    pub latency_ms: Option<u64>,
    /// Outcome of the notification step
    pub notification: StepOutcome,
    /// Outcome of the DNS reconciliation step
    pub dns: StepOutcome,
}

impl RemediationReport {
    pub fn is_success(&self) -> bool {
        self.state == RemediationState::Verified
    }
}

/// Orchestrates renewal, re-probing, notification and DNS reconciliation
pub struct RemediationController<'a> {
    renewer: &'a AddressRenewer,
    probe: &'a ConnectivityProbe,
    notifier: &'a OutcomeNotifier,
    sync: &'a DomainSynchronizer,
    attempts: usize,
}

impl<'a> RemediationController<'a> {
    pub fn new(
        renewer: &'a AddressRenewer,
        probe: &'a ConnectivityProbe,
        notifier: &'a OutcomeNotifier,
        sync: &'a DomainSynchronizer,
        attempts: usize,
    ) -> Self {
        Self {
            renewer,
            probe,
            notifier,
            sync,
            attempts,
        }
    }

    /// Run the full remediation workflow for one node
    pub async fn run(&self, state: &mut NodeState) -> RemediationReport {
        warn!("Change node IP");

        let mut attempts = 0;
        let mut latency_ms = None;
        for attempt in 1..=self.attempts {
            attempts = attempt;
            self.renewer.renew(state).await;

            match self.probe.probe(state).await {
                Ok(latency) => {
                    info!("Renew IP post check: success ({} ms)", latency);
                    latency_ms = Some(latency);
                    break;
                }
                Err(e) => {
                    error!(
                        "Renew IP post check: {} attempt retry.. ({}/{})",
                        e, attempt, self.attempts
                    );
                }
            }
        }

        let outcome = if latency_ms.is_some() {
            RemediationState::Verified
        } else {
            RemediationState::Exhausted
        };
        let success = outcome == RemediationState::Verified;

        let notification = match self.notifier.notify(state, success).await {
            Ok(()) => {
                info!("Push message success");
                StepOutcome::Completed
            }
            Err(e) => {
                error!("Push message failed: {}", e);
                StepOutcome::from_result::<()>(Err(e))
            }
        };

        let dns = match self.sync.reconcile(state).await {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                // The next cycle's staleness check retries the record
                warn!("Update domain failed: {}", e);
                StepOutcome::from_result::<()>(Err(e))
            }
        };

        RemediationReport {
            state: outcome,
            attempts,
            address: state.address(),
            latency_ms,
            notification,
            dns,
        }
    }
}
