//! Outcome notification
//!
//! Best-effort report of a remediation result. Callers log the returned
//! error; it never changes the remediation outcome.

use std::sync::Arc;

use crate::node::NodeState;
use crate::traits::Notifier;
use crate::{Error, Result};

/// Formats and dispatches remediation outcome messages
pub struct OutcomeNotifier {
    notifier: Option<Arc<dyn Notifier>>,
    renew_attempts: usize,
}

impl OutcomeNotifier {
    /// `renew_attempts` is the budget quoted in the failure message
    pub fn new(notifier: Option<Arc<dyn Notifier>>, renew_attempts: usize) -> Self {
        Self {
            notifier,
            renew_attempts,
        }
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = Some(notifier);
    }

    /// Message describing a remediation outcome
    pub fn message(&self, state: &NodeState, success: bool) -> String {
        if success {
            let ip = state
                .address()
                .map(|ip| ip.to_string())
                .unwrap_or_default();
            format!("IP changed: {ip}")
        } else {
            format!(
                "[{}] Connection block after IP refresh {} times",
                state.domain(),
                self.renew_attempts
            )
        }
    }

    /// Send the outcome message
    ///
    /// Fails immediately with `Error::NotifierUnavailable` when no
    /// transport is configured.
    pub async fn notify(&self, state: &NodeState, success: bool) -> Result<()> {
        let notifier = self.notifier.as_ref().ok_or(Error::NotifierUnavailable)?;
        notifier
            .send_webhook(state.domain(), &self.message(state, success))
            .await
    }
}
