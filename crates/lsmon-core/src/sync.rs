//! Domain synchronization
//!
//! Keeps the node's DNS record pointed at its cached address.
//!
//! - [`DomainSynchronizer::reconcile`]: unconditional update with retries,
//!   run after remediation
//! - [`DomainSynchronizer::sync_if_stale`]: query first, update only when
//!   the cached address is not published

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RemediationPolicy;
use crate::node::NodeState;
use crate::traits::DdnsClient;
use crate::{Error, Result};

/// What a staleness check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The cached address was already published
    AlreadyCurrent,
    /// The record was updated to the cached address
    Updated,
}

/// Reconciles DNS records with a node's cached address
pub struct DomainSynchronizer {
    client: Option<Arc<dyn DdnsClient>>,
    attempts: usize,
    retry_delay: Duration,
}

impl DomainSynchronizer {
    pub fn new(client: Option<Arc<dyn DdnsClient>>, policy: &RemediationPolicy) -> Self {
        Self {
            client,
            attempts: policy.dns_update_attempts,
            retry_delay: policy.dns_retry_delay(),
        }
    }

    pub fn set_client(&mut self, client: Arc<dyn DdnsClient>) {
        self.client = Some(client);
    }

    fn client(&self) -> Result<&Arc<dyn DdnsClient>> {
        self.client.as_ref().ok_or(Error::DdnsUnavailable)
    }

    /// Push the cached address to DNS, retrying on failure
    ///
    /// # Returns
    ///
    /// - `Ok(())` on the first successful update
    /// - `Err(Error::DdnsUnavailable)` if no client is configured
    /// - `Err(Error)` from the final attempt if every attempt failed
    pub async fn reconcile(&self, state: &NodeState) -> Result<()> {
        let client = self.client()?;
        let ip = state.address().ok_or_else(|| {
            Error::invalid_input(format!("no cached address for {}", state.domain()))
        })?;

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match client.upsert_record(state.family(), state.domain(), ip).await {
                Ok(()) => {
                    info!("Domain {} -> {}", state.domain(), ip);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Update domain attempt {}/{} failed for {}: {}",
                        attempt,
                        self.attempts,
                        state.domain(),
                        e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Other("no update attempts made".to_string())))
    }

    /// Update DNS only if the cached address is not already published
    pub async fn sync_if_stale(&self, state: &NodeState) -> Result<SyncAction> {
        let client = self.client()?;
        let ip = state.address().ok_or_else(|| {
            Error::invalid_input(format!("no cached address for {}", state.domain()))
        })?;

        let published = client
            .get_records(state.family().record_type(), state.domain())
            .await?;

        if published.contains(&ip) {
            debug!("Domain {} already resolves to {}", state.domain(), ip);
            return Ok(SyncAction::AlreadyCurrent);
        }

        client
            .upsert_record(state.family(), state.domain(), ip)
            .await?;
        info!("Domain {} was stale, updated to {}", state.domain(), ip);
        Ok(SyncAction::Updated)
    }
}
