// # Notifier Trait
//
// Outbound delivery of remediation outcomes. Delivery is best-effort: the
// core logs a failed send and carries on with DNS reconciliation.

use async_trait::async_trait;
use std::sync::Arc;

/// Trait for notification transports
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` about `domain`
    async fn send_webhook(&self, domain: &str, message: &str) -> Result<(), crate::Error>;

    /// Transport name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Arc<dyn Notifier>, crate::Error>;
}
