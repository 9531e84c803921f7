// # Dialer Trait
//
// The transport seam under the connectivity probe. Production code dials
// real TCP sockets through `TcpDialer`; tests script outcomes.

use async_trait::async_trait;
use std::time::Duration;

use crate::node::NetworkFamily;
use crate::probe::ProbeError;

/// Establishes (and immediately drops) a single connection
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dial `endpoint` (`ip:port`, IPv6 bracketed) over `family`
    ///
    /// Returns once the connection is established or `timeout` elapses.
    /// Implementations make exactly one attempt.
    async fn dial(
        &self,
        family: NetworkFamily,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<(), ProbeError>;
}
