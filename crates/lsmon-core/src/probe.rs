//! Connectivity probe
//!
//! A single reachability measurement against a node's `address:port`,
//! with its own small retry budget. The probe does not classify failures;
//! that is the block detector's job.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RemediationPolicy;
use crate::node::{NetworkFamily, NodeState};
use crate::traits::Dialer;

/// A failed network operation
///
/// `addr` is set when the target resolved to a socket address and the
/// transport itself failed (refused, unreachable, timed out). It is
/// `None` when the target never resolved.
#[derive(Debug, Error)]
#[error("{op} {network} {target}: {source}")]
pub struct NetOpError {
    /// Operation, e.g. "dial"
    pub op: &'static str,
    /// Network name ("tcp4" / "tcp6")
    pub network: &'static str,
    /// Target as given to the dialer
    pub target: String,
    /// Resolved remote address
    pub addr: Option<SocketAddr>,
    /// Underlying I/O error
    pub source: io::Error,
}

impl NetOpError {
    /// Dial failure against a resolved address
    pub fn dial(family: NetworkFamily, addr: SocketAddr, source: io::Error) -> Self {
        Self {
            op: "dial",
            network: family.network(),
            target: addr.to_string(),
            addr: Some(addr),
            source,
        }
    }

    /// Dial failure before any address was resolved
    pub fn unresolved(family: NetworkFamily, target: impl Into<String>, source: io::Error) -> Self {
        Self {
            op: "dial",
            network: family.network(),
            target: target.into(),
            addr: None,
            source,
        }
    }
}

/// Error returned by a probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network-operation failure
    #[error(transparent)]
    Net(#[from] NetOpError),

    /// The node has no cached address to dial
    #[error("no cached address for {domain}")]
    NoAddress {
        /// Domain of the node
        domain: String,
    },

    /// Any other failure shape
    #[error("probe error: {0}")]
    Other(String),
}

impl From<ProbeError> for crate::Error {
    fn from(err: ProbeError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Real TCP dialer built on tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(
        &self,
        family: NetworkFamily,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let addr: SocketAddr = endpoint.parse().map_err(|e| {
            NetOpError::unresolved(family, endpoint, io::Error::new(io::ErrorKind::InvalidInput, e))
        })?;

        if !family.matches(&addr.ip()) {
            return Err(NetOpError::unresolved(
                family,
                endpoint,
                io::Error::new(io::ErrorKind::InvalidInput, "no suitable address found"),
            )
            .into());
        }

        connect_within(family, addr, timeout, TcpStream::connect(addr)).await
    }
}

/// Bound a connect attempt by `timeout`, mapping failures to `NetOpError`
async fn connect_within<F, S>(
    family: NetworkFamily,
    addr: SocketAddr,
    timeout: Duration,
    connect: F,
) -> Result<(), ProbeError>
where
    F: Future<Output = io::Result<S>>,
{
    match tokio::time::timeout(timeout, connect).await {
        // Dropping the stream closes the connection
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(NetOpError::dial(family, addr, e).into()),
        Err(_) => Err(NetOpError::dial(
            family,
            addr,
            io::Error::new(io::ErrorKind::TimedOut, "i/o timeout"),
        )
        .into()),
    }
}

/// Measures reachability of a node
pub struct ConnectivityProbe {
    dialer: Arc<dyn Dialer>,
    attempts: usize,
    retry_delay: Duration,
}

impl ConnectivityProbe {
    pub fn new(dialer: Arc<dyn Dialer>, policy: &RemediationPolicy) -> Self {
        Self {
            dialer,
            attempts: policy.probe_attempts,
            retry_delay: policy.probe_retry_delay(),
        }
    }

    /// Dial the node until one connection succeeds or the budget is spent
    ///
    /// # Returns
    ///
    /// - `Ok(latency_ms)`: wall-clock time of the successful attempt
    /// - `Err(ProbeError)`: the error of the final attempt
    pub async fn probe(&self, state: &NodeState) -> Result<u64, ProbeError> {
        let Some(ip) = state.address() else {
            return Err(ProbeError::NoAddress {
                domain: state.domain().to_string(),
            });
        };
        let family = state.family();
        let endpoint = family.endpoint(&ip, state.port());

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            let start = Instant::now();
            match self.dialer.dial(family, &endpoint, state.timeout()).await {
                Ok(()) => {
                    let latency = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    return Ok(latency);
                }
                Err(e) => {
                    debug!("{} attempt retry.. ({}/{})", e, attempt, self.attempts);
                    last_error = Some(e);
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ProbeError::Other("no dial attempts made".to_string())))
    }
}
