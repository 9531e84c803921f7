// # DDNS Client Trait
//
// Defines the interface for reading and writing the DNS records that
// point at a monitored node.
//
// ## Implementations
//
// - Cloudflare: `lsmon-ddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use lsmon_core::traits::{DdnsClient, RecordType};
// use lsmon_core::NetworkFamily;
//
// let current = client.get_records(RecordType::A, "node.example.com").await?;
// if !current.contains(&ip) {
//     client.upsert_record(NetworkFamily::V4, "node.example.com", ip).await?;
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::node::NetworkFamily;

/// DNS address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for DDNS client implementations
///
/// # Trust Level: Untrusted
///
/// Clients execute one logical operation per call and return errors
/// as-is. The domain synchronizer owns retries and decides whether an
/// update is needed at all.
#[async_trait]
pub trait DdnsClient: Send + Sync {
    /// Addresses currently published for `domain` under `record_type`
    ///
    /// A domain with no records yields an empty set, not an error.
    async fn get_records(
        &self,
        record_type: RecordType,
        domain: &str,
    ) -> Result<HashSet<IpAddr>, crate::Error>;

    /// Point the record of `family`'s type for `domain` at `ip`,
    /// creating it if it does not exist
    async fn upsert_record(
        &self,
        family: NetworkFamily,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DDNS clients from configuration
pub trait DdnsClientFactory: Send + Sync {
    /// Create a DdnsClient instance from configuration
    fn create(
        &self,
        config: &crate::config::DdnsConfig,
    ) -> Result<Arc<dyn DdnsClient>, crate::Error>;
}
