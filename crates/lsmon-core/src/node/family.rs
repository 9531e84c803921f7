// # Network Family
//
// A node is monitored over exactly one address family, chosen when it is
// registered. Everything that differs between IPv4 and IPv6 lives here so
// the rest of the core never branches on the family itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::traits::{InstanceInfo, RecordType};

/// Address family a node is monitored over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkFamily {
    /// IPv4 (`tcp4`)
    #[serde(rename = "tcp4", alias = "ipv4")]
    V4,
    /// IPv6 (`tcp6`)
    #[serde(rename = "tcp6", alias = "ipv6")]
    V6,
}

impl NetworkFamily {
    /// Network name used in dial errors and logs
    pub fn network(self) -> &'static str {
        match self {
            Self::V4 => "tcp4",
            Self::V6 => "tcp6",
        }
    }

    /// DNS record type holding addresses of this family
    pub fn record_type(self) -> RecordType {
        match self {
            Self::V4 => RecordType::A,
            Self::V6 => RecordType::Aaaa,
        }
    }

    /// Whether `ip` is a literal of this family
    pub fn matches(self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (Self::V4, IpAddr::V4(_)) | (Self::V6, IpAddr::V6(_))
        )
    }

    /// Format `ip:port`, bracket-wrapping IPv6 literals.
    ///
    /// The cached address is never modified; brackets only exist in the
    /// dial target.
    pub fn endpoint(self, ip: &IpAddr, port: u16) -> String {
        match self {
            Self::V4 => format!("{ip}:{port}"),
            Self::V6 => format!("[{ip}]:{port}"),
        }
    }

    /// Pick the instance address this family monitors.
    ///
    /// IPv4 nodes use the public IPv4 address, IPv6 nodes the first
    /// IPv6 address the provider reports.
    pub fn select_address(self, instance: &InstanceInfo) -> Option<IpAddr> {
        match self {
            Self::V4 => instance.public_ipv4.map(IpAddr::V4),
            Self::V6 => instance.ipv6_addresses.first().copied().map(IpAddr::V6),
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.network())
    }
}
