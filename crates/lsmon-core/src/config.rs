//! Configuration types for the node monitor
//!
//! This module defines all configuration structures used throughout the crate.
//! Every policy value has a documented default matching the monitor's
//! historical behavior (3 attempts, 5 second spacing, 3 second settle delay).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::node::{NetworkFamily, NodeIdentity};

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Nodes to check
    pub nodes: Vec<NodeConfig>,

    /// DDNS client shared by all nodes (optional)
    #[serde(default)]
    pub ddns: Option<DdnsConfig>,

    /// Notifier shared by all nodes (optional)
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,

    /// Retry and timing policy
    #[serde(default)]
    pub policy: RemediationPolicy,
}

impl MonitorConfig {
    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.nodes.is_empty() {
            return Err(crate::Error::config("No nodes configured"));
        }

        for node in &self.nodes {
            node.validate()?;
        }
        if let Some(ddns) = &self.ddns {
            ddns.validate()?;
        }
        if let Some(notifier) = &self.notifier {
            notifier.validate()?;
        }
        self.policy.validate()
    }
}

/// A monitored node and the credentials to control it
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Cloud provider type name
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider access key ID
    pub access_key_id: String,

    /// Provider secret access key
    /// ⚠️ NEVER log this value
    pub secret_access_key: String,

    /// Provider region (e.g., "ap-northeast-1")
    pub region: String,

    /// Instance name at the provider
    pub instance_name: String,

    /// Address family to monitor
    pub network: NetworkFamily,

    /// Domain whose record points at the node
    pub domain: String,

    /// TCP port to probe
    pub port: u16,

    /// Dial timeout override in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Name of the reserved static IP used to force IPv4 renewal
    #[serde(default = "default_static_ip_name")]
    pub static_ip_name: String,
}

// Custom Debug implementation that hides the secret access key
impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("provider", &self.provider)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field("region", &self.region)
            .field("instance_name", &self.instance_name)
            .field("network", &self.network)
            .field("domain", &self.domain)
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("static_ip_name", &self.static_ip_name)
            .finish()
    }
}

impl NodeConfig {
    /// Validate the node configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(crate::Error::config(format!(
                "Node {}: access key ID and secret access key are required",
                self.domain
            )));
        }
        if self.region.is_empty() {
            return Err(crate::Error::config(format!(
                "Node {}: region cannot be empty",
                self.domain
            )));
        }
        if self.instance_name.is_empty() {
            return Err(crate::Error::config(format!(
                "Node {}: instance name cannot be empty",
                self.domain
            )));
        }
        if self.port == 0 {
            return Err(crate::Error::config(format!(
                "Node {}: port must be between 1 and 65535",
                self.domain
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(crate::Error::config(format!(
                "Node {}: timeout must be at least 1 second",
                self.domain
            )));
        }
        if self.network == NetworkFamily::V4 && self.static_ip_name.is_empty() {
            return Err(crate::Error::config(format!(
                "Node {}: IPv4 renewal needs a static IP name",
                self.domain
            )));
        }
        validate_domain_name(&self.domain)
    }

    /// Identity of the node this configuration describes
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            instance_name: self.instance_name.clone(),
            domain: self.domain.clone(),
            family: self.network,
            port: self.port,
            static_ip_name: self.static_ip_name.clone(),
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters, and
/// no leading or trailing hyphen.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{domain}'"
            )));
        }
        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{label}'"
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{label}'"
            )));
        }
    }

    Ok(())
}

/// DDNS client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DdnsConfig {
    /// Cloudflare DNS
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, can be auto-detected)
        #[serde(default)]
        zone_id: Option<String>,
        /// Perform reads only and log intended writes
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DdnsConfig {
    /// Validate the DDNS configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DdnsConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            DdnsConfig::Custom { factory, config } => validate_custom("DDNS", factory, config),
        }
    }

    /// Get the client type name
    pub fn type_name(&self) -> &str {
        match self {
            DdnsConfig::Cloudflare { .. } => "cloudflare",
            DdnsConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// JSON webhook
    Webhook {
        /// Endpoint receiving the POST
        url: String,
        /// Optional bearer token
        #[serde(default)]
        bearer_token: Option<String>,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Webhook { url, .. } => {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Webhook URL must use HTTP or HTTPS scheme. Got: {url}"
                    )));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, config } => {
                validate_custom("notifier", factory, config)
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Webhook { .. } => "webhook",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

fn validate_custom(
    kind: &str,
    factory: &str,
    config: &serde_json::Value,
) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {kind} factory cannot be empty"
        )));
    }
    if config.is_null() {
        return Err(crate::Error::config(format!(
            "Custom {kind} config cannot be null"
        )));
    }
    Ok(())
}

/// Retry budgets and delays of the check-and-remediate workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPolicy {
    /// Renew-then-probe iterations before giving up
    #[serde(default = "default_attempts")]
    pub renew_attempts: usize,

    /// Dial attempts per probe
    #[serde(default = "default_attempts")]
    pub probe_attempts: usize,

    /// Pause between failed dial attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub probe_retry_delay_secs: u64,

    /// Wait after a provider-side network toggle (in seconds)
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    /// DNS update attempts after remediation
    #[serde(default = "default_attempts")]
    pub dns_update_attempts: usize,

    /// Pause between failed DNS update attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub dns_retry_delay_secs: u64,

    /// Default dial timeout (in seconds)
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
}

impl RemediationPolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.renew_attempts == 0 || self.probe_attempts == 0 || self.dns_update_attempts == 0 {
            return Err(crate::Error::config("Attempt counts must be at least 1"));
        }
        if self.dial_timeout_secs == 0 {
            return Err(crate::Error::config("Dial timeout must be at least 1 second"));
        }
        Ok(())
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_secs(self.probe_retry_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn dns_retry_delay(&self) -> Duration {
        Duration::from_secs(self.dns_retry_delay_secs)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }
}

impl Default for RemediationPolicy {
    fn default() -> Self {
        Self {
            renew_attempts: default_attempts(),
            probe_attempts: default_attempts(),
            probe_retry_delay_secs: default_retry_delay_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            dns_update_attempts: default_attempts(),
            dns_retry_delay_secs: default_retry_delay_secs(),
            dial_timeout_secs: default_dial_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "lightsail".to_string()
}

fn default_static_ip_name() -> String {
    "LightsailMon".to_string()
}

fn default_attempts() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_settle_delay_secs() -> u64 {
    3
}

fn default_dial_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn node_json() -> serde_json::Value {
        serde_json::json!({
            "access_key_id": "AKIDEXAMPLE",
            "secret_access_key": "wJalrXUtnFEMI",
            "region": "ap-northeast-1",
            "instance_name": "tokyo-1",
            "network": "tcp4",
            "domain": "tokyo.example.com",
            "port": 443
        })
    }

    #[test]
    fn policy_defaults_match_historical_budgets() {
        let policy = RemediationPolicy::default();
        assert_eq!(policy.renew_attempts, 3);
        assert_eq!(policy.probe_attempts, 3);
        assert_eq!(policy.dns_update_attempts, 3);
        assert_eq!(policy.probe_retry_delay(), Duration::from_secs(5));
        assert_eq!(policy.dns_retry_delay(), Duration::from_secs(5));
        assert_eq!(policy.settle_delay(), Duration::from_secs(3));
        assert_eq!(policy.dial_timeout(), Duration::from_secs(5));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let policy = RemediationPolicy {
            renew_attempts: 0,
            ..RemediationPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn node_defaults_are_filled_in() {
        let node: NodeConfig = serde_json::from_value(node_json()).unwrap();
        assert_eq!(node.provider, "lightsail");
        assert_eq!(node.static_ip_name, "LightsailMon");
        assert_eq!(node.timeout_secs, None);
        assert!(node.validate().is_ok());

        let identity = node.identity();
        assert_eq!(identity.family, NetworkFamily::V4);
        assert_eq!(identity.port, 443);
    }

    #[test]
    fn node_debug_redacts_secret() {
        let node: NodeConfig = serde_json::from_value(node_json()).unwrap();
        let debug = format!("{node:?}");
        assert!(debug.contains("<REDACTED>"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn node_with_port_zero_is_invalid() {
        let mut json = node_json();
        json["port"] = serde_json::json!(0);
        let node: NodeConfig = serde_json::from_value(json).unwrap();
        assert!(node.validate().is_err());
    }

    #[test]
    fn domain_validation() {
        assert!(validate_domain_name("node-1.example.com").is_ok());
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("bad..example.com").is_err());
        assert!(validate_domain_name("-edge.example.com").is_err());
        assert!(validate_domain_name("under_score.example.com").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn tagged_client_configs() {
        let ddns: DdnsConfig = serde_json::from_value(serde_json::json!({
            "type": "cloudflare",
            "api_token": "token"
        }))
        .unwrap();
        assert_eq!(ddns.type_name(), "cloudflare");
        assert!(ddns.validate().is_ok());

        let notifier: NotifierConfig = serde_json::from_value(serde_json::json!({
            "type": "webhook",
            "url": "ftp://hooks.example.com"
        }))
        .unwrap();
        assert_eq!(notifier.type_name(), "webhook");
        assert!(notifier.validate().is_err());
    }

    #[test]
    fn loads_monitor_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let config = serde_json::json!({
            "nodes": [node_json()],
            "ddns": { "type": "cloudflare", "api_token": "token", "zone_id": "zone" },
            "policy": { "renew_attempts": 5 }
        });
        write!(file, "{config}").unwrap();

        let loaded = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert!(loaded.notifier.is_none());
        assert_eq!(loaded.policy.renew_attempts, 5);
        assert_eq!(loaded.policy.probe_attempts, 3);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn empty_node_list_is_invalid() {
        let config = MonitorConfig {
            nodes: Vec::new(),
            ddns: None,
            notifier: None,
            policy: RemediationPolicy::default(),
        };
        assert!(config.validate().is_err());
    }
}
