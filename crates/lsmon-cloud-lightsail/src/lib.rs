// # Lightsail Instance Control
//
// Cloud instance capability for the node monitor over the Lightsail JSON
// API, signed with AWS Signature Version 4.
//
// ## Behavior
//
// - One HTTP request per trait call; retries and settle delays belong to
//   the core's address renewer
// - HTTP timeout configured (30 seconds)
// - Lightsail error types mapped onto the shared error enum
// - Secret access key never appears in logs or `Debug` output
//
// ## API Reference
//
// Every call is `POST https://lightsail.{region}.amazonaws.com/` with
// `X-Amz-Target: Lightsail_20161128.<Action>`:
//
// - `GetInstance`: `{"instanceName"}`
// - `AttachStaticIp`: `{"staticIpName", "instanceName"}`
// - `DetachStaticIp`: `{"staticIpName"}`
// - `SetIpAddressType`: `{"resourceType": "Instance", "resourceName", "ipAddressType": "ipv4" | "dualstack"}`

pub mod sigv4;

use async_trait::async_trait;
use chrono::Utc;
use lsmon_core::config::{NodeConfig, RemediationPolicy};
use lsmon_core::traits::{CloudApiFactory, CloudInstanceApi, InstanceInfo};
use lsmon_core::{ClientRegistry, Error, Node, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use crate::sigv4::{CONTENT_TYPE, Credentials, SigningRequest};

/// Signing name of the service
const SERVICE: &str = "lightsail";

/// API version prefix of every target
const TARGET_PREFIX: &str = "Lightsail_20161128";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetInstanceResponse {
    instance: InstanceBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceBody {
    #[serde(default)]
    public_ip_address: Option<String>,
    #[serde(default)]
    ipv6_addresses: Vec<String>,
}

/// Lightsail API client for one region
pub struct LightsailClient {
    credentials: Credentials,
    region: String,

    /// Request URL, `https://lightsail.{region}.amazonaws.com/` unless overridden
    endpoint: String,

    /// Host as it appears in the signed `host` header
    host: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the secret access key
impl std::fmt::Debug for LightsailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightsailClient")
            .field("credentials", &self.credentials)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl LightsailClient {
    /// Create a client for the public regional endpoint
    ///
    /// # Errors
    ///
    /// `Error::Config` if a credential or the region is empty.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let region = region.into();
        let endpoint = format!("https://lightsail.{region}.amazonaws.com/");
        Self::with_endpoint(access_key_id, secret_access_key, region, endpoint)
    }

    /// Create a client that sends requests to `endpoint` instead
    pub fn with_endpoint(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        };
        let region = region.into();

        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(Error::config("Lightsail access key id and secret are required"));
        }
        if region.is_empty() {
            return Err(Error::config("Lightsail region is required"));
        }

        let endpoint = endpoint.into();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Lightsail endpoint {endpoint}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::config(format!("Lightsail endpoint has no host: {endpoint}")));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            region,
            endpoint,
            host,
            client,
        })
    }

    /// Create a client from a node's configuration
    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        Self::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.region.clone(),
        )
    }

    /// Perform one signed API call and return the JSON response body
    async fn call(&self, action: &str, body: Value) -> Result<Value> {
        let target = format!("{TARGET_PREFIX}.{action}");
        let payload = serde_json::to_vec(&body)?;

        let signed = sigv4::sign(
            &self.credentials,
            &SigningRequest {
                host: &self.host,
                target: &target,
                payload: &payload,
                region: &self.region,
                service: SERVICE,
                time: Utc::now(),
            },
        )?;

        tracing::debug!("Lightsail {} request", action);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Date", &signed.amz_date)
            .header("X-Amz-Target", &target)
            .header("Authorization", &signed.authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::provider(SERVICE, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(action, status.as_u16(), &error_text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::provider(SERVICE, format!("Failed to read response: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Map a non-2xx Lightsail response onto the shared error type
///
/// Lightsail reports most failures as 400 with a `__type` such as
/// `NotFoundException`, so the body is consulted before the status.
fn status_error(action: &str, status: u16, body: &str) -> Error {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let kind = parsed["__type"]
        .as_str()
        .or_else(|| parsed["code"].as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t))
        .unwrap_or_default();
    let message = parsed["message"]
        .as_str()
        .or_else(|| parsed["Message"].as_str())
        .unwrap_or(body);

    match (status, kind) {
        (_, k) if k.contains("NotFound") => {
            Error::not_found(format!("{action}: {message}"))
        }
        (401 | 403, _) | (_, "UnauthenticatedException" | "AccessDeniedException") => {
            Error::auth(format!("{action}: {message}"))
        }
        (429, _) | (_, "ThrottlingException") => {
            Error::rate_limited(format!("{action}: {message}"))
        }
        (500..=599, _) => Error::provider(
            SERVICE,
            format!("Lightsail server error (transient) on {action}: {status} - {message}"),
        ),
        (_, "") => Error::provider(SERVICE, format!("{action} failed: {status} - {message}")),
        (_, kind) => Error::provider(SERVICE, format!("{action} failed: {kind}: {message}")),
    }
}

fn parse_instance(body: Value) -> Result<InstanceInfo> {
    let response: GetInstanceResponse = serde_json::from_value(body)?;

    let public_ipv4 = response
        .instance
        .public_ip_address
        .as_deref()
        .map(str::parse::<Ipv4Addr>)
        .transpose()
        .map_err(|e| Error::provider(SERVICE, format!("Invalid IPv4 in response: {e}")))?;

    let ipv6_addresses = response
        .instance
        .ipv6_addresses
        .iter()
        .map(|s| s.parse::<Ipv6Addr>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::provider(SERVICE, format!("Invalid IPv6 in response: {e}")))?;

    Ok(InstanceInfo {
        public_ipv4,
        ipv6_addresses,
    })
}

#[async_trait]
impl CloudInstanceApi for LightsailClient {
    async fn get_instance(&self, instance_name: &str) -> Result<InstanceInfo> {
        let body = self
            .call("GetInstance", json!({ "instanceName": instance_name }))
            .await?;
        parse_instance(body)
    }

    async fn attach_static_ip(&self, instance_name: &str, static_ip_name: &str) -> Result<()> {
        self.call(
            "AttachStaticIp",
            json!({
                "staticIpName": static_ip_name,
                "instanceName": instance_name,
            }),
        )
        .await?;
        Ok(())
    }

    async fn detach_static_ip(&self, static_ip_name: &str) -> Result<()> {
        self.call("DetachStaticIp", json!({ "staticIpName": static_ip_name }))
            .await?;
        Ok(())
    }

    async fn set_dual_stack(&self, resource_name: &str, enabled: bool) -> Result<()> {
        let ip_address_type = if enabled { "dualstack" } else { "ipv4" };
        self.call(
            "SetIpAddressType",
            json!({
                "resourceType": "Instance",
                "resourceName": resource_name,
                "ipAddressType": ip_address_type,
            }),
        )
        .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        SERVICE
    }
}

/// Factory for creating Lightsail clients
pub struct LightsailFactory;

impl CloudApiFactory for LightsailFactory {
    fn create(&self, config: &NodeConfig) -> Result<Arc<dyn CloudInstanceApi>> {
        Ok(Arc::new(LightsailClient::from_config(config)?))
    }
}

/// Register the Lightsail client with a registry
///
/// # Example
///
/// ```rust
/// use lsmon_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// lsmon_cloud_lightsail::register(&registry);
/// assert!(registry.has_cloud("lightsail"));
/// ```
pub fn register(registry: &ClientRegistry) {
    registry.register_cloud(SERVICE, Box::new(LightsailFactory));
}

/// Build a monitored node backed by Lightsail
///
/// Validates the node's configuration, creates a client for its region and
/// seeds the cached address with one instance lookup. DDNS and notifier
/// capabilities are attached afterwards by the caller.
pub async fn connect_node(config: &NodeConfig, policy: &RemediationPolicy) -> Result<Node> {
    config.validate()?;
    let client = LightsailClient::from_config(config)?;

    let mut node = Node::new(config.identity(), Arc::new(client), policy.clone()).await;
    if let Some(timeout) = config.timeout_secs {
        node.set_timeout(timeout);
    }
    Ok(node)
}
