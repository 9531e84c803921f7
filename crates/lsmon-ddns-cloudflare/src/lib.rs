// # Cloudflare DDNS Client
//
// DDNS capability for the node monitor over the Cloudflare v4 API.
//
// ## Behavior
//
// - One logical operation per trait call, errors returned as-is
//   (the domain synchronizer owns retries)
// - HTTP timeout configured (30 seconds)
// - Zone ID pre-configured or discovered by walking the record name's suffixes
// - Upsert updates the first matching record or creates one
// - Dry-run mode performs every read and logs the write it would make
//
// ## Security
//
// - API token never appears in logs or `Debug` output
// - Construction fails fast on an empty token
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use async_trait::async_trait;
use lsmon_core::config::DdnsConfig;
use lsmon_core::traits::{DdnsClient, DdnsClientFactory, RecordType};
use lsmon_core::{ClientRegistry, Error, NetworkFamily, Result};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL value meaning "automatic"
const AUTO_TTL: u32 = 1;

/// Cloudflare DDNS client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PUT/POST payload
/// - **NOT** actually modify DNS records
pub struct CloudflareClient {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, can be auto-detected from domain)
    zone_id: Option<String>,

    /// API base URL, overridable for tests
    base_url: String,

    client: reqwest::Client,

    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Candidate zone names for a record name, longest first
///
/// Every suffix of the name down to two labels, so `node.abc.com` yields
/// `node.abc.com` then `abc.com`.
pub fn zone_candidates(domain: &str) -> Result<Vec<&str>> {
    let domain = domain.trim_end_matches('.');
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(Error::config(format!("Invalid domain name: {domain}")));
    }

    let mut candidates = Vec::with_capacity(labels.len() - 1);
    let mut rest = domain;
    for _ in 0..labels.len() - 1 {
        candidates.push(rest);
        if let Some((_, tail)) = rest.split_once('.') {
            rest = tail;
        }
    }
    Ok(candidates)
}

impl CloudflareClient {
    /// Create a new Cloudflare client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the API token is empty.
    pub fn new(api_token: impl Into<String>, zone_id: Option<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Send requests to `base_url` instead of the public API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a request and return the parsed JSON envelope
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<Value> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "Invalid API token or insufficient permissions. Status: {status}"
                )),
                404 => Error::not_found(format!("{context}: {error_text}")),
                409 => Error::provider(
                    "cloudflare",
                    format!("Conflict: Record is being updated by another process. Status: {status}"),
                ),
                429 => Error::rate_limited(format!("Please retry later. Status: {status}")),
                500..=599 => Error::provider(
                    "cloudflare",
                    format!("Cloudflare server error (transient): {status} - {error_text}"),
                ),
                _ => Error::provider(
                    "cloudflare",
                    format!("{context} failed: {status} - {error_text}"),
                ),
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {e}")))?;

        if json["success"] == Value::Bool(false) {
            return Err(Error::provider(
                "cloudflare",
                format!("{context} failed: {}", json["errors"]),
            ));
        }
        Ok(json)
    }

    /// Get the zone ID for a domain
    ///
    /// Tries each candidate zone until one exists:
    ///
    /// ```http
    /// GET /zones?name=node.example.com
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn get_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        for candidate in zone_candidates(domain)? {
            tracing::debug!("Looking up zone ID for: {}", candidate);
            let request = self
                .client
                .get(format!("{}/zones", self.base_url))
                .query(&[("name", candidate)]);
            let json = self.send(request, "Zone lookup").await?;

            let zones = json["result"].as_array().ok_or_else(|| {
                Error::provider("cloudflare", "Invalid response format: result is not an array")
            })?;
            let Some(zone) = zones.first() else {
                continue;
            };
            let zone_id = zone["id"].as_str().ok_or_else(|| {
                Error::provider("cloudflare", "Invalid response format: zone.id is not a string")
            })?;

            tracing::debug!("Found zone ID {} for {}", zone_id, candidate);
            return Ok(zone_id.to_string());
        }

        Err(Error::not_found(format!("No zone found for {domain}")))
    }

    /// List the records of one type for a name
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=node.example.com&type=A
    /// ```
    async fn list_records(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: RecordType,
    ) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
            .query(&[("name", record_name), ("type", record_type.as_str())]);
        let json = self.send(request, "Record lookup").await?;

        json["result"].as_array().cloned().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: result is not an array")
        })
    }
}

#[async_trait]
impl DdnsClient for CloudflareClient {
    async fn get_records(&self, record_type: RecordType, domain: &str) -> Result<HashSet<IpAddr>> {
        let zone_id = self.get_zone_id(domain).await?;
        let records = self.list_records(&zone_id, domain, record_type).await?;

        let mut addresses = HashSet::new();
        for record in &records {
            let Some(content) = record["content"].as_str() else {
                continue;
            };
            match content.parse::<IpAddr>() {
                Ok(ip) => {
                    addresses.insert(ip);
                }
                Err(_) => tracing::warn!(
                    "Ignoring non-address {} record content for {}: {}",
                    record_type,
                    domain,
                    content
                ),
            }
        }
        Ok(addresses)
    }

    /// Point the record at `ip`
    ///
    /// ```http
    /// # Existing record (skipped in dry-run mode)
    /// PUT /zones/:zone_id/dns_records/:record_id
    ///
    /// # No record yet (skipped in dry-run mode)
    /// POST /zones/:zone_id/dns_records
    ///
    /// { "type": "A", "name": "node.example.com", "content": "1.2.3.4", "ttl": 1, "proxied": false }
    /// ```
    async fn upsert_record(&self, family: NetworkFamily, domain: &str, ip: IpAddr) -> Result<()> {
        if !family.matches(&ip) {
            return Err(Error::invalid_input(format!(
                "{ip} is not a {family} address"
            )));
        }
        let record_type = family.record_type();

        tracing::info!(
            "Updating Cloudflare DNS record: {} -> {} ({}) [mode: {}]",
            domain,
            ip,
            record_type,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.get_zone_id(domain).await?;
        let records = self.list_records(&zone_id, domain, record_type).await?;
        let existing = records.first();

        if let Some(record) = existing {
            if record["content"].as_str() == Some(ip.to_string().as_str()) {
                tracing::info!("DNS record already has correct IP: {} -> {}", domain, ip);
                return Ok(());
            }
        }

        let payload = json!({
            "type": record_type.as_str(),
            "name": domain,
            "content": ip.to_string(),
            "ttl": existing.and_then(|r| r["ttl"].as_u64()).unwrap_or(u64::from(AUTO_TTL)),
            "proxied": existing.and_then(|r| r["proxied"].as_bool()).unwrap_or(false),
        });

        let request = match existing.and_then(|r| r["id"].as_str()) {
            Some(record_id) => {
                let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id);
                if self.dry_run {
                    tracing::info!("[DRY-RUN] Would send PUT request to {} with payload: {}", url, payload);
                    return Ok(());
                }
                self.client.put(url)
            }
            None => {
                let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
                if self.dry_run {
                    tracing::info!("[DRY-RUN] Would send POST request to {} with payload: {}", url, payload);
                    return Ok(());
                }
                self.client.post(url)
            }
        };

        self.send(request.json(&payload), "Record update").await?;
        tracing::info!("DNS record updated successfully: {} -> {}", domain, ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare clients
pub struct CloudflareFactory;

impl DdnsClientFactory for CloudflareFactory {
    fn create(&self, config: &DdnsConfig) -> Result<Arc<dyn DdnsClient>> {
        match config {
            DdnsConfig::Cloudflare {
                api_token,
                zone_id,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare client running in DRY-RUN mode - no changes will be made"
                    );
                }
                Ok(Arc::new(CloudflareClient::new(
                    api_token.clone(),
                    zone_id.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare client")),
        }
    }
}

/// Register the Cloudflare client with a registry
///
/// # Example
///
/// ```rust
/// use lsmon_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// lsmon_ddns_cloudflare::register(&registry);
/// assert!(registry.has_ddns("cloudflare"));
/// ```
pub fn register(registry: &ClientRegistry) {
    registry.register_ddns("cloudflare", Box::new(CloudflareFactory));
}
