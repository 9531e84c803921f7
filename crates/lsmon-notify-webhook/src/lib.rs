//! Webhook notifier
//!
//! Delivers remediation outcomes as a JSON POST:
//!
//! ```json
//! { "domain": "node.example.com", "message": "IP changed: 198.51.100.7" }
//! ```
//!
//! A bearer token is attached when configured. Any non-2xx response is a
//! provider error; the core logs it and carries on.

use async_trait::async_trait;
use lsmon_core::config::NotifierConfig;
use lsmon_core::traits::{Notifier, NotifierFactory};
use lsmon_core::{ClientRegistry, Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for deliveries (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    domain: &'a str,
    message: &'a str,
}

/// Posts outcome messages to a webhook URL
pub struct WebhookNotifier {
    url: reqwest::Url,
    /// ⚠️ NEVER log this value
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url.as_str())
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a notifier for `url`
    ///
    /// # Errors
    ///
    /// `Error::Config` if the URL does not parse or is not http(s).
    pub fn new(url: &str, bearer_token: Option<String>) -> Result<Self> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid webhook URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Webhook URL must be http or https, got {}",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_webhook(&self, domain: &str, message: &str) -> Result<()> {
        let mut request = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { domain, message });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider("webhook", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!("Webhook rejected credentials. Status: {status}")),
                429 => Error::rate_limited(format!("Webhook throttled. Status: {status}")),
                _ => Error::provider("webhook", format!("Webhook returned {status}: {body}")),
            });
        }

        tracing::debug!("Webhook delivered for {}", domain);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "webhook"
    }
}

/// Factory for creating webhook notifiers
pub struct WebhookFactory;

impl NotifierFactory for WebhookFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        match config {
            NotifierConfig::Webhook { url, bearer_token } => {
                Ok(Arc::new(WebhookNotifier::new(url, bearer_token.clone())?))
            }
            _ => Err(Error::config("Invalid config for webhook notifier")),
        }
    }
}

/// Register the webhook notifier with a registry
pub fn register(registry: &ClientRegistry) {
    registry.register_notifier("webhook", Box::new(WebhookFactory));
}
