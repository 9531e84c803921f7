//! Error types for the node monitor
//!
//! This module defines the error type shared by the core and every
//! capability implementation. Probe failures have their own type
//! ([`crate::probe::ProbeError`]) because the block detector needs to
//! inspect their shape.

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the node monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Dial/connect failures surfaced at the top level
    #[error("Transport error: {0}")]
    Transport(String),

    /// Cloud, DDNS or notifier API failure
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// No DDNS client configured for the node
    #[error("ddns client is null")]
    DdnsUnavailable,

    /// No notifier configured for the node
    #[error("notifier is null")]
    NotifierUnavailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found (zone, record, instance)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error means a capability is simply not configured.
    ///
    /// Such errors short-circuit the dependent step only and are reported
    /// as skipped rather than failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::DdnsUnavailable | Self::NotifierUnavailable)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_messages_match_operator_wording() {
        assert_eq!(Error::DdnsUnavailable.to_string(), "ddns client is null");
        assert_eq!(Error::NotifierUnavailable.to_string(), "notifier is null");
    }

    #[test]
    fn only_missing_capabilities_are_unavailable() {
        assert!(Error::DdnsUnavailable.is_unavailable());
        assert!(Error::NotifierUnavailable.is_unavailable());
        assert!(!Error::provider("lightsail", "boom").is_unavailable());
        assert!(!Error::config("bad").is_unavailable());
    }

    #[test]
    fn provider_error_names_the_provider() {
        let err = Error::provider("cloudflare", "Zone lookup failed");
        assert_eq!(
            err.to_string(),
            "Provider error (cloudflare): Zone lookup failed"
        );
    }
}
