//! Plugin-based client registry
//!
//! The registry maps type names to factories so the binary can build cloud,
//! DDNS and notifier clients from configuration without hardcoded if-else
//! chains.
//!
//! ## Registration
//!
//! Integration crates expose a `register()` function:
//!
//! ```rust,ignore
//! // In lsmon-ddns-cloudflare
//! pub fn register(registry: &ClientRegistry) {
//!     registry.register_ddns("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DdnsConfig, NodeConfig, NotifierConfig};
use crate::error::{Error, Result};
use crate::traits::{CloudApiFactory, CloudInstanceApi, DdnsClient, DdnsClientFactory};
use crate::traits::{Notifier, NotifierFactory};

/// Registry of capability factories
///
/// ## Thread Safety
///
/// Interior mutability with `RwLock` allows concurrent lookups and
/// exclusive registration.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered cloud API factories
    clouds: RwLock<HashMap<String, Box<dyn CloudApiFactory>>>,

    /// Registered DDNS client factories
    ddns: RwLock<HashMap<String, Box<dyn DdnsClientFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cloud API factory (e.g., "lightsail")
    pub fn register_cloud(&self, name: impl Into<String>, factory: Box<dyn CloudApiFactory>) {
        self.clouds.write().insert(name.into(), factory);
    }

    /// Register a DDNS client factory (e.g., "cloudflare")
    pub fn register_ddns(&self, name: impl Into<String>, factory: Box<dyn DdnsClientFactory>) {
        self.ddns.write().insert(name.into(), factory);
    }

    /// Register a notifier factory (e.g., "webhook")
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        self.notifiers.write().insert(name.into(), factory);
    }

    /// Create the cloud client for a node
    ///
    /// # Errors
    ///
    /// `Error::Config` if the node's provider is not registered, or
    /// whatever the factory returns.
    pub fn create_cloud(&self, config: &NodeConfig) -> Result<Arc<dyn CloudInstanceApi>> {
        let clouds = self.clouds.read();
        let factory = clouds
            .get(&config.provider)
            .ok_or_else(|| Error::config(format!("Unknown cloud provider: {}", config.provider)))?;
        factory.create(config)
    }

    /// Create a DDNS client from configuration
    pub fn create_ddns(&self, config: &DdnsConfig) -> Result<Arc<dyn DdnsClient>> {
        let client_type = config.type_name();
        let ddns = self.ddns.read();
        let factory = ddns
            .get(client_type)
            .ok_or_else(|| Error::config(format!("Unknown DDNS client type: {client_type}")))?;
        factory.create(config)
    }

    /// Create a notifier from configuration
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = self.notifiers.read();
        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {notifier_type}")))?;
        factory.create(config)
    }

    pub fn has_cloud(&self, name: &str) -> bool {
        self.clouds.read().contains_key(name)
    }

    pub fn has_ddns(&self, name: &str) -> bool {
        self.ddns.read().contains_key(name)
    }

    pub fn has_notifier(&self, name: &str) -> bool {
        self.notifiers.read().contains_key(name)
    }

    /// List registered DDNS client types
    pub fn list_ddns(&self) -> Vec<String> {
        self.ddns.read().keys().cloned().collect()
    }
}
