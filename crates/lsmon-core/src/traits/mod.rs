//! Capability traits for the node monitor
//!
//! This module defines the interfaces of the external collaborators the
//! remediation core talks to.
//!
//! - [`CloudInstanceApi`]: Inspect an instance and toggle its networking
//! - [`DdnsClient`]: Query and upsert DNS records
//! - [`Notifier`]: Deliver a human-readable outcome message
//! - [`Dialer`]: Open a single TCP connection for the connectivity probe

pub mod cloud;
pub mod ddns;
pub mod dialer;
pub mod notifier;

pub use cloud::{CloudApiFactory, CloudInstanceApi, InstanceInfo};
pub use dialer::Dialer;
pub use ddns::{DdnsClient, DdnsClientFactory, RecordType};
pub use notifier::{Notifier, NotifierFactory};
