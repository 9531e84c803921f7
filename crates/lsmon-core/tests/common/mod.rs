//! Test doubles and common utilities for contract tests
//!
//! These doubles count calls and script outcomes so tests can assert on
//! exact retry budgets. Timing assertions rely on tokio's paused clock.

#![allow(dead_code)]

use async_trait::async_trait;
use lsmon_core::error::{Error, Result};
use lsmon_core::traits::{CloudInstanceApi, DdnsClient, Dialer, InstanceInfo, Notifier, RecordType};
use lsmon_core::{NetOpError, NetworkFamily, Node, NodeIdentity, ProbeError, RemediationPolicy};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DOMAIN: &str = "node.example.com";
pub const PORT: u16 = 443;

/// One scripted dial result
#[derive(Debug, Clone)]
pub enum Dial {
    /// Connect after the given latency
    Connect(Duration),
    /// Transport failure against a resolved address
    Refused(&'static str),
    /// Target never resolved
    Unresolved,
}

/// A dialer that replays a script, then repeats `fallback`
pub struct ScriptedDialer {
    script: Mutex<VecDeque<Dial>>,
    fallback: Dial,
    endpoints: Mutex<Vec<String>>,
}

impl ScriptedDialer {
    pub fn new(script: Vec<Dial>, fallback: Dial) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn dial_count(&self) -> usize {
        self.endpoints.lock().unwrap().len()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(
        &self,
        family: NetworkFamily,
        endpoint: &str,
        _timeout: Duration,
    ) -> std::result::Result<(), ProbeError> {
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            Dial::Connect(latency) => {
                tokio::time::sleep(latency).await;
                Ok(())
            }
            Dial::Refused(reason) => {
                let addr: SocketAddr = endpoint.parse().expect("scripted endpoints resolve");
                Err(NetOpError::dial(
                    family,
                    addr,
                    io::Error::new(io::ErrorKind::ConnectionRefused, reason),
                )
                .into())
            }
            Dial::Unresolved => Err(NetOpError::unresolved(
                family,
                endpoint,
                io::Error::new(io::ErrorKind::NotFound, "no such host"),
            )
            .into()),
        }
    }
}

/// A dialer that reaches only an allow-list of addresses
///
/// Unreachable addresses time out after the dial timeout, like a
/// filtered port would.
pub struct ReachabilityDialer {
    reachable: HashSet<IpAddr>,
    dials: AtomicUsize,
}

impl ReachabilityDialer {
    pub fn new(reachable: &[IpAddr]) -> Self {
        Self {
            reachable: reachable.iter().copied().collect(),
            dials: AtomicUsize::new(0),
        }
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for ReachabilityDialer {
    async fn dial(
        &self,
        family: NetworkFamily,
        endpoint: &str,
        timeout: Duration,
    ) -> std::result::Result<(), ProbeError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let addr: SocketAddr = endpoint.parse().expect("test endpoints resolve");

        if self.reachable.contains(&addr.ip()) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        } else {
            tokio::time::sleep(timeout).await;
            Err(NetOpError::dial(
                family,
                addr,
                io::Error::new(io::ErrorKind::TimedOut, "i/o timeout"),
            )
            .into())
        }
    }
}

/// A cloud API that hands out a new address on every instance lookup
pub struct FakeCloud {
    /// Addresses returned by successive lookups; the last one repeats
    addresses: Mutex<VecDeque<IpAddr>>,
    last: Mutex<Option<IpAddr>>,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
    dual_stack_calls: Mutex<Vec<bool>>,
    get_calls: AtomicUsize,
    fail_toggles: bool,
}

impl FakeCloud {
    pub fn new(addresses: Vec<IpAddr>) -> Self {
        Self {
            addresses: Mutex::new(addresses.into()),
            last: Mutex::new(None),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
            dual_stack_calls: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            fail_toggles: false,
        }
    }

    /// Every attach/detach/dual-stack call fails
    pub fn failing_toggles(mut self) -> Self {
        self.fail_toggles = true;
        self
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn dual_stack_calls(&self) -> Vec<bool> {
        self.dual_stack_calls.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn toggle_result(&self) -> Result<()> {
        if self.fail_toggles {
            Err(Error::provider("fake", "operation failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CloudInstanceApi for FakeCloud {
    async fn get_instance(&self, _instance_name: &str) -> Result<InstanceInfo> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.addresses.lock().unwrap().pop_front() {
            *last = Some(next);
        }

        let mut info = InstanceInfo::default();
        match *last {
            Some(IpAddr::V4(v4)) => info.public_ipv4 = Some(v4),
            Some(IpAddr::V6(v6)) => info.ipv6_addresses.push(v6),
            None => return Err(Error::not_found("instance has no address")),
        }
        Ok(info)
    }

    async fn attach_static_ip(&self, _instance_name: &str, _static_ip_name: &str) -> Result<()> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        self.toggle_result()
    }

    async fn detach_static_ip(&self, _static_ip_name: &str) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        self.toggle_result()
    }

    async fn set_dual_stack(&self, _resource_name: &str, enabled: bool) -> Result<()> {
        self.dual_stack_calls.lock().unwrap().push(enabled);
        self.toggle_result()
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// An in-memory DDNS zone that can reject updates
pub struct FakeDdns {
    published: Mutex<HashSet<IpAddr>>,
    queried: Mutex<Vec<RecordType>>,
    upserts: Mutex<Vec<(NetworkFamily, String, IpAddr)>>,
    upsert_calls: AtomicUsize,
    /// Number of upserts to reject before accepting
    reject_upserts: usize,
}

impl FakeDdns {
    pub fn new(published: &[IpAddr]) -> Self {
        Self {
            published: Mutex::new(published.iter().copied().collect()),
            queried: Mutex::new(Vec::new()),
            upserts: Mutex::new(Vec::new()),
            upsert_calls: AtomicUsize::new(0),
            reject_upserts: 0,
        }
    }

    pub fn rejecting(mut self, count: usize) -> Self {
        self.reject_upserts = count;
        self
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> Vec<(NetworkFamily, String, IpAddr)> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn queried(&self) -> Vec<RecordType> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl DdnsClient for FakeDdns {
    async fn get_records(&self, record_type: RecordType, _domain: &str) -> Result<HashSet<IpAddr>> {
        self.queried.lock().unwrap().push(record_type);
        Ok(self.published.lock().unwrap().clone())
    }

    async fn upsert_record(&self, family: NetworkFamily, domain: &str, ip: IpAddr) -> Result<()> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.reject_upserts {
            return Err(Error::provider("fake", format!("upsert {call} rejected")));
        }

        self.upserts
            .lock()
            .unwrap()
            .push((family, domain.to_string(), ip));
        let mut published = self.published.lock().unwrap();
        published.clear();
        published.insert(ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// A notifier that records messages
pub struct FakeNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_webhook(&self, domain: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((domain.to_string(), message.to_string()));
        if self.fail {
            return Err(Error::provider("fake", "webhook returned 503"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "fake"
    }
}

pub fn identity(family: NetworkFamily) -> NodeIdentity {
    NodeIdentity {
        instance_name: "node-1".to_string(),
        domain: DOMAIN.to_string(),
        family,
        port: PORT,
        static_ip_name: "LightsailMon".to_string(),
    }
}

/// Build a node with default policy over the given doubles
pub async fn build_node(
    family: NetworkFamily,
    cloud: Arc<FakeCloud>,
    dialer: Arc<dyn Dialer>,
) -> Node {
    Node::new(identity(family), cloud, RemediationPolicy::default())
        .await
        .with_dialer(dialer)
}

pub fn ip(literal: &str) -> IpAddr {
    literal.parse().expect("valid test literal")
}
