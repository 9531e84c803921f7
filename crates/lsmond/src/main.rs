// # lsmond - Node Monitor Runner
//
// Thin integration layer: all health-check and remediation logic lives in
// lsmon-core. This binary runs exactly ONE check cycle per configured node
// and exits, so it is meant to be driven by cron or a systemd timer.
//
// Responsibilities:
// 1. Reading settings from environment variables
// 2. Loading and validating the JSON configuration file
// 3. Initializing logging and the runtime
// 4. Registering the built-in integrations
// 5. Building every node and running one cycle per node concurrently
//
// ## Environment
//
// - `LSMON_CONFIG`: Path to the JSON configuration (default `/etc/lsmon/config.json`)
// - `LSMON_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export LSMON_CONFIG=/etc/lsmon/config.json
// export LSMON_LOG_LEVEL=debug
//
// lsmond
// ```

use anyhow::{Context, Result};
use lsmon_core::{ClientRegistry, CycleOutcome, MonitorConfig, Node, NodeConfig};
use lsmon_core::{DdnsClient, Notifier, RemediationPolicy};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG_PATH: &str = "/etc/lsmon/config.json";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Every cycle ran
/// - 1: Configuration or startup error
/// - 2: Runtime error (a node could not be built or a cycle panicked)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LsmonExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<LsmonExitCode> for ExitCode {
    fn from(code: LsmonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process-level settings
struct Settings {
    config_path: String,
    log_level: String,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            config_path: env::var("LSMON_CONFIG")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
            log_level: env::var("LSMON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "LSMON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn load_config(path: &str) -> Result<MonitorConfig> {
    let config = MonitorConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {path}"))?;
    config.validate().context("Configuration validation error")?;
    Ok(config)
}

/// Capabilities shared by every node
struct Capabilities {
    registry: ClientRegistry,
    ddns: Option<Arc<dyn DdnsClient>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Capabilities {
    fn from_config(config: &MonitorConfig) -> Result<Self> {
        let registry = ClientRegistry::new();

        #[cfg(feature = "lightsail")]
        {
            info!("Registering Lightsail cloud client");
            lsmon_cloud_lightsail::register(&registry);
        }

        #[cfg(feature = "cloudflare")]
        {
            info!("Registering Cloudflare DDNS client");
            lsmon_ddns_cloudflare::register(&registry);
        }

        #[cfg(feature = "webhook")]
        {
            info!("Registering webhook notifier");
            lsmon_notify_webhook::register(&registry);
        }

        let ddns = config
            .ddns
            .as_ref()
            .map(|c| registry.create_ddns(c))
            .transpose()
            .context("Failed to create DDNS client")?;
        if ddns.is_none() {
            warn!("No DDNS client configured; DNS records will not be updated");
        }

        let notifier = config
            .notifier
            .as_ref()
            .map(|c| registry.create_notifier(c))
            .transpose()
            .context("Failed to create notifier")?;

        Ok(Self {
            registry,
            ddns,
            notifier,
        })
    }

    async fn build_node(&self, config: &NodeConfig, policy: &RemediationPolicy) -> Result<Node> {
        let cloud = self
            .registry
            .create_cloud(config)
            .with_context(|| format!("Failed to create cloud client for {}", config.domain))?;

        let mut node = Node::new(config.identity(), cloud, policy.clone()).await;
        if let Some(timeout) = config.timeout_secs {
            node.set_timeout(timeout);
        }
        if let Some(ddns) = &self.ddns {
            node.set_ddns_client(ddns.clone());
        }
        if let Some(notifier) = &self.notifier {
            node.set_notifier(notifier.clone());
        }
        Ok(node)
    }
}

fn main() -> ExitCode {
    let settings = Settings::from_env();

    let log_level = match settings.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return LsmonExitCode::ConfigError.into();
        }
    };

    let config = match load_config(&settings.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return LsmonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return LsmonExitCode::ConfigError.into();
    }

    info!("Starting lsmond");
    info!("Configuration loaded: {} node(s)", config.nodes.len());

    let capabilities = match Capabilities::from_config(&config) {
        Ok(capabilities) => capabilities,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return LsmonExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LsmonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_cycles(config, capabilities)).into()
}

/// Build every node and run one cycle for each, concurrently
async fn run_cycles(config: MonitorConfig, capabilities: Capabilities) -> LsmonExitCode {
    let mut exit_code = LsmonExitCode::Success;
    let mut cycles = JoinSet::new();

    for node_config in &config.nodes {
        let mut node = match capabilities.build_node(node_config, &config.policy).await {
            Ok(node) => node,
            Err(e) => {
                error!("{:#}", e);
                exit_code = LsmonExitCode::RuntimeError;
                continue;
            }
        };

        // Each task owns its node, so a node never runs two cycles at once
        cycles.spawn(async move {
            let outcome = node.run_cycle().await;
            (node.state().domain().to_string(), outcome)
        });
    }

    while let Some(joined) = cycles.join_next().await {
        match joined {
            Ok((domain, outcome)) => report(&domain, &outcome),
            Err(e) => {
                error!("Check cycle task failed: {}", e);
                exit_code = LsmonExitCode::RuntimeError;
            }
        }
    }

    info!("All check cycles finished");
    exit_code
}

fn report(domain: &str, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Healthy { latency_ms, dns } => {
            info!(domain, ?latency_ms, ?dns, "Node healthy");
        }
        CycleOutcome::Remediated(report) if report.is_success() => {
            info!(
                domain,
                attempts = report.attempts,
                address = ?report.address,
                "Node remediated"
            );
        }
        CycleOutcome::Remediated(report) => {
            warn!(
                domain,
                attempts = report.attempts,
                notification = ?report.notification,
                dns = ?report.dns,
                "Node still blocked after remediation"
            );
        }
    }
}
