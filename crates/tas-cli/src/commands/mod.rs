//! CLI commands

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tracing::{debug, warn};

use tas_common::Platform;
use tas_deployer::{detect_platform, KubeRsClient, Options, Subsystem};
use tas_manifests::waitable::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT};
use tas_manifests::WaitConfig;

use crate::{Error, Result};

pub mod deploy;
pub mod detect;
pub mod remove;
pub mod render;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Options shared by every command
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Cluster platform: kubernetes (k8s) or openshift (ocp); autodetected if unset
    #[arg(long, env = "TAS_PLATFORM", value_parser = parse_platform, global = true)]
    pub platform: Option<Platform>,

    /// Path to kubeconfig file (default: $KUBECONFIG or in-cluster config)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use IfNotPresent image pull policy instead of Always
    #[arg(long, global = true)]
    pub pull_if_not_present: bool,

    /// Scheduler plugin replica count
    #[arg(long, default_value_t = 1, global = true)]
    pub replicas: i32,

    /// Topology updater configuration, inline
    #[arg(long, global = true)]
    pub rte_config_data: Option<String>,

    /// Topology updater configuration, read from a file (wins over --rte-config-data)
    #[arg(long, global = true)]
    pub rte_config_file: Option<PathBuf>,
}

impl CommonArgs {
    /// The updater payload; the file wins when both sources are given
    pub fn rte_config_data(&self) -> Result<String> {
        if let Some(path) = &self.rte_config_file {
            debug!(path = %path.display(), "reading topology updater config");
            return Ok(std::fs::read_to_string(path)?);
        }
        Ok(self.rte_config_data.clone().unwrap_or_default())
    }

    /// Orchestrator options for a resolved platform
    pub fn options(&self, platform: Platform, wait: Option<&LifecycleArgs>) -> Result<Options> {
        Ok(Options {
            platform,
            wait_completion: wait.is_some_and(|w| w.wait),
            rte_config_data: self.rte_config_data()?,
            pull_if_not_present: self.pull_if_not_present,
            replicas: self.replicas,
            wait: WaitConfig {
                timeout: wait.map_or(DEFAULT_WAIT_TIMEOUT, |w| w.wait_timeout),
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
        })
    }

    /// Options for removal; an unreadable payload file only drops the payload
    pub fn removal_options(&self, platform: Platform, wait: &LifecycleArgs) -> Options {
        let rte_config_data = self.rte_config_data().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read topology updater config, removing without it");
            String::new()
        });
        Options {
            platform,
            wait_completion: wait.wait,
            rte_config_data,
            pull_if_not_present: self.pull_if_not_present,
            replicas: self.replicas,
            wait: WaitConfig {
                timeout: wait.wait_timeout,
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
        }
    }

    /// Connect to the cluster this invocation targets
    pub async fn connect(&self) -> Result<KubeRsClient> {
        Ok(KubeRsClient::connect(self.kubeconfig.as_deref()).await?)
    }

    /// User choice, else the API probe; fails if neither yields a platform
    pub async fn resolve_platform(&self, client: &KubeRsClient) -> Result<Platform> {
        let detection = detect_platform(client, self.platform.unwrap_or_default()).await;
        Ok(detection.require_known()?)
    }
}

/// Arguments of `deploy` and `remove`
#[derive(Args, Debug)]
pub struct LifecycleArgs {
    #[command(subcommand)]
    pub target: Option<Target>,

    /// Wait for every step to be completed
    #[arg(short = 'W', long, global = true)]
    pub wait: bool,

    /// Upper bound for each wait (e.g. 90s, 3m)
    #[arg(long, default_value = "3m", value_parser = parse_duration, global = true)]
    pub wait_timeout: Duration,
}

/// A single subsystem
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The NodeResourceTopology API
    Api,
    /// The topology-aware scheduler plugin
    SchedulerPlugin,
    /// The resource topology updater
    TopologyUpdater,
}

impl From<Target> for Subsystem {
    fn from(t: Target) -> Self {
        match t {
            Target::Api => Subsystem::Api,
            Target::SchedulerPlugin => Subsystem::SchedulerPlugin,
            Target::TopologyUpdater => Subsystem::TopologyUpdater,
        }
    }
}

fn parse_platform(s: &str) -> std::result::Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}

/// Parse a human-friendly duration string.
///
/// Supports `Nh` (hours), `Nm` (minutes), `Ns` (seconds) and raw seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid =
        || Error::validation(format!("invalid duration '{s}', expected e.g. 90s, 3m, 1h"));
    let (digits, unit) = if let Some(h) = s.strip_suffix('h') {
        (h, 3600)
    } else if let Some(m) = s.strip_suffix('m') {
        (m, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s, 1)
    };
    let n: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = n
        .checked_mul(unit)
        .ok_or_else(|| Error::validation(format!("duration '{s}' is too large")))?;
    Ok(Duration::from_secs(secs))
}
