//! Deploy and remove control flow across the three subsystems
//!
//! Deploy runs api, topology-updater, scheduler-plugin and stops at the first
//! failure. Remove runs the reverse order and attempts every subsystem, so a
//! half-installed stack can always be cleaned up.

pub mod api;
pub mod sched;
pub mod updater;

use tracing::{info, warn};

use tas_common::{Error, Platform, Result};
use tas_manifests::{sched as sched_manifests, ManifestObject, WaitConfig};

use crate::client::KubeClient;

pub use tas_manifests::Component as Subsystem;

/// Deploy order; removal runs it backwards
pub const DEPLOY_ORDER: [Subsystem; 3] = [
    Subsystem::Api,
    Subsystem::TopologyUpdater,
    Subsystem::SchedulerPlugin,
];

/// Settings shared by every subsystem step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Resolved platform
    pub platform: Platform,
    /// Execute the wait conditions of each plan
    pub wait_completion: bool,
    /// Updater configuration payload (empty for none)
    pub rte_config_data: String,
    /// Use `IfNotPresent` as image pull policy
    pub pull_if_not_present: bool,
    /// Scheduler replica count
    pub replicas: i32,
    /// Wait timing
    pub wait: WaitConfig,
}

impl Options {
    /// Defaults for a platform: no waits, no payload, one replica
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            wait_completion: false,
            rte_config_data: String::new(),
            pull_if_not_present: false,
            replicas: 1,
            wait: WaitConfig::default(),
        }
    }

    /// Check user-supplied values before anything is submitted
    pub fn validate(&self) -> Result<()> {
        sched_manifests::validate_replicas(self.replicas)
    }
}

/// Failures collected while removing
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Subsystems that failed, in the order they were attempted
    pub failures: Vec<(Subsystem, Error)>,
}

impl RemovalReport {
    /// True if every subsystem was removed cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deploy one subsystem; errors name the subsystem
pub async fn deploy(
    client: &dyn KubeClient,
    subsystem: Subsystem,
    options: &Options,
) -> Result<()> {
    options.validate()?;
    info!(subsystem = %subsystem, platform = %options.platform, "deploying");
    let result = match subsystem {
        Subsystem::Api => api::deploy(client, options).await,
        Subsystem::TopologyUpdater => updater::deploy(client, options).await,
        Subsystem::SchedulerPlugin => sched::deploy(client, options).await,
    };
    result.map_err(|e| Error::in_subsystem(subsystem.as_str(), e))?;
    info!(subsystem = %subsystem, "deployed");
    Ok(())
}

/// Remove one subsystem; errors name the subsystem
pub async fn remove(
    client: &dyn KubeClient,
    subsystem: Subsystem,
    options: &Options,
) -> Result<()> {
    info!(subsystem = %subsystem, platform = %options.platform, "removing");
    let result = match subsystem {
        Subsystem::Api => api::remove(client, options).await,
        Subsystem::TopologyUpdater => updater::remove(client, options).await,
        Subsystem::SchedulerPlugin => sched::remove(client, options).await,
    };
    result.map_err(|e| Error::in_subsystem(subsystem.as_str(), e))?;
    info!(subsystem = %subsystem, "removed");
    Ok(())
}

/// Deploy every subsystem in order, stopping at the first failure
pub async fn deploy_all(client: &dyn KubeClient, options: &Options) -> Result<()> {
    options.validate()?;
    for subsystem in DEPLOY_ORDER {
        deploy(client, subsystem, options).await?;
    }
    Ok(())
}

/// Remove every subsystem in reverse order, collecting failures
pub async fn remove_all(client: &dyn KubeClient, options: &Options) -> RemovalReport {
    let mut report = RemovalReport::default();
    for subsystem in DEPLOY_ORDER.into_iter().rev() {
        if let Err(e) = remove(client, subsystem, options).await {
            warn!(subsystem = %subsystem, error = %e, "error removing, continuing");
            report.failures.push((subsystem, e));
        }
    }
    report
}

/// Patched objects of one subsystem, in render order
pub fn render(subsystem: Subsystem, options: &Options) -> Result<Vec<ManifestObject>> {
    match subsystem {
        Subsystem::Api => Ok(api::manifests()?.to_objects()),
        Subsystem::TopologyUpdater => Ok(updater::manifests(options)?.to_objects()),
        Subsystem::SchedulerPlugin => Ok(sched::manifests(options)?.to_objects()),
    }
}

/// Patched objects of every subsystem, in deploy order
pub fn render_all(options: &Options) -> Result<Vec<ManifestObject>> {
    let mut objs = Vec::new();
    for subsystem in DEPLOY_ORDER {
        objs.extend(render(subsystem, options)?);
    }
    Ok(objs)
}
