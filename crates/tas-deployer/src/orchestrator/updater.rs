//! Topology updater subsystem steps

use tracing::debug;

use tas_common::Result;
use tas_manifests::{updater, ManifestSet, UpdateOptions};

use crate::apply::{create_objects, delete_objects};
use crate::client::KubeClient;
use crate::orchestrator::Options;

/// The patched updater set for these options
pub fn manifests(options: &Options) -> Result<ManifestSet> {
    let set = updater::get_manifests(options.platform)?.update(&UpdateOptions {
        config_data: options.rte_config_data.clone(),
        pull_if_not_present: options.pull_if_not_present,
        ..Default::default()
    })?;
    debug!(
        namespace = %set.namespace(),
        config = set.config_map.is_some(),
        "topology updater manifests"
    );
    Ok(set)
}

/// Create the exporter DaemonSet and its dependencies
pub async fn deploy(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = manifests(options)?.to_creatable_objects(options.wait.timeout);
    create_objects(client, &plan, options).await
}

/// Delete the exporter DaemonSet and its dependencies
pub async fn remove(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = manifests(options)?.to_deletable_objects(options.wait.timeout);
    delete_objects(client, &plan, options).await
}
