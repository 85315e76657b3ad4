//! Scheduler plugin subsystem steps
//!
//! The scheduler configuration names the namespace the topology updater
//! publishes into, so the updater set is resolved first.

use tas_common::Result;
use tas_manifests::{sched, ManifestSet, UpdateOptions};

use crate::apply::{create_objects, delete_objects};
use crate::client::KubeClient;
use crate::orchestrator::{updater, Options};

/// The patched scheduler set for these options
pub fn manifests(options: &Options) -> Result<ManifestSet> {
    patched(options, Some(options.replicas))
}

fn patched(options: &Options, replicas: Option<i32>) -> Result<ManifestSet> {
    let peer = updater::manifests(options)?;
    sched::get_manifests(options.platform)?.update(&UpdateOptions {
        pull_if_not_present: options.pull_if_not_present,
        replicas,
        peer_namespace: Some(peer.namespace().to_string()),
        ..Default::default()
    })
}

/// Create the secondary scheduler and its dependencies
pub async fn deploy(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = manifests(options)?.to_creatable_objects(options.wait.timeout);
    create_objects(client, &plan, options).await
}

/// Delete the secondary scheduler and its dependencies; the replica count
/// plays no part in removal and is not checked
pub async fn remove(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = patched(options, None)?.to_deletable_objects(options.wait.timeout);
    delete_objects(client, &plan, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_common::{Error, Platform};

    #[test]
    fn scheduler_config_points_at_updater_namespace() {
        let set = manifests(&Options::new(Platform::Kubernetes)).unwrap();
        let cm = set.config_map.as_ref().unwrap();
        let config = &cm.data.as_ref().unwrap()[sched::CONFIG_KEY];
        assert!(config.contains("- tas-topology-updater"));
    }

    #[test]
    fn invalid_replicas_fail_before_any_call() {
        let options = Options {
            replicas: 0,
            ..Options::new(Platform::Kubernetes)
        };
        assert!(matches!(manifests(&options), Err(Error::Validation { .. })));
    }

    #[test]
    fn removal_plan_ignores_the_replica_count() {
        let options = Options {
            replicas: 0,
            ..Options::new(Platform::Kubernetes)
        };
        let plan = patched(&options, None)
            .unwrap()
            .to_deletable_objects(options.wait.timeout);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].object.name(), "tas-scheduler");
    }
}
