//! Scheduler plugin manifests
//!
//! The scheduler looks NodeResourceTopology objects up in the namespace the
//! topology updater runs in, so its configuration can only be rendered once
//! the updater set has been resolved.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;

use tas_common::{Error, Platform, Result};

use crate::object::Workload;
use crate::set::{ManifestSet, UpdateOptions, VanillaIdentity};
use crate::store::TemplateStore;
use crate::{patch, Component};

/// Namespace reused on OpenShift
pub const OPENSHIFT_NAMESPACE: &str = "openshift-kube-scheduler";
/// Service account reused on OpenShift
pub const OPENSHIFT_SERVICE_ACCOUNT: &str = "openshift-kube-scheduler-sa";

/// ConfigMap carrying the rendered scheduler configuration
pub const CONFIG_MAP_NAME: &str = "scheduler-config";
/// Key of the scheduler configuration inside the ConfigMap
pub const CONFIG_KEY: &str = "scheduler-config.yaml";

const NAMESPACE_PLACEHOLDER: &str = "${NODE_RESOURCES_NAMESPACE}";

const VANILLA: VanillaIdentity = VanillaIdentity {
    namespace: OPENSHIFT_NAMESPACE,
    service_account: OPENSHIFT_SERVICE_ACCOUNT,
};

/// Scheduler set for a platform, using the embedded templates
pub fn get_manifests(platform: Platform) -> Result<ManifestSet> {
    get_manifests_from(TemplateStore::embedded()?, platform)
}

/// Scheduler set placed into an already existing namespace
pub fn get_manifests_for_namespace(platform: Platform, namespace: &str) -> Result<ManifestSet> {
    get_manifests_for_namespace_from(TemplateStore::embedded()?, platform, namespace)
}

/// Like [`get_manifests`] with an explicit template store
pub fn get_manifests_from(store: &TemplateStore, platform: Platform) -> Result<ManifestSet> {
    ManifestSet::build(store, Component::SchedulerPlugin, platform, None, VANILLA)
}

/// Like [`get_manifests_for_namespace`] with an explicit template store
pub fn get_manifests_for_namespace_from(
    store: &TemplateStore,
    platform: Platform,
    namespace: &str,
) -> Result<ManifestSet> {
    ManifestSet::build(
        store,
        Component::SchedulerPlugin,
        platform,
        Some(namespace),
        VANILLA,
    )
}

/// Substitute the updater namespace into the scheduler configuration template
pub fn render_config(template: &str, node_resources_namespace: &str) -> String {
    template.replace(NAMESPACE_PLACEHOLDER, node_resources_namespace)
}

/// Reject replica counts that would deploy no scheduler at all
pub fn validate_replicas(replicas: i32) -> Result<()> {
    if replicas < 1 {
        return Err(Error::validation_for_field(
            "replicas",
            format!("replicas must be at least 1, got {replicas}"),
        ));
    }
    Ok(())
}

pub(crate) fn apply(set: &mut ManifestSet, options: &UpdateOptions) -> Result<()> {
    let peer = options
        .peer_namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| {
            Error::precondition("sched::update", "topology updater namespace is not resolved")
        })?;

    if let Some(replicas) = options.replicas {
        validate_replicas(replicas)?;
        if let Workload::Deployment(dp) = &mut set.workload {
            if let Some(spec) = dp.spec.as_mut() {
                spec.replicas = Some(replicas);
            }
        }
    }

    let template = set.config_template().ok_or_else(|| {
        Error::template(Component::SchedulerPlugin.as_str(), "missing scheduler config template")
    })?;
    let rendered = render_config(template, peer);
    set.config_map = Some(config_map(set.namespace(), rendered));

    debug!(node_resources_namespace = %peer, "rendered scheduler configuration");
    Ok(())
}

fn config_map(namespace: &str, config: String) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(CONFIG_MAP_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(patch::managed_labels()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(CONFIG_KEY.to_string(), config)])),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater;

    fn options(peer: &str, replicas: Option<i32>) -> UpdateOptions {
        UpdateOptions {
            peer_namespace: Some(peer.to_string()),
            replicas,
            ..Default::default()
        }
    }

    fn replicas(set: &ManifestSet) -> Option<i32> {
        match &set.workload {
            Workload::Deployment(dp) => dp.spec.as_ref().and_then(|s| s.replicas),
            Workload::DaemonSet(_) => None,
        }
    }

    #[test]
    fn kubernetes_owns_scheduler_namespace() {
        let set = get_manifests(Platform::Kubernetes).unwrap();
        assert_eq!(set.namespace(), "tas-scheduler");
        assert_eq!(set.service_account(), "topology-aware-scheduler");
        assert!(set.namespace.is_some());
    }

    #[test]
    fn openshift_uses_platform_scheduler_identity() {
        let set = get_manifests(Platform::OpenShift).unwrap();
        assert_eq!(set.namespace(), OPENSHIFT_NAMESPACE);
        assert_eq!(set.service_account(), OPENSHIFT_SERVICE_ACCOUNT);
        assert!(set.namespace.is_none() && set.service_account.is_none());
    }

    // ==========================================================================
    // Story: Scheduler configuration follows the updater namespace
    // ==========================================================================

    #[test]
    fn config_embeds_the_updater_namespace() {
        let peer = updater::get_manifests(Platform::OpenShift).unwrap();
        let set = get_manifests(Platform::OpenShift)
            .unwrap()
            .update(&options(peer.namespace(), None))
            .unwrap();

        let cm = set.config_map.as_ref().unwrap();
        assert_eq!(cm.metadata.namespace.as_deref(), Some(OPENSHIFT_NAMESPACE));
        let config = &cm.data.as_ref().unwrap()[CONFIG_KEY];
        assert!(config.contains("- openshift-monitoring"));
        assert!(!config.contains(NAMESPACE_PLACEHOLDER));
        assert!(config.contains("NodeResourceTopologyMatch"));
    }

    #[test]
    fn config_map_is_always_present_after_update() {
        let set = get_manifests(Platform::Kubernetes)
            .unwrap()
            .update(&options("tas-topology-updater", None))
            .unwrap();
        assert!(set.config_map.is_some());

        let kinds: Vec<_> = set.to_objects().iter().map(|o| o.kind()).collect();
        assert_eq!(
            kinds,
            ["Namespace", "ServiceAccount", "Role", "RoleBinding", "ConfigMap", "Deployment"]
        );
    }

    #[test]
    fn when_peer_namespace_missing_update_fails() {
        let base = get_manifests(Platform::Kubernetes).unwrap();
        let err = base.update(&UpdateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));

        let err = base.update(&options("", None)).unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
        assert!(err.to_string().contains("[sched::update]"));
    }

    #[test]
    fn replica_counts_below_one_are_rejected() {
        assert!(validate_replicas(1).is_ok());
        assert!(validate_replicas(3).is_ok());
        let err = validate_replicas(0).unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "replicas"));
        assert!(validate_replicas(-2).is_err());
    }

    // ==========================================================================
    // Story: Replica count
    // ==========================================================================

    #[test]
    fn replicas_are_applied() {
        let base = get_manifests(Platform::Kubernetes).unwrap();
        assert_eq!(replicas(&base), Some(1));

        let set = base.update(&options("ns", Some(3))).unwrap();
        assert_eq!(replicas(&set), Some(3));

        let kept = base.update(&options("ns", None)).unwrap();
        assert_eq!(replicas(&kept), Some(1));
    }

    #[test]
    fn when_replicas_below_one_update_is_rejected() {
        let base = get_manifests(Platform::Kubernetes).unwrap();
        for bad in [0, -2] {
            let err = base.update(&options("ns", Some(bad))).unwrap_err();
            match err {
                Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some("replicas")),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn scheduler_update_is_idempotent() {
        let base = get_manifests(Platform::Kubernetes).unwrap();
        let opts = UpdateOptions {
            pull_if_not_present: true,
            ..options("tas-topology-updater", Some(2))
        };
        let once = base.update(&opts).unwrap();
        assert_eq!(once.update(&opts).unwrap(), once);
    }

    #[test]
    fn render_config_replaces_every_placeholder() {
        let template = "a: ${NODE_RESOURCES_NAMESPACE}\nb: ${NODE_RESOURCES_NAMESPACE}\n";
        let out = render_config(template, "x");
        assert_eq!(out, "a: x\nb: x\n");
    }
}
