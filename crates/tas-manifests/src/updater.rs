//! Topology updater (resource-topology-exporter) manifests

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use tas_common::{Platform, Result};

use crate::set::{ManifestSet, UpdateOptions, VanillaIdentity};
use crate::store::TemplateStore;
use crate::{patch, Component};

/// Namespace reused on OpenShift
pub const OPENSHIFT_NAMESPACE: &str = "openshift-monitoring";
/// Service account reused on OpenShift
pub const OPENSHIFT_SERVICE_ACCOUNT: &str = "node-exporter";

/// Name of the ConfigMap carrying the exporter configuration
pub const CONFIG_MAP_NAME: &str = "rte-config";
/// Key of the configuration payload inside the ConfigMap
pub const CONFIG_KEY: &str = "config.yaml";

const EXPORTER_CONTAINER: &str = "resource-topology-exporter-container";
const CONFIG_VOLUME: &str = "rte-config";
const CONFIG_MOUNT_PATH: &str = "/etc/resource-topology-exporter/";

const VANILLA: VanillaIdentity = VanillaIdentity {
    namespace: OPENSHIFT_NAMESPACE,
    service_account: OPENSHIFT_SERVICE_ACCOUNT,
};

/// Updater set for a platform, using the embedded templates
pub fn get_manifests(platform: Platform) -> Result<ManifestSet> {
    get_manifests_from(TemplateStore::embedded()?, platform)
}

/// Updater set placed into an already existing namespace
pub fn get_manifests_for_namespace(platform: Platform, namespace: &str) -> Result<ManifestSet> {
    get_manifests_for_namespace_from(TemplateStore::embedded()?, platform, namespace)
}

/// Like [`get_manifests`] with an explicit template store
pub fn get_manifests_from(store: &TemplateStore, platform: Platform) -> Result<ManifestSet> {
    ManifestSet::build(store, Component::TopologyUpdater, platform, None, VANILLA)
}

/// Like [`get_manifests_for_namespace`] with an explicit template store
pub fn get_manifests_for_namespace_from(
    store: &TemplateStore,
    platform: Platform,
    namespace: &str,
) -> Result<ManifestSet> {
    ManifestSet::build(
        store,
        Component::TopologyUpdater,
        platform,
        Some(namespace),
        VANILLA,
    )
}

pub(crate) fn apply(set: &mut ManifestSet, options: &UpdateOptions) -> Result<()> {
    let namespace = set.namespace().to_string();
    let privileged = set.platform() == Platform::OpenShift;

    set.config_map = if options.config_data.is_empty() {
        None
    } else {
        Some(config_map(&namespace, &options.config_data))
    };
    let has_config = set.config_map.is_some();

    let spec = set.pod_spec_mut()?;
    if has_config {
        patch::upsert_config_volume(
            spec,
            EXPORTER_CONTAINER,
            CONFIG_VOLUME,
            CONFIG_MAP_NAME,
            CONFIG_MOUNT_PATH,
        )?;
    } else {
        patch::remove_volume(spec, CONFIG_VOLUME);
    }

    if privileged {
        patch::set_privileged(patch::container_mut(spec, EXPORTER_CONTAINER)?);
    }
    Ok(())
}

fn config_map(namespace: &str, data: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(CONFIG_MAP_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(patch::managed_labels()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(CONFIG_KEY.to_string(), data.to_string())])),
        ..Default::default()
    }
}
