//! In-place field patches applied to cloned templates
//!
//! Every helper replaces rather than appends, so applying the same patch
//! twice leaves the object unchanged.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, PodSpec, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{RoleBinding, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use tas_common::{Error, Result, LABEL_MANAGED_BY, MANAGED_BY};

pub(crate) const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";
pub(crate) const PULL_ALWAYS: &str = "Always";

pub(crate) fn set_namespace(meta: &mut ObjectMeta, namespace: &str) {
    meta.namespace = Some(namespace.to_string());
}

/// Labels stamped on objects the deployer generates rather than loads
pub(crate) fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string())])
}

/// Bind the role to exactly one service account subject
pub(crate) fn update_role_binding(rb: &mut RoleBinding, service_account: &str, namespace: &str) {
    set_namespace(&mut rb.metadata, namespace);
    rb.subjects = Some(vec![Subject {
        kind: "ServiceAccount".to_string(),
        name: service_account.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }]);
}

pub(crate) fn set_pull_policy(spec: &mut PodSpec, pull_if_not_present: bool) {
    let policy = if pull_if_not_present {
        PULL_IF_NOT_PRESENT
    } else {
        PULL_ALWAYS
    };
    let init = spec.init_containers.iter_mut().flatten();
    for c in spec.containers.iter_mut().chain(init) {
        c.image_pull_policy = Some(policy.to_string());
    }
}

pub(crate) fn container_mut<'a>(spec: &'a mut PodSpec, name: &str) -> Result<&'a mut Container> {
    spec.containers
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            Error::template("workload", format!("workload has no container named {name}"))
        })
}

pub(crate) fn set_privileged(container: &mut Container) {
    let ctx = container
        .security_context
        .get_or_insert_with(SecurityContext::default);
    ctx.privileged = Some(true);
}

/// Add (or replace) a ConfigMap-backed volume and mount it into one container
pub(crate) fn upsert_config_volume(
    spec: &mut PodSpec,
    container: &str,
    volume_name: &str,
    config_map: &str,
    mount_path: &str,
) -> Result<()> {
    let volume = Volume {
        name: volume_name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };

    let volumes = spec.volumes.get_or_insert_with(Vec::new);
    volumes.retain(|v| v.name != volume_name);
    volumes.push(volume);

    let mounts = container_mut(spec, container)?
        .volume_mounts
        .get_or_insert_with(Vec::new);
    mounts.retain(|m| m.name != volume_name);
    mounts.push(VolumeMount {
        name: volume_name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: Some(true),
        ..Default::default()
    });
    Ok(())
}

/// Drop a volume and every mount of it
pub(crate) fn remove_volume(spec: &mut PodSpec, volume_name: &str) {
    if let Some(volumes) = spec.volumes.as_mut() {
        volumes.retain(|v| v.name != volume_name);
    }
    for c in spec.containers.iter_mut() {
        if let Some(mounts) = c.volume_mounts.as_mut() {
            mounts.retain(|m| m.name != volume_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_spec() -> PodSpec {
        PodSpec {
            containers: vec![
                Container {
                    name: "main".to_string(),
                    image_pull_policy: Some("Never".to_string()),
                    ..Default::default()
                },
                Container {
                    name: "sidecar".to_string(),
                    ..Default::default()
                },
            ],
            init_containers: Some(vec![Container {
                name: "init".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn pull_policy_applies_to_every_container() {
        let mut spec = pod_spec();
        set_pull_policy(&mut spec, true);
        let init = spec.init_containers.as_ref().unwrap();
        for c in spec.containers.iter().chain(init) {
            assert_eq!(c.image_pull_policy.as_deref(), Some("IfNotPresent"));
        }

        set_pull_policy(&mut spec, false);
        assert!(spec
            .containers
            .iter()
            .all(|c| c.image_pull_policy.as_deref() == Some("Always")));
    }

    #[test]
    fn role_binding_gets_a_single_subject() {
        let mut rb = RoleBinding::default();
        rb.subjects = Some(vec![Subject::default(), Subject::default()]);
        update_role_binding(&mut rb, "rte", "tas");

        let subjects = rb.subjects.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].kind, "ServiceAccount");
        assert_eq!(subjects[0].name, "rte");
        assert_eq!(subjects[0].namespace.as_deref(), Some("tas"));
        assert_eq!(rb.metadata.namespace.as_deref(), Some("tas"));
    }

    #[test]
    fn config_volume_upsert_is_idempotent() {
        let mut spec = pod_spec();
        upsert_config_volume(&mut spec, "main", "cfg", "cm", "/etc/cfg").unwrap();
        let once = spec.clone();
        upsert_config_volume(&mut spec, "main", "cfg", "cm", "/etc/cfg").unwrap();
        assert_eq!(spec, once);

        assert_eq!(spec.volumes.as_ref().unwrap().len(), 1);
        let mounts = spec.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/etc/cfg");
        assert!(spec.containers[1].volume_mounts.is_none());
    }

    #[test]
    fn config_volume_needs_the_target_container() {
        let mut spec = pod_spec();
        let err = upsert_config_volume(&mut spec, "missing", "cfg", "cm", "/etc/cfg").unwrap_err();
        assert!(err.to_string().contains("no container named missing"));
    }

    #[test]
    fn removing_a_volume_drops_its_mounts() {
        let mut spec = pod_spec();
        upsert_config_volume(&mut spec, "main", "cfg", "cm", "/etc/cfg").unwrap();
        remove_volume(&mut spec, "cfg");
        assert!(spec.volumes.as_ref().unwrap().is_empty());
        assert!(spec.containers[0].volume_mounts.as_ref().unwrap().is_empty());
    }

    #[test]
    fn privileged_keeps_other_security_settings() {
        let mut c = Container {
            security_context: Some(SecurityContext {
                run_as_user: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        set_privileged(&mut c);
        let ctx = c.security_context.unwrap();
        assert_eq!(ctx.privileged, Some(true));
        assert_eq!(ctx.run_as_user, Some(0));
    }
}
