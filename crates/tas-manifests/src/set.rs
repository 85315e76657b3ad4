//! Manifest Set: the patched objects of one namespaced subsystem

use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PodSpec, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use tracing::debug;

use tas_common::{Error, Platform, Result};

use crate::object::{ManifestObject, Workload};
use crate::store::TemplateStore;
use crate::waitable::{WaitCondition, WaitableObject};
use crate::{patch, sched, updater, Component};

/// Runtime values patched into a cloned set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Updater configuration payload; empty means no ConfigMap
    pub config_data: String,
    /// Use `IfNotPresent` instead of `Always` as image pull policy
    pub pull_if_not_present: bool,
    /// Scheduler replica count; `None` keeps the template value
    pub replicas: Option<i32>,
    /// Resolved updater namespace, required by the scheduler
    pub peer_namespace: Option<String>,
}

/// Objects of the topology updater or the scheduler plugin
///
/// Obtained from [`updater::get_manifests`] or [`sched::get_manifests`]
/// (and their `_for_namespace` variants). Values are never patched in place:
/// [`ManifestSet::update`] returns a new set.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestSet {
    /// Component namespace, owned on Kubernetes unless it already existed
    pub namespace: Option<Namespace>,
    /// Component service account, owned on Kubernetes only
    pub service_account: Option<ServiceAccount>,
    /// Namespaced role
    pub role: Role,
    /// Binding of role to service account
    pub role_binding: RoleBinding,
    /// Configuration payload
    pub config_map: Option<ConfigMap>,
    /// The component workload
    pub workload: Workload,

    component: Component,
    platform: Platform,
    namespace_name: String,
    service_account_name: String,
    config_template: Option<String>,
}

/// Namespace and service account reused on the vanilla variant
pub(crate) struct VanillaIdentity {
    pub namespace: &'static str,
    pub service_account: &'static str,
}

impl ManifestSet {
    pub(crate) fn build(
        store: &TemplateStore,
        component: Component,
        platform: Platform,
        existing_namespace: Option<&str>,
        vanilla: VanillaIdentity,
    ) -> Result<Self> {
        if !platform.is_known() {
            return Err(Error::precondition(
                "ManifestSet::build",
                format!("platform must be resolved before building {component} manifests"),
            ));
        }
        if existing_namespace.is_some_and(str::is_empty) {
            return Err(Error::precondition(
                "ManifestSet::build",
                format!("namespace for {component} must not be empty"),
            ));
        }
        let templates = store.component(component).ok_or_else(|| {
            Error::internal_with_context(
                component.as_str(),
                "component has no namespaced templates",
            )
        })?;

        let (namespace, namespace_name) = match (platform.owns_namespace(), existing_namespace) {
            (_, Some(ns)) => (None, ns.to_string()),
            (true, None) => {
                let ns = templates.namespace.clone();
                let name = ns.metadata.name.clone().unwrap_or_default();
                (Some(ns), name)
            }
            (false, None) => (None, vanilla.namespace.to_string()),
        };

        let (service_account, service_account_name) = if platform.owns_namespace() {
            let sa = templates.service_account.clone();
            let name = sa.metadata.name.clone().unwrap_or_default();
            (Some(sa), name)
        } else {
            (None, vanilla.service_account.to_string())
        };

        debug!(
            component = %component,
            platform = %platform,
            namespace = %namespace_name,
            service_account = %service_account_name,
            "built manifest set"
        );

        Ok(Self {
            namespace,
            service_account,
            role: templates.role.clone(),
            role_binding: templates.role_binding.clone(),
            config_map: None,
            workload: templates.workload.clone(),
            component,
            platform,
            namespace_name,
            service_account_name,
            config_template: templates.config.clone(),
        })
    }

    /// Subsystem this set belongs to
    pub fn component(&self) -> Component {
        self.component
    }

    /// Platform the set was built for
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Namespace every namespaced object is placed in
    pub fn namespace(&self) -> &str {
        &self.namespace_name
    }

    /// Service account the workload runs as
    pub fn service_account(&self) -> &str {
        &self.service_account_name
    }

    pub(crate) fn config_template(&self) -> Option<&str> {
        self.config_template.as_deref()
    }

    /// Patch a clone with runtime values; `self` is left untouched
    pub fn update(&self, options: &UpdateOptions) -> Result<Self> {
        let mut ret = self.clone();
        let ns = self.namespace_name.as_str();
        let sa = self.service_account_name.as_str();

        if let Some(account) = ret.service_account.as_mut() {
            patch::set_namespace(&mut account.metadata, ns);
        }
        patch::set_namespace(&mut ret.role.metadata, ns);
        patch::update_role_binding(&mut ret.role_binding, sa, ns);
        patch::set_namespace(ret.workload.metadata_mut(), ns);

        let spec = ret.pod_spec_mut()?;
        spec.service_account_name = Some(sa.to_string());
        patch::set_pull_policy(spec, options.pull_if_not_present);

        match self.component {
            Component::TopologyUpdater => updater::apply(&mut ret, options)?,
            Component::SchedulerPlugin => sched::apply(&mut ret, options)?,
            Component::Api => {
                return Err(Error::internal_with_context(
                    "update",
                    "api manifests are not a namespaced set",
                ))
            }
        }

        debug!(
            component = %self.component,
            namespace = %ns,
            config = ret.config_map.is_some(),
            "patched manifest set"
        );
        Ok(ret)
    }

    pub(crate) fn pod_spec_mut(&mut self) -> Result<&mut PodSpec> {
        let component = self.component;
        self.workload
            .pod_template_mut()
            .and_then(|t| t.spec.as_mut())
            .ok_or_else(|| Error::template(component.as_str(), "workload has no pod spec"))
    }

    /// Every present object, in render order
    pub fn to_objects(&self) -> Vec<ManifestObject> {
        let mut objs = Vec::with_capacity(6);
        if let Some(ns) = &self.namespace {
            objs.push(ManifestObject::Namespace(ns.clone()));
        }
        if let Some(sa) = &self.service_account {
            objs.push(ManifestObject::ServiceAccount(sa.clone()));
        }
        objs.push(ManifestObject::Role(self.role.clone()));
        objs.push(ManifestObject::RoleBinding(self.role_binding.clone()));
        if let Some(cm) = &self.config_map {
            objs.push(ManifestObject::ConfigMap(cm.clone()));
        }
        objs.push(self.workload.to_object());
        objs
    }

    /// Creation plan: dependencies first, workload last and awaited
    pub fn to_creatable_objects(&self, timeout: Duration) -> Vec<WaitableObject> {
        let mut objs = Vec::with_capacity(6);
        if let Some(ns) = &self.namespace {
            objs.push(WaitableObject::new(ManifestObject::Namespace(ns.clone())));
        }
        if let Some(sa) = &self.service_account {
            objs.push(WaitableObject::new(ManifestObject::ServiceAccount(sa.clone())));
        }
        if let Some(cm) = &self.config_map {
            objs.push(WaitableObject::new(ManifestObject::ConfigMap(cm.clone())));
        }
        objs.push(WaitableObject::new(ManifestObject::Role(self.role.clone())));
        objs.push(WaitableObject::new(ManifestObject::RoleBinding(
            self.role_binding.clone(),
        )));
        objs.push(WaitableObject::with_wait(
            self.workload.to_object(),
            WaitCondition::pods_running(&self.namespace_name, self.workload.name()),
            timeout,
        ));
        objs
    }

    /// Deletion plan: the owned namespace alone, or the workload first
    pub fn to_deletable_objects(&self, timeout: Duration) -> Vec<WaitableObject> {
        if let Some(ns) = &self.namespace {
            let name = ns.metadata.name.as_deref().unwrap_or_default();
            return vec![WaitableObject::with_wait(
                ManifestObject::Namespace(ns.clone()),
                WaitCondition::namespace_gone(name),
                timeout,
            )];
        }

        let mut objs = vec![
            WaitableObject::with_wait(
                self.workload.to_object(),
                WaitCondition::pods_gone(&self.namespace_name, self.workload.name()),
                timeout,
            ),
            WaitableObject::new(ManifestObject::Role(self.role.clone())),
            WaitableObject::new(ManifestObject::RoleBinding(self.role_binding.clone())),
        ];
        if let Some(cm) = &self.config_map {
            objs.push(WaitableObject::new(ManifestObject::ConfigMap(cm.clone())));
        }
        if let Some(sa) = &self.service_account {
            objs.push(WaitableObject::new(ManifestObject::ServiceAccount(sa.clone())));
        }
        objs
    }
}
