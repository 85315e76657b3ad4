//! Typed manifest objects
//!
//! Every object the deployer creates, deletes or renders is one of a small,
//! closed set of k8s-openapi types. `ManifestObject` wraps them so plans and
//! render output can carry heterogeneous objects without type erasure.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PodTemplateSpec, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource;
use serde::Serialize;

use tas_common::{yaml, Error};

/// One cluster object managed by the deployer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ManifestObject {
    /// API definition
    CustomResourceDefinition(CustomResourceDefinition),
    /// Component namespace (managed variant only)
    Namespace(Namespace),
    /// Component service account (managed variant only)
    ServiceAccount(ServiceAccount),
    /// Namespaced RBAC role
    Role(Role),
    /// Binding of the role to the component service account
    RoleBinding(RoleBinding),
    /// Embedded configuration payload
    ConfigMap(ConfigMap),
    /// Per-node workload
    DaemonSet(DaemonSet),
    /// Replicated workload
    Deployment(Deployment),
}

impl ManifestObject {
    /// Resource kind (e.g. "DaemonSet")
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CustomResourceDefinition(_) => CustomResourceDefinition::KIND,
            Self::Namespace(_) => Namespace::KIND,
            Self::ServiceAccount(_) => ServiceAccount::KIND,
            Self::Role(_) => Role::KIND,
            Self::RoleBinding(_) => RoleBinding::KIND,
            Self::ConfigMap(_) => ConfigMap::KIND,
            Self::DaemonSet(_) => DaemonSet::KIND,
            Self::Deployment(_) => Deployment::KIND,
        }
    }

    /// Full API version (e.g. "apps/v1")
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::CustomResourceDefinition(_) => CustomResourceDefinition::API_VERSION,
            Self::Namespace(_) => Namespace::API_VERSION,
            Self::ServiceAccount(_) => ServiceAccount::API_VERSION,
            Self::Role(_) => Role::API_VERSION,
            Self::RoleBinding(_) => RoleBinding::API_VERSION,
            Self::ConfigMap(_) => ConfigMap::API_VERSION,
            Self::DaemonSet(_) => DaemonSet::API_VERSION,
            Self::Deployment(_) => Deployment::API_VERSION,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::CustomResourceDefinition(o) => &o.metadata,
            Self::Namespace(o) => &o.metadata,
            Self::ServiceAccount(o) => &o.metadata,
            Self::Role(o) => &o.metadata,
            Self::RoleBinding(o) => &o.metadata,
            Self::ConfigMap(o) => &o.metadata,
            Self::DaemonSet(o) => &o.metadata,
            Self::Deployment(o) => &o.metadata,
        }
    }

    /// Object name, empty if the template left it unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Namespace for namespace-scoped objects, `None` for cluster-scoped ones
    pub fn namespace(&self) -> Option<&str> {
        if self.is_cluster_scoped() {
            return None;
        }
        self.metadata().namespace.as_deref()
    }

    /// True for objects that live outside any namespace
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, Self::CustomResourceDefinition(_) | Self::Namespace(_))
    }

    /// "Kind/name" label for logs and errors
    pub fn describe(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{} in {}", self.kind(), self.name(), ns),
            None => format!("{}/{}", self.kind(), self.name()),
        }
    }

    /// JSON form including apiVersion and kind
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        serde_json::to_value(self).map_err(|e| {
            Error::serialization_for_kind(self.kind(), format!("failed to serialize: {e}"))
        })
    }

    /// YAML document for render output
    pub fn to_yaml(&self) -> Result<String, Error> {
        yaml::to_yaml(self)
    }
}

/// The workload of a component: per-node or replicated
#[derive(Clone, Debug, PartialEq)]
pub enum Workload {
    /// One pod per node (topology updater)
    DaemonSet(DaemonSet),
    /// N replicas (scheduler plugin)
    Deployment(Deployment),
}

impl Workload {
    /// Workload metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::DaemonSet(ds) => &ds.metadata,
            Self::Deployment(dp) => &dp.metadata,
        }
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::DaemonSet(ds) => &mut ds.metadata,
            Self::Deployment(dp) => &mut dp.metadata,
        }
    }

    /// Workload name
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Pod template, if the template defines a spec
    pub fn pod_template(&self) -> Option<&PodTemplateSpec> {
        match self {
            Self::DaemonSet(ds) => ds.spec.as_ref().map(|s| &s.template),
            Self::Deployment(dp) => dp.spec.as_ref().map(|s| &s.template),
        }
    }

    pub(crate) fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        match self {
            Self::DaemonSet(ds) => ds.spec.as_mut().map(|s| &mut s.template),
            Self::Deployment(dp) => dp.spec.as_mut().map(|s| &mut s.template),
        }
    }

    /// Wrap as a manifest object
    pub fn to_object(&self) -> ManifestObject {
        match self {
            Self::DaemonSet(ds) => ManifestObject::DaemonSet(ds.clone()),
            Self::Deployment(dp) => ManifestObject::Deployment(dp.clone()),
        }
    }
}
