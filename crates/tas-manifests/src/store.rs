//! Manifest template store
//!
//! Base definitions are embedded into the binary at build time and parsed
//! once. Templates are never handed out by reference for patching: Manifest
//! Sets clone what they need, so the store stays read-only after load.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::de::DeserializeOwned;
use tracing::debug;

use tas_common::{yaml, Error, Result};

use crate::object::Workload;
use crate::Component;

/// The kinds of template a component can need
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TemplateKind {
    /// API definition
    CustomResourceDefinition,
    /// Component namespace
    Namespace,
    /// Component service account
    ServiceAccount,
    /// Namespaced role
    Role,
    /// Role binding
    RoleBinding,
    /// Per-node workload
    DaemonSet,
    /// Replicated workload
    Deployment,
    /// Raw configuration text (not a Kubernetes object)
    Config,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CustomResourceDefinition => "CustomResourceDefinition",
            Self::Namespace => "Namespace",
            Self::ServiceAccount => "ServiceAccount",
            Self::Role => "Role",
            Self::RoleBinding => "RoleBinding",
            Self::DaemonSet => "DaemonSet",
            Self::Deployment => "Deployment",
            Self::Config => "Config",
        };
        write!(f, "{s}")
    }
}

/// Raw template text keyed by component and kind
#[derive(Clone, Debug, Default)]
pub struct TemplateSources {
    sources: BTreeMap<(Component, TemplateKind), String>,
}

impl TemplateSources {
    /// The templates compiled into the binary
    pub fn embedded() -> Self {
        use Component::{Api, SchedulerPlugin, TopologyUpdater};
        use TemplateKind as K;

        Self::default()
            .with(
                Api,
                K::CustomResourceDefinition,
                include_str!("../templates/api/crd.yaml"),
            )
            .with(
                TopologyUpdater,
                K::Namespace,
                include_str!("../templates/topology-updater/namespace.yaml"),
            )
            .with(
                TopologyUpdater,
                K::ServiceAccount,
                include_str!("../templates/topology-updater/serviceaccount.yaml"),
            )
            .with(
                TopologyUpdater,
                K::Role,
                include_str!("../templates/topology-updater/role.yaml"),
            )
            .with(
                TopologyUpdater,
                K::RoleBinding,
                include_str!("../templates/topology-updater/rolebinding.yaml"),
            )
            .with(
                TopologyUpdater,
                K::DaemonSet,
                include_str!("../templates/topology-updater/daemonset.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::Namespace,
                include_str!("../templates/scheduler-plugin/namespace.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::ServiceAccount,
                include_str!("../templates/scheduler-plugin/serviceaccount.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::Role,
                include_str!("../templates/scheduler-plugin/role.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::RoleBinding,
                include_str!("../templates/scheduler-plugin/rolebinding.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::Deployment,
                include_str!("../templates/scheduler-plugin/deployment.yaml"),
            )
            .with(
                SchedulerPlugin,
                K::Config,
                include_str!("../templates/scheduler-plugin/scheduler-config.yaml"),
            )
    }

    /// Add or replace one template
    pub fn with(
        mut self,
        component: Component,
        kind: TemplateKind,
        text: impl Into<String>,
    ) -> Self {
        self.sources.insert((component, kind), text.into());
        self
    }

    /// Drop one template
    pub fn without(mut self, component: Component, kind: TemplateKind) -> Self {
        self.sources.remove(&(component, kind));
        self
    }

    fn raw(&self, component: Component, kind: TemplateKind) -> Result<&str> {
        self.sources
            .get(&(component, kind))
            .map(String::as_str)
            .ok_or_else(|| {
                Error::template(component.to_string(), format!("missing {kind} template"))
            })
    }

    fn parse<T: DeserializeOwned>(&self, component: Component, kind: TemplateKind) -> Result<T> {
        let raw = self.raw(component, kind)?;
        yaml::from_yaml(&format!("{component} {kind}"), raw)
            .map_err(|e| Error::template(component.to_string(), e.to_string()))
    }
}

/// Base objects shared by the namespaced components (updater, scheduler)
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentTemplates {
    /// Namespace created on the managed variant
    pub namespace: Namespace,
    /// Service account created on the managed variant
    pub service_account: ServiceAccount,
    /// Role granted to the service account
    pub role: Role,
    /// Binding of role to service account
    pub role_binding: RoleBinding,
    /// The component workload
    pub workload: Workload,
    /// Configuration text template, for components that render one
    pub config: Option<String>,
}

/// Parsed, immutable base definitions for every component
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateStore {
    crd: CustomResourceDefinition,
    updater: ComponentTemplates,
    scheduler: ComponentTemplates,
}

static EMBEDDED: LazyLock<std::result::Result<TemplateStore, String>> = LazyLock::new(|| {
    TemplateStore::from_sources(&TemplateSources::embedded()).map_err(|e| e.to_string())
});

impl TemplateStore {
    /// The process-wide store built from the embedded templates
    pub fn embedded() -> Result<&'static TemplateStore> {
        EMBEDDED
            .as_ref()
            .map_err(|msg| Error::template("embedded", msg.clone()))
    }

    /// Parse every required template; fails on the first missing or malformed one
    pub fn from_sources(sources: &TemplateSources) -> Result<Self> {
        let crd = sources.parse(Component::Api, TemplateKind::CustomResourceDefinition)?;

        let daemonset: DaemonSet =
            sources.parse(Component::TopologyUpdater, TemplateKind::DaemonSet)?;
        let updater = load_component(
            sources,
            Component::TopologyUpdater,
            Workload::DaemonSet(daemonset),
            false,
        )?;

        let deployment: Deployment =
            sources.parse(Component::SchedulerPlugin, TemplateKind::Deployment)?;
        let scheduler = load_component(
            sources,
            Component::SchedulerPlugin,
            Workload::Deployment(deployment),
            true,
        )?;

        debug!("loaded manifest templates");
        Ok(Self {
            crd,
            updater,
            scheduler,
        })
    }

    /// API definition template
    pub fn crd(&self) -> &CustomResourceDefinition {
        &self.crd
    }

    /// Templates of a namespaced component, `None` for the API component
    pub fn component(&self, component: Component) -> Option<&ComponentTemplates> {
        match component {
            Component::Api => None,
            Component::TopologyUpdater => Some(&self.updater),
            Component::SchedulerPlugin => Some(&self.scheduler),
        }
    }
}

fn load_component(
    sources: &TemplateSources,
    component: Component,
    workload: Workload,
    needs_config: bool,
) -> Result<ComponentTemplates> {
    let templates = ComponentTemplates {
        namespace: sources.parse::<Namespace>(component, TemplateKind::Namespace)?,
        service_account: sources.parse::<ServiceAccount>(component, TemplateKind::ServiceAccount)?,
        role: sources.parse::<Role>(component, TemplateKind::Role)?,
        role_binding: sources.parse::<RoleBinding>(component, TemplateKind::RoleBinding)?,
        workload,
        config: if needs_config {
            Some(sources.raw(component, TemplateKind::Config)?.to_string())
        } else {
            None
        },
    };

    let named = [
        (TemplateKind::Namespace, templates.namespace.metadata.name.as_deref()),
        (TemplateKind::ServiceAccount, templates.service_account.metadata.name.as_deref()),
        (TemplateKind::Role, templates.role.metadata.name.as_deref()),
        (TemplateKind::RoleBinding, templates.role_binding.metadata.name.as_deref()),
    ];
    for (kind, name) in named {
        if name.is_none_or(str::is_empty) {
            return Err(Error::template(
                component.to_string(),
                format!("{kind} template has no metadata.name"),
            ));
        }
    }
    if templates.workload.name().is_empty() || templates.workload.pod_template().is_none() {
        return Err(Error::template(
            component.to_string(),
            "workload template needs metadata.name and a pod template",
        ));
    }

    Ok(templates)
}
