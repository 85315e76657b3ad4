//! Cluster access seam
//!
//! Everything the orchestrator and the wait loops need from the API server
//! goes through [`KubeClient`], so tests can run against mocks while
//! production code uses [`KubeRsClient`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use tas_common::{Error, MANAGED_BY};
use tas_manifests::ManifestObject;

/// Default connection timeout for the API client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the API client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Name and phase of a pod, all the wait loops look at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodSummary {
    /// Pod name
    pub name: String,
    /// Pod phase ("Pending", "Running", ...), empty if not reported yet
    pub phase: String,
}

impl PodSummary {
    /// True once the kubelet reports the pod running
    pub fn is_running(&self) -> bool {
        self.phase == "Running"
    }
}

/// Operations against the target cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Create an object; an existing object yields `Error::AlreadyExists`
    async fn create(&self, object: &ManifestObject) -> Result<(), Error>;

    /// Delete an object; a missing object yields `Error::NotFound`, an object
    /// the API cannot delete in its current state yields `Error::Conflict`
    async fn delete(&self, object: &ManifestObject) -> Result<(), Error>;

    /// Pods currently present in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>, Error>;

    /// Whether a namespace exists (terminating namespaces still exist)
    async fn namespace_exists(&self, name: &str) -> Result<bool, Error>;

    /// Whether the API server serves an API group
    async fn api_group_exists(&self, group: &str) -> Result<bool, Error>;
}

/// [`KubeClient`] over a kube-rs client
pub struct KubeRsClient {
    client: Client,
}

impl KubeRsClient {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig, or the inferred configuration
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, Error> {
        Ok(Self::new(create_client(kubeconfig).await?))
    }

    fn dynamic_api(&self, object: &ManifestObject) -> Api<DynamicObject> {
        let ar = api_resource(object);
        match object.namespace() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

fn api_resource(object: &ManifestObject) -> ApiResource {
    match object {
        ManifestObject::CustomResourceDefinition(_) => {
            ApiResource::erase::<CustomResourceDefinition>(&())
        }
        ManifestObject::Namespace(_) => ApiResource::erase::<Namespace>(&()),
        ManifestObject::ServiceAccount(_) => ApiResource::erase::<ServiceAccount>(&()),
        ManifestObject::Role(_) => ApiResource::erase::<Role>(&()),
        ManifestObject::RoleBinding(_) => ApiResource::erase::<RoleBinding>(&()),
        ManifestObject::ConfigMap(_) => ApiResource::erase::<ConfigMap>(&()),
        ManifestObject::DaemonSet(_) => ApiResource::erase::<DaemonSet>(&()),
        ManifestObject::Deployment(_) => ApiResource::erase::<Deployment>(&()),
    }
}

fn to_dynamic(object: &ManifestObject) -> Result<DynamicObject, Error> {
    serde_json::from_value(object.to_json()?).map_err(|e| {
        Error::serialization_for_kind(
            object.kind(),
            format!("failed to convert to dynamic object: {e}"),
        )
    })
}

/// Map API status codes onto the error variants callers branch on
fn classify(object: &ManifestObject, err: kube::Error) -> Error {
    if let kube::Error::Api(ae) = &err {
        match ae.code {
            409 if ae.reason == "AlreadyExists" => {
                return Error::already_exists(object.kind(), object.name())
            }
            409 => return Error::conflict(object.kind(), object.name(), ae.message.clone()),
            404 => return Error::not_found(object.kind(), object.name()),
            _ => {}
        }
    }
    Error::from(err)
}

#[async_trait]
impl KubeClient for KubeRsClient {
    async fn create(&self, object: &ManifestObject) -> Result<(), Error> {
        let api = self.dynamic_api(object);
        let params = PostParams {
            field_manager: Some(MANAGED_BY.to_string()),
            ..Default::default()
        };
        api.create(&params, &to_dynamic(object)?)
            .await
            .map_err(|e| classify(object, e))?;
        Ok(())
    }

    async fn delete(&self, object: &ManifestObject) -> Result<(), Error> {
        self.dynamic_api(object)
            .delete(object.name(), &DeleteParams::default())
            .await
            .map_err(|e| classify(object, e))?;
        Ok(())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods
            .items
            .into_iter()
            .map(|p| PodSummary {
                name: p.metadata.name.unwrap_or_default(),
                phase: p.status.and_then(|s| s.phase).unwrap_or_default(),
            })
            .collect())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn api_group_exists(&self, group: &str) -> Result<bool, Error> {
        let groups = self.client.list_api_groups().await?;
        let found = groups.groups.iter().any(|g| g.name == group);
        debug!(group = %group, found, "probed API group");
        Ok(found)
    }
}

/// Create a kube client from an optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {e}", path.display()),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {e}"),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {e}"))
        })?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {e}"))
    })
}
