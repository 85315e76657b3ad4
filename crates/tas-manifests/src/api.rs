//! NodeResourceTopology API manifests

use std::time::Duration;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

use tas_common::Result;

use crate::object::ManifestObject;
use crate::store::TemplateStore;
use crate::waitable::WaitableObject;

/// The API subsystem: a single cluster-scoped CRD
#[derive(Clone, Debug, PartialEq)]
pub struct ApiManifests {
    /// NodeResourceTopology definition
    pub crd: CustomResourceDefinition,
}

impl ApiManifests {
    /// API manifests from the embedded templates
    pub fn get_manifests() -> Result<Self> {
        Ok(Self::from_store(TemplateStore::embedded()?))
    }

    /// API manifests from an explicit store
    pub fn from_store(store: &TemplateStore) -> Self {
        Self {
            crd: store.crd().clone(),
        }
    }

    /// The CRD is cluster-scoped; nothing to patch
    pub fn update(&self) -> Self {
        self.clone()
    }

    /// Render order
    pub fn to_objects(&self) -> Vec<ManifestObject> {
        vec![ManifestObject::CustomResourceDefinition(self.crd.clone())]
    }

    /// Creation plan, no waits
    pub fn to_creatable_objects(&self, _timeout: Duration) -> Vec<WaitableObject> {
        self.to_objects().into_iter().map(WaitableObject::new).collect()
    }

    /// Deletion plan, no waits
    pub fn to_deletable_objects(&self, _timeout: Duration) -> Vec<WaitableObject> {
        self.to_objects().into_iter().map(WaitableObject::new).collect()
    }
}
