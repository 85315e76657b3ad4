//! API subsystem steps

use tas_common::Result;
use tas_manifests::ApiManifests;

use crate::apply::{create_objects, delete_objects};
use crate::client::KubeClient;
use crate::orchestrator::Options;

pub(crate) fn manifests() -> Result<ApiManifests> {
    Ok(ApiManifests::get_manifests()?.update())
}

/// Install the NodeResourceTopology CRD
pub async fn deploy(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = manifests()?.to_creatable_objects(options.wait.timeout);
    create_objects(client, &plan, options).await
}

/// Remove the NodeResourceTopology CRD
pub async fn remove(client: &dyn KubeClient, options: &Options) -> Result<()> {
    let plan = manifests()?.to_deletable_objects(options.wait.timeout);
    delete_objects(client, &plan, options).await
}
