//! Plan execution: submit each step, then await its condition

use tracing::{debug, info};

use tas_common::Result;
use tas_manifests::{ManifestObject, WaitableObject};

use crate::client::KubeClient;
use crate::orchestrator::Options;
use crate::wait::wait_for;

/// Create every object in order; existing objects are left alone
pub async fn create_objects(
    client: &dyn KubeClient,
    plan: &[WaitableObject],
    options: &Options,
) -> Result<()> {
    for step in plan {
        let obj = &step.object;
        match client.create(obj).await {
            Ok(()) => info!(kind = %obj.kind(), name = %obj.name(), "created"),
            Err(e) if e.is_already_exists() => {
                debug!(kind = %obj.kind(), name = %obj.name(), "already exists")
            }
            Err(e) => return Err(e),
        }
        await_step(client, step, options).await?;
    }
    Ok(())
}

/// Delete every object in order; missing objects count as deleted and a
/// namespace that is already terminating is still awaited
pub async fn delete_objects(
    client: &dyn KubeClient,
    plan: &[WaitableObject],
    options: &Options,
) -> Result<()> {
    for step in plan {
        let obj = &step.object;
        match client.delete(obj).await {
            Ok(()) => info!(kind = %obj.kind(), name = %obj.name(), "deleted"),
            Err(e) if e.is_not_found() => {
                debug!(kind = %obj.kind(), name = %obj.name(), "already gone");
                continue;
            }
            Err(e) if e.is_conflict() && matches!(obj, ManifestObject::Namespace(_)) => {
                debug!(name = %obj.name(), "namespace deletion already in progress")
            }
            Err(e) => return Err(e),
        }
        await_step(client, step, options).await?;
    }
    Ok(())
}

async fn await_step(
    client: &dyn KubeClient,
    step: &WaitableObject,
    options: &Options,
) -> Result<()> {
    match &step.wait {
        Some(wait) if options.wait_completion => {
            wait_for(client, wait, options.wait.poll_interval).await
        }
        _ => Ok(()),
    }
}
