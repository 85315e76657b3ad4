//! Deploy command - install every subsystem, or a single one
//!
//! Usage: deployer deploy [api|topology-updater|scheduler-plugin] [-W]

use tracing::info;

use tas_deployer::orchestrator;

use super::{CommonArgs, LifecycleArgs};
use crate::Result;

/// Run the deploy command; the first failing subsystem aborts it
pub async fn run(common: &CommonArgs, args: LifecycleArgs) -> Result<()> {
    let client = common.connect().await?;
    let platform = common.resolve_platform(&client).await?;
    let options = common.options(platform, Some(&args))?;

    match args.target {
        Some(target) => orchestrator::deploy(&client, target.into(), &options).await?,
        None => orchestrator::deploy_all(&client, &options).await?,
    }

    info!(platform = %platform, "deployment complete");
    Ok(())
}
