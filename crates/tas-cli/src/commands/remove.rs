//! Remove command - uninstall every subsystem, or a single one
//!
//! Removal keeps going past failures so as much as possible is cleaned up.
//! Failures are logged and the command still succeeds. An unreadable
//! `--rte-config-file` only drops the payload.

use tracing::{info, warn};

use tas_deployer::orchestrator;

use super::{CommonArgs, LifecycleArgs};
use crate::Result;

/// Run the remove command
pub async fn run(common: &CommonArgs, args: LifecycleArgs) -> Result<()> {
    let client = common.connect().await?;
    let platform = common.resolve_platform(&client).await?;
    let options = common.removal_options(platform, &args);

    match args.target {
        Some(target) => {
            if let Err(e) = orchestrator::remove(&client, target.into(), &options).await {
                warn!(error = %e, "error removing");
            }
        }
        None => {
            let report = orchestrator::remove_all(&client, &options).await;
            if !report.is_clean() {
                warn!(failed = report.failures.len(), "removal finished with errors");
            }
        }
    }

    info!(platform = %platform, "removal complete");
    Ok(())
}
