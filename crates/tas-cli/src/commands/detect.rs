//! Detect command - print the platform detection result as JSON

use tracing::debug;

use tas_common::{Platform, PlatformDetection};
use tas_deployer::detect_platform;

use super::{CommandErrorExt, CommonArgs};
use crate::Result;

/// Run the detect command
pub async fn run(common: &CommonArgs) -> Result<()> {
    let user_supplied = common.platform.unwrap_or_default();
    let detection = match common.connect().await {
        Ok(client) => detect_platform(&client, user_supplied).await,
        Err(e) => {
            debug!(error = %e, "cannot reach the cluster, skipping the probe");
            PlatformDetection::resolve(user_supplied, Platform::Unknown)
        }
    };
    println!("{}", serde_json::to_string_pretty(&detection).cmd_err()?);
    Ok(())
}
