//! Render command - print the manifests as a multi-document YAML stream
//!
//! Rendering never talks to the cluster, so the platform must be given.

use std::io::Write;

use clap::Args;

use tas_common::yaml::join_documents;
use tas_deployer::orchestrator;

use super::{CommonArgs, Target};
use crate::{Error, Result};

/// Arguments of `render`
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(subcommand)]
    pub target: Option<Target>,
}

/// Run the render command
pub fn run(common: &CommonArgs, args: RenderArgs) -> Result<()> {
    let out = render_manifests(common, args.target)?;
    std::io::stdout().lock().write_all(out.as_bytes())?;
    Ok(())
}

/// Render one subsystem, or all of them in deploy order
pub fn render_manifests(common: &CommonArgs, target: Option<Target>) -> Result<String> {
    let platform = common
        .platform
        .filter(|p| p.is_known())
        .ok_or_else(|| Error::validation("must explicitly select a cluster platform"))?;
    let options = common.options(platform, None)?;

    let objects = match target {
        Some(target) => orchestrator::render(target.into(), &options)?,
        None => orchestrator::render_all(&options)?,
    };
    let docs = objects
        .iter()
        .map(|o| o.to_yaml())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(join_documents(docs))
}
