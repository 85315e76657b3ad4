//! Topology-aware scheduling deployer CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

use commands::CommonArgs;

/// Deploy the components needed for topology-aware scheduling
#[derive(Parser, Debug)]
#[command(name = "deployer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the components and configurations needed for topology-aware scheduling
    Deploy(commands::LifecycleArgs),
    /// Remove the components and configurations needed for topology-aware scheduling
    Remove(commands::LifecycleArgs),
    /// Render the manifests needed for topology-aware scheduling
    Render(commands::render::RenderArgs),
    /// Detect the cluster platform and print the result as JSON
    Detect,
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Deploy(args) => commands::deploy::run(&self.common, args).await,
            Commands::Remove(args) => commands::remove::run(&self.common, args).await,
            Commands::Render(args) => commands::render::run(&self.common, args),
            Commands::Detect => commands::detect::run(&self.common).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::Target;
    use std::time::Duration;
    use tas_common::Platform;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("deployer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn deploy_everything_with_defaults() {
        let cli = parse(&["deploy"]);
        let Commands::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.target.is_none());
        assert!(!args.wait);
        assert_eq!(args.wait_timeout, Duration::from_secs(180));
        assert_eq!(cli.common.replicas, 1);
        assert!(!cli.common.pull_if_not_present);
    }

    #[test]
    fn subsystem_subcommands_and_global_flags() {
        let cli = parse(&[
            "--platform",
            "openshift",
            "deploy",
            "scheduler-plugin",
            "-W",
            "--wait-timeout",
            "90s",
            "--replicas",
            "2",
        ]);
        assert_eq!(cli.common.platform, Some(Platform::OpenShift));
        assert_eq!(cli.common.replicas, 2);
        let Commands::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.target, Some(Target::SchedulerPlugin));
        assert!(args.wait);
        assert_eq!(args.wait_timeout, Duration::from_secs(90));
    }

    #[test]
    fn remove_accepts_wait_before_subcommand() {
        let cli = parse(&["remove", "--wait", "topology-updater"]);
        let Commands::Remove(args) = cli.command else {
            panic!("expected remove");
        };
        assert_eq!(args.target, Some(Target::TopologyUpdater));
        assert!(args.wait);
    }

    #[test]
    fn render_takes_config_options() {
        let cli = parse(&[
            "render",
            "topology-updater",
            "--platform",
            "k8s",
            "--pull-if-not-present",
            "--rte-config-data",
            "x: 1",
        ]);
        assert_eq!(cli.common.platform, Some(Platform::Kubernetes));
        assert!(cli.common.pull_if_not_present);
        assert_eq!(cli.common.rte_config_data.as_deref(), Some("x: 1"));
        assert!(matches!(cli.command, Commands::Render(_)));
    }

    #[test]
    fn invalid_platform_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["deployer", "--platform", "nomad", "detect"]).unwrap_err();
        assert!(err.to_string().contains("invalid platform"));
    }

    #[test]
    fn invalid_wait_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["deployer", "deploy", "--wait-timeout", "soon"]).is_err());
    }

    #[test]
    fn api_subcommand_is_available_everywhere() {
        for cmd in ["deploy", "remove", "render"] {
            assert!(Cli::try_parse_from(["deployer", cmd, "api"]).is_ok(), "{cmd} api");
        }
    }
}
