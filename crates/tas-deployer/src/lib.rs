//! Deploys and removes the topology-aware scheduling stack
//!
//! [`orchestrator`] drives the subsystems in order against a [`KubeClient`].
//! Each subsystem turns its Manifest Set into a plan which [`apply`] submits
//! step by step, optionally blocking on the step's wait condition.

#![deny(missing_docs)]

pub mod apply;
pub mod client;
pub mod detect;
pub mod orchestrator;
pub mod wait;

pub use client::{KubeClient, KubeRsClient, PodSummary};
pub use detect::{detect_platform, probe_platform};
pub use orchestrator::{deploy_all, remove_all, Options, RemovalReport, Subsystem};
