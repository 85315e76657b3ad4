//! Manifests for the topology-aware scheduling stack
//!
//! Immutable templates are loaded once into a [`TemplateStore`]. Each command
//! builds one Manifest Set per subsystem from the store, patches a clone with
//! runtime values and turns it into an ordered plan of [`WaitableObject`]s.

#![deny(missing_docs)]

pub mod api;
pub mod object;
mod patch;
pub mod sched;
pub mod set;
pub mod store;
pub mod updater;
pub mod waitable;

pub use api::ApiManifests;
pub use object::{ManifestObject, Workload};
pub use set::{ManifestSet, UpdateOptions};
pub use store::{ComponentTemplates, TemplateKind, TemplateSources, TemplateStore};
pub use waitable::{WaitCondition, WaitConfig, WaitFor, WaitableObject};

/// The three cooperating subsystems
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// NodeResourceTopology API definition
    Api,
    /// Per-node resource topology exporter
    TopologyUpdater,
    /// Secondary scheduler running the topology match plugin
    SchedulerPlugin,
}

impl Component {
    /// Name used on the command line and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::TopologyUpdater => "topology-updater",
            Self::SchedulerPlugin => "scheduler-plugin",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
