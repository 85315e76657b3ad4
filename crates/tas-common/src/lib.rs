//! Common types for the topology-aware scheduling deployer: errors, platform, YAML

#![deny(missing_docs)]

pub mod error;
pub mod platform;
pub mod yaml;

pub use error::Error;
pub use platform::{Platform, PlatformDetection};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager / app label value stamped on everything the deployer creates
pub const MANAGED_BY: &str = "tas-deployer";

/// Label key used to mark deployer-managed objects
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// API group whose presence identifies an OpenShift cluster
pub const OPENSHIFT_CONFIG_API_GROUP: &str = "config.openshift.io";
