//! Cluster platform variants
//!
//! The deployer branches on the platform everywhere: on Kubernetes it owns the
//! namespace and service account of each component, on OpenShift it reuses
//! fixed, well-known ones that the platform already provides.

use serde::{Deserialize, Serialize};

/// The cluster platform a command runs against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Not determined (no user choice and the probe failed)
    #[default]
    Unknown,
    /// Vanilla Kubernetes: the deployer manages namespaces and service accounts
    Kubernetes,
    /// OpenShift: the deployer reuses platform-provided namespaces and accounts
    OpenShift,
}

impl Platform {
    /// True if the deployer creates and deletes its own namespace and service account
    pub fn owns_namespace(&self) -> bool {
        matches!(self, Self::Kubernetes)
    }

    /// True if this is a concrete platform (anything but `Unknown`)
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "openshift" | "ocp" => Ok(Self::OpenShift),
            _ => Err(crate::Error::validation_for_field(
                "platform",
                format!("invalid platform: {s}, expected one of: kubernetes, openshift"),
            )),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Kubernetes => write!(f, "kubernetes"),
            Self::OpenShift => write!(f, "openshift"),
        }
    }
}

/// Outcome of platform resolution, kept for diagnostics and the `detect` command
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDetection {
    /// What the API probe found (`Unknown` if it was skipped or failed)
    pub auto_detected: Platform,
    /// What the user asked for (`Unknown` if nothing was given)
    pub user_supplied: Platform,
    /// The platform the command will use
    pub discovered: Platform,
}

impl PlatformDetection {
    /// Combine a user choice with a probe result; the user choice wins
    pub fn resolve(user_supplied: Platform, auto_detected: Platform) -> Self {
        let discovered = if user_supplied.is_known() {
            user_supplied
        } else {
            auto_detected
        };
        Self {
            auto_detected,
            user_supplied,
            discovered,
        }
    }

    /// The concrete platform, or `Error::PlatformResolution`
    pub fn require_known(&self) -> crate::Result<Platform> {
        if self.discovered.is_known() {
            Ok(self.discovered)
        } else {
            Err(crate::Error::PlatformResolution)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("Kubernetes".parse::<Platform>().unwrap(), Platform::Kubernetes);
        assert_eq!("k8s".parse::<Platform>().unwrap(), Platform::Kubernetes);
        assert_eq!("OpenShift".parse::<Platform>().unwrap(), Platform::OpenShift);
        assert_eq!("ocp".parse::<Platform>().unwrap(), Platform::OpenShift);
    }

    #[test]
    fn rejects_unknown_platform_names() {
        let err = "nomad".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("invalid platform: nomad"));
        assert!("unknown".parse::<Platform>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for p in [Platform::Kubernetes, Platform::OpenShift] {
            assert_eq!(p.to_string().parse::<Platform>().unwrap(), p);
        }
        assert_eq!(Platform::Unknown.to_string(), "unknown");
    }

    #[test]
    fn only_kubernetes_owns_namespaces() {
        assert!(Platform::Kubernetes.owns_namespace());
        assert!(!Platform::OpenShift.owns_namespace());
        assert!(!Platform::Unknown.owns_namespace());
    }

    // ==========================================================================
    // Story: Resolution precedence
    // ==========================================================================

    #[test]
    fn user_choice_wins_over_probe() {
        let d = PlatformDetection::resolve(Platform::Kubernetes, Platform::OpenShift);
        assert_eq!(d.discovered, Platform::Kubernetes);
        assert_eq!(d.require_known().unwrap(), Platform::Kubernetes);
    }

    #[test]
    fn probe_result_used_without_user_choice() {
        let d = PlatformDetection::resolve(Platform::Unknown, Platform::OpenShift);
        assert_eq!(d.discovered, Platform::OpenShift);
    }

    #[test]
    fn no_choice_and_failed_probe_is_an_error() {
        let d = PlatformDetection::resolve(Platform::Unknown, Platform::Unknown);
        assert_eq!(d.discovered, Platform::Unknown);
        assert!(matches!(
            d.require_known(),
            Err(crate::Error::PlatformResolution)
        ));
    }

    #[test]
    fn detection_serializes_in_camel_case() {
        let d = PlatformDetection::resolve(Platform::Unknown, Platform::Kubernetes);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["autoDetected"], "kubernetes");
        assert_eq!(json["userSupplied"], "unknown");
        assert_eq!(json["discovered"], "kubernetes");
    }
}
