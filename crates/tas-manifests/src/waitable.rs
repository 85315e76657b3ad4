//! Creation and deletion plans
//!
//! A plan is an ordered list of objects, each optionally followed by a wait
//! condition. Conditions are plain data; the deployer decides how (and
//! whether) to evaluate them.

use std::time::Duration;

use crate::object::ManifestObject;

/// Default upper bound on a single wait
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default delay between two condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Timing of wait conditions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitConfig {
    /// Give up (with a timeout error) after this long
    pub timeout: Duration,
    /// Delay between two checks
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A condition checked against the live cluster after an object is submitted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one pod matches and every matching pod is running
    PodsRunning {
        /// Namespace to list pods in
        namespace: String,
        /// Anchored pod-name pattern
        pattern: String,
    },
    /// No pod matches any more
    PodsGone {
        /// Namespace to list pods in
        namespace: String,
        /// Anchored pod-name pattern
        pattern: String,
    },
    /// The namespace no longer exists
    NamespaceGone {
        /// Namespace name
        name: String,
    },
}

impl WaitCondition {
    /// Pods of a workload are all running
    pub fn pods_running(namespace: &str, workload: &str) -> Self {
        Self::PodsRunning {
            namespace: namespace.to_string(),
            pattern: pod_name_pattern(workload),
        }
    }

    /// Pods of a workload are all gone
    pub fn pods_gone(namespace: &str, workload: &str) -> Self {
        Self::PodsGone {
            namespace: namespace.to_string(),
            pattern: pod_name_pattern(workload),
        }
    }

    /// A namespace is gone
    pub fn namespace_gone(name: &str) -> Self {
        Self::NamespaceGone {
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PodsRunning { namespace, pattern } => {
                write!(f, "pods {pattern} in {namespace} to be running")
            }
            Self::PodsGone { namespace, pattern } => {
                write!(f, "pods {pattern} in {namespace} to be gone")
            }
            Self::NamespaceGone { name } => write!(f, "namespace {name} to be gone"),
        }
    }
}

/// Wait condition with its deadline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitFor {
    /// What to wait for
    pub condition: WaitCondition,
    /// How long to wait at most
    pub timeout: Duration,
}

/// One plan step
#[derive(Clone, Debug, PartialEq)]
pub struct WaitableObject {
    /// Object to create or delete
    pub object: ManifestObject,
    /// Optional condition to await after submission
    pub wait: Option<WaitFor>,
}

impl WaitableObject {
    /// Step without a wait
    pub fn new(object: ManifestObject) -> Self {
        Self { object, wait: None }
    }

    /// Step followed by a wait
    pub fn with_wait(object: ManifestObject, condition: WaitCondition, timeout: Duration) -> Self {
        Self {
            object,
            wait: Some(WaitFor { condition, timeout }),
        }
    }
}

/// Pods created by a workload are named `<workload>-<generated suffix>`
pub fn pod_name_pattern(workload: &str) -> String {
    format!("^{}-[a-z0-9-]+$", regex::escape(workload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn pod_pattern_tolerates_generated_suffixes() {
        let re = Regex::new(&pod_name_pattern("topology-aware-scheduler")).unwrap();
        assert!(re.is_match("topology-aware-scheduler-7d9f8c6b5-x2kqp"));
        assert!(re.is_match("topology-aware-scheduler-abcde"));
        assert!(!re.is_match("topology-aware-scheduler"));
        assert!(!re.is_match("other-topology-aware-scheduler-abcde"));
        assert!(!re.is_match("topology-aware-scheduler-ABC"));
    }

    #[test]
    fn pod_pattern_escapes_workload_names() {
        let re = Regex::new(&pod_name_pattern("a.b")).unwrap();
        assert!(re.is_match("a.b-xyz12"));
        assert!(!re.is_match("aXb-xyz12"));
    }

    #[test]
    fn default_wait_config() {
        let cfg = WaitConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(180));
        assert_eq!(cfg.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn conditions_describe_themselves() {
        assert_eq!(
            WaitCondition::namespace_gone("tas").to_string(),
            "namespace tas to be gone"
        );
        let c = WaitCondition::pods_running("tas", "rte");
        assert_eq!(c.to_string(), "pods ^rte-[a-z0-9-]+$ in tas to be running");
    }
}
