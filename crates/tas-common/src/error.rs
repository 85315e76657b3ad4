//! Error types for the deployer
//!
//! Errors carry structured fields (resource kind, subsystem, context) so the
//! command boundary can report which object or subsystem failed.

use std::time::Duration;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for deployer operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error that is not otherwise classified
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A required manifest template is missing or malformed
    #[error("template error [{component}]: {message}")]
    Template {
        /// Component whose template failed to load (e.g. "topology-updater")
        component: String,
        /// Description of what's wrong with the template
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Invalid option value supplied by the user
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid option or field (e.g. "replicas")
        field: Option<String>,
    },

    /// A required internal value was never resolved
    #[error("precondition failed [{context}]: {message}")]
    Precondition {
        /// Where the precondition was checked
        context: String,
        /// What was missing
        message: String,
    },

    /// Neither the user nor the API probe produced a concrete platform
    #[error("cannot autodetect the platform, and no platform given")]
    PlatformResolution,

    /// Create rejected because the object already exists
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
    },

    /// The API refused the operation because of the object's current state
    /// (e.g. deleting a namespace that is already terminating)
    #[error("{kind} {name} conflict: {message}")]
    Conflict {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Get/delete target does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
    },

    /// A readiness/removal condition was not met in time
    #[error("timeout after {}s waiting for {what}", timeout.as_secs())]
    WaitTimeout {
        /// Human-readable description of the awaited condition
        what: String,
        /// How long we waited
        timeout: Duration,
    },

    /// A whole subsystem step failed
    #[error("{subsystem}: {source}")]
    Subsystem {
        /// Subsystem name (api, topology-updater, scheduler-plugin)
        subsystem: String,
        /// The error that stopped the subsystem
        #[source]
        source: Box<Error>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a template error for a component
    pub fn template(component: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            component: component.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending option
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a precondition error
    pub fn precondition(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Precondition {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create an already-exists error
    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(
        kind: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a wait timeout error
    pub fn wait_timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::WaitTimeout {
            what: what.into(),
            timeout,
        }
    }

    /// Wrap an error with the name of the subsystem it came from
    pub fn in_subsystem(subsystem: impl Into<String>, source: Error) -> Self {
        Self::Subsystem {
            subsystem: subsystem.into(),
            source: Box::new(source),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True if the API rejected a create because the object exists
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::AlreadyExists { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 409 && ae.reason == "AlreadyExists",
            _ => false,
        }
    }

    /// True if the API refused the operation with a non-AlreadyExists 409
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 409 && ae.reason != "AlreadyExists",
            _ => false,
        }
    }

    /// True if the target object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// Get the subsystem name if this error was raised by a subsystem step
    pub fn subsystem(&self) -> Option<&str> {
        match self {
            Error::Subsystem { subsystem, .. } => Some(subsystem),
            _ => None,
        }
    }
}
