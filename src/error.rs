//! Error types for chaos experiment operations
//!
//! Errors carry the resource coordinates (kind, namespace, name) they relate
//! to so a failed cleanup or wait can be traced back to a specific experiment.

use std::time::Duration;

use thiserror::Error;

/// Boxed underlying cause for connection failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for chaos experiment operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Authentication, network, or non-retryable API failure
    #[error("connection error during {operation}: {message}")]
    Connection {
        /// Operation that failed (e.g., "connect", "create PodChaos")
        operation: String,
        /// Description of what failed
        message: String,
        /// Underlying transport or configuration error
        #[source]
        source: Option<BoxError>,
    },

    /// A resource with the same name already exists
    #[error("{kind}/{name} already exists in namespace {namespace}")]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Namespace of the conflicting resource
        namespace: String,
    },

    /// The resource does not exist on the control plane
    #[error("{kind}/{name} not found in namespace {namespace}")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// Selector is empty or mixes label- and pod-based selection
    #[error("ambiguous selector: {0}")]
    AmbiguousSelector(String),

    /// Experiment or parameter input is invalid
    #[error("validation error for {field}: {message}")]
    Validation {
        /// Offending field (e.g., "duration", "delay.latency")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// A wait operation exceeded its budget
    #[error("{operation} of {kind}/{name} timed out after {elapsed:?} (selector: {selector})")]
    Timeout {
        /// What was being waited for ("injection" or "deletion")
        operation: String,
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Human-readable selector of the experiment
        selector: String,
    },

    /// Manifest or status could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a connection error without an underlying cause
    pub fn connection(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connection {
            operation: operation.into(),
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error wrapping the underlying cause
    pub fn connection_from<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error for the given field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create an ambiguous selector error
    pub fn ambiguous_selector(msg: impl Into<String>) -> Self {
        Self::AmbiguousSelector(msg.into())
    }

    /// Create a not-found error for a resource
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Create an already-exists error for a resource
    pub fn already_exists(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True if the resource was absent on the control plane
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True if this error was raised before any network interaction
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::AmbiguousSelector(_))
    }

    /// True if a wait operation ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
