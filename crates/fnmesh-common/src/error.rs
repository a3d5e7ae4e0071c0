//! Error types for the Function Mesh operator
//!
//! API failures that the reconcilers need to branch on (missing objects,
//! name clashes, stale writes) get their own variants so callers never
//! inspect raw HTTP status codes. Everything else from the API server
//! travels as [`Error::Kube`].

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Function Mesh operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error not covered by a more specific variant
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The addressed object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object
        name: String,
    },

    /// An object with the same name already exists
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Kind of the clashing object
        kind: String,
        /// Name of the clashing object
        name: String,
    },

    /// A write carried a stale resourceVersion
    #[error("conflict writing {kind} {name}: {message}")]
    Conflict {
        /// Kind of the object being written
        kind: String,
        /// Name of the object being written
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Validation error for CRD specs
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Name of the resource with invalid configuration
        resource: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.functions[0].replicas")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "selector", "statefulset")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for the given kind and name
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an already-exists error for the given kind and name
    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a conflict error for the given kind and name
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

    /// Create a validation error with the given message
    ///
    /// For simple validation errors without resource context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with resource context
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with resource context and field path
    pub fn validation_for_field(
        resource: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
            field: Some(field.into()),
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

    /// Classify a raw kube error for an object of the given kind and name
    ///
    /// 404 becomes [`Error::NotFound`], 409 with reason `AlreadyExists`
    /// becomes [`Error::AlreadyExists`], any other 409 becomes
    /// [`Error::Conflict`]. Everything else is wrapped as [`Error::Kube`].
    pub fn from_kube(kind: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(kind, name),
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Self::already_exists(kind, name)
            }
            kube::Error::Api(ae) if ae.code == 409 => Self::conflict(kind, name, ae.message),
            other => Self::Kube { source: other },
        }
    }

    /// True when the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// True when a create hit an existing object
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// True when a write was rejected for a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors need a spec change before another
    /// attempt can succeed. Everything else, stale writes included, is
    /// resolved by a later pass against fresh state.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { .. } => true,
            Error::NotFound { .. } => true,
            Error::AlreadyExists { .. } => true,
            Error::Conflict { .. } => true,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the resource name if this error is associated with a specific resource
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::NotFound { name, .. } => Some(name),
            Error::AlreadyExists { name, .. } => Some(name),
            Error::Conflict { name, .. } => Some(name),
            Error::Validation { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} happened"),
            reason: reason.to_string(),
            code,
        })
    }

    // ==========================================================================
    // Story Tests: Classifying API failures
    // ==========================================================================

    /// Story: Reconcilers branch on missing objects without inspecting status codes
    #[test]
    fn story_missing_object_is_classified_as_not_found() {
        let err = Error::from_kube("StatefulSet", "mesh-f1", api_error(404, "NotFound"));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert_eq!(err.resource(), Some("mesh-f1"));
        assert!(err.to_string().contains("StatefulSet mesh-f1 not found"));
    }

    /// Story: A create racing another writer surfaces as AlreadyExists
    #[test]
    fn story_name_clash_is_distinguished_from_stale_write() {
        let err = Error::from_kube("Function", "mesh-f1", api_error(409, "AlreadyExists"));
        assert!(err.is_already_exists());
        assert!(!err.is_conflict());

        let err = Error::from_kube("Function", "mesh-f1", api_error(409, "Conflict"));
        assert!(err.is_conflict());
        assert!(err.to_string().contains("Conflict happened"));
    }

    /// Story: Unclassified API errors keep the original kube error
    #[test]
    fn story_other_api_errors_stay_kube_errors() {
        let err = Error::from_kube("Service", "svc", api_error(500, "InternalError"));
        match err {
            Error::Kube { .. } => {}
            other => panic!("expected Kube variant, got {other:?}"),
        }
    }

    /// Story: Only spec problems stop the controller from retrying
    #[test]
    fn story_retry_classification() {
        assert!(!Error::validation("duplicate name").is_retryable());
        assert!(!Error::serialization("bad json").is_retryable());
        assert!(Error::conflict("Function", "f", "stale").is_retryable());
        assert!(Error::not_found("Function", "f").is_retryable());
        assert!(Error::internal_with_context("selector", "bad operator").is_retryable());
        assert!(Error::from(api_error(503, "ServiceUnavailable")).is_retryable());
    }

    #[test]
    fn validation_errors_carry_field_paths() {
        let err = Error::validation_for_field("mesh", "spec.functions[1].name", "duplicate");
        match &err {
            Error::Validation {
                resource, field, ..
            } => {
                assert_eq!(resource, "mesh");
                assert_eq!(field.as_deref(), Some("spec.functions[1].name"));
            }
            _ => panic!("Expected Validation variant"),
        }
        assert!(err.to_string().contains("validation error for mesh"));
    }

    #[test]
    fn serde_errors_convert_to_serialization() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
