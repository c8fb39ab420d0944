//! # Errors
//!
//! Error kinds surfaced by client construction and the deployment lifecycle.
//!
//! Each layer owns a narrow error enum (credentials, usage tracking, the
//! configuration store, the remote deployment client, the execution context);
//! [`Error`] folds them into the kinds the reconciler reports, naming the stage
//! that failed.

use thiserror::Error;

use crate::client::context::ContextError;
use crate::client::credentials::CredentialError;
use crate::client::remote::RemoteError;
use crate::controller::connector::StoreError;
use crate::controller::usage::TrackingError;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The referenced ProviderConfig could not be resolved
    #[error("cannot get ProviderConfig {name:?}: {source}")]
    ConfigurationNotFound {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Secret extraction failed while building a client
    #[error("cannot load credentials: {0}")]
    CredentialLoadFailure(#[source] CredentialError),

    /// The ProviderConfig usage could not be recorded
    #[error("cannot track ProviderConfig usage: {0}")]
    UsageTrackingFailure(#[source] TrackingError),

    /// The managed object is not a Deployment
    #[error("managed resource is not a Deployment custom resource (got {found})")]
    TypeMismatch { found: String },

    /// Update or delete was asked for an object that was never created
    #[error("deployment has no external name; it was never created")]
    MissingIdentity,

    /// A query or transaction against the marketplace failed
    #[error("{operation} failed: {source}")]
    RemoteOperationFailure {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    /// Writing state back to the cluster failed
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    pub(crate) fn remote(operation: &'static str, source: RemoteError) -> Self {
        Self::RemoteOperationFailure { operation, source }
    }

    /// Short machine-readable label, used for condition reasons and metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationNotFound { .. } => "ConfigurationNotFound",
            Self::CredentialLoadFailure(_) => "CredentialLoadFailure",
            Self::UsageTrackingFailure(_) => "UsageTrackingFailure",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::MissingIdentity => "MissingIdentity",
            Self::RemoteOperationFailure { .. } => "RemoteOperationFailure",
            Self::Kube(_) => "KubernetesApiError",
        }
    }

    /// Whether the failure came from a canceled or expired context
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::CredentialLoadFailure(CredentialError::Context(_))
            | Self::UsageTrackingFailure(TrackingError::Context(_))
            | Self::RemoteOperationFailure {
                source: RemoteError::Context(_),
                ..
            }
            | Self::ConfigurationNotFound {
                source: StoreError::Context(_),
                ..
            } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::MissingIdentity.kind(), "MissingIdentity");
        assert_eq!(
            Error::TypeMismatch {
                found: "v1/ConfigMap".to_string()
            }
            .kind(),
            "TypeMismatch"
        );
        assert_eq!(
            Error::remote("create deployment", RemoteError::NotFound).kind(),
            "RemoteOperationFailure"
        );
    }

    #[test]
    fn test_remote_error_names_operation() {
        let err = Error::remote("close deployment", RemoteError::NotFound);
        assert!(err.to_string().starts_with("close deployment failed"));
    }

    #[test]
    fn test_cancellation_detection() {
        let cancelled = Error::remote(
            "get deployment",
            RemoteError::Context(ContextError::TimedOut(Duration::from_secs(1))),
        );
        assert!(cancelled.is_cancellation());

        let loaded = Error::CredentialLoadFailure(CredentialError::Context(ContextError::Cancelled));
        assert!(loaded.is_cancellation());

        assert!(!Error::MissingIdentity.is_cancellation());
    }
}
