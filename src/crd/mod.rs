//! # Custom Resource Definitions
//!
//! CRD types served by the provider, all in group `akash.crossplane.io/v1alpha1`
//! and cluster scoped.
//!
//! ## Module Structure
//!
//! - `deployment.rs` - The managed `Deployment` resource
//! - `provider_config.rs` - `ProviderConfig`: credentials and Akash settings
//! - `usage.rs` - `ProviderConfigUsage`: usage records protecting ProviderConfigs
//! - `status.rs` - Status conditions

mod deployment;
mod provider_config;
mod status;
mod usage;

use kube::core::DynamicObject;
use kube::Resource;

pub use deployment::{
    AkashDeployment, DeletionPolicy, DeploymentObservation, DeploymentParameters, DeploymentSpec,
    DeploymentStatus, ProviderConfigReference, SecretReference,
};
pub use provider_config::{
    AkashConfiguration, CredentialsSource, EnvSelector, FsSelector, ProviderConfig,
    ProviderConfigSpec, ProviderConfigStatus, ProviderCredentials, SecretKeySelector,
};
pub use status::{set_condition, Condition, CONDITION_READY, CONDITION_SYNCED};
pub use usage::{ProviderConfigUsage, ProviderConfigUsageSpec, TypedReference};

use crate::error::{Error, Result};

/// A managed object handed to the connector.
///
/// Objects arriving through a typed watch are always `Deployment`; objects
/// arriving untyped are classified once, here.
#[derive(Debug, Clone)]
pub enum ManagedResource {
    Deployment(Box<AkashDeployment>),
    Unknown { api_version: String, kind: String },
}

impl From<AkashDeployment> for ManagedResource {
    fn from(deployment: AkashDeployment) -> Self {
        Self::Deployment(Box::new(deployment))
    }
}

impl ManagedResource {
    /// Classify an untyped object by its apiVersion and kind
    #[must_use]
    pub fn from_dynamic(object: DynamicObject) -> Self {
        let (api_version, kind) = object
            .types
            .as_ref()
            .map(|t| (t.api_version.clone(), t.kind.clone()))
            .unwrap_or_default();

        if api_version != AkashDeployment::api_version(&()) || kind != AkashDeployment::kind(&()) {
            return Self::Unknown { api_version, kind };
        }

        serde_json::to_value(object)
            .and_then(serde_json::from_value::<AkashDeployment>)
            .map_or(Self::Unknown { api_version, kind }, Self::from)
    }

    /// Borrow the Deployment, or fail with `TypeMismatch`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for any other kind.
    pub fn as_deployment(&self) -> Result<&AkashDeployment> {
        match self {
            Self::Deployment(deployment) => Ok(&**deployment),
            Self::Unknown { api_version, kind } => Err(Error::TypeMismatch {
                found: format!("{api_version}/{kind}"),
            }),
        }
    }
}
