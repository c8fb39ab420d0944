//! # Connector
//!
//! Turns a managed object into an [`ExternalDeployment`]: checks its kind,
//! looks up the referenced ProviderConfig and builds a client for it.

use std::sync::Arc;

use async_trait::async_trait;
use kube::{Api, Client};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::client::context::{ContextError, OperationContext};
use crate::client::credentials::CredentialDescriptor;
use crate::client::ClientFactory;
use crate::controller::external::ExternalDeployment;
use crate::crd::{ManagedResource, ProviderConfig};
use crate::error::{Error, Result};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ProviderConfig not found")]
    NotFound,

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Read access to ProviderConfig objects
#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    async fn get(&self, ctx: &OperationContext, name: &str) -> Result<ProviderConfig, StoreError>;
}

#[derive(Clone)]
pub struct KubeProviderConfigStore {
    api: Api<ProviderConfig>,
}

impl KubeProviderConfigStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ProviderConfigStore for KubeProviderConfigStore {
    async fn get(&self, ctx: &OperationContext, name: &str) -> Result<ProviderConfig, StoreError> {
        ctx.run("get_provider_config", self.api.get_opt(name))
            .await??
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Clone)]
pub struct Connector {
    store: Arc<dyn ProviderConfigStore>,
    factory: ClientFactory,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

impl Connector {
    #[must_use]
    pub fn new(store: Arc<dyn ProviderConfigStore>, factory: ClientFactory) -> Self {
        Self { store, factory }
    }

    /// Bind a lifecycle handler to the client `managed` should use.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` for anything but a Deployment, `ConfigurationNotFound`
    /// when the ProviderConfig cannot be read, and the client construction
    /// errors of [`ClientFactory::build`].
    #[instrument(skip_all)]
    pub async fn connect(
        &self,
        ctx: &OperationContext,
        managed: &ManagedResource,
    ) -> Result<ExternalDeployment> {
        let deployment = managed.as_deployment()?;
        let name = deployment.provider_config_name();

        let config = self
            .store
            .get(ctx, name)
            .await
            .map_err(|source| Error::ConfigurationNotFound {
                name: name.to_string(),
                source,
            })?;

        let descriptor = CredentialDescriptor::try_from(&config.spec.credentials)
            .map_err(Error::CredentialLoadFailure)?;
        debug!(
            provider_config = name,
            source = descriptor.source_name(),
            "connecting"
        );

        let client = self
            .factory
            .build_within(ctx, config.spec.configuration.as_ref(), descriptor, deployment)
            .await?;
        Ok(ExternalDeployment::new(client))
    }
}
