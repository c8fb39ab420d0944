//! # Client
//!
//! [`AkashClient`] bundles resolved settings, the credential (cached, and
//! refreshable when it comes from a Secret), an execution context and a
//! [`DeploymentClient`] backend. Every marketplace call goes through the
//! handle so it honors the context and is counted in metrics.
//!
//! Handles are built by [`ClientFactory`] once per reconciliation.
//!
//! ## Module Structure
//!
//! - `cache.rs` - Time-bounded credential cache
//! - `settings.rs` - Default completion of the Akash settings
//! - `credentials.rs` - Credential descriptors and loaders
//! - `context.rs` - Cancellation and deadlines
//! - `remote.rs` - Marketplace capability and wire types
//! - `cli/` - Process-invocation backend
//! - `rest.rs` - HTTP query backend
//! - `factory.rs` - Client construction

pub mod cache;
pub mod cli;
pub mod context;
pub mod credentials;
mod factory;
pub mod remote;
pub mod rest;
pub mod settings;

pub use factory::ClientFactory;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::client::cache::{CredentialBlob, CredentialCache};
use crate::client::context::OperationContext;
use crate::client::credentials::{CredentialDescriptor, CredentialError, CredentialLoader};
use crate::client::remote::{
    DeploymentClient, DeploymentId, DeploymentSnapshot, RemoteCall, RemoteError, Seqs,
};
use crate::client::settings::ProviderSettings;
use crate::error::{Error, Result};
use crate::observability::metrics;

pub struct AkashClient {
    settings: ProviderSettings,
    /// Present only for refreshable (Secret) credentials
    descriptor: Option<CredentialDescriptor>,
    cache: CredentialCache,
    loader: Arc<dyn CredentialLoader>,
    remote: Arc<dyn DeploymentClient>,
    ctx: OperationContext,
    note: String,
}

impl std::fmt::Debug for AkashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AkashClient")
            .field("settings", &self.settings)
            .field("descriptor", &self.descriptor)
            .field("note", &self.note)
            .finish_non_exhaustive()
    }
}

impl AkashClient {
    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    #[must_use]
    pub fn context(&self) -> &OperationContext {
        &self.ctx
    }

    /// Memo attached to every transaction this handle broadcasts
    pub fn set_transaction_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// The current credential.
    ///
    /// Secret-backed credentials are served from the cache and reloaded once
    /// stale; other credentials are returned as loaded at construction.
    ///
    /// # Errors
    ///
    /// Fails when a stale Secret credential cannot be reloaded.
    pub async fn credentials(&self) -> Result<CredentialBlob, CredentialError> {
        match &self.descriptor {
            Some(descriptor) => {
                self.cache
                    .get(|| self.loader.extract(&self.ctx, descriptor))
                    .await
            }
            None => Ok(self.cache.last_loaded().await),
        }
    }

    /// Reload a Secret-backed credential now. No-op for other sources.
    ///
    /// # Errors
    ///
    /// Fails when the Secret cannot be read; the cached credential is kept.
    pub async fn refresh_credentials(&self) -> Result<(), CredentialError> {
        let Some(descriptor) = &self.descriptor else {
            return Ok(());
        };
        self.cache
            .force_refresh(|| self.loader.extract(&self.ctx, descriptor))
            .await
            .map(|_| ())
    }

    pub async fn set_credential_cache_ttl(&self, ttl: Duration) {
        self.cache.set_ttl(ttl).await;
    }

    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` or `RemoteOperationFailure`.
    pub async fn list_deployments(&self, owner: &str) -> Result<Vec<DeploymentId>> {
        let credentials = self.call_credentials().await?;
        let call = self.remote_call(&credentials);
        self.invoke("list_deployments", self.remote.list_deployments(call, owner))
            .await
    }

    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` or `RemoteOperationFailure`.
    pub async fn get_deployment(&self, dseq: &str, owner: &str) -> Result<DeploymentSnapshot> {
        let credentials = self.call_credentials().await?;
        let call = self.remote_call(&credentials);
        let id = DeploymentId::new(owner, dseq);
        self.invoke("get_deployment", self.remote.get_deployment(call, &id))
            .await
    }

    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` or `RemoteOperationFailure`.
    pub async fn create_deployment(&self, manifest: &str) -> Result<Seqs> {
        let credentials = self.call_credentials().await?;
        let call = self.remote_call(&credentials);
        self.invoke(
            "create_deployment",
            self.remote.create_deployment(call, manifest),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` or `RemoteOperationFailure`.
    pub async fn update_deployment(&self, dseq: &str, manifest: &str) -> Result<()> {
        let credentials = self.call_credentials().await?;
        let call = self.remote_call(&credentials);
        let id = DeploymentId::new(self.settings.account_address.clone(), dseq);
        self.invoke(
            "update_deployment",
            self.remote.update_deployment(call, &id, manifest),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` or `RemoteOperationFailure`.
    pub async fn delete_deployment(&self, dseq: &str, owner: &str) -> Result<()> {
        let credentials = self.call_credentials().await?;
        let call = self.remote_call(&credentials);
        let id = DeploymentId::new(owner, dseq);
        self.invoke("delete_deployment", self.remote.delete_deployment(call, &id))
            .await
    }

    async fn call_credentials(&self) -> Result<CredentialBlob> {
        self.credentials().await.map_err(Error::CredentialLoadFailure)
    }

    fn remote_call<'a>(&'a self, credentials: &'a CredentialBlob) -> RemoteCall<'a> {
        RemoteCall {
            settings: &self.settings,
            credentials: credentials.as_slice(),
            note: &self.note,
        }
    }

    async fn invoke<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        let start = Instant::now();
        let result = match self.ctx.run(operation, fut).await {
            Ok(result) => result,
            Err(e) => Err(RemoteError::Context(e)),
        };
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_remote_operation(operation, result.is_ok(), elapsed);
        debug!(operation, success = result.is_ok(), elapsed, "marketplace call finished");
        result.map_err(|e| Error::remote(operation, e))
    }
}
