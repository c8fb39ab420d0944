//! # Client Factory
//!
//! Builds an [`AkashClient`] for one managed resource. Construction either
//! succeeds completely or returns an error naming the failed stage:
//!
//! 1. resolve settings from the ProviderConfig's partial configuration;
//! 2. load the credential once (Secret-backed credentials keep their
//!    descriptor for later refreshes);
//! 3. record ProviderConfig usage;
//! 4. seed the credential cache and hand the client out.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::client::cache::CredentialCache;
use crate::client::context::OperationContext;
use crate::client::credentials::{CredentialDescriptor, CredentialLoader};
use crate::client::remote::DeploymentClient;
use crate::client::settings::resolve_settings;
use crate::client::AkashClient;
use crate::constants::DEFAULT_CREDENTIAL_CACHE_TTL;
use crate::controller::usage::UsageTracker;
use crate::crd::{AkashConfiguration, AkashDeployment};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct ClientFactory {
    loader: Arc<dyn CredentialLoader>,
    tracker: Arc<dyn UsageTracker>,
    remote: Arc<dyn DeploymentClient>,
    cache_ttl: Duration,
    ctx: OperationContext,
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("cache_ttl", &self.cache_ttl)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl ClientFactory {
    #[must_use]
    pub fn new(
        loader: Arc<dyn CredentialLoader>,
        tracker: Arc<dyn UsageTracker>,
        remote: Arc<dyn DeploymentClient>,
    ) -> Self {
        Self {
            loader,
            tracker,
            remote,
            cache_ttl: DEFAULT_CREDENTIAL_CACHE_TTL,
            ctx: OperationContext::default(),
        }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Default parent context for [`build`](Self::build)
    #[must_use]
    pub fn with_context(mut self, ctx: OperationContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Build a ready-to-use client for `managed`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialLoadFailure` when the credential cannot be read and
    /// `UsageTrackingFailure` when usage cannot be recorded. Usage is never
    /// recorded for a credential that failed to load.
    pub async fn build(
        &self,
        configuration: Option<&AkashConfiguration>,
        descriptor: CredentialDescriptor,
        managed: &AkashDeployment,
    ) -> Result<AkashClient> {
        self.build_within(&self.ctx, configuration, descriptor, managed)
            .await
    }

    /// [`build`](Self::build) under a caller-supplied parent context
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub async fn build_within(
        &self,
        parent: &OperationContext,
        configuration: Option<&AkashConfiguration>,
        descriptor: CredentialDescriptor,
        managed: &AkashDeployment,
    ) -> Result<AkashClient> {
        let settings = resolve_settings(configuration);
        let ctx = parent.child();

        debug!(
            source = descriptor.source_name(),
            net = %settings.net,
            chain_id = %settings.chain_id,
            "building akash client"
        );

        let blob = self
            .loader
            .extract(&ctx, &descriptor)
            .await
            .map_err(Error::CredentialLoadFailure)?;

        self.tracker
            .track(&ctx, managed)
            .await
            .map_err(Error::UsageTrackingFailure)?;

        let cache = CredentialCache::new(self.cache_ttl);
        cache.store(blob).await;

        let refreshable = descriptor.is_refreshable();
        if refreshable {
            debug!(source = descriptor.source_name(), "credential cache bound to secret");
        }

        Ok(AkashClient {
            settings,
            descriptor: refreshable.then_some(descriptor),
            cache,
            loader: Arc::clone(&self.loader),
            remote: Arc::clone(&self.remote),
            ctx,
            note: String::new(),
        })
    }
}
