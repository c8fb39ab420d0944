//! # Usage Tracking
//!
//! Records which managed resources use which ProviderConfig. Each tracked
//! Deployment gets one `ProviderConfigUsage`, named after its uid, owned by
//! the Deployment and labelled with the config name so the ProviderConfig
//! controller can count its users.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use thiserror::Error;
use tracing::debug;

use crate::client::context::{ContextError, OperationContext};
use crate::constants::{FIELD_MANAGER, PROVIDER_CONFIG_LABEL};
use crate::crd::{
    AkashDeployment, ProviderConfigReference, ProviderConfigUsage, ProviderConfigUsageSpec,
    TypedReference,
};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("managed resource has no uid yet")]
    MissingUid,

    #[error("cannot apply ProviderConfigUsage: {0}")]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Context(#[from] ContextError),
}

#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Record that `managed` uses its ProviderConfig. Idempotent.
    async fn track(
        &self,
        ctx: &OperationContext,
        managed: &AkashDeployment,
    ) -> Result<(), TrackingError>;
}

/// Build the usage object describing `managed`
///
/// # Errors
///
/// Returns `MissingUid` for objects the API server has not persisted yet.
pub fn usage_for(managed: &AkashDeployment) -> Result<ProviderConfigUsage, TrackingError> {
    let uid = managed.uid().ok_or(TrackingError::MissingUid)?;
    let name = uid.clone();
    let config_name = managed.provider_config_name().to_string();

    let mut usage = ProviderConfigUsage::new(
        &name,
        ProviderConfigUsageSpec {
            provider_config_ref: ProviderConfigReference {
                name: config_name.clone(),
            },
            resource_ref: TypedReference {
                api_version: AkashDeployment::api_version(&()).into_owned(),
                kind: AkashDeployment::kind(&()).into_owned(),
                name: managed.name_any(),
                uid: Some(uid),
            },
        },
    );
    usage
        .labels_mut()
        .insert(PROVIDER_CONFIG_LABEL.to_string(), config_name);
    if let Some(owner) = managed.controller_owner_ref(&()) {
        usage.owner_references_mut().push(owner);
    }
    Ok(usage)
}

/// Applies `ProviderConfigUsage` objects with server-side apply
#[derive(Clone)]
pub struct ProviderConfigUsageTracker {
    client: Client,
}

impl ProviderConfigUsageTracker {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageTracker for ProviderConfigUsageTracker {
    async fn track(
        &self,
        ctx: &OperationContext,
        managed: &AkashDeployment,
    ) -> Result<(), TrackingError> {
        let usage = usage_for(managed)?;
        let name = usage.name_any();
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        let params = PatchParams::apply(FIELD_MANAGER).force();

        ctx.run("track_usage", api.patch(&name, &params, &Patch::Apply(&usage)))
            .await??;

        metrics::increment_usage_tracking();
        debug!(
            usage = %name,
            provider_config = managed.provider_config_name(),
            "ProviderConfig usage recorded"
        );
        Ok(())
    }
}
