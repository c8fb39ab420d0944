//! # ProviderConfig Reconciler
//!
//! Counts the `ProviderConfigUsage` objects pointing at each ProviderConfig,
//! writes the count to `status.users` and holds the in-use finalizer while
//! it is non-zero, so a config cannot disappear from under its Deployments.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::{watcher, Controller};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::constants::{IN_USE_FINALIZER, PROVIDER_CONFIG_LABEL};
use crate::controller::finalizers::set_finalizer;
use crate::crd::{set_condition, Condition, ProviderConfig, ProviderConfigUsage, CONDITION_READY};
use crate::error::{Error, Result};
use crate::observability::metrics;

pub struct ProviderConfigReconciler {
    pub client: Client,
    pub requeue: Duration,
}

impl std::fmt::Debug for ProviderConfigReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfigReconciler")
            .field("requeue", &self.requeue)
            .finish_non_exhaustive()
    }
}

impl ProviderConfigReconciler {
    #[must_use]
    pub fn new(client: Client, requeue: Duration) -> Self {
        Self { client, requeue }
    }
}

/// Selector matching the usages of ProviderConfig `name`
#[must_use]
pub fn usage_selector(name: &str) -> String {
    format!("{PROVIDER_CONFIG_LABEL}={name}")
}

/// Whether the in-use finalizer belongs on a config with `users` users
#[must_use]
pub fn needs_in_use_finalizer(users: usize) -> bool {
    users > 0
}

/// # Errors
///
/// Kubernetes API errors while counting usages or writing the config.
pub async fn reconcile(
    config: Arc<ProviderConfig>,
    ctx: Arc<ProviderConfigReconciler>,
) -> Result<Action> {
    let name = config.name_any();
    let span = info_span!("reconcile_provider_config", provider_config = %name);

    async move {
        let usages: Api<ProviderConfigUsage> = Api::all(ctx.client.clone());
        let users = usages
            .list_metadata(&ListParams::default().labels(&usage_selector(&name)))
            .await?
            .items
            .len();

        let api: Api<ProviderConfig> = Api::all(ctx.client.clone());
        let in_use = needs_in_use_finalizer(users);

        if config.metadata.deletion_timestamp.is_some() && in_use {
            warn!(users, "ProviderConfig is being deleted but still in use");
        }
        set_finalizer(&api, config.as_ref(), IN_USE_FINALIZER, in_use).await?;

        let mut conditions = config
            .status
            .as_ref()
            .map(|s| s.conditions.clone())
            .unwrap_or_default();
        set_condition(
            &mut conditions,
            Condition::new(CONDITION_READY, true, "Available", format!("{users} user(s)")),
        );
        let patch = serde_json::json!({
            "status": {
                "users": i64::try_from(users).unwrap_or(i64::MAX),
                "conditions": conditions,
            }
        });
        if config.metadata.deletion_timestamp.is_none() || in_use {
            api.patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
                .await?;
        }

        debug!(users, "ProviderConfig usage counted");
        Ok(Action::requeue(ctx.requeue))
    }
    .instrument(span)
    .await
}

pub fn error_policy(
    config: Arc<ProviderConfig>,
    error: &Error,
    ctx: Arc<ProviderConfigReconciler>,
) -> Action {
    metrics::increment_reconciliation_errors(error.kind());
    warn!(provider_config = %config.name_any(), error = %error, "ProviderConfig reconciliation failed");
    Action::requeue(ctx.requeue)
}

/// Run the ProviderConfig controller until shutdown
pub async fn run(reconciler: Arc<ProviderConfigReconciler>) {
    let api: Api<ProviderConfig> = Api::all(reconciler.client.clone());
    info!("starting ProviderConfig controller");

    Controller::new(api, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            if let Err(e) = result {
                warn!(error = %e, "ProviderConfig controller stream error");
            }
        })
        .await;

    info!("ProviderConfig controller stopped");
}
