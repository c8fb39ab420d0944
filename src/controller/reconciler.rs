//! # Deployment Reconciler
//!
//! Drives each `Deployment` through connect, observe and then create, update
//! or delete, and writes the outcome back to the cluster:
//!
//! - the external-name annotation after a create;
//! - the managed finalizer, removed once the remote deployment is closed;
//! - connection details into `writeConnectionSecretToRef`;
//! - `status.atProvider` and the `Ready`/`Synced` conditions.
//!
//! Failures requeue with a per-resource Fibonacci backoff; a clean pass
//! resets it and requeues after the poll interval.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::client::context::OperationContext;
use crate::config::ControllerConfig;
use crate::constants::{
    BACKOFF_MAX_MINUTES, BACKOFF_MIN_MINUTES, FIELD_MANAGER, MANAGED_FINALIZER,
};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::connector::Connector;
use crate::controller::external::{ConnectionDetails, ExternalDeployment, ExternalObservation};
use crate::controller::finalizers::{has_finalizer, set_finalizer};
use crate::crd::{
    set_condition, AkashDeployment, Condition, DeletionPolicy, DeploymentStatus, ManagedResource,
};
use crate::error::{Error, Result};
use crate::observability::metrics;

const CONNECTION_SECRET_TYPE: &str = "connection.crossplane.io/v1alpha1";

/// What a live Deployment needs after observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Create,
    Update,
    UpToDate,
}

impl LifecycleStep {
    #[must_use]
    pub fn plan(observation: &ExternalObservation) -> Self {
        if !observation.resource_exists {
            Self::Create
        } else if !observation.resource_up_to_date {
            Self::Update
        } else {
            Self::UpToDate
        }
    }

    /// `Ready` condition once the step succeeded
    #[must_use]
    pub fn ready_condition(self) -> Condition {
        match self {
            Self::Create => Condition::creating(),
            Self::Update | Self::UpToDate => Condition::available(),
        }
    }
}

/// What a Deployment marked for deletion needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    /// Close the remote deployment, then release the finalizer
    Close,
    /// Release the finalizer and leave the remote deployment running
    Orphan,
    /// Our finalizer is already gone; nothing to do
    Released,
}

impl DeletionStep {
    #[must_use]
    pub fn plan(desired: &AkashDeployment) -> Self {
        if !has_finalizer(desired, MANAGED_FINALIZER) {
            return Self::Released;
        }
        match desired.spec.deletion_policy {
            DeletionPolicy::Delete => Self::Close,
            DeletionPolicy::Orphan => Self::Orphan,
        }
    }
}

/// Merge patch persisting the external-name annotation set by a create
#[must_use]
pub fn external_name_patch(desired: &AkashDeployment) -> Option<serde_json::Value> {
    desired
        .external_name_patch()
        .map(|annotations| serde_json::json!({ "metadata": { "annotations": annotations } }))
}

/// Shared state of the Deployment controller
pub struct Reconciler {
    pub client: Client,
    pub connector: Connector,
    pub config: ControllerConfig,
    /// Root context; cancelled on shutdown
    pub ctx: OperationContext,
    /// Per-resource backoff, keyed by Deployment name
    pub backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
    managed: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        client: Client,
        connector: Connector,
        config: ControllerConfig,
        ctx: OperationContext,
    ) -> Self {
        Self {
            client,
            connector,
            config,
            ctx,
            backoff_states: Mutex::new(HashMap::new()),
            managed: Mutex::new(HashSet::new()),
        }
    }

    fn api(&self) -> Api<AkashDeployment> {
        Api::all(self.client.clone())
    }

    /// Forget the error streak of `name`; returns whether there was one
    fn reset_backoff(&self, name: &str) -> bool {
        self.backoff_states
            .lock()
            .ok()
            .and_then(|mut states| states.remove(name))
            .is_some_and(|backoff| backoff.failures() > 0)
    }

    fn next_backoff(&self, name: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let backoff = states.entry(name.to_string()).or_insert_with(|| {
                    FibonacciBackoff::new(BACKOFF_MIN_MINUTES, BACKOFF_MAX_MINUTES)
                });
                let delay = backoff.next_backoff();
                (delay, backoff.failures())
            }
            Err(e) => {
                warn!(error = %e, "backoff state poisoned, using minimum backoff");
                (Duration::from_secs(BACKOFF_MIN_MINUTES * 60), 0)
            }
        }
    }

    fn track_managed(&self, name: &str, present: bool) {
        if let Ok(mut managed) = self.managed.lock() {
            if present {
                managed.insert(name.to_string());
            } else {
                managed.remove(name);
            }
            metrics::set_deployments_managed(i64::try_from(managed.len()).unwrap_or(i64::MAX));
        }
    }
}

/// Reconcile one Deployment
///
/// # Errors
///
/// Any error of connect or of the lifecycle call; the `Synced` condition is
/// set to `False` with the error message first.
pub async fn reconcile(deployment: Arc<AkashDeployment>, ctx: Arc<Reconciler>) -> Result<Action> {
    let name = deployment.name_any();
    let span = info_span!("reconcile", deployment = %name);

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations();

        let mut desired = (*deployment).clone();
        let result = reconcile_deployment(&mut desired, &ctx).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(action) => {
                if ctx.reset_backoff(&name) {
                    info!("backoff reset after successful reconciliation");
                }
                Ok(action)
            }
            Err(e) => {
                if let Err(status_err) = record_failure(&ctx, &mut desired, &e).await {
                    warn!(error = %status_err, "cannot record reconcile error in status");
                }
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn reconcile_deployment(desired: &mut AkashDeployment, ctx: &Reconciler) -> Result<Action> {
    let name = desired.name_any();
    let api = ctx.api();
    let op_ctx = ctx.ctx.child();

    let external = ctx
        .connector
        .connect(&op_ctx, &ManagedResource::from(desired.clone()))
        .await?;

    if desired.meta().deletion_timestamp.is_some() {
        return finalize(desired, ctx, &external).await;
    }

    set_finalizer(&api, desired, MANAGED_FINALIZER, true).await?;

    let observation = external.observe(desired).await?;
    let step = LifecycleStep::plan(&observation);
    debug!(?step, "observed remote deployment");
    let mut details = match step {
        LifecycleStep::Create => {
            let creation = external.create(desired).await?;
            if let Some(patch) = external_name_patch(desired) {
                api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
                    .await?;
            }
            creation.connection_details
        }
        LifecycleStep::Update => {
            let update = external.update(desired).await?;
            let mut details = observation.connection_details;
            details.extend(update.connection_details);
            details
        }
        LifecycleStep::UpToDate => observation.connection_details,
    };

    details.retain(|_, v| !v.is_empty());
    publish_connection_details(ctx, desired, details).await?;

    {
        let status = desired.status.get_or_insert_with(DeploymentStatus::default);
        set_condition(&mut status.conditions, step.ready_condition());
        set_condition(&mut status.conditions, Condition::reconcile_success());
    }
    patch_status(&api, desired).await?;
    ctx.track_managed(&name, true);

    let interval = ctx.config.poll_interval();
    debug!(requeue_secs = interval.as_secs(), "reconciled");
    Ok(Action::requeue(interval))
}

async fn finalize(
    desired: &mut AkashDeployment,
    ctx: &Reconciler,
    external: &ExternalDeployment,
) -> Result<Action> {
    let step = DeletionStep::plan(desired);
    if step == DeletionStep::Released {
        return Ok(Action::await_change());
    }
    let api = ctx.api();

    {
        let status = desired.status.get_or_insert_with(DeploymentStatus::default);
        set_condition(&mut status.conditions, Condition::deleting());
    }
    if let Err(e) = patch_status(&api, desired).await {
        debug!(error = %e, "cannot mark deployment as deleting");
    }

    match step {
        DeletionStep::Close => external.delete(desired).await?,
        DeletionStep::Orphan => info!("deletion policy is Orphan, leaving remote deployment"),
        DeletionStep::Released => {}
    }

    set_finalizer(&api, desired, MANAGED_FINALIZER, false).await?;
    ctx.track_managed(&desired.name_any(), false);
    Ok(Action::await_change())
}

async fn patch_status(api: &Api<AkashDeployment>, desired: &AkashDeployment) -> Result<()> {
    let Some(status) = &desired.status else {
        return Ok(());
    };
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&desired.name_any(), &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    Ok(())
}

async fn record_failure(ctx: &Reconciler, desired: &mut AkashDeployment, e: &Error) -> Result<()> {
    if e.is_cancellation() && ctx.ctx.is_cancelled() {
        return Ok(());
    }
    let status = desired.status.get_or_insert_with(DeploymentStatus::default);
    set_condition(&mut status.conditions, Condition::reconcile_error(e.to_string()));
    patch_status(&ctx.api(), desired).await
}

/// Server-side apply the connection Secret, if the Deployment asks for one
async fn publish_connection_details(
    ctx: &Reconciler,
    desired: &AkashDeployment,
    details: ConnectionDetails,
) -> Result<()> {
    let Some(target) = &desired.spec.write_connection_secret_to_ref else {
        return Ok(());
    };
    if details.is_empty() {
        return Ok(());
    }

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            owner_references: desired.controller_owner_ref(&()).map(|o| vec![o]),
            ..ObjectMeta::default()
        },
        data: Some(
            details
                .into_iter()
                .map(|(k, v)| (k, ByteString(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        type_: Some(CONNECTION_SECRET_TYPE.to_string()),
        ..Secret::default()
    };

    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &target.namespace);
    api.patch(
        &target.name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&secret),
    )
    .await?;
    debug!(secret = %target.name, namespace = %target.namespace, "connection details published");
    Ok(())
}

/// Requeue a failed reconciliation with Fibonacci backoff
pub fn error_policy(deployment: Arc<AkashDeployment>, error: &Error, ctx: Arc<Reconciler>) -> Action {
    let name = deployment.name_any();
    metrics::increment_reconciliation_errors(error.kind());

    let (delay, failures) = ctx.next_backoff(&name);
    let next = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_out_of_range| chrono::Duration::minutes(1));
    error!(
        deployment = %name,
        kind = error.kind(),
        error = %error,
        failures,
        retry_at = %next.to_rfc3339(),
        "reconciliation failed"
    );
    Action::requeue(delay)
}

/// Run the Deployment controller until shutdown
pub async fn run(reconciler: Arc<Reconciler>) {
    let api = reconciler.api();
    let concurrency = reconciler.config.max_concurrent_reconciliations;
    info!(concurrency, "starting Deployment controller");

    Controller::new(api, watcher::Config::default().any_semantic())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(deployment = %object.name, "reconcile finished"),
                Err(e) => warn!(error = %e, "Deployment controller stream error"),
            }
        })
        .await;

    info!("Deployment controller stopped");
}
