//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `akash_provider_reconciliations_total` - Total number of Deployment reconciliations
//! - `akash_provider_reconciliation_errors_total` - Reconciliation errors by error kind
//! - `akash_provider_reconciliation_duration_seconds` - Duration of reconciliations
//! - `akash_provider_remote_operations_total` - Marketplace call-outs by operation and outcome
//! - `akash_provider_remote_operation_duration_seconds` - Duration of marketplace call-outs
//! - `akash_provider_credential_cache_hits_total` - Credential reads served from cache
//! - `akash_provider_credential_cache_misses_total` - Credential reads that found the cache stale
//! - `akash_provider_credential_refreshes_total` - Credential loader invocations
//! - `akash_provider_usage_tracking_total` - ProviderConfig usages recorded
//! - `akash_provider_deployments_managed` - Deployments currently holding a remote identity

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REGISTERED: AtomicBool = AtomicBool::new(false);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "akash_provider_reconciliations_total",
        "Total number of Deployment reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "akash_provider_reconciliation_errors_total",
            "Total number of reconciliation errors by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "akash_provider_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "akash_provider_remote_operations_total",
            "Total number of marketplace operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "akash_provider_remote_operation_duration_seconds",
            "Duration of marketplace operations in seconds by operation",
        )
        // Broadcasts wait for block inclusion
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_DURATION metric - this should never happen")
});

static CREDENTIAL_CACHE_HITS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "akash_provider_credential_cache_hits_total",
        "Total number of credential lookups served from the cache",
    )
    .expect("Failed to create CREDENTIAL_CACHE_HITS_TOTAL metric - this should never happen")
});

static CREDENTIAL_CACHE_MISSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "akash_provider_credential_cache_misses_total",
        "Total number of credential lookups that found the cache empty or stale",
    )
    .expect("Failed to create CREDENTIAL_CACHE_MISSES_TOTAL metric - this should never happen")
});

static CREDENTIAL_REFRESHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "akash_provider_credential_refreshes_total",
        "Total number of credential loader invocations",
    )
    .expect("Failed to create CREDENTIAL_REFRESHES_TOTAL metric - this should never happen")
});

static USAGE_TRACKING_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "akash_provider_usage_tracking_total",
        "Total number of ProviderConfig usages recorded",
    )
    .expect("Failed to create USAGE_TRACKING_TOTAL metric - this should never happen")
});

static DEPLOYMENTS_MANAGED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "akash_provider_deployments_managed",
        "Current number of Deployments holding a remote identity",
    )
    .expect("Failed to create DEPLOYMENTS_MANAGED metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric collides with one registered elsewhere"
)]
/// Register every metric with [`REGISTRY`]; later calls are no-ops
pub fn register_metrics() -> Result<()> {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CREDENTIAL_CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIAL_CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIAL_REFRESHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(USAGE_TRACKING_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEPLOYMENTS_MANAGED.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Record one marketplace call-out
pub fn record_remote_operation(operation: &str, success: bool, duration: f64) {
    let outcome = if success { "success" } else { "error" };
    REMOTE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    REMOTE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_credential_cache_hits() {
    CREDENTIAL_CACHE_HITS_TOTAL.inc();
}

pub fn increment_credential_cache_misses() {
    CREDENTIAL_CACHE_MISSES_TOTAL.inc();
}

pub fn increment_credential_refreshes() {
    CREDENTIAL_REFRESHES_TOTAL.inc();
}

pub fn increment_usage_tracking() {
    USAGE_TRACKING_TOTAL.inc();
}

pub fn set_deployments_managed(count: i64) {
    DEPLOYMENTS_MANAGED.set(count);
}
