//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

use std::time::Duration;

/// API group shared by every kind this controller serves
pub const API_GROUP: &str = "akash.crossplane.io";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "akash-provider-controller";

/// Annotation carrying the remote identity (dseq) of a reconciled Deployment
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Finalizer held by managed Deployments until the remote entity is closed
pub const MANAGED_FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// Finalizer held by ProviderConfigs while any usage references them
pub const IN_USE_FINALIZER: &str = "in-use.crossplane.io";

/// Label linking a ProviderConfigUsage to its ProviderConfig
pub const PROVIDER_CONFIG_LABEL: &str = "akash.crossplane.io/provider-config";

/// ProviderConfig name used when a Deployment does not set one
pub const DEFAULT_PROVIDER_CONFIG_NAME: &str = "default";

/// Default credential cache time-to-live
pub const DEFAULT_CREDENTIAL_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default poll interval between reconciliations of a healthy resource (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default upper bound for a single external call-out (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

/// Default requeue interval for ProviderConfig usage accounting (seconds)
pub const DEFAULT_PROVIDER_CONFIG_REQUEUE_SECS: u64 = 30;

/// Fibonacci backoff floor for reconciliation errors (minutes)
pub const BACKOFF_MIN_MINUTES: u64 = 1;

/// Fibonacci backoff ceiling for reconciliation errors (minutes)
pub const BACKOFF_MAX_MINUTES: u64 = 10;

/// Attempts made for a CLI call failing with a transient decode error
pub const CLI_MAX_ATTEMPTS: u32 = 3;
