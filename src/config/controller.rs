//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables. The
//! deployment populates them from a ConfigMap with `envFrom`.

use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CREDENTIAL_CACHE_TTL, DEFAULT_METRICS_PORT, DEFAULT_OPERATION_TIMEOUT_SECS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROVIDER_CONFIG_REQUEUE_SECS,
};

/// Which [`DeploymentClient`](crate::client::remote::DeploymentClient)
/// backend serves marketplace calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoteBackend {
    /// Everything through the akash binary
    #[default]
    Cli,
    /// Queries over HTTP, transactions through the akash binary
    Rest,
}

impl FromStr for RemoteBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "rest" => Ok(Self::Rest),
            other => Err(format!("unknown remote backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requeue interval for a healthy Deployment (seconds)
    pub poll_interval_secs: u64,
    /// Upper bound for any single external call-out (seconds)
    pub operation_timeout_secs: u64,
    /// Credential cache time-to-live (seconds)
    pub credential_cache_ttl_secs: u64,
    /// Requeue interval for ProviderConfig usage accounting (seconds)
    pub provider_config_requeue_secs: u64,
    pub remote_backend: RemoteBackend,
    /// Port serving `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Limits how many Deployments reconcile at once
    pub max_concurrent_reconciliations: u16,
    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE); `RUST_LOG` wins when set
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse().ok());
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            poll_interval_secs: parsed("POLL_INTERVAL_SECS").unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            operation_timeout_secs: parsed("OPERATION_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_OPERATION_TIMEOUT_SECS),
            credential_cache_ttl_secs: parsed("CREDENTIAL_CACHE_TTL_SECS")
                .unwrap_or(DEFAULT_CREDENTIAL_CACHE_TTL.as_secs()),
            provider_config_requeue_secs: parsed("PROVIDER_CONFIG_REQUEUE_SECS")
                .unwrap_or(DEFAULT_PROVIDER_CONFIG_REQUEUE_SECS),
            remote_backend: lookup("REMOTE_BACKEND")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            metrics_port: lookup("METRICS_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_METRICS_PORT),
            max_concurrent_reconciliations: lookup("MAX_CONCURRENT_RECONCILIATIONS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(10),
            log_level: text("LOG_LEVEL", "INFO"),
            log_format: text("LOG_FORMAT", "json"),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    #[must_use]
    pub fn credential_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_cache_ttl_secs)
    }

    #[must_use]
    pub fn provider_config_requeue(&self) -> Duration {
        Duration::from_secs(self.provider_config_requeue_secs)
    }
}
