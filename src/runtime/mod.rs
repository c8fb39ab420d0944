//! # Runtime
//!
//! Process start-up: rustls provider, tracing subscriber, metrics, the probe
//! server, the Kubernetes client and the two controllers.

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info};

use crate::client::cli::CliDeploymentClient;
use crate::client::context::OperationContext;
use crate::client::credentials::KubeCredentialLoader;
use crate::client::remote::DeploymentClient;
use crate::client::rest::RestDeploymentClient;
use crate::client::ClientFactory;
use crate::config::{ControllerConfig, RemoteBackend};
use crate::controller::connector::{Connector, KubeProviderConfigStore};
use crate::controller::providerconfig::{self, ProviderConfigReconciler};
use crate::controller::reconciler::{self, Reconciler};
use crate::controller::usage::ProviderConfigUsageTracker;
use crate::observability;
use crate::server::{start_server, ServerState};

/// Install the tracing subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
pub fn init_tracing(config: &ControllerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_unset| {
        format!("akash_provider={}", config.log_level.to_lowercase()).into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder.json().try_init()
    };
    if let Err(e) = installed {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

fn remote_backend(config: &ControllerConfig) -> Result<Arc<dyn DeploymentClient>> {
    Ok(match config.remote_backend {
        RemoteBackend::Cli => Arc::new(CliDeploymentClient::new()),
        RemoteBackend::Rest => {
            let http = reqwest::Client::builder()
                .timeout(config.operation_timeout())
                .build()
                .context("Failed to build HTTP client")?;
            Arc::new(RestDeploymentClient::new(http))
        }
    })
}

/// Start everything and run until SIGINT/SIGTERM
///
/// # Errors
///
/// Fails when start-up cannot complete: no Kubernetes client, metrics
/// registration failure or an unusable HTTP client configuration.
pub async fn run(config: ControllerConfig) -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    info!(
        timestamp = env!("BUILD_TIMESTAMP"),
        datetime = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        "starting Akash provider controller"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let probe_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, probe_state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let root = OperationContext::new(config.operation_timeout());
    let factory = ClientFactory::new(
        Arc::new(KubeCredentialLoader::new(client.clone())),
        Arc::new(ProviderConfigUsageTracker::new(client.clone())),
        remote_backend(&config)?,
    )
    .with_cache_ttl(config.credential_cache_ttl())
    .with_context(root.clone());
    let connector = Connector::new(
        Arc::new(KubeProviderConfigStore::new(client.clone())),
        factory,
    );

    let deployments = Arc::new(Reconciler::new(
        client.clone(),
        connector,
        config.clone(),
        root.clone(),
    ));
    let provider_configs = Arc::new(ProviderConfigReconciler::new(
        client,
        config.provider_config_requeue(),
    ));

    server_state.set_ready(true);
    info!(backend = ?config.remote_backend, "controllers starting");

    tokio::join!(
        reconciler::run(deployments),
        providerconfig::run(provider_configs),
    );

    server_state.set_ready(false);
    root.cancel();
    info!("controller stopped gracefully");
    Ok(())
}
