//! # Akash Provider Controller
//!
//! Kubernetes controller that keeps `Deployment` resources in step with
//! deployments on the Akash marketplace.

use akash_provider::config::ControllerConfig;
use akash_provider::runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ControllerConfig::from_env();
    runtime::init_tracing(&config);
    runtime::run(config).await
}
