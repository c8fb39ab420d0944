//! Akash Provider Controller Library
//!
//! Reconciles `Deployment` resources against the Akash compute marketplace.
//!
//! - [`client`]: credential cache, settings resolution, client construction
//!   and the marketplace backends
//! - [`controller`]: connector, lifecycle handler and the reconcilers
//! - [`crd`]: the `Deployment`, `ProviderConfig` and `ProviderConfigUsage` kinds

pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod server;

pub use error::{Error, Result};
