//! # Configuration
//!
//! Process-level settings for the controller, read from the environment.

mod controller;

pub use controller::{ControllerConfig, RemoteBackend};
