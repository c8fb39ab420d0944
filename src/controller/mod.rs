//! # Controller
//!
//! Reconciliation of the cluster-side kinds.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `connector`: ProviderConfig lookup and client construction
//! - `external`: Observe/Create/Update/Delete of one deployment
//! - `finalizers`: finalizer patch helpers
//! - `providerconfig`: ProviderConfig usage accounting
//! - `reconciler`: Deployment reconciliation loop
//! - `usage`: ProviderConfigUsage tracking

pub mod backoff;
pub mod connector;
pub mod external;
pub mod finalizers;
pub mod providerconfig;
pub mod reconciler;
pub mod usage;
