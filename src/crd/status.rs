//! # Conditions
//!
//! Status conditions shared by every kind this controller writes.

use serde::{Deserialize, Serialize};

/// Condition type reporting whether the remote entity is available
pub const CONDITION_READY: &str = "Ready";

/// Condition type reporting whether the last reconciliation succeeded
pub const CONDITION_SYNCED: &str = "Synced";

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn new(r#type: &str, status: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn available() -> Self {
        Self::new(CONDITION_READY, true, "Available", "deployment exists on the marketplace")
    }

    #[must_use]
    pub fn creating() -> Self {
        Self::new(CONDITION_READY, false, "Creating", "deployment is being created")
    }

    #[must_use]
    pub fn deleting() -> Self {
        Self::new(CONDITION_READY, false, "Deleting", "deployment is being closed")
    }

    #[must_use]
    pub fn reconcile_success() -> Self {
        Self::new(CONDITION_SYNCED, true, "ReconcileSuccess", "")
    }

    #[must_use]
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(CONDITION_SYNCED, false, "ReconcileError", message)
    }
}

/// Insert or replace the condition of the same type.
///
/// The transition time of an existing condition is kept when its status did
/// not change.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            if existing.status == condition.status {
                condition
                    .last_transition_time
                    .clone_from(&existing.last_transition_time);
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}
