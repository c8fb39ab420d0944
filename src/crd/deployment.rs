//! # Deployment
//!
//! The managed resource: a deployment the user wants to exist on the Akash
//! marketplace.

use std::collections::BTreeMap;

use kube::ResourceExt;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROVIDER_CONFIG_NAME, EXTERNAL_NAME_ANNOTATION};
use crate::crd::Condition;

/// Deployment Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: akash.crossplane.io/v1alpha1
/// kind: Deployment
/// metadata:
///   name: web
/// spec:
///   forProvider:
///     manifest: /manifests/web.yaml
///   providerConfigRef:
///     name: default
///   writeConnectionSecretToRef:
///     name: web-akash
///     namespace: apps
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Deployment",
    root = "AkashDeployment",
    group = "akash.crossplane.io",
    version = "v1alpha1",
    status = "DeploymentStatus",
    shortname = "akd",
    category = "crossplane",
    category = "managed",
    category = "akash",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}, {"name":"State", "type":"string", "jsonPath":".status.atProvider.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Provider-specific parameters
    pub for_provider: DeploymentParameters,
    /// ProviderConfig holding the credentials and settings used to reach the marketplace
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
    /// Secret receiving the connection details (dseq, owner, state, ...)
    #[serde(default)]
    pub write_connection_secret_to_ref: Option<SecretReference>,
    /// What happens to the remote deployment when this object is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentParameters {
    /// Location of the SDL manifest handed to the deployment client
    pub manifest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ProviderConfigReference {
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_CONFIG_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum DeletionPolicy {
    /// Close the remote deployment
    #[default]
    Delete,
    /// Leave the remote deployment running
    Orphan,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Last observed state of the remote deployment
    #[serde(default)]
    pub at_provider: Option<DeploymentObservation>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Mirror of the remote deployment, rebuilt on every observation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentObservation {
    #[serde(default)]
    pub dseq: Option<String>,
    #[serde(default)]
    pub gseq: Option<String>,
    #[serde(default)]
    pub oseq: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Deployment state, e.g. "active" or "closed"
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub escrow_state: Option<String>,
    /// Escrow balance rendered as `<amount><denom>`
    #[serde(default)]
    pub escrow_balance: Option<String>,
}

impl AkashDeployment {
    /// The dseq of the remote deployment, once it was created
    #[must_use]
    pub fn external_name(&self) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(EXTERNAL_NAME_ANNOTATION))
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn set_external_name(&mut self, name: impl Into<String>) {
        self.annotations_mut()
            .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.into());
    }

    #[must_use]
    pub fn provider_config_name(&self) -> &str {
        &self.spec.provider_config_ref.name
    }

    #[must_use]
    pub fn manifest(&self) -> &str {
        &self.spec.for_provider.manifest
    }

    /// Mutable access to the observed remote state, creating an empty mirror if needed
    pub fn at_provider_mut(&mut self) -> &mut DeploymentObservation {
        self.status
            .get_or_insert_with(DeploymentStatus::default)
            .at_provider
            .get_or_insert_with(DeploymentObservation::default)
    }

    /// Annotations to persist after a lifecycle call, if any were set
    #[must_use]
    pub fn external_name_patch(&self) -> Option<BTreeMap<String, String>> {
        self.external_name().map(|name| {
            BTreeMap::from([(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string())])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(yaml: &str) -> AkashDeployment {
        serde_yaml::from_str(yaml).expect("valid deployment")
    }

    #[test]
    fn test_defaults_applied() {
        let d = deployment(
            r"
apiVersion: akash.crossplane.io/v1alpha1
kind: Deployment
metadata:
  name: web
spec:
  forProvider:
    manifest: /manifests/web.yaml
",
        );
        assert_eq!(d.provider_config_name(), "default");
        assert_eq!(d.spec.deletion_policy, DeletionPolicy::Delete);
        assert_eq!(d.manifest(), "/manifests/web.yaml");
        assert!(d.external_name().is_none());
    }

    #[test]
    fn test_external_name_round_trip() {
        let mut d = AkashDeployment::new(
            "web",
            DeploymentSpec {
                for_provider: DeploymentParameters {
                    manifest: "m.yaml".to_string(),
                },
                provider_config_ref: ProviderConfigReference::default(),
                write_connection_secret_to_ref: None,
                deletion_policy: DeletionPolicy::Orphan,
            },
        );
        d.set_external_name("12345");
        assert_eq!(d.external_name(), Some("12345"));
        assert_eq!(
            d.external_name_patch()
                .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION).cloned()),
            Some("12345".to_string())
        );
    }

    #[test]
    fn test_empty_external_name_is_absent() {
        let mut d = deployment(
            r"
apiVersion: akash.crossplane.io/v1alpha1
kind: Deployment
metadata:
  name: web
  annotations:
    crossplane.io/external-name: ''
spec:
  forProvider:
    manifest: m.yaml
",
        );
        assert!(d.external_name().is_none());
        d.at_provider_mut().state = Some("active".to_string());
        assert_eq!(
            d.status
                .and_then(|s| s.at_provider)
                .and_then(|a| a.state)
                .as_deref(),
            Some("active")
        );
    }
}
