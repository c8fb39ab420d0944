//! # ProviderConfigUsage
//!
//! Records that a managed resource uses a ProviderConfig, so the config is
//! not deleted from under it.

use serde::{Deserialize, Serialize};

use crate::crd::ProviderConfigReference;

#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ProviderConfigUsage",
    group = "akash.crossplane.io",
    version = "v1alpha1",
    category = "crossplane",
    category = "provider",
    category = "akash",
    printcolumn = r#"{"name":"Config-Name", "type":"string", "jsonPath":".spec.providerConfigRef.name"}, {"name":"Resource-Kind", "type":"string", "jsonPath":".spec.resourceRef.kind"}, {"name":"Resource-Name", "type":"string", "jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    pub provider_config_ref: ProviderConfigReference,
    pub resource_ref: TypedReference,
}

/// Reference to the managed resource holding the usage
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
}
