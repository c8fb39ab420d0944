//! # ProviderConfig
//!
//! Credentials and marketplace settings shared by every Deployment that
//! references them.

use serde::{Deserialize, Serialize};

use crate::crd::Condition;

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: akash.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       name: akash-key
///       namespace: crossplane-system
///       key: key.txt
///   configuration:
///     net: testnet
///     chainId: testnet-1
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "akash.crossplane.io",
    version = "v1alpha1",
    status = "ProviderConfigStatus",
    category = "crossplane",
    category = "provider",
    category = "akash",
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}, {"name":"Secret-Name", "type":"string", "jsonPath":".spec.credentials.secretRef.name", "priority":1}, {"name":"Users", "type":"integer", "jsonPath":".status.users"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credentials required to sign marketplace transactions
    pub credentials: ProviderCredentials,
    /// Akash settings; every omitted field takes its documented default
    #[serde(default)]
    pub configuration: Option<AkashConfiguration>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,
    /// Secret key holding the credential, for `source: Secret`
    #[serde(default)]
    pub secret_ref: Option<SecretKeySelector>,
    /// Environment variable holding the credential, for `source: Environment`
    #[serde(default)]
    pub env: Option<EnvSelector>,
    /// File holding the credential, for `source: Filesystem`
    #[serde(default)]
    pub fs: Option<FsSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum CredentialsSource {
    None,
    Secret,
    InjectedIdentity,
    Environment,
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretKeySelector {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct EnvSelector {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FsSelector {
    pub path: String,
}

/// Partial Akash settings as written by the user.
///
/// `None` means "use the default"; `Some("")` is a real value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AkashConfiguration {
    /// Name of the key used to sign transactions (default "default")
    #[serde(default)]
    pub key_name: Option<String>,
    /// Keyring backend: os, file, test or memory (default "test")
    #[serde(default)]
    pub keyring_backend: Option<String>,
    /// Account address; derived from the key when empty
    #[serde(default)]
    pub account_address: Option<String>,
    /// Network: mainnet, testnet or sandbox (default "mainnet")
    #[serde(default)]
    pub net: Option<String>,
    /// Akash version (default "0.18.0")
    #[serde(default)]
    pub version: Option<String>,
    /// Chain ID (default "akashnet-2")
    #[serde(default)]
    pub chain_id: Option<String>,
    /// RPC endpoint (default "https://rpc.akashnet.io:443")
    #[serde(default)]
    pub node: Option<String>,
    /// Home directory for keyring and client state (default "/tmp/.akash")
    #[serde(default)]
    pub home: Option<String>,
    /// Path to the akash binary (default "/usr/local/bin/akash")
    #[serde(default)]
    pub path: Option<String>,
    /// Marketplace API base URL (default "https://akash-api.polkachu.com")
    #[serde(default)]
    pub providers_api: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Number of ProviderConfigUsages referencing this config
    #[serde(default)]
    pub users: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_configuration_deserializes() {
        let pc: ProviderConfig = serde_yaml::from_str(
            r"
apiVersion: akash.crossplane.io/v1alpha1
kind: ProviderConfig
metadata:
  name: default
spec:
  credentials:
    source: Secret
    secretRef:
      name: akash-key
      namespace: crossplane-system
      key: key.txt
  configuration:
    net: testnet
    chainId: testnet-1
    accountAddress: ''
",
        )
        .expect("valid provider config");

        assert_eq!(pc.spec.credentials.source, CredentialsSource::Secret);
        let config = pc.spec.configuration.expect("configuration present");
        assert_eq!(config.net.as_deref(), Some("testnet"));
        assert_eq!(config.chain_id.as_deref(), Some("testnet-1"));
        assert_eq!(config.account_address.as_deref(), Some(""));
        assert!(config.node.is_none());
    }
}
