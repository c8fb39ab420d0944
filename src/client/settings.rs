//! # Settings
//!
//! Completes a partial [`AkashConfiguration`] field by field from the
//! documented defaults. There is exactly one input record; nothing is merged
//! across sources and nothing is validated here.

use crate::crd::AkashConfiguration;

pub const DEFAULT_KEY_NAME: &str = "default";
pub const DEFAULT_KEYRING_BACKEND: &str = "test";
pub const DEFAULT_NET: &str = "mainnet";
pub const DEFAULT_CHAIN_ID: &str = "akashnet-2";
pub const DEFAULT_NODE: &str = "https://rpc.akashnet.io:443";
pub const DEFAULT_VERSION: &str = "0.18.0";
pub const DEFAULT_HOME: &str = "/tmp/.akash";
pub const DEFAULT_PATH: &str = "/usr/local/bin/akash";
pub const DEFAULT_PROVIDERS_API: &str = "https://akash-api.polkachu.com";

/// Keyring backends accepted by the akash binary
pub const KEYRING_BACKENDS: [&str; 4] = ["os", "file", "test", "memory"];

/// Networks the provider knows about
pub const NETWORKS: [&str; 3] = ["mainnet", "testnet", "sandbox"];

/// Fully resolved settings used by every call a client makes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub key_name: String,
    pub keyring_backend: String,
    /// Empty means "derive from the loaded key"
    pub account_address: String,
    pub net: String,
    pub version: String,
    pub chain_id: String,
    pub node: String,
    pub home: String,
    pub path: String,
    pub providers_api: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        resolve_settings(None)
    }
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), Clone::clone)
}

/// Resolve a partial configuration into complete settings.
///
/// A present field is taken verbatim, including the empty string.
#[must_use]
pub fn resolve_settings(partial: Option<&AkashConfiguration>) -> ProviderSettings {
    let empty = AkashConfiguration::default();
    let c = partial.unwrap_or(&empty);

    ProviderSettings {
        key_name: or_default(c.key_name.as_ref(), DEFAULT_KEY_NAME),
        keyring_backend: or_default(c.keyring_backend.as_ref(), DEFAULT_KEYRING_BACKEND),
        account_address: or_default(c.account_address.as_ref(), ""),
        net: or_default(c.net.as_ref(), DEFAULT_NET),
        version: or_default(c.version.as_ref(), DEFAULT_VERSION),
        chain_id: or_default(c.chain_id.as_ref(), DEFAULT_CHAIN_ID),
        node: or_default(c.node.as_ref(), DEFAULT_NODE),
        home: or_default(c.home.as_ref(), DEFAULT_HOME),
        path: or_default(c.path.as_ref(), DEFAULT_PATH),
        providers_api: or_default(c.providers_api.as_ref(), DEFAULT_PROVIDERS_API),
    }
}
