//! # Remote Deployment Client
//!
//! The capability the lifecycle handler needs from the marketplace, plus the
//! wire types shared by the process-invocation backend ([`crate::client::cli`])
//! and the HTTP backend ([`crate::client::rest`]).
//!
//! Implementations perform no retries of their own beyond transport-level
//! quirks; every error is reported to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::client::context::ContextError;
use crate::client::settings::ProviderSettings;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("deployment not found")]
    NotFound,
    #[error("invalid dseq {0:?}")]
    InvalidIdentity(String),
    #[error("akash command failed: {0}")]
    Command(String),
    #[error("transaction rejected: {raw_log}")]
    Transaction { raw_log: String },
    #[error("marketplace API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("marketplace API returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Everything a backend needs to sign and route one call
#[derive(Clone, Copy)]
pub struct RemoteCall<'a> {
    pub settings: &'a ProviderSettings,
    pub credentials: &'a [u8],
    /// Transaction memo
    pub note: &'a str,
}

impl std::fmt::Debug for RemoteCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCall")
            .field("settings", self.settings)
            .field("note", &self.note)
            .finish_non_exhaustive()
    }
}

/// Identity of a deployment on chain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentId {
    #[serde(default)]
    pub owner: String,
    pub dseq: String,
}

impl DeploymentId {
    #[must_use]
    pub fn new(owner: impl Into<String>, dseq: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            dseq: dseq.into(),
        }
    }

    /// The dseq as the chain sees it
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidIdentity`] unless the dseq is an unsigned integer.
    pub fn dseq_number(&self) -> Result<u64, RemoteError> {
        parse_dseq(&self.dseq)
    }
}

/// # Errors
///
/// Returns [`RemoteError::InvalidIdentity`] unless `dseq` is an unsigned integer.
pub fn parse_dseq(dseq: &str) -> Result<u64, RemoteError> {
    dseq.parse::<u64>()
        .map_err(|_invalid| RemoteError::InvalidIdentity(dseq.to_string()))
}

/// Sequence numbers identifying a deployment, its group and order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seqs {
    pub dseq: String,
    pub gseq: String,
    pub oseq: String,
}

impl Seqs {
    /// A freshly created deployment has a single group with a single order
    #[must_use]
    pub fn first_order(dseq: impl Into<String>) -> Self {
        Self {
            dseq: dseq.into(),
            gseq: "1".to_string(),
            oseq: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Coin {
    #[serde(default)]
    pub denom: String,
    #[serde(default)]
    pub amount: String,
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EscrowAccount {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub balance: Coin,
}

/// One observation of a remote deployment. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSnapshot {
    pub exists: bool,
    pub id: DeploymentId,
    pub state: String,
    pub escrow: EscrowAccount,
}

#[derive(Debug, Deserialize)]
struct DeploymentInfoDocument {
    deployment: DeploymentInfo,
    #[serde(default)]
    escrow_account: EscrowAccount,
}

#[derive(Debug, Deserialize)]
struct DeploymentInfo {
    deployment_id: DeploymentId,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentListDocument {
    #[serde(default)]
    deployments: Vec<DeploymentInfoDocument>,
}

impl DeploymentSnapshot {
    /// Decode a deployment-info document (`query deployment get -o json`,
    /// `/akash/deployment/v1beta3/deployments/info`).
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Decode`] for malformed documents.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RemoteError> {
        let document: DeploymentInfoDocument = serde_json::from_slice(bytes)?;
        Ok(document.into())
    }
}

impl From<DeploymentInfoDocument> for DeploymentSnapshot {
    fn from(document: DeploymentInfoDocument) -> Self {
        Self {
            exists: true,
            id: document.deployment.deployment_id,
            state: document.deployment.state,
            escrow: document.escrow_account,
        }
    }
}

/// Decode a deployment-list document into identities
///
/// # Errors
///
/// Returns [`RemoteError::Decode`] for malformed documents.
pub fn parse_deployment_list(bytes: &[u8]) -> Result<Vec<DeploymentId>, RemoteError> {
    let document: DeploymentListDocument = serde_json::from_slice(bytes)?;
    Ok(document
        .deployments
        .into_iter()
        .map(|d| d.deployment.deployment_id)
        .collect())
}

/// Marketplace operations on deployments
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    async fn list_deployments(
        &self,
        call: RemoteCall<'_>,
        owner: &str,
    ) -> Result<Vec<DeploymentId>, RemoteError>;

    async fn get_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<DeploymentSnapshot, RemoteError>;

    async fn create_deployment(
        &self,
        call: RemoteCall<'_>,
        manifest: &str,
    ) -> Result<Seqs, RemoteError>;

    async fn update_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
        manifest: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<(), RemoteError>;
}
