//! # Credentials
//!
//! Where the signing key comes from, and how it is read.
//!
//! Only credentials read from a Kubernetes Secret are refreshable; every
//! other source is read once when the client is built.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::client::context::{ContextError, OperationContext};
use crate::crd::{CredentialsSource, ProviderCredentials, SecretKeySelector};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials source {0} requires a selector")]
    MissingSelector(&'static str),
    #[error("credentials source {0} is not supported")]
    Unsupported(&'static str),
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },
    #[error("secret {namespace}/{name} has no key {key:?}")]
    KeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },
    #[error("environment variable {0} is not set")]
    EnvironmentNotSet(String),
    #[error("cannot read credentials file {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read secret: {0}")]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Location of a credential
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialDescriptor {
    /// Credential already in hand; also used for `source: None` (empty)
    Inline(Zeroizing<Vec<u8>>),
    Secret(SecretKeySelector),
    InjectedIdentity,
    Environment(String),
    Filesystem(String),
}

impl std::fmt::Debug for CredentialDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            Self::Secret(selector) => f.debug_tuple("Secret").field(selector).finish(),
            Self::InjectedIdentity => f.write_str("InjectedIdentity"),
            Self::Environment(name) => f.debug_tuple("Environment").field(name).finish(),
            Self::Filesystem(path) => f.debug_tuple("Filesystem").field(path).finish(),
        }
    }
}

impl CredentialDescriptor {
    #[must_use]
    pub fn inline(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Inline(Zeroizing::new(bytes.into()))
    }

    /// Whether the credential can be re-read later, and so is worth caching
    #[must_use]
    pub fn is_refreshable(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Inline(_) => "None",
            Self::Secret(_) => "Secret",
            Self::InjectedIdentity => "InjectedIdentity",
            Self::Environment(_) => "Environment",
            Self::Filesystem(_) => "Filesystem",
        }
    }
}

impl TryFrom<&ProviderCredentials> for CredentialDescriptor {
    type Error = CredentialError;

    fn try_from(credentials: &ProviderCredentials) -> Result<Self, Self::Error> {
        match credentials.source {
            CredentialsSource::None => Ok(Self::inline(Vec::new())),
            CredentialsSource::Secret => credentials
                .secret_ref
                .clone()
                .map(Self::Secret)
                .ok_or(CredentialError::MissingSelector("Secret")),
            CredentialsSource::InjectedIdentity => Ok(Self::InjectedIdentity),
            CredentialsSource::Environment => credentials
                .env
                .as_ref()
                .map(|env| Self::Environment(env.name.clone()))
                .ok_or(CredentialError::MissingSelector("Environment")),
            CredentialsSource::Filesystem => credentials
                .fs
                .as_ref()
                .map(|fs| Self::Filesystem(fs.path.clone()))
                .ok_or(CredentialError::MissingSelector("Filesystem")),
        }
    }
}

/// Reads credential bytes from wherever a descriptor points.
///
/// Implementations must not outlive `ctx`.
#[async_trait]
pub trait CredentialLoader: Send + Sync {
    async fn extract(
        &self,
        ctx: &OperationContext,
        descriptor: &CredentialDescriptor,
    ) -> Result<Vec<u8>, CredentialError>;
}

/// Loader backed by the Kubernetes API and the controller's own process
#[derive(Clone)]
pub struct KubeCredentialLoader {
    client: kube::Client,
}

impl std::fmt::Debug for KubeCredentialLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCredentialLoader").finish_non_exhaustive()
    }
}

impl KubeCredentialLoader {
    #[must_use]
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    async fn read_secret(&self, selector: &SecretKeySelector) -> Result<Vec<u8>, CredentialError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = api
            .get_opt(&selector.name)
            .await?
            .ok_or_else(|| CredentialError::SecretNotFound {
                namespace: selector.namespace.clone(),
                name: selector.name.clone(),
            })?;

        secret
            .data
            .and_then(|mut data| data.remove(&selector.key))
            .map(|bytes| bytes.0)
            .ok_or_else(|| CredentialError::KeyNotFound {
                namespace: selector.namespace.clone(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            })
    }
}

#[async_trait]
impl CredentialLoader for KubeCredentialLoader {
    async fn extract(
        &self,
        ctx: &OperationContext,
        descriptor: &CredentialDescriptor,
    ) -> Result<Vec<u8>, CredentialError> {
        match descriptor {
            CredentialDescriptor::Secret(selector) => {
                debug!(
                    namespace = %selector.namespace,
                    name = %selector.name,
                    "reading credentials from secret"
                );
                ctx.run("read credentials secret", self.read_secret(selector))
                    .await?
            }
            other => extract_local(ctx, other).await,
        }
    }
}

/// Read a credential that does not need the Kubernetes API
///
/// # Errors
///
/// Fails for `Secret` and `InjectedIdentity` descriptors, a missing variable
/// or an unreadable file.
pub async fn extract_local(
    ctx: &OperationContext,
    descriptor: &CredentialDescriptor,
) -> Result<Vec<u8>, CredentialError> {
    match descriptor {
        CredentialDescriptor::Inline(bytes) => Ok(bytes.to_vec()),
        CredentialDescriptor::Environment(name) => std::env::var(name)
            .map(String::into_bytes)
            .map_err(|_not_set| CredentialError::EnvironmentNotSet(name.clone())),
        CredentialDescriptor::Filesystem(path) => ctx
            .run("read credentials file", tokio::fs::read(path))
            .await?
            .map_err(|source| CredentialError::Filesystem {
                path: path.clone(),
                source,
            }),
        CredentialDescriptor::InjectedIdentity => {
            Err(CredentialError::Unsupported("InjectedIdentity"))
        }
        CredentialDescriptor::Secret(_) => Err(CredentialError::Unsupported("Secret")),
    }
}
