//! Common test utilities
//!
//! In-memory stand-ins for every collaborator the client factory and the
//! lifecycle handler depend on. Each fake appends to a shared [`CallLog`] so
//! tests can assert ordering across collaborators.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use akash_provider::client::context::OperationContext;
use akash_provider::client::credentials::{CredentialDescriptor, CredentialError, CredentialLoader};
use akash_provider::client::remote::{
    Coin, DeploymentClient, DeploymentId, DeploymentSnapshot, EscrowAccount, RemoteCall,
    RemoteError, Seqs,
};
use akash_provider::client::ClientFactory;
use akash_provider::controller::connector::{ProviderConfigStore, StoreError};
use akash_provider::controller::usage::{TrackingError, UsageTracker};
use akash_provider::crd::{
    AkashConfiguration, AkashDeployment, CredentialsSource, DeploymentParameters, DeploymentSpec,
    ProviderConfig, ProviderConfigReference, ProviderConfigSpec, ProviderCredentials,
    SecretKeySelector,
};
use async_trait::async_trait;

/// Ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("log").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("log").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

pub struct FakeLoader {
    pub log: CallLog,
    pub calls: AtomicUsize,
    pub blob: Mutex<Vec<u8>>,
    pub fail: bool,
}

impl FakeLoader {
    pub fn returning(log: &CallLog, blob: &[u8]) -> Self {
        Self {
            log: log.clone(),
            calls: AtomicUsize::new(0),
            blob: Mutex::new(blob.to_vec()),
            fail: false,
        }
    }

    pub fn failing(log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::returning(log, b"")
        }
    }

    pub fn set_blob(&self, blob: &[u8]) {
        *self.blob.lock().expect("blob") = blob.to_vec();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialLoader for FakeLoader {
    async fn extract(
        &self,
        _ctx: &OperationContext,
        descriptor: &CredentialDescriptor,
    ) -> Result<Vec<u8>, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("load:{}", descriptor.source_name()));
        if self.fail {
            return Err(CredentialError::SecretNotFound {
                namespace: "crossplane-system".to_string(),
                name: "akash-creds".to_string(),
            });
        }
        Ok(self.blob.lock().expect("blob").clone())
    }
}

pub struct FakeTracker {
    pub log: CallLog,
    pub fail: bool,
}

impl FakeTracker {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail: true,
        }
    }
}

#[async_trait]
impl UsageTracker for FakeTracker {
    async fn track(
        &self,
        _ctx: &OperationContext,
        managed: &AkashDeployment,
    ) -> Result<(), TrackingError> {
        self.log.push(format!("track:{}", managed.provider_config_name()));
        if self.fail {
            return Err(TrackingError::MissingUid);
        }
        Ok(())
    }
}

/// Marketplace double: remembers what it created and echoes it back
pub struct FakeRemote {
    pub log: CallLog,
    next_dseq: Mutex<u64>,
    existing: Mutex<HashSet<String>>,
    pub fail_lookups: bool,
    /// Owners seen by calls, for owner-resolution assertions
    pub owners: Mutex<Vec<String>>,
    /// Credentials seen by calls
    pub credentials: Mutex<Vec<Vec<u8>>>,
}

impl FakeRemote {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            next_dseq: Mutex::new(4242),
            existing: Mutex::new(HashSet::new()),
            fail_lookups: false,
            owners: Mutex::new(Vec::new()),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn with_existing(log: &CallLog, dseq: &str) -> Self {
        let remote = Self::new(log);
        remote.existing.lock().expect("existing").insert(dseq.to_string());
        remote
    }

    pub fn failing_lookups(log: &CallLog) -> Self {
        Self {
            fail_lookups: true,
            ..Self::new(log)
        }
    }

    fn record(&self, call: RemoteCall<'_>, entry: String, owner: Option<&str>) {
        self.log.push(entry);
        self.credentials
            .lock()
            .expect("credentials")
            .push(call.credentials.to_vec());
        if let Some(owner) = owner {
            self.owners.lock().expect("owners").push(owner.to_string());
        }
    }

    pub fn remote_calls(&self) -> usize {
        self.log.count("remote:")
    }
}

#[async_trait]
impl DeploymentClient for FakeRemote {
    async fn list_deployments(
        &self,
        call: RemoteCall<'_>,
        owner: &str,
    ) -> Result<Vec<DeploymentId>, RemoteError> {
        self.record(call, "remote:list".to_string(), Some(owner));
        let mut ids: Vec<DeploymentId> = self
            .existing
            .lock()
            .expect("existing")
            .iter()
            .map(|dseq| DeploymentId::new(owner, dseq.as_str()))
            .collect();
        ids.sort_by(|a, b| a.dseq.cmp(&b.dseq));
        Ok(ids)
    }

    async fn get_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<DeploymentSnapshot, RemoteError> {
        self.record(call, format!("remote:get:{}", id.dseq), Some(&id.owner));
        if self.fail_lookups {
            return Err(RemoteError::Command("connection refused".to_string()));
        }
        if !self.existing.lock().expect("existing").contains(&id.dseq) {
            return Err(RemoteError::NotFound);
        }
        Ok(DeploymentSnapshot {
            exists: true,
            id: id.clone(),
            state: "active".to_string(),
            escrow: EscrowAccount {
                owner: id.owner.clone(),
                state: "open".to_string(),
                balance: Coin {
                    denom: "uakt".to_string(),
                    amount: "5000000".to_string(),
                },
            },
        })
    }

    async fn create_deployment(
        &self,
        call: RemoteCall<'_>,
        manifest: &str,
    ) -> Result<Seqs, RemoteError> {
        self.record(call, format!("remote:create:{manifest}"), None);
        let mut next = self.next_dseq.lock().expect("dseq");
        let dseq = next.to_string();
        *next += 1;
        self.existing.lock().expect("existing").insert(dseq.clone());
        Ok(Seqs::first_order(dseq))
    }

    async fn update_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
        manifest: &str,
    ) -> Result<(), RemoteError> {
        self.record(call, format!("remote:update:{}:{manifest}", id.dseq), None);
        Ok(())
    }

    async fn delete_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<(), RemoteError> {
        self.record(call, format!("remote:delete:{}", id.dseq), Some(&id.owner));
        self.existing.lock().expect("existing").remove(&id.dseq);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStore {
    configs: HashMap<String, ProviderConfig>,
}

impl FakeStore {
    pub fn with(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|c| (c.metadata.name.clone().unwrap_or_default(), c))
                .collect(),
        }
    }
}

#[async_trait]
impl ProviderConfigStore for FakeStore {
    async fn get(&self, _ctx: &OperationContext, name: &str) -> Result<ProviderConfig, StoreError> {
        self.configs.get(name).cloned().ok_or(StoreError::NotFound)
    }
}

pub fn deployment(name: &str, manifest: &str) -> AkashDeployment {
    let mut d = AkashDeployment::new(
        name,
        DeploymentSpec {
            for_provider: DeploymentParameters {
                manifest: manifest.to_string(),
            },
            provider_config_ref: ProviderConfigReference::default(),
            write_connection_secret_to_ref: None,
            deletion_policy: Default::default(),
        },
    );
    d.metadata.uid = Some(format!("{name}-uid"));
    d
}

pub fn secret_credentials() -> ProviderCredentials {
    ProviderCredentials {
        source: CredentialsSource::Secret,
        secret_ref: Some(SecretKeySelector {
            name: "akash-creds".to_string(),
            namespace: "crossplane-system".to_string(),
            key: "key".to_string(),
        }),
        env: None,
        fs: None,
    }
}

pub fn secret_descriptor() -> CredentialDescriptor {
    CredentialDescriptor::try_from(&secret_credentials()).expect("secret descriptor")
}

pub fn provider_config(name: &str, configuration: Option<AkashConfiguration>) -> ProviderConfig {
    ProviderConfig::new(
        name,
        ProviderConfigSpec {
            credentials: secret_credentials(),
            configuration,
        },
    )
}

pub fn account(address: &str) -> AkashConfiguration {
    AkashConfiguration {
        account_address: Some(address.to_string()),
        ..AkashConfiguration::default()
    }
}

/// Factory over the given fakes
pub fn factory(
    loader: Arc<FakeLoader>,
    tracker: Arc<FakeTracker>,
    remote: Arc<FakeRemote>,
) -> ClientFactory {
    ClientFactory::new(loader, tracker, remote)
}
