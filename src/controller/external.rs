//! # External Deployment
//!
//! Observe/Create/Update/Delete against the marketplace for one Deployment.
//!
//! The `crossplane.io/external-name` annotation (the dseq) links the object
//! to its remote deployment. Without it the deployment is considered absent,
//! and Delete has nothing to do.
//!
//! Drift is not detected: once the remote deployment exists it is reported
//! up to date, so Update is only reached when a caller asks for it directly.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::client::remote::DeploymentSnapshot;
use crate::client::AkashClient;
use crate::crd::AkashDeployment;
use crate::error::{Error, Result};

/// Connection details published for downstream consumers
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

fn insert_detail(details: &mut ConnectionDetails, key: &str, value: &str) {
    if !value.is_empty() {
        details.insert(key.to_string(), value.as_bytes().to_vec());
    }
}

/// Lifecycle handler bound to one client
#[derive(Debug)]
pub struct ExternalDeployment {
    client: AkashClient,
}

impl ExternalDeployment {
    #[must_use]
    pub fn new(client: AkashClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &AkashClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut AkashClient {
        &mut self.client
    }

    fn owner(&self) -> &str {
        &self.client.settings().account_address
    }

    /// Look the deployment up and mirror it into `status.atProvider`.
    ///
    /// A failed lookup counts as absence. Cancellation is still returned.
    ///
    /// # Errors
    ///
    /// Only when the context was cancelled or timed out.
    pub async fn observe(&self, managed: &mut AkashDeployment) -> Result<ExternalObservation> {
        let Some(dseq) = managed.external_name().map(str::to_string) else {
            debug!("no external name, deployment not created yet");
            return Ok(ExternalObservation::absent());
        };

        let snapshot = match self.client.get_deployment(&dseq, self.owner()).await {
            Ok(snapshot) if snapshot.exists => snapshot,
            Ok(_) => return Ok(ExternalObservation::absent()),
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                warn!(%dseq, error = %e, "deployment lookup failed, treating as absent");
                return Ok(ExternalObservation::absent());
            }
        };

        let connection_details = record_snapshot(managed, &snapshot);
        debug!(%dseq, state = %snapshot.state, "deployment observed");

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: true,
            connection_details,
        })
    }

    /// Create the deployment and set the external name to its dseq
    ///
    /// # Errors
    ///
    /// `RemoteOperationFailure` or `CredentialLoadFailure` from the client.
    pub async fn create(&self, managed: &mut AkashDeployment) -> Result<ExternalCreation> {
        let seqs = self.client.create_deployment(managed.manifest()).await?;
        managed.set_external_name(seqs.dseq.clone());

        let owner = self.owner().to_string();
        let observation = managed.at_provider_mut();
        observation.dseq = Some(seqs.dseq.clone());
        observation.gseq = Some(seqs.gseq.clone());
        observation.oseq = Some(seqs.oseq.clone());
        if !owner.is_empty() {
            observation.owner = Some(owner.clone());
        }

        let mut connection_details = ConnectionDetails::new();
        insert_detail(&mut connection_details, "dseq", &seqs.dseq);
        insert_detail(&mut connection_details, "gseq", &seqs.gseq);
        insert_detail(&mut connection_details, "oseq", &seqs.oseq);
        insert_detail(&mut connection_details, "owner", &owner);

        info!(dseq = %seqs.dseq, "deployment created");
        Ok(ExternalCreation { connection_details })
    }

    /// # Errors
    ///
    /// `MissingIdentity` when the deployment was never created, otherwise
    /// errors from the client.
    pub async fn update(&self, managed: &AkashDeployment) -> Result<ExternalUpdate> {
        let dseq = managed.external_name().ok_or(Error::MissingIdentity)?;
        self.client
            .update_deployment(dseq, managed.manifest())
            .await?;

        let mut connection_details = ConnectionDetails::new();
        insert_detail(&mut connection_details, "dseq", dseq);
        info!(%dseq, "deployment updated");
        Ok(ExternalUpdate { connection_details })
    }

    /// Close the deployment. Succeeds without a remote call when it was
    /// never created.
    ///
    /// # Errors
    ///
    /// Errors from the client.
    pub async fn delete(&self, managed: &AkashDeployment) -> Result<()> {
        let Some(dseq) = managed.external_name() else {
            debug!("no external name, nothing to close");
            return Ok(());
        };
        self.client.delete_deployment(dseq, self.owner()).await?;
        info!(%dseq, "deployment closed");
        Ok(())
    }
}

fn record_snapshot(managed: &mut AkashDeployment, snapshot: &DeploymentSnapshot) -> ConnectionDetails {
    let balance = if snapshot.escrow.balance.amount.is_empty() {
        String::new()
    } else {
        snapshot.escrow.balance.to_string()
    };

    let observation = managed.at_provider_mut();
    observation.dseq = Some(snapshot.id.dseq.clone());
    observation.owner = Some(snapshot.id.owner.clone()).filter(|o| !o.is_empty());
    observation.state = Some(snapshot.state.clone()).filter(|s| !s.is_empty());
    observation.escrow_state = Some(snapshot.escrow.state.clone()).filter(|s| !s.is_empty());
    observation.escrow_balance = Some(balance.clone()).filter(|b| !b.is_empty());

    let mut details = ConnectionDetails::new();
    insert_detail(&mut details, "dseq", &snapshot.id.dseq);
    if let Some(gseq) = &observation.gseq {
        insert_detail(&mut details, "gseq", gseq);
    }
    if let Some(oseq) = &observation.oseq {
        insert_detail(&mut details, "oseq", oseq);
    }
    insert_detail(&mut details, "owner", &snapshot.id.owner);
    insert_detail(&mut details, "state", &snapshot.state);
    insert_detail(&mut details, "escrowBalance", &balance);
    details
}
