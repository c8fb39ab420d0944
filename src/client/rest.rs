//! # REST Backend
//!
//! [`DeploymentClient`] that queries the marketplace API over HTTP and signs
//! transactions through a wrapped [`CliDeploymentClient`].

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::client::cli::{CliDeploymentClient, CommandRunner, ProcessRunner};
use crate::client::remote::{
    parse_deployment_list, DeploymentClient, DeploymentId, DeploymentSnapshot, RemoteCall,
    RemoteError, Seqs,
};

const DEPLOYMENT_INFO_PATH: &str = "/akash/deployment/v1beta3/deployments/info";
const DEPLOYMENT_LIST_PATH: &str = "/akash/deployment/v1beta3/deployments/list";

pub struct RestDeploymentClient<R = ProcessRunner> {
    http: reqwest::Client,
    signer: CliDeploymentClient<R>,
}

impl<R> std::fmt::Debug for RestDeploymentClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDeploymentClient").finish_non_exhaustive()
    }
}

impl RestDeploymentClient<ProcessRunner> {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_signer(http, CliDeploymentClient::new())
    }
}

impl<R: CommandRunner> RestDeploymentClient<R> {
    #[must_use]
    pub fn with_signer(http: reqwest::Client, signer: CliDeploymentClient<R>) -> Self {
        Self { http, signer }
    }

    async fn fetch(
        &self,
        call: RemoteCall<'_>,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}{path}", call.settings.providers_api.trim_end_matches('/'));
        debug!(%url, "querying marketplace API");

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let text = String::from_utf8_lossy(&body).into_owned();
        if status == StatusCode::NOT_FOUND || text.contains("not found") {
            return Err(RemoteError::NotFound);
        }
        Err(RemoteError::UnexpectedStatus {
            status: status.as_u16(),
            body: text,
        })
    }
}

#[async_trait]
impl<R: CommandRunner> DeploymentClient for RestDeploymentClient<R> {
    async fn list_deployments(
        &self,
        call: RemoteCall<'_>,
        owner: &str,
    ) -> Result<Vec<DeploymentId>, RemoteError> {
        let owner = self.signer.owner(call, owner).await?;
        let body = self
            .fetch(call, DEPLOYMENT_LIST_PATH, &[("filters.owner", owner.as_str())])
            .await?;
        parse_deployment_list(&body)
    }

    async fn get_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<DeploymentSnapshot, RemoteError> {
        id.dseq_number()?;
        let owner = self.signer.owner(call, &id.owner).await?;
        let body = self
            .fetch(
                call,
                DEPLOYMENT_INFO_PATH,
                &[("id.owner", owner.as_str()), ("id.dseq", id.dseq.as_str())],
            )
            .await?;
        DeploymentSnapshot::from_json(&body)
    }

    async fn create_deployment(
        &self,
        call: RemoteCall<'_>,
        manifest: &str,
    ) -> Result<Seqs, RemoteError> {
        self.signer.create_deployment(call, manifest).await
    }

    async fn update_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
        manifest: &str,
    ) -> Result<(), RemoteError> {
        self.signer.update_deployment(call, id, manifest).await
    }

    async fn delete_deployment(
        &self,
        call: RemoteCall<'_>,
        id: &DeploymentId,
    ) -> Result<(), RemoteError> {
        self.signer.delete_deployment(call, id).await
    }
}
