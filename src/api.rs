//! Typed facade over the QuantForce endpoints.
//!
//! [`QuantForceClient`] owns the transport and the session. Project-scoped
//! calls go through a [`ProjectClient`], which targets the project's own
//! service URL and knows the status endpoint of the jobs it starts.
//!
//! ```no_run
//! use quantforce_client::{AuthRequest, ClientConfig, QuantForceClient};
//!
//! # async fn example() -> quantforce_client::ClientResult<()> {
//! let mut client = QuantForceClient::new(ClientConfig::default())?;
//! client.authenticate(&AuthRequest::md5("me@example.com", "secret")).await?;
//! let project = client.find_or_create_project("demo01").await?;
//! let scoped = client.project(&project)?;
//! let job = scoped.upload_dataset(std::fs::read("data.csv")?, 65001).await?;
//! let job = scoped.wait(job, |h| println!("{} {}%", h.status, h.progress())).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use tracing::info;

use crate::auth::{AuthRequest, AuthSession};
use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};
use crate::job::{JobHandle, JobId};
use crate::models::{BinsViewList, Dataset, Project, ProjectList};
use crate::orchestrator::JobOrchestrator;
use crate::transport::{RequestBody, RestClient, Transport, TransportExt};

/// Windows code page number of UTF-8, used to tag CSV uploads.
pub const UTF8_CODEPAGE: u32 = 65001;

/// Column selector meaning "every column".
pub const ALL_COLUMNS: &str = "*";

/// Binning mode letting the server choose the grouping.
pub const AUTO_BINNING: &str = "Auto";

/// Artifact produced by `deploy/export`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Transformation code in Python.
    Python,
    /// Transformation as an Excel workbook.
    Excel,
    /// Dataset transformed by the last deploy job.
    Transform,
    Other(String),
}

impl ExportFormat {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Python => "Python",
            Self::Excel => "Excel",
            Self::Transform => "transform",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry point of the API.
#[derive(Debug, Clone)]
pub struct QuantForceClient {
    transport: RestClient,
    api: Endpoint,
    session: Option<AuthSession>,
    poll_interval: Duration,
}

impl QuantForceClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            transport: RestClient::new(&config)?,
            api: Endpoint::api(&config.endpoint),
            session: None,
            poll_interval: config.poll_interval,
        })
    }

    pub fn transport(&self) -> &RestClient {
        &self.transport
    }

    /// Root of the versioned API (`{endpoint}/api/v1.0`).
    pub fn api(&self) -> &Endpoint {
        &self.api
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// Exchange credentials for a session and attach its token to every
    /// subsequent request.
    pub async fn authenticate(&mut self, request: &AuthRequest) -> ClientResult<&AuthSession> {
        let url = self.api.url(["auth"]);
        let session: AuthSession = self.transport.post_typed(&url, Some(request)).await?;
        self.transport.set_token(&session.token)?;
        info!(login = %request.login, expires_in_minutes = session.expiration, "authenticated");
        Ok(self.session.insert(session))
    }

    /// Reuse a session obtained elsewhere.
    pub fn set_session(&mut self, session: AuthSession) -> ClientResult<()> {
        self.transport.set_token(&session.token)?;
        self.session = Some(session);
        Ok(())
    }

    fn token(&self) -> ClientResult<&str> {
        self.session
            .as_ref()
            .map(|s| s.token.as_str())
            .ok_or(ClientError::NotAuthenticated)
    }

    pub async fn projects(&self) -> ClientResult<ProjectList> {
        let url = self.api.url(["project", self.token()?]);
        self.transport.get_typed(&url).await
    }

    pub async fn create_project(&self, project: &Project) -> ClientResult<Project> {
        let url = self.api.url(["project", self.token()?]);
        let created: Project = self.transport.post_typed(&url, Some(project)).await?;
        info!(project = %created.id, name = %created.name, "project created");
        Ok(created)
    }

    /// The project called `name`, created as a user-data project if absent.
    pub async fn find_or_create_project(&self, name: &str) -> ClientResult<Project> {
        if let Some(project) = self.projects().await?.find_by_name(name) {
            info!(project = %project.id, name, "using existing project");
            return Ok(project.clone());
        }
        self.create_project(&Project::named(name)).await
    }

    /// Calls scoped to `project`, served from its own `uri` when it has one.
    pub fn project(&self, project: &Project) -> ClientResult<ProjectClient<'_>> {
        let api = match project.uri.as_deref() {
            Some(uri) if !uri.is_empty() => Endpoint::api(uri),
            _ => self.api.clone(),
        };
        Ok(ProjectClient {
            transport: &self.transport,
            api,
            token: self.token()?,
            project_id: project.id.clone(),
            poll_interval: self.poll_interval,
        })
    }
}

/// Calls against one project.
#[derive(Debug, Clone)]
pub struct ProjectClient<'a> {
    transport: &'a RestClient,
    api: Endpoint,
    token: &'a str,
    project_id: String,
    poll_interval: Duration,
}

impl<'a> ProjectClient<'a> {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn api(&self) -> &Endpoint {
        &self.api
    }

    /// `{api}/{resource}/{token}/{project}/{tail...}`
    fn url(&self, resource: &[&str], tail: &[&str]) -> String {
        let scope = [self.token, self.project_id.as_str()];
        self.api
            .url(resource.iter().chain(scope.iter()).chain(tail.iter()))
    }

    /// Status endpoint of a job started in this project.
    pub fn task_url(&self, job: &JobId) -> String {
        self.url(&["task"], &[job.as_str()])
    }

    pub fn orchestrator(&self) -> JobOrchestrator<'a, RestClient> {
        JobOrchestrator::new(self.transport).with_poll_interval(self.poll_interval)
    }

    /// Upload CSV content encoded in `codepage`; starts an ingestion job.
    pub async fn upload_dataset(
        &self,
        csv: impl Into<Bytes>,
        codepage: u32,
    ) -> ClientResult<JobHandle> {
        let codepage = codepage.to_string();
        let url = self.url(&["dataset"], &["csv", "raw", &codepage]);
        self.orchestrator()
            .submit(Method::POST, &url, RequestBody::raw(csv))
            .await
    }

    /// Column descriptions of the ingested dataset.
    pub async fn dataset(&self) -> ClientResult<Dataset> {
        self.transport.get_typed(&self.url(&["dataset"], &[])).await
    }

    /// Post back column qualifications.
    pub async fn update_dataset(&self, dataset: &Dataset) -> ClientResult<Dataset> {
        self.transport
            .post_typed(&self.url(&["dataset"], &[]), Some(dataset))
            .await
    }

    /// Start binning `column` (or [`ALL_COLUMNS`]) into at most `max_bins`.
    pub async fn create_binning(&self, column: &str, max_bins: u32) -> ClientResult<JobHandle> {
        let max_bins = max_bins.to_string();
        let url = self.url(&["binning", "create"], &[column, &max_bins]);
        self.orchestrator()
            .submit(Method::GET, &url, RequestBody::Empty)
            .await
    }

    /// Binning results for `column` (or [`ALL_COLUMNS`]) in `mode`.
    pub async fn binning(&self, column: &str, mode: &str) -> ClientResult<BinsViewList> {
        let url = self.url(&["binning", "get"], &[column, mode]);
        self.transport.get_typed(&url).await
    }

    /// Download an export artifact to `destination`.
    pub async fn export(&self, format: &ExportFormat, destination: &Path) -> ClientResult<u64> {
        let url = self.url(&["deploy", "export"], &[format.as_str()]);
        let written = self.transport.download(&url, destination).await?;
        info!(%format, path = %destination.display(), bytes = written, "export downloaded");
        Ok(written)
    }

    /// Apply the project's transformation server-side to CSV content.
    pub async fn deploy_dataset(
        &self,
        csv: impl Into<Bytes>,
        codepage: u32,
    ) -> ClientResult<JobHandle> {
        let codepage = codepage.to_string();
        let url = self.url(&["deploy"], &["csv", "raw", &codepage]);
        self.orchestrator()
            .submit(Method::POST, &url, RequestBody::raw(csv))
            .await
    }

    /// Poll a job of this project until it is terminal.
    pub async fn wait<P>(&self, handle: JobHandle, on_progress: P) -> ClientResult<JobHandle>
    where
        P: FnMut(&JobHandle),
    {
        self.orchestrator()
            .await_completion(handle, |id| self.task_url(id), on_progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(client: &QuantForceClient) -> ProjectClient<'_> {
        let project = Project {
            id: "p-42".into(),
            uri: Some("https://eu1.quantforce.net/".into()),
            ..Project::named("demo01")
        };
        client.project(&project).unwrap()
    }

    fn authenticated() -> QuantForceClient {
        let mut client = QuantForceClient::new(ClientConfig::default()).unwrap();
        client.set_session(AuthSession::new("tok", 60)).unwrap();
        client
    }

    #[test]
    fn test_project_urls() {
        let client = authenticated();
        let project = scoped(&client);
        assert_eq!(project.api().as_str(), "https://eu1.quantforce.net/api/v1.0");
        assert_eq!(
            project.task_url(&JobId::from("j-1")),
            "https://eu1.quantforce.net/api/v1.0/task/tok/p-42/j-1"
        );
        assert_eq!(
            project.url(&["binning", "create"], &[ALL_COLUMNS, "20"]),
            "https://eu1.quantforce.net/api/v1.0/binning/create/tok/p-42/*/20"
        );
        assert_eq!(
            project.url(&["dataset"], &[]),
            "https://eu1.quantforce.net/api/v1.0/dataset/tok/p-42"
        );
    }

    #[test]
    fn test_project_without_uri_uses_root_api() {
        let client = authenticated();
        let project = client.project(&Project::named("x")).unwrap();
        assert_eq!(project.api(), client.api());
    }

    #[test]
    fn test_project_requires_session() {
        let client = QuantForceClient::new(ClientConfig::default()).unwrap();
        assert!(matches!(
            client.project(&Project::named("x")),
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_export_format_names() {
        assert_eq!(ExportFormat::Python.as_str(), "Python");
        assert_eq!(ExportFormat::Transform.to_string(), "transform");
        assert_eq!(ExportFormat::Other("R".into()).as_str(), "R");
    }
}
