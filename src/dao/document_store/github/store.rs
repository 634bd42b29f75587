use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, header};
use tokio::sync::RwLock;
use tracing::debug;

use crate::dao::{
    document_store::{DocumentStore, StoreCredentials},
    models::{GameCollectionDocument, RemoteDocumentHandle, VersionMarker},
    storage::StoreResult,
};

use super::{
    config::GithubConfig,
    error::{GithubDaoError, GithubResult},
    models::{ContentsResponse, PutContentsRequest, PutContentsResponse},
};

const ACCEPT_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("game-gallery-back/", env!("CARGO_PKG_VERSION"));

/// Document store backed by a file in a hosted git repository.
#[derive(Clone)]
pub struct GithubDocumentStore {
    client: Client,
    api_base: Arc<str>,
    path: Arc<str>,
    branch: Option<Arc<str>>,
    credentials: Arc<RwLock<Option<StoreCredentials>>>,
}

impl GithubDocumentStore {
    /// Build the HTTP client. No request is issued until the first call.
    pub fn new(config: GithubConfig, credentials: Option<StoreCredentials>) -> GithubResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| GithubDaoError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_base: Arc::<str>::from(config.api_base.trim_end_matches('/')),
            path: Arc::<str>::from(config.path.trim_start_matches('/')),
            branch: config.branch.map(Arc::<str>::from),
            credentials: Arc::new(RwLock::new(credentials)),
        })
    }

    async fn require_credentials(&self) -> GithubResult<StoreCredentials> {
        self.credentials
            .read()
            .await
            .clone()
            .ok_or(GithubDaoError::MissingCredentials)
    }

    fn repository_url(&self, credentials: &StoreCredentials) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base, credentials.owner, credentials.repo
        )
    }

    fn contents_url(&self, credentials: &StoreCredentials) -> String {
        format!("{}/contents/{}", self.repository_url(credentials), self.path)
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        credentials: &StoreCredentials,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&credentials.token)
            .header(header::ACCEPT, ACCEPT_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn get_contents(&self) -> GithubResult<RemoteDocumentHandle> {
        let credentials = self.require_credentials().await?;
        let url = self.contents_url(&credentials);
        let mut builder = self.request(Method::GET, &url, &credentials);
        if let Some(branch) = self.branch.as_deref() {
            builder = builder.query(&[("ref", branch)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| GithubDaoError::RequestSend {
                path: self.path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(GithubDaoError::NotFound {
                path: self.path.to_string(),
            }),
            status if status.is_success() => {
                let payload = response.json::<ContentsResponse>().await.map_err(|source| {
                    GithubDaoError::DecodeResponse {
                        path: self.path.to_string(),
                        source,
                    }
                })?;
                let bytes = payload.decoded(&self.path)?;
                let ingested = GameCollectionDocument::ingest(&bytes).map_err(|source| {
                    GithubDaoError::ParseDocument {
                        path: self.path.to_string(),
                        source,
                    }
                })?;
                debug!(path = %self.path, sha = %payload.sha, games = ingested.document.games.len(), "fetched collection document");

                Ok(RemoteDocumentHandle {
                    content: ingested.document,
                    version_marker: Some(VersionMarker::new(payload.sha)),
                    legacy_status_ids: ingested.legacy_status_ids,
                })
            }
            other => Err(GithubDaoError::RequestStatus {
                path: self.path.to_string(),
                status: other,
            }),
        }
    }

    async fn put_contents(
        &self,
        content: &GameCollectionDocument,
        expected: Option<&VersionMarker>,
        message: &str,
    ) -> GithubResult<VersionMarker> {
        let credentials = self.require_credentials().await?;
        let url = self.contents_url(&credentials);
        let body = content
            .to_pretty_json()
            .map_err(|source| GithubDaoError::SerializeDocument { source })?;
        let request = PutContentsRequest::new(
            message,
            &body,
            expected.map(VersionMarker::as_str),
            self.branch.as_deref(),
        );

        let response = self
            .request(Method::PUT, &url, &credentials)
            .json(&request)
            .send()
            .await
            .map_err(|source| GithubDaoError::RequestSend {
                path: self.path.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => {
                let payload = response
                    .json::<PutContentsResponse>()
                    .await
                    .map_err(|source| GithubDaoError::DecodeResponse {
                        path: self.path.to_string(),
                        source,
                    })?;
                Ok(VersionMarker::new(payload.content.sha))
            }
            StatusCode::CONFLICT => Err(GithubDaoError::Conflict {
                path: self.path.to_string(),
            }),
            // Creating a file that another writer created first is reported as
            // a validation failure because no sha was supplied.
            StatusCode::UNPROCESSABLE_ENTITY if expected.is_none() => {
                Err(GithubDaoError::Conflict {
                    path: self.path.to_string(),
                })
            }
            other => Err(GithubDaoError::RequestStatus {
                path: self.path.to_string(),
                status: other,
            }),
        }
    }

    async fn get_repository(&self) -> GithubResult<bool> {
        let credentials = self.require_credentials().await?;
        let url = self.repository_url(&credentials);
        let response = self
            .request(Method::GET, &url, &credentials)
            .send()
            .await
            .map_err(|source| GithubDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(false),
            other => Err(GithubDaoError::RequestStatus {
                path: url,
                status: other,
            }),
        }
    }
}

impl DocumentStore for GithubDocumentStore {
    fn read(&self) -> BoxFuture<'static, StoreResult<RemoteDocumentHandle>> {
        let store = self.clone();
        Box::pin(async move { store.get_contents().await.map_err(Into::into) })
    }

    fn write(
        &self,
        content: GameCollectionDocument,
        expected: Option<VersionMarker>,
        change_description: String,
    ) -> BoxFuture<'static, StoreResult<VersionMarker>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .put_contents(&content, expected.as_ref(), &change_description)
                .await
                .map_err(Into::into)
        })
    }

    fn test_connection(&self) -> BoxFuture<'static, StoreResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.get_repository().await.map_err(Into::into) })
    }

    fn set_credentials(&self, credentials: Option<StoreCredentials>) -> BoxFuture<'static, ()> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.credentials.write().await;
            *guard = credentials;
        })
    }

    fn is_configured(&self) -> BoxFuture<'static, bool> {
        let store = self.clone();
        Box::pin(async move { store.credentials.read().await.is_some() })
    }
}
