//! Error types raised by the content API adapter.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StoreError;

/// Convenient result alias returning [`GithubDaoError`] failures.
pub type GithubResult<T> = Result<T, GithubDaoError>;

/// Failures that can occur while talking to the content API.
#[derive(Debug, Error)]
pub enum GithubDaoError {
    /// No token / owner / repository installed.
    #[error("repository credentials are not configured")]
    MissingCredentials,
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build content API client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The file does not exist in the repository.
    #[error("`{path}` does not exist")]
    NotFound { path: String },
    /// The supplied blob sha no longer matches the file.
    #[error("`{path}` was modified by another writer")]
    Conflict { path: String },
    /// The API answered with an unexpected status code.
    #[error("unexpected content API status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode content API response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The file content is not base64 or uses another encoding.
    #[error("unsupported content encoding `{encoding}` for `{path}`")]
    UnsupportedEncoding { path: String, encoding: String },
    /// The base64 payload is malformed.
    #[error("failed to decode base64 content of `{path}`")]
    DecodeContent {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
    /// The stored document is not a valid collection document.
    #[error("failed to parse collection document `{path}`")]
    ParseDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The collection document could not be serialized for upload.
    #[error("failed to serialize collection document")]
    SerializeDocument {
        #[source]
        source: serde_json::Error,
    },
}

impl From<GithubDaoError> for StoreError {
    fn from(err: GithubDaoError) -> Self {
        match err {
            GithubDaoError::MissingCredentials => StoreError::NotConfigured,
            GithubDaoError::NotFound { path } => StoreError::NotFound { path },
            GithubDaoError::Conflict { path } => StoreError::VersionConflict { path },
            other => StoreError::transport(other.to_string(), other),
        }
    }
}
