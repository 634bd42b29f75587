pub mod github;
pub mod memory;

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::dao::{
    models::{GameCollectionDocument, RemoteDocumentHandle, VersionMarker},
    storage::StoreResult,
};

/// Access credentials and location of the remote repository holding the document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCredentials {
    /// Bearer token granting contents access.
    pub token: String,
    /// Owner (user or organisation) of the repository.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl StoreCredentials {
    /// Build a credential set from its three parts.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let visible: String = self
            .token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{visible}")
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("token", &self.masked_token())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

/// Abstraction over the single versioned file holding the game collection.
///
/// Implementations never cache: every call reaches the backing store.
pub trait DocumentStore: Send + Sync {
    /// Fetch the current content together with its version marker.
    fn read(&self) -> BoxFuture<'static, StoreResult<RemoteDocumentHandle>>;
    /// Replace the whole document, conditioned on `expected` still being current.
    /// `None` creates the file and fails with a conflict if it already exists.
    fn write(
        &self,
        content: GameCollectionDocument,
        expected: Option<VersionMarker>,
        change_description: String,
    ) -> BoxFuture<'static, StoreResult<VersionMarker>>;
    /// Check that the configured location is reachable without mutating it.
    fn test_connection(&self) -> BoxFuture<'static, StoreResult<bool>>;
    /// Swap the credentials used by subsequent calls.
    fn set_credentials(&self, credentials: Option<StoreCredentials>) -> BoxFuture<'static, ()>;
    /// Whether credentials are currently installed.
    fn is_configured(&self) -> BoxFuture<'static, bool>;
}
