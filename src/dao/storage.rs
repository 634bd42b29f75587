use std::error::Error;
use thiserror::Error;

/// Result alias for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure taxonomy shared by every document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Credentials or file location have not been configured yet.
    #[error("document store is not configured")]
    NotConfigured,
    /// The remote file does not exist yet.
    #[error("document `{path}` not found")]
    NotFound { path: String },
    /// Another writer committed after the supplied version marker was read.
    #[error("document `{path}` changed since it was read")]
    VersionConflict { path: String },
    /// Network, HTTP or payload failure.
    #[error("document store transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Construct a transport error from any backend failure.
    pub fn transport(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Transport {
            message,
            source: Box::new(source),
        }
    }

    /// Whether the failure is a stale-write rejection.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
