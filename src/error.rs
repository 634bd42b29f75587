use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{storage::StoreError, storefront::StorefrontError},
    services::update_coordinator::{TransformError, UpdateError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Store credentials are missing; the user must visit the settings surface.
    #[error("store credentials are not configured")]
    NotConfigured,
    /// The remote store or network failed.
    #[error("storage unavailable: {0}")]
    Transport(#[source] StoreError),
    /// A record with the same name already exists.
    #[error("a game named `{0}` already exists")]
    DuplicateEntry(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Every attempt of an update lost against another writer.
    #[error("update abandoned after {0} conflicting attempts")]
    ConcurrencyExhausted(u32),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// The storefront could not serve a search.
    #[error("storefront unavailable")]
    Storefront(#[source] StorefrontError),
    /// Local persistence (credentials file) failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotConfigured => ServiceError::NotConfigured,
            other => ServiceError::Transport(other),
        }
    }
}

impl From<TransformError> for ServiceError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::DuplicateEntry { name } => ServiceError::DuplicateEntry(name),
            TransformError::MissingRecord { id } => ServiceError::NotFound(format!("game `{id}`")),
        }
    }
}

impl From<UpdateError> for ServiceError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Store(source) => source.into(),
            UpdateError::Rejected(reason) => reason.into(),
            UpdateError::ConcurrencyExhausted { attempts } => {
                ServiceError::ConcurrencyExhausted(attempts)
            }
            UpdateError::DeadlineExceeded(_) => ServiceError::Timeout,
        }
    }
}

impl From<StorefrontError> for ServiceError {
    fn from(err: StorefrontError) -> Self {
        ServiceError::Storefront(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Settings must be completed before the request can succeed.
    #[error("settings required: {0}")]
    PreconditionRequired(String),
    /// Upstream service failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or overloaded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotConfigured => {
                AppError::PreconditionRequired("store credentials are not configured".into())
            }
            ServiceError::Transport(source) => AppError::BadGateway(source.to_string()),
            ServiceError::DuplicateEntry(name) => {
                AppError::Conflict(format!("a game named `{name}` already exists"))
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            err @ ServiceError::ConcurrencyExhausted(_) => {
                AppError::ServiceUnavailable(err.to_string())
            }
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::Storefront(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PreconditionRequired(_) => StatusCode::PRECONDITION_REQUIRED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
