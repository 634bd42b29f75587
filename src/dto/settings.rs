use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::document_store::StoreCredentials, dto::validation::validate_not_blank};

/// Current store settings. The token is never echoed back in full.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub configured: bool,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Last four characters of the token, prefixed with `****`.
    pub token: Option<String>,
}

impl SettingsResponse {
    /// Settings view for the given credentials.
    pub fn from_credentials(credentials: Option<&StoreCredentials>) -> Self {
        match credentials {
            Some(credentials) => Self {
                configured: true,
                owner: Some(credentials.owner.clone()),
                repo: Some(credentials.repo.clone()),
                token: Some(credentials.masked_token()),
            },
            None => Self {
                configured: false,
                owner: None,
                repo: None,
                token: None,
            },
        }
    }
}

/// Credentials submitted from the settings surface.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SaveSettingsRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub token: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub owner: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub repo: String,
}

impl From<SaveSettingsRequest> for StoreCredentials {
    fn from(request: SaveSettingsRequest) -> Self {
        StoreCredentials::new(
            request.token.trim(),
            request.owner.trim(),
            request.repo.trim(),
        )
    }
}

/// Outcome of a connection check against the remote repository.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionTestResponse {
    /// `true` when the repository is reachable with the current credentials.
    pub ok: bool,
}
