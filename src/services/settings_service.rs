use tracing::{info, warn};

use crate::{
    config,
    dao::document_store::StoreCredentials,
    dto::settings::SettingsResponse,
    error::ServiceError,
    services::library_service,
    state::SharedState,
};

/// Current settings with the token masked.
pub async fn get_settings(state: &SharedState) -> SettingsResponse {
    SettingsResponse::from_credentials(state.credentials().await.as_ref())
}

/// Persist and install new credentials, then check them.
///
/// When the repository is reachable the library is reloaded from it. Returns
/// whether the connection check succeeded.
pub async fn save_settings(
    state: &SharedState,
    credentials: StoreCredentials,
) -> Result<bool, ServiceError> {
    let path = state.config().credentials_path.clone();
    config::save_credentials(&path, &credentials).map_err(|err| {
        warn!(path = %path.display(), error = %err, "failed to persist credentials");
        ServiceError::Internal("failed to persist credentials".into())
    })?;
    info!(owner = %credentials.owner, repo = %credentials.repo, "store credentials updated");
    state.install_credentials(credentials).await;

    let reachable = test_connection(state).await?;
    if reachable {
        library_service::load(state).await?;
    }
    Ok(reachable)
}

/// Check that the configured repository can be reached.
pub async fn test_connection(state: &SharedState) -> Result<bool, ServiceError> {
    let reachable = state.store().test_connection().await?;
    if !reachable {
        warn!("store rejected the configured credentials");
    }
    Ok(reachable)
}
