use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::settings::{ConnectionTestResponse, SaveSettingsRequest, SettingsResponse},
    error::AppError,
    services::settings_service,
    state::SharedState,
};

/// Remote store settings endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/settings", get(get_settings).put(save_settings))
        .route("/settings/test", post(test_connection))
}

/// Current store settings with the token masked.
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses((status = 200, description = "Current settings", body = SettingsResponse))
)]
pub async fn get_settings(State(state): State<SharedState>) -> Json<SettingsResponse> {
    Json(settings_service::get_settings(&state).await)
}

/// Save credentials, test them and reload the library when they work.
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    request_body = SaveSettingsRequest,
    responses(
        (status = 200, description = "Credentials saved; `ok` reports the connection check", body = ConnectionTestResponse),
        (status = 400, description = "Invalid payload"),
        (status = 502, description = "Store unreachable")
    )
)]
pub async fn save_settings(
    State(state): State<SharedState>,
    Json(payload): Json<SaveSettingsRequest>,
) -> Result<Json<ConnectionTestResponse>, AppError> {
    payload.validate()?;
    let ok = settings_service::save_settings(&state, payload.into()).await?;
    Ok(Json(ConnectionTestResponse { ok }))
}

/// Check the current credentials without changing anything.
#[utoipa::path(
    post,
    path = "/settings/test",
    tag = "settings",
    responses(
        (status = 200, description = "Connection check result", body = ConnectionTestResponse),
        (status = 428, description = "Store credentials are not configured")
    )
)]
pub async fn test_connection(
    State(state): State<SharedState>,
) -> Result<Json<ConnectionTestResponse>, AppError> {
    let ok = settings_service::test_connection(&state).await?;
    Ok(Json(ConnectionTestResponse { ok }))
}
