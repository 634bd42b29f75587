use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload while logging configuration issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if state.store().is_configured().await {
        HealthResponse::ok()
    } else {
        warn!("store credentials missing; settings required");
        HealthResponse::unconfigured()
    }
}
