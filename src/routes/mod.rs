use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod games;
pub mod health;
pub mod settings;
pub mod sse;
pub mod storefront;

/// Path of the Swagger UI.
pub const DOCS_PATH: &str = "/docs";
/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(games::router())
        .merge(storefront::router())
        .merge(settings::router());

    let docs_router: Router<SharedState> = SwaggerUi::new(DOCS_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into();

    api_router.merge(docs_router).with_state(state)
}
