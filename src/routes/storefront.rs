use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{games::SearchQuery, storefront::StorefrontHitView},
    error::AppError,
    services::library_service,
    state::SharedState,
};

/// Storefront lookup endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/storefront/search", get(search_storefront))
}

/// Search the storefront for games to import. A blank query returns nothing.
#[utoipa::path(
    get,
    path = "/storefront/search",
    tag = "storefront",
    params(SearchQuery),
    responses(
        (status = 200, description = "Up to ten matches", body = [StorefrontHitView]),
        (status = 502, description = "Storefront unavailable")
    )
)]
pub async fn search_storefront(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StorefrontHitView>>, AppError> {
    let hits = library_service::search_storefront(&state, &query.q).await?;
    Ok(Json(hits.into_iter().map(StorefrontHitView::from).collect()))
}
