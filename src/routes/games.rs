use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use validator::Validate;

use crate::{
    dto::games::{
        CreateGameRequest, GameView, GroupedGamesResponse, SearchQuery, UpdateGameRequest, views,
    },
    error::AppError,
    services::library_service,
    state::SharedState,
};

/// Game library endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/reload", post(reload_games))
        .route("/games/search", get(search_games))
        .route("/games/{id}", patch(update_game).delete(delete_game))
        .route("/games/{id}/pin", post(toggle_pin))
}

/// List the session's games grouped by status.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Games grouped by status", body = GroupedGamesResponse))
)]
pub async fn list_games(State(state): State<SharedState>) -> Json<GroupedGamesResponse> {
    Json(library_service::grouped(&state).await)
}

/// Add a game to the queue.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game added", body = GameView),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "A game with this name already exists"),
        (status = 428, description = "Store credentials are not configured")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameView>), AppError> {
    payload.validate()?;
    let record = library_service::add_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(GameView::from(&record))))
}

/// Reload the list from the remote store, migrating legacy statuses.
#[utoipa::path(
    post,
    path = "/games/reload",
    tag = "games",
    responses(
        (status = 200, description = "Reloaded games", body = GroupedGamesResponse),
        (status = 428, description = "Store credentials are not configured")
    )
)]
pub async fn reload_games(
    State(state): State<SharedState>,
) -> Result<Json<GroupedGamesResponse>, AppError> {
    library_service::load(&state).await?;
    Ok(Json(library_service::grouped(&state).await))
}

/// Find games by name.
#[utoipa::path(
    get,
    path = "/games/search",
    tag = "games",
    params(SearchQuery),
    responses((status = 200, description = "Matching games", body = [GameView]))
)]
pub async fn search_games(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<GameView>> {
    Json(views(&library_service::search_local(&state, &query.q).await))
}

/// Rename a game or change its status.
#[utoipa::path(
    patch,
    path = "/games/{id}",
    tag = "games",
    params(("id" = String, Path, description = "Identifier of the game to edit")),
    request_body = UpdateGameRequest,
    responses(
        (status = 200, description = "Updated game", body = GameView),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Another game already has this name")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGameRequest>,
) -> Result<Json<GameView>, AppError> {
    payload.validate()?;
    let record = library_service::update_game(&state, &id, payload).await?;
    Ok(Json(GameView::from(&record)))
}

/// Remove a game.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    params(("id" = String, Path, description = "Identifier of the game to delete")),
    responses(
        (status = 204, description = "Game removed"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    library_service::delete_game(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pin or unpin a game.
#[utoipa::path(
    post,
    path = "/games/{id}/pin",
    tag = "games",
    params(("id" = String, Path, description = "Identifier of the game to pin or unpin")),
    responses(
        (status = 200, description = "Game with its new pinned flag", body = GameView),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn toggle_pin(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    let record = library_service::toggle_pin(&state, &id).await?;
    Ok(Json(GameView::from(&record)))
}
