use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Game Gallery Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::games::list_games,
        crate::routes::games::create_game,
        crate::routes::games::reload_games,
        crate::routes::games::search_games,
        crate::routes::games::update_game,
        crate::routes::games::delete_game,
        crate::routes::games::toggle_pin,
        crate::routes::storefront::search_storefront,
        crate::routes::settings::get_settings,
        crate::routes::settings::save_settings,
        crate::routes::settings::test_connection,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::games::GameView,
            crate::dto::games::GroupedGamesResponse,
            crate::dto::games::CreateGameRequest,
            crate::dto::games::UpdateGameRequest,
            crate::dto::storefront::StorefrontHitView,
            crate::dto::settings::SettingsResponse,
            crate::dto::settings::SaveSettingsRequest,
            crate::dto::settings::ConnectionTestResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::GamesUpdatedEvent,
            crate::dto::sse::GameEnrichedEvent,
            crate::dto::sse::NoticeEvent,
            crate::dao::models::GameStatus,
            crate::dao::models::Genre,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game library management"),
        (name = "storefront", description = "Storefront search for imports"),
        (name = "settings", description = "Remote store credentials"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
