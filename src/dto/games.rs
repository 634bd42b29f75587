use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{GameRecord, GameStatus, Genre},
    dto::{
        format_timestamp,
        validation::{validate_game_name, validate_storefront_url},
    },
};

/// Public projection of a tracked game exposed to REST/SSE clients.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    pub name: String,
    pub status: GameStatus,
    /// RFC 3339 creation timestamp.
    pub added_at: String,
    /// RFC 3339 timestamp of the last user edit.
    pub last_updated: String,
    pub steam_url: Option<String>,
    pub cover_image: Option<String>,
    pub positive_percentage: Option<u8>,
    pub total_reviews: Option<u64>,
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub is_early_access: Option<bool>,
    pub genres: Option<Vec<Genre>>,
    pub is_pinned: bool,
}

impl From<&GameRecord> for GameView {
    fn from(record: &GameRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            status: record.status,
            added_at: format_timestamp(record.added_at),
            last_updated: format_timestamp(record.last_updated),
            steam_url: record.steam_url.clone(),
            cover_image: record.cover_image.clone(),
            positive_percentage: record.positive_percentage,
            total_reviews: record.total_reviews,
            release_date: record.release_date.clone(),
            coming_soon: record.coming_soon,
            is_early_access: record.is_early_access,
            genres: record.genres.clone(),
            is_pinned: record.is_pinned,
        }
    }
}

/// Convert a list of records into their public projection.
pub fn views(games: &[GameRecord]) -> Vec<GameView> {
    games.iter().map(GameView::from).collect()
}

/// Games split by status, each group in display order.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct GroupedGamesResponse {
    pub playing: Vec<GameView>,
    pub queueing: Vec<GameView>,
    pub completion: Vec<GameView>,
}

/// Payload used to add a game, either typed by hand or picked from a storefront search.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_game_name"))]
    pub name: String,
    /// Storefront detail page; enables background metadata refresh.
    #[validate(url, custom(function = "validate_storefront_url"))]
    pub steam_url: Option<String>,
    #[validate(url)]
    pub cover_image: Option<String>,
    #[validate(range(max = 100))]
    pub positive_percentage: Option<u8>,
    pub total_reviews: Option<u64>,
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub is_early_access: Option<bool>,
    pub genres: Option<Vec<Genre>>,
}

impl CreateGameRequest {
    /// Build the record committed for this request. New games always start queued.
    pub fn into_record(self, id: String, now: OffsetDateTime) -> GameRecord {
        let mut record = GameRecord::new_queued(id, self.name.trim().to_string(), now);
        record.steam_url = self.steam_url;
        record.cover_image = self.cover_image;
        record.positive_percentage = self.positive_percentage;
        record.total_reviews = self.total_reviews;
        record.release_date = self.release_date;
        record.coming_soon = self.coming_soon;
        record.is_early_access = self.is_early_access;
        record.genres = self.genres;
        record
    }
}

/// Partial edit of a game. At least one field must be present.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateGameRequest {
    #[validate(custom(function = "validate_game_name"))]
    pub name: Option<String>,
    pub status: Option<GameStatus>,
}

impl UpdateGameRequest {
    /// Whether the request changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none()
    }
}

/// Free-text query over game names.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring to look for.
    #[serde(default)]
    pub q: String,
}
