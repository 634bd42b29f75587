use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Status value written by older releases for games waiting in the backlog.
pub const LEGACY_QUEUEING_STATUS: &str = "pending";

/// Marker in a storefront detail-page URL preceding the numeric application id.
const APP_PATH_SEGMENT: &str = "/app/";

/// Backlog classification of a tracked game.
///
/// The set is closed: the legacy `pending` spelling is folded into
/// [`GameStatus::Queueing`] when a document is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Currently being played.
    Playing,
    /// Waiting in the backlog.
    #[serde(alias = "pending")]
    Queueing,
    /// Finished.
    Completion,
}

impl GameStatus {
    /// Wire spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Playing => "playing",
            GameStatus::Queueing => "queueing",
            GameStatus::Completion => "completion",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storefront genre tag attached to an imported game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Genre {
    pub id: String,
    pub description: String,
}

/// One tracked title as persisted in the remote document.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Opaque identifier assigned at creation, never reused.
    pub id: String,
    /// User-editable display name.
    pub name: String,
    /// Backlog classification.
    pub status: GameStatus,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    /// Bumped on every user mutation, left untouched by metadata refreshes.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    /// Storefront detail page the game was imported from.
    pub steam_url: Option<String>,
    /// Thumbnail captured at import time.
    pub cover_image: Option<String>,
    /// Share of positive reviews, 0 to 100.
    pub positive_percentage: Option<u8>,
    /// Number of reviews backing [`GameRecord::positive_percentage`].
    pub total_reviews: Option<u64>,
    /// Free-form release date as reported by the storefront.
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub is_early_access: Option<bool>,
    pub genres: Option<Vec<Genre>>,
    /// Pinned records sort ahead of the rest of their group.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_pinned: bool,
    /// Fields written by other clients that this service does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameRecord {
    /// Build a freshly added record; new games always start in the queue.
    pub fn new_queued(id: String, name: String, now: OffsetDateTime) -> Self {
        Self {
            id,
            name,
            status: GameStatus::Queueing,
            added_at: now,
            last_updated: now,
            steam_url: None,
            cover_image: None,
            positive_percentage: None,
            total_reviews: None,
            release_date: None,
            coming_soon: None,
            is_early_access: None,
            genres: None,
            is_pinned: false,
            extra: Map::new(),
        }
    }

    /// Case-insensitive name comparison used for duplicate detection.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Storefront application id parsed from [`GameRecord::steam_url`].
    pub fn storefront_app_id(&self) -> Option<u64> {
        self.steam_url.as_deref().and_then(app_id_from_url)
    }

    /// Whether review data has never been fetched for this record.
    pub fn is_missing_reviews(&self) -> bool {
        self.positive_percentage.is_none()
    }

    /// Storefront-derived fields currently carried by the record.
    pub fn metadata(&self) -> StorefrontMetadata {
        StorefrontMetadata {
            positive_percentage: self.positive_percentage,
            total_reviews: self.total_reviews,
            release_date: self.release_date.clone(),
            coming_soon: self.coming_soon,
            is_early_access: self.is_early_access,
            genres: self.genres.clone(),
        }
    }

    /// Overwrite the storefront-derived fields. `last_updated` is left as is.
    pub fn apply_metadata(&mut self, metadata: &StorefrontMetadata) {
        self.positive_percentage = metadata.positive_percentage;
        self.total_reviews = metadata.total_reviews;
        self.release_date = metadata.release_date.clone();
        self.coming_soon = metadata.coming_soon;
        self.is_early_access = metadata.is_early_access;
        self.genres = metadata.genres.clone();
    }
}

/// Review and release fields refreshed from the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorefrontMetadata {
    pub positive_percentage: Option<u8>,
    pub total_reviews: Option<u64>,
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub is_early_access: Option<bool>,
    pub genres: Option<Vec<Genre>>,
}

impl StorefrontMetadata {
    /// Layer freshly fetched values over `self`, keeping the current value for
    /// every field the fetch left absent.
    pub fn merged_with(&self, fresh: &StorefrontMetadata) -> StorefrontMetadata {
        StorefrontMetadata {
            positive_percentage: fresh.positive_percentage.or(self.positive_percentage),
            total_reviews: fresh.total_reviews.or(self.total_reviews),
            release_date: fresh
                .release_date
                .clone()
                .or_else(|| self.release_date.clone()),
            coming_soon: fresh.coming_soon.or(self.coming_soon),
            is_early_access: fresh.is_early_access.or(self.is_early_access),
            genres: fresh.genres.clone().or_else(|| self.genres.clone()),
        }
    }

    /// True when every field is absent.
    pub fn is_empty(&self) -> bool {
        *self == StorefrontMetadata::default()
    }
}

/// Extract the numeric application id from a storefront detail-page URL.
pub fn app_id_from_url(url: &str) -> Option<u64> {
    let (_, rest) = url.split_once(APP_PATH_SEGMENT)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Entire persisted state, stored as the sole content of one remote file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameCollectionDocument {
    #[serde(default)]
    pub games: Vec<GameRecord>,
}

/// Result of parsing a raw document at the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedDocument {
    pub document: GameCollectionDocument,
    /// Ids of records whose status was stored with the legacy spelling.
    pub legacy_status_ids: Vec<String>,
}

impl GameCollectionDocument {
    /// Wrap a list of records.
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self { games }
    }

    /// Parse raw document bytes, normalizing legacy status values and
    /// reporting which records carried them.
    pub fn ingest(bytes: &[u8]) -> serde_json::Result<IngestedDocument> {
        let raw: Value = serde_json::from_slice(bytes)?;
        let legacy_status_ids = raw
            .get("games")
            .and_then(Value::as_array)
            .map(|games| {
                games
                    .iter()
                    .filter(|game| {
                        game.get("status").and_then(Value::as_str) == Some(LEGACY_QUEUEING_STATUS)
                    })
                    .filter_map(|game| game.get("id").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let document = serde_json::from_value(raw)?;
        Ok(IngestedDocument {
            document,
            legacy_status_ids,
        })
    }

    /// Serialize the document the way it is committed to the remote file.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Opaque content hash handed back by the store; writes must echo it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionMarker(String);

impl VersionMarker {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The store's view of the remote file at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocumentHandle {
    pub content: GameCollectionDocument,
    /// `None` only when the file does not exist yet.
    pub version_marker: Option<VersionMarker>,
    /// Records that were stored with the legacy status spelling.
    pub legacy_status_ids: Vec<String>,
}

impl RemoteDocumentHandle {
    /// Handle standing in for a file that has not been created yet.
    pub fn first_run() -> Self {
        Self {
            content: GameCollectionDocument::default(),
            version_marker: None,
            legacy_status_ids: Vec::new(),
        }
    }

    /// Whether the stored bytes still carry values that ingestion rewrote.
    pub fn needs_rewrite(&self) -> bool {
        !self.legacy_status_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hades_document(status: &str) -> String {
        format!(
            r#"{{"games":[{{"id":"1","name":"Hades","status":"{status}","addedAt":"2024-01-01T00:00:00.000Z","lastUpdated":"2024-01-02T00:00:00.000Z","tags":["roguelike"]}}]}}"#
        )
    }

    #[test]
    fn ingest_reports_legacy_statuses() {
        let ingested = GameCollectionDocument::ingest(hades_document("pending").as_bytes()).unwrap();
        assert_eq!(ingested.legacy_status_ids, vec!["1".to_string()]);
        assert_eq!(ingested.document.games[0].status, GameStatus::Queueing);
    }

    #[test]
    fn ingest_of_current_statuses_reports_nothing() {
        let ingested =
            GameCollectionDocument::ingest(hades_document("queueing").as_bytes()).unwrap();
        assert!(ingested.legacy_status_ids.is_empty());
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let ingested = GameCollectionDocument::ingest(hades_document("playing").as_bytes()).unwrap();
        let json = ingested.document.to_pretty_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["games"][0]["tags"][0], "roguelike");
        assert!(value["games"][0].get("isPinned").is_none());
        assert!(value["games"][0].get("positivePercentage").is_none());
    }

    #[test]
    fn status_deserialisation_accepts_legacy_alias() {
        let parse = |raw: &str| serde_json::from_str::<GameStatus>(raw);
        assert_eq!(parse("\"pending\"").unwrap(), GameStatus::Queueing);
        assert_eq!(parse("\"completion\"").unwrap(), GameStatus::Completion);
        assert!(parse("\"dropped\"").is_err());
        assert_eq!(serde_json::to_string(&GameStatus::Queueing).unwrap(), "\"queueing\"");
    }

    #[test]
    fn app_id_is_read_from_detail_url() {
        assert_eq!(
            app_id_from_url("https://store.steampowered.com/app/1145360/Hades/"),
            Some(1145360)
        );
        assert_eq!(
            app_id_from_url("https://store.steampowered.com/app/1145360"),
            Some(1145360)
        );
        assert_eq!(app_id_from_url("https://example.com/game/12"), None);
        assert_eq!(app_id_from_url("https://store.steampowered.com/app/"), None);
    }

    #[test]
    fn merge_keeps_current_values_for_absent_fields() {
        let current = StorefrontMetadata {
            positive_percentage: Some(80),
            total_reviews: Some(10),
            release_date: Some("1 Jan, 2020".into()),
            coming_soon: Some(false),
            is_early_access: Some(true),
            genres: Some(vec![Genre {
                id: "23".into(),
                description: "Indie".into(),
            }]),
        };
        let fresh = StorefrontMetadata {
            positive_percentage: Some(90),
            is_early_access: Some(false),
            ..StorefrontMetadata::default()
        };

        let merged = current.merged_with(&fresh);
        assert_eq!(merged.positive_percentage, Some(90));
        assert_eq!(merged.total_reviews, Some(10));
        assert_eq!(merged.release_date.as_deref(), Some("1 Jan, 2020"));
        assert_eq!(merged.is_early_access, Some(false));
        assert_eq!(merged.genres, current.genres);
    }
}
