use std::collections::HashMap;

use serde::Deserialize;

use crate::dao::{
    models::Genre,
    storefront::{ReleaseInfo, ReviewSummary, StorefrontHit},
};

/// Genre id the storefront uses to flag early-access titles.
pub const EARLY_ACCESS_GENRE_ID: &str = "70";
/// Number of search candidates kept.
pub const MAX_SEARCH_RESULTS: usize = 10;
const SEARCH_ITEM_APP: &str = "app";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub tiny_image: Option<String>,
}

impl SearchResponse {
    /// Keep the first application matches and derive their canonical URLs.
    pub fn into_hits(self) -> Vec<StorefrontHit> {
        self.items
            .into_iter()
            .filter(|item| item.kind == SEARCH_ITEM_APP)
            .take(MAX_SEARCH_RESULTS)
            .map(|item| StorefrontHit {
                steam_url: format!("https://store.steampowered.com/app/{}", item.id),
                cover_image: item
                    .tiny_image
                    .filter(|image| !image.is_empty())
                    .unwrap_or_else(|| {
                        format!(
                            "https://cdn.cloudflare.steamstatic.com/steam/apps/{}/capsule_sm_120.jpg",
                            item.id
                        )
                    }),
                app_id: item.id,
                name: item.name,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub query_summary: Option<ReviewQuerySummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuerySummary {
    #[serde(default)]
    pub total_positive: Option<u64>,
    #[serde(default)]
    pub total_negative: Option<u64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
}

impl From<ReviewQuerySummary> for ReviewSummary {
    fn from(summary: ReviewQuerySummary) -> Self {
        let positive_percentage = match (summary.total_positive, summary.total_negative) {
            (Some(positive), Some(negative)) if positive + negative > 0 => {
                Some(rounded_percentage(positive, positive + negative))
            }
            _ => None,
        };
        Self {
            positive_percentage,
            total_reviews: summary.total_reviews.filter(|total| *total > 0),
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up, in integer arithmetic.
fn rounded_percentage(part: u64, whole: u64) -> u8 {
    let percentage = (200 * part + whole) / (2 * whole);
    u8::try_from(percentage.min(100)).unwrap_or(100)
}

/// `appdetails` answers with an object keyed by the requested app id.
pub type AppDetailsResponse = HashMap<String, AppDetailsEnvelope>;

#[derive(Debug, Deserialize)]
pub struct AppDetailsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AppDetailsData>,
}

#[derive(Debug, Deserialize)]
pub struct AppDetailsData {
    #[serde(default)]
    pub genres: Option<Vec<Genre>>,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: Option<bool>,
    #[serde(default)]
    pub date: String,
}

impl From<AppDetailsData> for ReleaseInfo {
    fn from(data: AppDetailsData) -> Self {
        let is_early_access = data
            .genres
            .as_ref()
            .is_some_and(|genres| genres.iter().any(|genre| genre.id == EARLY_ACCESS_GENRE_ID));
        let (release_date, coming_soon) = match data.release_date {
            Some(release) => (
                Some(release.date).filter(|date| !date.is_empty()),
                release.coming_soon,
            ),
            None => (None, None),
        };
        Self {
            release_date,
            coming_soon,
            is_early_access: Some(is_early_access),
            genres: data.genres,
        }
    }
}
