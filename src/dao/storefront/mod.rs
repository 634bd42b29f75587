pub mod steam;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::models::{Genre, StorefrontMetadata};

/// Result alias for storefront operations that surface failures.
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// Failures raised by the storefront search. Metadata lookups never return
/// them; they degrade to absent values instead.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Building the HTTP client failed.
    #[error("failed to build storefront client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send storefront request for {context}")]
    RequestSend {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    /// The storefront answered with an unexpected status code.
    #[error("unexpected storefront status {status} for {context}")]
    RequestStatus {
        context: String,
        status: reqwest::StatusCode,
    },
    /// Response payload could not be parsed.
    #[error("failed to decode storefront response for {context}")]
    DecodeResponse {
        context: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Aggregate review score for one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub positive_percentage: Option<u8>,
    pub total_reviews: Option<u64>,
}

/// Release information for one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub is_early_access: Option<bool>,
    pub genres: Option<Vec<Genre>>,
}

/// Combine a review summary and release info into record metadata.
pub fn metadata_from(reviews: &ReviewSummary, release: &ReleaseInfo) -> StorefrontMetadata {
    StorefrontMetadata {
        positive_percentage: reviews.positive_percentage,
        total_reviews: reviews.total_reviews,
        release_date: release.release_date.clone(),
        coming_soon: release.coming_soon,
        is_early_access: release.is_early_access,
        genres: release.genres.clone(),
    }
}

/// Candidate returned by a storefront search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontHit {
    pub app_id: u64,
    pub name: String,
    /// Canonical detail-page URL.
    pub steam_url: String,
    /// Thumbnail image URL.
    pub cover_image: String,
}

/// Third-party source of review scores, release data and search results.
pub trait MetadataSource: Send + Sync {
    /// Review aggregate; all-absent when the lookup fails.
    fn reviews(&self, app_id: u64) -> BoxFuture<'static, ReviewSummary>;
    /// Release data; all-absent when the lookup fails.
    fn release_info(&self, app_id: u64) -> BoxFuture<'static, ReleaseInfo>;
    /// Up to ten matches for a free-text query. A blank query yields no
    /// matches without contacting the storefront.
    fn search(&self, query: String) -> BoxFuture<'static, StorefrontResult<Vec<StorefrontHit>>>;
}
