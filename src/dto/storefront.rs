use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::storefront::StorefrontHit;

/// Storefront search match offered for import.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontHitView {
    pub app_id: u64,
    pub name: String,
    pub steam_url: String,
    pub cover_image: String,
}

impl From<StorefrontHit> for StorefrontHitView {
    fn from(hit: StorefrontHit) -> Self {
        Self {
            app_id: hit.app_id,
            name: hit.name,
            steam_url: hit.steam_url,
            cover_image: hit.cover_image,
        }
    }
}
