use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::dao::storefront::{
    MetadataSource, ReleaseInfo, ReviewSummary, StorefrontError, StorefrontHit, StorefrontResult,
};

use super::{
    config::SteamConfig,
    models::{AppDetailsResponse, ReviewsResponse, SearchResponse},
};

/// HTTP client for the public storefront endpoints.
#[derive(Clone)]
pub struct SteamStorefront {
    client: Client,
    store_base: Arc<str>,
    language: Arc<str>,
    country: Arc<str>,
}

impl SteamStorefront {
    /// Build the client with an explicit request timeout.
    pub fn new(config: SteamConfig) -> StorefrontResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| StorefrontError::ClientBuilder { source })?;

        Ok(Self {
            client,
            store_base: Arc::<str>::from(config.store_base.trim_end_matches('/')),
            language: Arc::<str>::from(config.language),
            country: Arc::<str>::from(config.country),
        })
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> StorefrontResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.store_base, path);
        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| StorefrontError::RequestSend {
                context: context.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(StorefrontError::RequestStatus {
                context: context.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| StorefrontError::DecodeResponse {
                context: context.to_string(),
                source,
            })
    }

    async fn fetch_search(&self, query: &str) -> StorefrontResult<Vec<StorefrontHit>> {
        let context = format!("search `{query}`");
        let response: SearchResponse = self
            .get_json(
                "api/storesearch/",
                &[
                    ("term", query),
                    ("l", self.language.as_ref()),
                    ("cc", self.country.as_ref()),
                ],
                &context,
            )
            .await?;
        let hits = response.into_hits();
        debug!(query, count = hits.len(), "storefront search finished");
        Ok(hits)
    }

    async fn fetch_reviews(&self, app_id: u64) -> StorefrontResult<ReviewSummary> {
        let context = format!("reviews {app_id}");
        let response: ReviewsResponse = self
            .get_json(
                &format!("appreviews/{app_id}"),
                &[
                    ("json", "1"),
                    ("language", "all"),
                    ("purchase_type", "all"),
                    ("num_per_page", "0"),
                ],
                &context,
            )
            .await?;

        match response.query_summary {
            Some(summary) => Ok(summary.into()),
            None => {
                warn!(app_id, "reviews response carried no query summary");
                Ok(ReviewSummary::default())
            }
        }
    }

    async fn fetch_release_info(&self, app_id: u64) -> StorefrontResult<ReleaseInfo> {
        let context = format!("appdetails {app_id}");
        let app_id_param = app_id.to_string();
        let mut response: AppDetailsResponse = self
            .get_json(
                "api/appdetails",
                &[
                    ("appids", app_id_param.as_str()),
                    ("l", self.language.as_ref()),
                    ("cc", self.country.as_ref()),
                ],
                &context,
            )
            .await?;

        match response.remove(&app_id_param) {
            Some(envelope) if envelope.success => Ok(envelope
                .data
                .map(ReleaseInfo::from)
                .unwrap_or_default()),
            _ => {
                warn!(app_id, "storefront reported app details as unsuccessful");
                Ok(ReleaseInfo::default())
            }
        }
    }
}

impl MetadataSource for SteamStorefront {
    fn reviews(&self, app_id: u64) -> BoxFuture<'static, ReviewSummary> {
        let storefront = self.clone();
        Box::pin(async move {
            storefront
                .fetch_reviews(app_id)
                .await
                .unwrap_or_else(|err| {
                    warn!(app_id, error = %err, "review lookup failed");
                    ReviewSummary::default()
                })
        })
    }

    fn release_info(&self, app_id: u64) -> BoxFuture<'static, ReleaseInfo> {
        let storefront = self.clone();
        Box::pin(async move {
            storefront
                .fetch_release_info(app_id)
                .await
                .unwrap_or_else(|err| {
                    warn!(app_id, error = %err, "release info lookup failed");
                    ReleaseInfo::default()
                })
        })
    }

    fn search(&self, query: String) -> BoxFuture<'static, StorefrontResult<Vec<StorefrontHit>>> {
        let storefront = self.clone();
        Box::pin(async move {
            let query = query.trim();
            if query.is_empty() {
                return Ok(Vec::new());
            }
            storefront.fetch_search(query).await
        })
    }
}
