//! Test doubles shared by the service tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;

use crate::{
    config::{AppConfig, StoreBackend},
    dao::{
        document_store::memory::InMemoryDocumentStore,
        storefront::{
            MetadataSource, ReleaseInfo, ReviewSummary, StorefrontHit, StorefrontResult,
        },
    },
    services::update_coordinator::RetryPolicy,
    state::{AppState, SharedState},
};

type ReviewHook = Box<dyn Fn(u64) + Send + Sync>;

/// Scripted [`MetadataSource`]; unknown ids yield all-absent data.
#[derive(Clone, Default)]
pub struct FakeMetadataSource {
    reviews: Arc<Mutex<HashMap<u64, ReviewSummary>>>,
    releases: Arc<Mutex<HashMap<u64, ReleaseInfo>>>,
    hits: Arc<Mutex<Vec<StorefrontHit>>>,
    review_calls: Arc<Mutex<Vec<u64>>>,
    release_calls: Arc<AtomicUsize>,
    on_reviews: Arc<Mutex<Option<ReviewHook>>>,
}

impl FakeMetadataSource {
    pub fn with_reviews(self, app_id: u64, summary: ReviewSummary) -> Self {
        self.reviews.lock().unwrap().insert(app_id, summary);
        self
    }

    pub fn with_release(self, app_id: u64, release: ReleaseInfo) -> Self {
        self.releases.lock().unwrap().insert(app_id, release);
        self
    }

    pub fn with_hits(self, hits: Vec<StorefrontHit>) -> Self {
        *self.hits.lock().unwrap() = hits;
        self
    }

    /// App ids passed to `reviews`, in call order.
    pub fn review_calls(&self) -> Arc<Mutex<Vec<u64>>> {
        self.review_calls.clone()
    }

    pub fn release_call_count(&self) -> Arc<AtomicUsize> {
        self.release_calls.clone()
    }

    /// Run `hook` whenever reviews are requested.
    pub fn on_reviews(&self, hook: impl Fn(u64) + Send + Sync + 'static) {
        *self.on_reviews.lock().unwrap() = Some(Box::new(hook));
    }
}

impl MetadataSource for FakeMetadataSource {
    fn reviews(&self, app_id: u64) -> BoxFuture<'static, ReviewSummary> {
        self.review_calls.lock().unwrap().push(app_id);
        if let Some(hook) = self.on_reviews.lock().unwrap().as_ref() {
            hook(app_id);
        }
        let summary = self
            .reviews
            .lock()
            .unwrap()
            .get(&app_id)
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { summary })
    }

    fn release_info(&self, app_id: u64) -> BoxFuture<'static, ReleaseInfo> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let release = self
            .releases
            .lock()
            .unwrap()
            .get(&app_id)
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { release })
    }

    fn search(&self, query: String) -> BoxFuture<'static, StorefrontResult<Vec<StorefrontHit>>> {
        let needle = query.trim().to_lowercase();
        let hits = if needle.is_empty() {
            Vec::new()
        } else {
            self.hits
                .lock()
                .unwrap()
                .iter()
                .filter(|hit| hit.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };
        Box::pin(async move { Ok(hits) })
    }
}

/// Application state over `store` with immediate retries.
pub fn test_state(store: &InMemoryDocumentStore, source: FakeMetadataSource) -> SharedState {
    let config = AppConfig {
        backend: StoreBackend::Memory,
        retry: RetryPolicy::immediate(3),
        ..AppConfig::default()
    };
    AppState::new(config, Arc::new(store.clone()), Arc::new(source), None)
}
