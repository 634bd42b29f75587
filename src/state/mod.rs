mod session;
mod sse;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::AppConfig,
    dao::{
        document_store::{DocumentStore, StoreCredentials},
        storefront::MetadataSource,
    },
    services::update_coordinator::UpdateCoordinator,
};

pub use self::session::LibrarySession;
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 16;

/// Central application state: configuration, data sources and the live session.
pub struct AppState {
    config: AppConfig,
    coordinator: UpdateCoordinator,
    storefront: Arc<dyn MetadataSource>,
    credentials: RwLock<Option<StoreCredentials>>,
    session: LibrarySession,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// `credentials` must be the set already installed on `store`.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        storefront: Arc<dyn MetadataSource>,
        credentials: Option<StoreCredentials>,
    ) -> SharedState {
        let coordinator = UpdateCoordinator::new(store, config.retry.clone());
        Arc::new(Self {
            config,
            coordinator,
            storefront,
            credentials: RwLock::new(credentials),
            session: LibrarySession::new(SSE_CAPACITY),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Single write path to the remote document.
    pub fn coordinator(&self) -> &UpdateCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.coordinator.store()
    }

    pub fn storefront(&self) -> &Arc<dyn MetadataSource> {
        &self.storefront
    }

    /// Currently installed store credentials.
    pub async fn credentials(&self) -> Option<StoreCredentials> {
        self.credentials.read().await.clone()
    }

    /// Install new credentials on the store and remember them for the settings view.
    pub async fn install_credentials(&self, credentials: StoreCredentials) {
        self.store().set_credentials(Some(credentials.clone())).await;
        let mut guard = self.credentials.write().await;
        *guard = Some(credentials);
    }

    pub fn session(&self) -> &LibrarySession {
        &self.session
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.session.sse()
    }
}
