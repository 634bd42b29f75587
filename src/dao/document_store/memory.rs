//! Volatile document store used for local development and tests.
//!
//! The document is kept in its serialized form so reads go through the same
//! ingestion path as the remote adapter.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;

use crate::dao::{
    document_store::{DocumentStore, StoreCredentials},
    models::{GameCollectionDocument, GameRecord, RemoteDocumentHandle, VersionMarker},
    storage::{StoreError, StoreResult},
};

const MEMORY_PATH: &str = "memory://games.json";

type ForeignCommit = Box<dyn Fn(&mut Vec<GameRecord>) + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    body: Option<String>,
    revision: u64,
    reads: usize,
    writes: usize,
    conflicts: usize,
    messages: Vec<String>,
    pending_foreign: usize,
    foreign_commit: Option<ForeignCommit>,
}

impl MemoryState {
    fn marker(&self) -> Option<VersionMarker> {
        self.body
            .as_ref()
            .map(|_| VersionMarker::new(format!("mem-{}", self.revision)))
    }

    fn store_document(&mut self, document: &GameCollectionDocument) -> StoreResult<VersionMarker> {
        let body = document
            .to_pretty_json()
            .map_err(|source| StoreError::transport("failed to serialize document".into(), source))?;
        self.body = Some(body);
        self.revision += 1;
        Ok(VersionMarker::new(format!("mem-{}", self.revision)))
    }

    fn parse(&self) -> StoreResult<Option<RemoteDocumentHandle>> {
        let Some(body) = self.body.as_ref() else {
            return Ok(None);
        };
        let ingested = GameCollectionDocument::ingest(body.as_bytes())
            .map_err(|source| StoreError::transport("failed to parse document".into(), source))?;
        Ok(Some(RemoteDocumentHandle {
            content: ingested.document,
            version_marker: self.marker(),
            legacy_status_ids: ingested.legacy_status_ids,
        }))
    }

    /// Commit on behalf of another client right before one of our writes lands.
    fn run_foreign_commit(&mut self) -> StoreResult<()> {
        if self.pending_foreign == 0 {
            return Ok(());
        }
        let Some(mut handle) = self.parse()? else {
            return Ok(());
        };
        if let Some(commit) = self.foreign_commit.as_ref() {
            commit(&mut handle.content.games);
        }
        self.pending_foreign -= 1;
        self.store_document(&handle.content)?;
        Ok(())
    }
}

/// In-process [`DocumentStore`] with revision counting.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDocumentStore {
    /// Empty store: the first read reports a missing document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `document`.
    pub fn with_document(document: GameCollectionDocument) -> StoreResult<Self> {
        let store = Self::new();
        store.lock().store_document(&document)?;
        Ok(store)
    }

    /// Store pre-populated with raw JSON, bypassing serialization. Useful to
    /// seed documents written by older releases.
    pub fn with_raw(body: impl Into<String>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.body = Some(body.into());
            state.revision = 1;
        }
        store
    }

    /// Let another client commit `commit` right before each of our next
    /// `count` writes, forcing them to observe a stale marker.
    pub fn inject_foreign_commits<F>(&self, count: usize, commit: F)
    where
        F: Fn(&mut Vec<GameRecord>) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.pending_foreign = count;
        state.foreign_commit = Some(Box::new(commit));
    }

    /// Apply a commit immediately, as another client would.
    pub fn commit_foreign<F>(&self, commit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Vec<GameRecord>),
    {
        let mut state = self.lock();
        let mut handle = state.parse()?.unwrap_or_else(RemoteDocumentHandle::first_run);
        commit(&mut handle.content.games);
        state.store_document(&handle.content)?;
        Ok(())
    }

    /// Current records, or an empty list when nothing was written yet.
    pub fn games(&self) -> Vec<GameRecord> {
        self.lock()
            .parse()
            .ok()
            .flatten()
            .map(|handle| handle.content.games)
            .unwrap_or_default()
    }

    /// Raw serialized document.
    pub fn raw(&self) -> Option<String> {
        self.lock().body.clone()
    }

    /// Number of read calls served.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Number of successful writes issued through [`DocumentStore::write`].
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Number of writes rejected with a version conflict.
    pub fn conflicts(&self) -> usize {
        self.lock().conflicts
    }

    /// Change descriptions of successful writes, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // The state is only mutated in short critical sections that cannot
        // leave it half-updated, so a poisoned lock is still usable.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self) -> BoxFuture<'static, StoreResult<RemoteDocumentHandle>> {
        let store = self.clone();
        Box::pin(async move {
            let handle = {
                let mut state = store.lock();
                state.reads += 1;
                state.parse()?
            };
            // Give concurrently started updates a chance to read the same marker.
            tokio::task::yield_now().await;
            handle.ok_or_else(|| StoreError::NotFound {
                path: MEMORY_PATH.to_string(),
            })
        })
    }

    fn write(
        &self,
        content: GameCollectionDocument,
        expected: Option<VersionMarker>,
        change_description: String,
    ) -> BoxFuture<'static, StoreResult<VersionMarker>> {
        let store = self.clone();
        Box::pin(async move {
            let mut state = store.lock();
            state.run_foreign_commit()?;
            if state.marker() != expected {
                state.conflicts += 1;
                return Err(StoreError::VersionConflict {
                    path: MEMORY_PATH.to_string(),
                });
            }
            let marker = state.store_document(&content)?;
            state.writes += 1;
            state.messages.push(change_description);
            Ok(marker)
        })
    }

    fn test_connection(&self) -> BoxFuture<'static, StoreResult<bool>> {
        Box::pin(async { Ok(true) })
    }

    /// No-op: the in-process document needs no credentials.
    fn set_credentials(&self, _credentials: Option<StoreCredentials>) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    /// Always configured, with or without credentials.
    fn is_configured(&self) -> BoxFuture<'static, bool> {
        Box::pin(async { true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_reports_not_found() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(store.read().await, Err(StoreError::NotFound { .. })));
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn stale_marker_is_rejected() {
        let store = InMemoryDocumentStore::with_document(GameCollectionDocument::default()).unwrap();
        let handle = store.read().await.unwrap();
        store.commit_foreign(|_| {}).unwrap();

        let result = store
            .write(
                GameCollectionDocument::default(),
                handle.version_marker,
                "stale".into(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(store.conflicts(), 1);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn create_fails_once_the_document_exists() {
        let store = InMemoryDocumentStore::with_document(GameCollectionDocument::default()).unwrap();
        let result = store
            .write(GameCollectionDocument::default(), None, "create".into())
            .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn credentials_do_not_affect_the_store() {
        let store = InMemoryDocumentStore::new();
        assert!(store.is_configured().await);

        store.set_credentials(None).await;

        assert!(store.is_configured().await);
        assert!(store.test_connection().await.unwrap());
    }
}
