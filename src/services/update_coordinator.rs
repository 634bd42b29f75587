//! Compare-and-swap update loop over the whole collection document.
//!
//! Every mutation of the remote list goes through [`UpdateCoordinator::update`]:
//! fetch the latest document, run a pure transform over its records, and write
//! the result conditioned on the fetched version marker. A stale marker
//! restarts the cycle against freshly fetched state.

use std::{sync::Arc, time::Duration};

use rand::{Rng, rng};
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::dao::{
    document_store::DocumentStore,
    models::{GameCollectionDocument, GameRecord, RemoteDocumentHandle},
    storage::{StoreError, StoreResult},
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(200);
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(2);
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Reasons a transform refuses to produce a new list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A record with the same name (case-insensitive) already exists.
    #[error("a game named `{name}` already exists")]
    DuplicateEntry { name: String },
    /// The record targeted by the transform is gone from the remote list.
    #[error("game `{id}` no longer exists")]
    MissingRecord { id: String },
}

/// Failures surfaced by [`UpdateCoordinator::update`].
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Reading or writing the document failed for a reason other than a conflict.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The transform aborted the update; nothing was written.
    #[error(transparent)]
    Rejected(#[from] TransformError),
    /// Every attempt lost the race against another writer.
    #[error("update abandoned after {attempts} conflicting attempts")]
    ConcurrencyExhausted { attempts: u32 },
    /// The whole update, retries included, exceeded its time budget.
    #[error("update did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Attempt ceiling and pacing of conflicted retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// First backoff; doubled after every further conflict.
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Time budget for one update including retries, checked before every
    /// read and every backoff pause. A write already sent is always awaited.
    /// `None` disables it.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            deadline: Some(DEFAULT_DEADLINE),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, without backoff or deadline.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            deadline: None,
        }
    }

    /// Pause before the attempt following `attempt` conflicted ones.
    fn backoff(&self, attempt: u32) -> Duration {
        if self.backoff_base.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self
            .backoff_base
            .saturating_mul(1 << exponent)
            .min(self.backoff_max);
        let jitter_cap = u64::try_from(self.backoff_base.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rng().random_range(0..=jitter_cap));
        exponential + jitter
    }
}

/// Single serialization point for writes to the collection document.
///
/// There is no client-side lock: concurrent calls race at the store and the
/// loser retries with the winner's result.
#[derive(Clone)]
pub struct UpdateCoordinator {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl UpdateCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Backing store, for operations that do not mutate the document.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Read the current document; a missing file reads as an empty first-run
    /// document without a marker.
    pub async fn fetch(&self) -> StoreResult<RemoteDocumentHandle> {
        match self.store.read().await {
            Ok(handle) => Ok(handle),
            Err(StoreError::NotFound { path }) => {
                info!(%path, "collection document missing; starting from an empty list");
                Ok(RemoteDocumentHandle::first_run())
            }
            Err(err) => Err(err),
        }
    }

    /// Apply `transform` to the latest remote list and commit the result.
    ///
    /// The transform may run once per attempt and must be free of side effects.
    /// On success the committed list is returned verbatim.
    pub async fn update<F>(
        &self,
        change_description: &str,
        transform: F,
    ) -> Result<Vec<GameRecord>, UpdateError>
    where
        F: Fn(&[GameRecord]) -> Result<Vec<GameRecord>, TransformError>,
    {
        let deadline = self.policy.deadline.map(|limit| Deadline {
            at: Instant::now() + limit,
            limit,
        });

        for attempt in 1..=self.policy.max_attempts {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline.at
            {
                return Err(deadline.exceeded(change_description));
            }

            let handle = self.fetch().await?;
            let candidate = transform(&handle.content.games)?;

            if candidate == handle.content.games && !handle.needs_rewrite() {
                debug!(change = change_description, "transform left the list unchanged; skipping write");
                return Ok(candidate);
            }

            let document = GameCollectionDocument::new(candidate.clone());
            match self
                .store
                .write(
                    document,
                    handle.version_marker,
                    change_description.to_string(),
                )
                .await
            {
                Ok(marker) => {
                    debug!(change = change_description, attempt, %marker, "committed collection document");
                    return Ok(candidate);
                }
                Err(err) if err.is_conflict() => {
                    warn!(change = change_description, attempt, "version conflict; retrying with fresh state");
                    if attempt < self.policy.max_attempts {
                        let pause = self.policy.backoff(attempt);
                        if let Some(deadline) = deadline
                            && Instant::now() + pause >= deadline.at
                        {
                            return Err(deadline.exceeded(change_description));
                        }
                        if !pause.is_zero() {
                            sleep(pause).await;
                        }
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(UpdateError::ConcurrencyExhausted {
            attempts: self.policy.max_attempts,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    fn exceeded(self, change_description: &str) -> UpdateError {
        warn!(change = change_description, limit = ?self.limit, "update deadline exceeded");
        UpdateError::DeadlineExceeded(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use time::OffsetDateTime;

    use super::*;
    use crate::dao::{
        document_store::{StoreCredentials, memory::InMemoryDocumentStore},
        models::VersionMarker,
    };

    fn record(id: &str, name: &str) -> GameRecord {
        GameRecord::new_queued(id.into(), name.into(), OffsetDateTime::UNIX_EPOCH)
    }

    fn append(game: GameRecord) -> impl Fn(&[GameRecord]) -> Result<Vec<GameRecord>, TransformError> {
        move |games| {
            let mut next = games.to_vec();
            next.push(game.clone());
            Ok(next)
        }
    }

    fn add_unique(game: GameRecord) -> impl Fn(&[GameRecord]) -> Result<Vec<GameRecord>, TransformError> {
        move |games| {
            if games.iter().any(|existing| existing.has_name(&game.name)) {
                return Err(TransformError::DuplicateEntry {
                    name: game.name.clone(),
                });
            }
            let mut next = vec![game.clone()];
            next.extend_from_slice(games);
            Ok(next)
        }
    }

    fn coordinator(store: &InMemoryDocumentStore) -> UpdateCoordinator {
        UpdateCoordinator::new(Arc::new(store.clone()), RetryPolicy::immediate(3))
    }

    fn seeded(games: Vec<GameRecord>) -> InMemoryDocumentStore {
        InMemoryDocumentStore::with_document(GameCollectionDocument::new(games)).unwrap()
    }

    fn names(games: &[GameRecord]) -> Vec<&str> {
        games.iter().map(|game| game.name.as_str()).collect()
    }

    #[tokio::test]
    async fn transform_sees_interleaved_commits() {
        let store = seeded(vec![record("1", "Hades")]);
        let counter = std::sync::atomic::AtomicUsize::new(0);
        store.inject_foreign_commits(2, move |games| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            games.push(record(&format!("foreign-{n}"), &format!("Foreign {n}")));
        });

        let result = coordinator(&store)
            .update("Add Celeste", append(record("2", "Celeste")))
            .await
            .unwrap();

        assert_eq!(
            names(&result),
            vec!["Hades", "Foreign 0", "Foreign 1", "Celeste"]
        );
        assert_eq!(store.games(), result);
        assert_eq!(store.reads(), 3);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn conflicts_beyond_the_ceiling_exhaust_the_update() {
        let store = seeded(vec![record("1", "Hades")]);
        store.inject_foreign_commits(usize::MAX, |_| {});

        let err = coordinator(&store)
            .update("Add Celeste", append(record("2", "Celeste")))
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::ConcurrencyExhausted { attempts: 3 }));
        assert_eq!(store.reads(), 3);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn racing_appends_both_land() {
        let store = seeded(Vec::new());
        let coordinator = coordinator(&store);

        let (first, second) = tokio::join!(
            coordinator.update("Add X", append(record("x", "X"))),
            coordinator.update("Add Y", append(record("y", "Y"))),
        );

        first.unwrap();
        second.unwrap();
        let mut stored = names(&store.games())
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        stored.sort();
        assert_eq!(stored, vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(store.conflicts(), 1);
    }

    #[tokio::test]
    async fn racing_duplicate_adds_commit_once() {
        let store = seeded(Vec::new());
        let coordinator = coordinator(&store);

        let (first, second) = tokio::join!(
            coordinator.update("Add Hades", add_unique(record("a", "Hades"))),
            coordinator.update("Add hades", add_unique(record("b", "hades"))),
        );

        let results = [first, second];
        let committed = results.iter().filter(|result| result.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|result| {
                matches!(
                    result,
                    Err(UpdateError::Rejected(TransformError::DuplicateEntry { .. }))
                )
            })
            .count();
        assert_eq!((committed, rejected), (1, 1));
        assert_eq!(store.games().len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn rejected_transform_writes_nothing() {
        let store = seeded(vec![record("1", "Hades")]);
        let err = coordinator(&store)
            .update("Add HADES", add_unique(record("2", "HADES")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Rejected(TransformError::DuplicateEntry { .. })
        ));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn missing_document_is_created_on_first_write() {
        let store = InMemoryDocumentStore::new();
        let result = coordinator(&store)
            .update("Add Hades", append(record("1", "Hades")))
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["Hades"]);
        assert_eq!(store.games(), result);
    }

    #[tokio::test]
    async fn unchanged_list_is_not_written() {
        let store = seeded(vec![record("1", "Hades")]);
        let result = coordinator(&store)
            .update("Noop", |games| Ok(games.to_vec()))
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["Hades"]);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(300),
            deadline: None,
        };
        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        let fourth = policy.backoff(4);
        assert!(fourth >= Duration::from_millis(300) && fourth <= Duration::from_millis(350));
        assert_eq!(RetryPolicy::immediate(3).backoff(2), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_a_stalled_update() {
        let store = seeded(Vec::new());
        store.inject_foreign_commits(usize::MAX, |_| {});
        let policy = RetryPolicy {
            max_attempts: 1_000,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(1),
            deadline: Some(Duration::from_secs(5)),
        };
        let coordinator = UpdateCoordinator::new(Arc::new(store.clone()), policy);

        let err = coordinator
            .update("Add Hades", append(record("1", "Hades")))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::DeadlineExceeded(_)));
    }

    /// Store whose writes take `delay` before reaching the inner store.
    struct SlowWrites {
        inner: InMemoryDocumentStore,
        delay: Duration,
    }

    impl DocumentStore for SlowWrites {
        fn read(&self) -> BoxFuture<'static, StoreResult<RemoteDocumentHandle>> {
            self.inner.read()
        }

        fn write(
            &self,
            content: GameCollectionDocument,
            expected: Option<VersionMarker>,
            change_description: String,
        ) -> BoxFuture<'static, StoreResult<VersionMarker>> {
            let write = self.inner.write(content, expected, change_description);
            let delay = self.delay;
            Box::pin(async move {
                sleep(delay).await;
                write.await
            })
        }

        fn test_connection(&self) -> BoxFuture<'static, StoreResult<bool>> {
            self.inner.test_connection()
        }

        fn set_credentials(&self, credentials: Option<StoreCredentials>) -> BoxFuture<'static, ()> {
            self.inner.set_credentials(credentials)
        }

        fn is_configured(&self) -> BoxFuture<'static, bool> {
            self.inner.is_configured()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn write_in_flight_is_not_cut_off_by_the_deadline() {
        let store = seeded(Vec::new());
        let slow = SlowWrites {
            inner: store.clone(),
            delay: Duration::from_secs(5),
        };
        let policy = RetryPolicy {
            deadline: Some(Duration::from_secs(1)),
            ..RetryPolicy::immediate(3)
        };
        let coordinator = UpdateCoordinator::new(Arc::new(slow), policy);

        let result = coordinator
            .update("Add Hades", append(record("1", "Hades")))
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["Hades"]);
        assert_eq!(store.games(), result);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_checked_before_the_next_read() {
        let store = seeded(Vec::new());
        store.inject_foreign_commits(1, |_| {});
        let slow = SlowWrites {
            inner: store.clone(),
            delay: Duration::from_secs(5),
        };
        let policy = RetryPolicy {
            deadline: Some(Duration::from_secs(1)),
            ..RetryPolicy::immediate(3)
        };
        let coordinator = UpdateCoordinator::new(Arc::new(slow), policy);

        let err = coordinator
            .update("Add Hades", append(record("1", "Hades")))
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::DeadlineExceeded(_)));
        assert_eq!(store.reads(), 1);
        assert_eq!(store.conflicts(), 1);
    }
}
