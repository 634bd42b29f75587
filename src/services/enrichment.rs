//! Background refresh of storefront metadata.
//!
//! A sweep walks a snapshot of the session list, fetches fresh review and
//! release data per item, applies each change locally as it arrives and
//! commits everything in one coordinator update at the end.

use std::{sync::Arc, time::Duration};

use indexmap::IndexMap;
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior, interval_at, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{GameRecord, StorefrontMetadata},
        storefront::{MetadataSource, ReleaseInfo, metadata_from},
    },
    services::{sse_events, update_coordinator::UpdateError},
    state::SharedState,
};

/// Change description of the single commit closing a sweep.
pub const REFRESH_COMMIT_MESSAGE: &str = "Update games info after refresh";

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_ITEM_PAUSE: Duration = Duration::from_secs(1);

/// Timer settings of the scheduler.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    /// Delay before the first, prioritized sweep.
    pub initial_delay: Duration,
    /// Period of the routine sweeps that follow.
    pub interval: Duration,
    /// Pause between two visited items, for the storefront's rate limits.
    pub item_pause: Duration,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_INTERVAL,
            item_pause: DEFAULT_ITEM_PAUSE,
        }
    }
}

/// What one sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Items carrying a storefront id that were looked up.
    pub visited: usize,
    /// Items whose metadata changed.
    pub changed: usize,
    /// Whether the sweep ended with a successful remote commit.
    pub committed: bool,
    /// The session closed mid-sweep and the results were dropped.
    pub interrupted: bool,
}

/// Drive sweeps until the session closes: one prioritized sweep after the
/// initial delay, then routine sweeps on the configured interval.
///
/// Nothing is scheduled before the first successful load, so the first sweep
/// never runs against an empty list.
///
/// Closing the session cancels pending timers; a sweep in flight finishes its
/// current lookup and discards the result.
pub async fn run(state: SharedState) {
    let schedule = state.config().refresh.clone();
    let mut active = state.session().watch_active();
    let mut loaded = state.session().watch_loaded();

    let first_load = async {
        let _ = loaded.wait_for(|loaded| *loaded).await;
    };
    if !wait_unless_closed(&mut active, first_load).await {
        return;
    }
    debug!("library loaded; scheduling the first metadata refresh");

    if !wait_unless_closed(&mut active, sleep(schedule.initial_delay)).await {
        return;
    }

    let mut ticker = interval_at(Instant::now() + schedule.interval, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut prioritized = true;

    loop {
        let outcome = sweep(&state, prioritized).await;
        info!(
            prioritized,
            visited = outcome.visited,
            changed = outcome.changed,
            committed = outcome.committed,
            "metadata refresh finished"
        );
        prioritized = false;

        if !wait_unless_closed(&mut active, ticker.tick()).await {
            break;
        }
    }

    info!("metadata refresh scheduler stopped");
}

/// Visit every item of the session list once.
///
/// Items missing review data go first. Release data is fetched for every item
/// on a prioritized sweep; on routine sweeps only when it is missing or the
/// item is still flagged early access.
pub async fn sweep(state: &SharedState, prioritized: bool) -> SweepOutcome {
    let session = state.session();
    let mut outcome = SweepOutcome::default();

    let mut items = session.games().await;
    items.sort_by_key(|game| !game.is_missing_reviews());

    let pause = state.config().refresh.item_pause;
    let mut active = session.watch_active();
    let mut changes: IndexMap<String, StorefrontMetadata> = IndexMap::new();
    let mut previous: IndexMap<String, StorefrontMetadata> = IndexMap::new();

    for game in &items {
        let Some(app_id) = game.storefront_app_id() else {
            continue;
        };
        if outcome.visited > 0 && !wait_unless_closed(&mut active, sleep(pause)).await {
            outcome.interrupted = true;
            break;
        }
        outcome.visited += 1;

        let needs_release =
            prioritized || game.release_date.is_none() || game.is_early_access != Some(false);
        let fresh = fetch_metadata(state.storefront(), app_id, needs_release).await;

        let current = game.metadata();
        let merged = current.merged_with(&fresh);
        if merged == current {
            continue;
        }

        let mut before = None;
        let applied = session
            .apply_local(&game.id, |record| {
                before = Some(record.metadata());
                record.apply_metadata(&merged);
            })
            .await;
        match (applied, before) {
            (Some(updated), Some(before)) => {
                debug!(id = %game.id, name = %game.name, app_id, "refreshed game metadata");
                sse_events::broadcast_game_enriched(session.sse(), &updated);
                outcome.changed += 1;
                changes.insert(game.id.clone(), fresh);
                previous.insert(game.id.clone(), before);
            }
            _ if !session.is_active() => {
                outcome.interrupted = true;
                break;
            }
            _ => debug!(id = %game.id, "game removed during refresh; skipping"),
        }
    }

    if outcome.interrupted || !session.is_active() {
        outcome.interrupted = true;
        info!("session closed during refresh; discarding results");
        return outcome;
    }
    if changes.is_empty() {
        return outcome;
    }

    outcome.committed = commit_changes(state, &changes, &previous, REFRESH_COMMIT_MESSAGE)
        .await
        .is_ok();
    outcome
}

/// Refresh one freshly added game right away instead of waiting for a sweep.
pub async fn enrich_one(state: &SharedState, id: &str) -> Option<GameRecord> {
    let session = state.session();
    let game = session
        .read(|games| games.iter().find(|game| game.id == id).cloned())
        .await?;
    let app_id = game.storefront_app_id()?;

    let fresh = fetch_metadata(state.storefront(), app_id, true).await;
    let current = game.metadata();
    let merged = current.merged_with(&fresh);
    if merged == current {
        debug!(id, app_id, "storefront returned nothing new");
        return None;
    }

    let mut before = None;
    let updated = session
        .apply_local(id, |record| {
            before = Some(record.metadata());
            record.apply_metadata(&merged);
        })
        .await?;
    sse_events::broadcast_game_enriched(session.sse(), &updated);

    let changes = IndexMap::from([(game.id.clone(), fresh)]);
    let previous = IndexMap::from([(game.id.clone(), before.unwrap_or_default())]);
    let message = format!("Update game via web: {}", game.name);
    commit_changes(state, &changes, &previous, &message).await.ok()?;
    Some(updated)
}

/// Fetch review data, plus release data when asked, concurrently.
async fn fetch_metadata(
    source: &Arc<dyn MetadataSource>,
    app_id: u64,
    needs_release: bool,
) -> StorefrontMetadata {
    let reviews = source.reviews(app_id);
    let (reviews, release) = if needs_release {
        tokio::join!(reviews, source.release_info(app_id))
    } else {
        (reviews.await, ReleaseInfo::default())
    };
    metadata_from(&reviews, &release)
}

/// Merge fetched metadata onto the then-current remote list, matched by id.
///
/// Records deleted remotely in the meantime stay deleted. When the commit
/// fails the local records get their `previous` metadata back, so the next
/// sweep sees them as stale again.
async fn commit_changes(
    state: &SharedState,
    changes: &IndexMap<String, StorefrontMetadata>,
    previous: &IndexMap<String, StorefrontMetadata>,
    message: &str,
) -> Result<(), UpdateError> {
    let result = state
        .coordinator()
        .update(message, |remote| {
            Ok(remote
                .iter()
                .cloned()
                .map(|mut game| {
                    if let Some(fresh) = changes.get(&game.id) {
                        let merged = game.metadata().merged_with(fresh);
                        game.apply_metadata(&merged);
                    }
                    game
                })
                .collect())
        })
        .await;

    match result {
        Ok(games) => {
            state.session().replace(games).await;
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, change = message, "failed to save refreshed metadata; restoring local state");
            restore_local(state, previous).await;
            Err(err)
        }
    }
}

async fn restore_local(state: &SharedState, previous: &IndexMap<String, StorefrontMetadata>) {
    let session = state.session();
    for (id, metadata) in previous {
        session
            .apply_local(id, |record| record.apply_metadata(metadata))
            .await;
    }
    if session.is_active() {
        let games = session.games().await;
        sse_events::broadcast_games_updated(session.sse(), &games);
    }
}

/// Await `timer` unless the session closes first. Returns whether the session
/// is still active.
async fn wait_unless_closed<F>(active: &mut watch::Receiver<bool>, timer: F) -> bool
where
    F: Future,
{
    if !*active.borrow() {
        return false;
    }
    tokio::select! {
        _ = timer => {}
        // The guard returned by `wait_for` must not outlive this branch.
        _ = async {
            let _ = active.wait_for(|is_active| !*is_active).await;
        } => {}
    }
    *active.borrow()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use time::{Duration as TimeDuration, OffsetDateTime};

    use super::*;
    use crate::{
        dao::{
            document_store::memory::InMemoryDocumentStore,
            models::{GameCollectionDocument, Genre},
            storefront::ReviewSummary,
        },
        services::{
            library_service,
            test_support::{FakeMetadataSource, test_state},
            update_coordinator::DEFAULT_MAX_ATTEMPTS,
        },
    };

    const HADES: u64 = 1145360;
    const CELESTE: u64 = 504230;

    fn steam_game(id: &str, name: &str, app_id: u64) -> GameRecord {
        let mut game =
            GameRecord::new_queued(id.into(), name.into(), OffsetDateTime::UNIX_EPOCH);
        game.steam_url = Some(format!("https://store.steampowered.com/app/{app_id}"));
        game
    }

    fn released(mut game: GameRecord, percentage: u8) -> GameRecord {
        game.positive_percentage = Some(percentage);
        game.total_reviews = Some(100);
        game.release_date = Some("17 Sep, 2020".into());
        game.coming_soon = Some(false);
        game.is_early_access = Some(false);
        game
    }

    fn reviews(percentage: u8, total: u64) -> ReviewSummary {
        ReviewSummary {
            positive_percentage: Some(percentage),
            total_reviews: Some(total),
        }
    }

    fn release(date: &str, early_access: bool) -> ReleaseInfo {
        ReleaseInfo {
            release_date: Some(date.into()),
            coming_soon: Some(false),
            is_early_access: Some(early_access),
            genres: None,
        }
    }

    async fn loaded(games: Vec<GameRecord>, source: FakeMetadataSource) -> (SharedState, InMemoryDocumentStore) {
        let store =
            InMemoryDocumentStore::with_document(GameCollectionDocument::new(games.clone())).unwrap();
        let state = test_state(&store, source);
        state.session().replace(games).await;
        state.session().mark_loaded();
        (state, store)
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_commits_once_and_keeps_last_updated() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_release(HADES, release("17 Sep, 2020", false))
            .with_reviews(CELESTE, reviews(97, 80_000));
        let (state, store) = loaded(
            vec![steam_game("1", "Hades", HADES), steam_game("2", "Celeste", CELESTE)],
            source,
        )
        .await;

        let outcome = sweep(&state, true).await;

        assert_eq!(outcome.visited, 2);
        assert_eq!(outcome.changed, 2);
        assert!(outcome.committed);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.messages(), vec![REFRESH_COMMIT_MESSAGE.to_string()]);

        let remote = store.games();
        assert_eq!(remote[0].positive_percentage, Some(90));
        assert_eq!(remote[0].is_early_access, Some(false));
        assert_eq!(remote[0].last_updated, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(remote[1].total_reviews, Some(80_000));
        assert_eq!(state.session().games().await, remote);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_sweep_writes_nothing() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_release(HADES, release("17 Sep, 2020", false));
        let (state, store) = loaded(vec![released(steam_game("1", "Hades", HADES), 90)], source).await;

        let outcome = sweep(&state, true).await;

        assert_eq!(outcome.visited, 1);
        assert_eq!(outcome.changed, 0);
        assert!(!outcome.committed);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_deletion_is_not_resurrected() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_reviews(CELESTE, reviews(97, 80_000));
        let (state, store) = loaded(
            vec![steam_game("1", "Hades", HADES), steam_game("2", "Celeste", CELESTE)],
            source,
        )
        .await;
        store
            .commit_foreign(|games| games.retain(|game| game.id != "2"))
            .unwrap();

        let outcome = sweep(&state, false).await;

        assert!(outcome.committed);
        let remote = store.games();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].positive_percentage, Some(90));
        assert_eq!(state.session().games().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn items_missing_reviews_are_visited_first() {
        let source = FakeMetadataSource::default();
        let calls = source.review_calls();
        let (state, _store) = loaded(
            vec![
                released(steam_game("1", "Hades", HADES), 90),
                steam_game("2", "Celeste", CELESTE),
                steam_game("3", "Zero", 0),
            ],
            source,
        )
        .await;

        sweep(&state, false).await;

        assert_eq!(*calls.lock().unwrap(), vec![CELESTE, 0, HADES]);
    }

    #[tokio::test(start_paused = true)]
    async fn routine_sweep_skips_release_data_of_released_games() {
        let source = FakeMetadataSource::default();
        let release_calls = source.release_call_count();
        let (state, _store) = loaded(
            vec![
                released(steam_game("1", "Hades", HADES), 90),
                steam_game("2", "Celeste", CELESTE),
            ],
            source,
        )
        .await;

        sweep(&state, false).await;
        assert_eq!(release_calls.load(Ordering::SeqCst), 1);

        sweep(&state, true).await;
        assert_eq!(release_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn early_access_games_are_rechecked_on_routine_sweeps() {
        let mut early = released(steam_game("1", "Hades", HADES), 90);
        early.is_early_access = Some(true);
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_release(HADES, release("17 Sep, 2020", false));
        let (state, store) = loaded(vec![early], source).await;

        let outcome = sweep(&state, false).await;

        assert!(outcome.committed);
        assert_eq!(store.games()[0].is_early_access, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_session_mid_sweep_drops_the_results() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_reviews(CELESTE, reviews(97, 80_000));
        let (state, store) = loaded(
            vec![steam_game("1", "Hades", HADES), steam_game("2", "Celeste", CELESTE)],
            source.clone(),
        )
        .await;
        let weak = Arc::downgrade(&state);
        source.on_reviews(move |app_id| {
            if app_id == HADES {
                if let Some(state) = weak.upgrade() {
                    state.session().shutdown();
                }
            }
        });

        let outcome = sweep(&state, false).await;

        assert!(outcome.interrupted);
        assert_eq!(outcome.visited, 1);
        assert_eq!(store.writes(), 0);
        assert_eq!(state.session().games().await[0].positive_percentage, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_restores_local_state_for_the_next_sweep() {
        let source = FakeMetadataSource::default().with_reviews(HADES, reviews(90, 100));
        let (state, store) = loaded(vec![steam_game("1", "Hades", HADES)], source).await;
        store.inject_foreign_commits(DEFAULT_MAX_ATTEMPTS as usize, |_| {});

        let first = sweep(&state, false).await;

        assert_eq!(first.changed, 1);
        assert!(!first.committed);
        assert_eq!(store.writes(), 0);
        assert_eq!(state.session().games().await[0].positive_percentage, None);

        let second = sweep(&state, false).await;

        assert_eq!(second.changed, 1);
        assert!(second.committed);
        assert_eq!(store.games()[0].positive_percentage, Some(90));
        assert_eq!(state.session().games().await, store.games());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_enrich_one_restores_the_record() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_release(HADES, release("17 Sep, 2020", false));
        let (state, store) = loaded(vec![steam_game("1", "Hades", HADES)], source).await;
        store.inject_foreign_commits(DEFAULT_MAX_ATTEMPTS as usize, |_| {});

        assert!(enrich_one(&state, "1").await.is_none());

        let local = state.session().games().await;
        assert_eq!(local[0].positive_percentage, None);
        assert_eq!(local[0].release_date, None);
    }

    #[tokio::test(start_paused = true)]
    async fn enrich_one_commits_with_the_game_name() {
        let source = FakeMetadataSource::default()
            .with_reviews(HADES, reviews(90, 100))
            .with_release(HADES, release("17 Sep, 2020", false));
        let (state, store) = loaded(vec![steam_game("1", "Hades", HADES)], source).await;

        let updated = enrich_one(&state, "1").await.unwrap();

        assert_eq!(updated.positive_percentage, Some(90));
        assert_eq!(store.messages(), vec!["Update game via web: Hades".to_string()]);
        assert_eq!(store.games()[0].release_date.as_deref(), Some("17 Sep, 2020"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_sweeps_after_the_delay_and_stops_with_the_session() {
        let source = FakeMetadataSource::default().with_reviews(HADES, reviews(90, 100));
        let calls = source.review_calls();
        let (state, _store) = loaded(vec![steam_game("1", "Hades", HADES)], source).await;

        let handle = tokio::spawn(run(state.clone()));

        sleep(Duration::from_secs(1)).await;
        assert!(calls.lock().unwrap().is_empty());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.lock().unwrap().len(), 1);

        sleep(DEFAULT_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(calls.lock().unwrap().len(), 2);

        state.session().shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_waits_for_the_first_load() {
        let source = FakeMetadataSource::default().with_reviews(HADES, reviews(90, 100));
        let calls = source.review_calls();
        let store = InMemoryDocumentStore::with_document(GameCollectionDocument::new(vec![
            steam_game("1", "Hades", HADES),
        ]))
        .unwrap();
        let state = test_state(&store, source);

        let handle = tokio::spawn(run(state.clone()));

        sleep(Duration::from_secs(30)).await;
        assert!(calls.lock().unwrap().is_empty());

        library_service::load(&state).await.unwrap();

        sleep(Duration::from_secs(1)).await;
        assert!(calls.lock().unwrap().is_empty());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(store.games()[0].positive_percentage, Some(90));

        state.session().shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_stops_when_closed_before_any_load() {
        let store = InMemoryDocumentStore::new();
        let state = test_state(&store, FakeMetadataSource::default());

        let handle = tokio::spawn(run(state.clone()));
        sleep(Duration::from_secs(5)).await;
        state.session().shutdown();

        handle.await.unwrap();
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prioritized_sweep_refreshes_genres() {
        let adventure = vec![Genre {
            id: "25".into(),
            description: "Adventure".into(),
        }];
        let source = FakeMetadataSource::default().with_release(
            HADES,
            ReleaseInfo {
                genres: Some(adventure.clone()),
                ..release("17 Sep, 2020", false)
            },
        );
        let (state, store) = loaded(vec![released(steam_game("1", "Hades", HADES), 90)], source).await;

        let outcome = sweep(&state, true).await;

        assert!(outcome.committed);
        assert_eq!(store.games()[0].genres.as_ref(), Some(&adventure));
        assert_eq!(state.session().games().await[0].genres.as_ref(), Some(&adventure));
    }

    #[test]
    fn refresh_leaves_last_updated_alone() {
        let mut game = steam_game("1", "Hades", HADES);
        game.last_updated = OffsetDateTime::UNIX_EPOCH + TimeDuration::days(1);
        let before = game.last_updated;
        game.apply_metadata(&StorefrontMetadata {
            positive_percentage: Some(50),
            ..StorefrontMetadata::default()
        });
        assert_eq!(game.last_updated, before);
    }
}
