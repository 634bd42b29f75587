use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::{dao::models::GameRecord, services::sse_events, state::SseHub};

/// Owner of the authoritative in-memory game list for one user session.
///
/// Results that arrive after [`LibrarySession::shutdown`] are discarded.
pub struct LibrarySession {
    games: RwLock<Vec<GameRecord>>,
    active: watch::Sender<bool>,
    loaded: watch::Sender<bool>,
    sse: SseHub,
}

impl LibrarySession {
    /// Start an active session with an empty list.
    pub fn new(sse_capacity: usize) -> Self {
        let (active, _rx) = watch::channel(true);
        let (loaded, _rx) = watch::channel(false);
        Self {
            games: RwLock::new(Vec::new()),
            active,
            loaded,
            sse: SseHub::new(sse_capacity),
        }
    }

    /// Copy of the current list.
    pub async fn games(&self) -> Vec<GameRecord> {
        self.games.read().await.clone()
    }

    /// Run `f` against the current list without cloning it.
    pub async fn read<R>(&self, f: impl FnOnce(&[GameRecord]) -> R) -> R {
        let guard = self.games.read().await;
        f(&guard)
    }

    /// Adopt `games` as the new local truth and tell subscribers.
    ///
    /// Returns `false` when the session is already closed.
    pub async fn replace(&self, games: Vec<GameRecord>) -> bool {
        let mut guard = self.games.write().await;
        if !self.is_active() {
            debug!("session closed; discarding list replacement");
            return false;
        }
        sse_events::broadcast_games_updated(&self.sse, &games);
        *guard = games;
        true
    }

    /// Mutate the record `id` in place, returning its new value.
    ///
    /// `None` when the session is closed or the record is gone.
    pub async fn apply_local<F>(&self, id: &str, mutate: F) -> Option<GameRecord>
    where
        F: FnOnce(&mut GameRecord),
    {
        let mut guard = self.games.write().await;
        if !self.is_active() {
            debug!(id, "session closed; discarding local update");
            return None;
        }
        let record = guard.iter_mut().find(|game| game.id == id)?;
        mutate(record);
        Some(record.clone())
    }

    /// Whether results may still be applied.
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Close the session. Pending timers observe this through [`LibrarySession::watch_active`].
    pub fn shutdown(&self) {
        self.active.send_replace(false);
    }

    /// Receiver flipping to `false` once the session closes.
    pub fn watch_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    /// Record that the list has been read from the store at least once.
    pub fn mark_loaded(&self) {
        self.loaded.send_if_modified(|loaded| !std::mem::replace(loaded, true));
    }

    /// Receiver flipping to `true` after the first successful load.
    pub fn watch_loaded(&self) -> watch::Receiver<bool> {
        self.loaded.subscribe()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }
}
