//! Load-time reconciliation of the remote document.
//!
//! Ingestion folds legacy status values into their current spelling; this pass
//! persists that normalization once so later loads find nothing to migrate.

use tracing::info;

use crate::{
    dao::models::GameRecord,
    services::update_coordinator::{UpdateCoordinator, UpdateError},
};

/// Change description of the migration commit.
pub const MIGRATION_COMMIT_MESSAGE: &str = "Migrate pending status to queueing";

/// Result of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Authoritative list to present.
    pub games: Vec<GameRecord>,
    /// Records whose legacy status was rewritten.
    pub migrated: usize,
}

/// Read the document and, when it still carries legacy statuses, commit the
/// normalized list before returning it.
pub async fn reconcile(coordinator: &UpdateCoordinator) -> Result<LoadOutcome, UpdateError> {
    let handle = coordinator.fetch().await?;
    if !handle.needs_rewrite() {
        return Ok(LoadOutcome {
            games: handle.content.games,
            migrated: 0,
        });
    }

    let migrated = handle.legacy_status_ids.len();
    info!(migrated, ids = ?handle.legacy_status_ids, "migrating legacy statuses");

    // Statuses are already normalized by ingestion, so the identity transform
    // is enough; the coordinator writes because the fetched bytes are stale.
    let games = coordinator
        .update(MIGRATION_COMMIT_MESSAGE, |games| Ok(games.to_vec()))
        .await?;

    Ok(LoadOutcome { games, migrated })
}
