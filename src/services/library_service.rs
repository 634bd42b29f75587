//! User actions on the game library. Every mutation goes through the update
//! coordinator and the session adopts the committed list on success; on
//! failure the local list is left as it was.

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameRecord, GameStatus},
        storefront::StorefrontHit,
    },
    dto::games::{CreateGameRequest, GroupedGamesResponse, UpdateGameRequest, views},
    error::ServiceError,
    services::{
        enrichment,
        reconciliation::{self, LoadOutcome},
        sse_events,
        update_coordinator::TransformError,
    },
    state::SharedState,
};

/// Fetch the remote list (migrating legacy statuses) and adopt it.
pub async fn load(state: &SharedState) -> Result<LoadOutcome, ServiceError> {
    let outcome = match reconciliation::reconcile(state.coordinator()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = ServiceError::from(err);
            warn!(error = %err, "failed to load games");
            return Err(err);
        }
    };

    if outcome.migrated > 0 {
        sse_events::broadcast_notice(
            state.public_sse(),
            format!("Migrated {} games from pending to queueing", outcome.migrated),
        );
    }
    if state.session().replace(outcome.games.clone()).await {
        state.session().mark_loaded();
    }
    info!(games = outcome.games.len(), migrated = outcome.migrated, "games loaded");
    Ok(outcome)
}

/// Current list split by status, pinned first, then most recently updated.
pub async fn grouped(state: &SharedState) -> GroupedGamesResponse {
    state.session().read(group_games).await
}

fn group_games(games: &[GameRecord]) -> GroupedGamesResponse {
    let mut sorted = games.to_vec();
    sorted.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.last_updated.cmp(&a.last_updated))
    });

    let pick = |status: GameStatus| {
        let members: Vec<GameRecord> = sorted
            .iter()
            .filter(|game| game.status == status)
            .cloned()
            .collect();
        views(&members)
    };

    GroupedGamesResponse {
        playing: pick(GameStatus::Playing),
        queueing: pick(GameStatus::Queueing),
        completion: pick(GameStatus::Completion),
    }
}

/// Add a new queued game. The name must not exist yet, locally or remotely.
///
/// Games imported from a storefront page with incomplete metadata are
/// refreshed in the background right after the commit.
pub async fn add_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameRecord, ServiceError> {
    let name = request.name.trim().to_string();
    if state
        .session()
        .read(|games| games.iter().any(|game| game.has_name(&name)))
        .await
    {
        return Err(ServiceError::DuplicateEntry(name));
    }

    let record = request.into_record(Uuid::new_v4().simple().to_string(), OffsetDateTime::now_utc());
    let message = match record.storefront_app_id() {
        Some(app_id) => format!("Add game via web: {} ({app_id})", record.name),
        None => format!("Add game via web: {}", record.name),
    };

    let games = state
        .coordinator()
        .update(&message, |current| {
            if current.iter().any(|game| game.has_name(&record.name)) {
                return Err(TransformError::DuplicateEntry {
                    name: record.name.clone(),
                });
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(record.clone());
            next.extend_from_slice(current);
            Ok(next)
        })
        .await?;
    state.session().replace(games).await;
    info!(id = %record.id, name = %record.name, "game added");

    if record.storefront_app_id().is_some() && is_metadata_incomplete(&record) {
        let state = state.clone();
        let id = record.id.clone();
        tokio::spawn(async move {
            enrichment::enrich_one(&state, &id).await;
        });
    }

    Ok(record)
}

fn is_metadata_incomplete(record: &GameRecord) -> bool {
    record.positive_percentage.is_none()
        || record.total_reviews.is_none()
        || record.release_date.is_none()
        || record.is_early_access.is_none()
}

/// Rename a game and/or change its status.
pub async fn update_game(
    state: &SharedState,
    id: &str,
    request: UpdateGameRequest,
) -> Result<GameRecord, ServiceError> {
    if request.is_empty() {
        return Err(ServiceError::InvalidInput(
            "nothing to update: provide a name or a status".into(),
        ));
    }
    let existing = local_game(state, id).await?;
    let new_name = request.name.as_deref().map(str::trim).map(str::to_owned);
    let now = OffsetDateTime::now_utc();
    let message = format!("Update game via web: {}", existing.name);

    let games = state
        .coordinator()
        .update(&message, |current| {
            if let Some(name) = new_name.as_deref()
                && current
                    .iter()
                    .any(|game| game.id != id && game.has_name(name))
            {
                return Err(TransformError::DuplicateEntry { name: name.into() });
            }
            modify_record(current, id, |game| {
                if let Some(name) = new_name.as_ref() {
                    game.name = name.clone();
                }
                if let Some(status) = request.status {
                    game.status = status;
                }
                game.last_updated = now;
            })
        })
        .await?;

    adopt_and_find(state, games, id).await
}

/// Flip the pinned flag of a game.
pub async fn toggle_pin(state: &SharedState, id: &str) -> Result<GameRecord, ServiceError> {
    let existing = local_game(state, id).await?;
    let pinned = !existing.is_pinned;
    let now = OffsetDateTime::now_utc();
    let verb = if pinned { "Pin" } else { "Unpin" };
    let message = format!("{verb} game via web: {}", existing.name);

    let games = state
        .coordinator()
        .update(&message, |current| {
            modify_record(current, id, |game| {
                game.is_pinned = pinned;
                game.last_updated = now;
            })
        })
        .await?;

    adopt_and_find(state, games, id).await
}

/// Remove a game. Already deleted remotely counts as success.
pub async fn delete_game(state: &SharedState, id: &str) -> Result<(), ServiceError> {
    let existing = local_game(state, id).await?;
    let message = format!("Remove game via web: {}", existing.name);

    let games = state
        .coordinator()
        .update(&message, |current| {
            Ok(current
                .iter()
                .filter(|game| game.id != id)
                .cloned()
                .collect())
        })
        .await?;
    state.session().replace(games).await;
    info!(id, name = %existing.name, "game removed");
    Ok(())
}

/// Games whose name contains `term`, ignoring case. A blank term matches nothing.
pub async fn search_local(state: &SharedState, term: &str) -> Vec<GameRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    state
        .session()
        .read(|games| {
            games
                .iter()
                .filter(|game| game.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        })
        .await
}

/// Look up import candidates on the storefront.
pub async fn search_storefront(
    state: &SharedState,
    query: &str,
) -> Result<Vec<StorefrontHit>, ServiceError> {
    Ok(state.storefront().search(query.to_string()).await?)
}

async fn local_game(state: &SharedState, id: &str) -> Result<GameRecord, ServiceError> {
    state
        .session()
        .read(|games| games.iter().find(|game| game.id == id).cloned())
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}`")))
}

/// Copy `current`, applying `change` to the record `id`.
fn modify_record<F>(
    current: &[GameRecord],
    id: &str,
    change: F,
) -> Result<Vec<GameRecord>, TransformError>
where
    F: Fn(&mut GameRecord),
{
    let mut next = current.to_vec();
    let record = next
        .iter_mut()
        .find(|game| game.id == id)
        .ok_or_else(|| TransformError::MissingRecord { id: id.to_string() })?;
    change(record);
    Ok(next)
}

async fn adopt_and_find(
    state: &SharedState,
    games: Vec<GameRecord>,
    id: &str,
) -> Result<GameRecord, ServiceError> {
    let updated = games.iter().find(|game| game.id == id).cloned();
    state.session().replace(games).await;
    updated.ok_or_else(|| ServiceError::NotFound(format!("game `{id}`")))
}
