use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::GameRecord,
    dto::{
        games::{GameView, views},
        sse::{GameEnrichedEvent, GamesUpdatedEvent, NoticeEvent, ServerEvent},
    },
    state::SseHub,
};

const EVENT_GAMES_UPDATED: &str = "games_updated";
const EVENT_GAME_ENRICHED: &str = "game_enriched";
const EVENT_NOTICE: &str = "notice";

/// Broadcast the full list the session just adopted.
pub fn broadcast_games_updated(hub: &SseHub, games: &[GameRecord]) {
    let payload = GamesUpdatedEvent {
        games: views(games),
    };
    send_event(hub, EVENT_GAMES_UPDATED, &payload);
}

/// Broadcast one game whose storefront metadata was refreshed locally.
pub fn broadcast_game_enriched(hub: &SseHub, game: &GameRecord) {
    let payload = GameEnrichedEvent {
        game: GameView::from(game),
    };
    send_event(hub, EVENT_GAME_ENRICHED, &payload);
}

/// Broadcast a short user-facing notice.
pub fn broadcast_notice(hub: &SseHub, message: impl Into<String>) {
    let payload = NoticeEvent {
        message: message.into(),
    };
    send_event(hub, EVENT_NOTICE, &payload);
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
