use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::games::GameView;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether store credentials are installed; `false` means the settings surface is needed.
    pub configured: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the session adopts a new authoritative list.
pub struct GamesUpdatedEvent {
    pub games: Vec<GameView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a background refresh updated one game locally.
pub struct GameEnrichedEvent {
    pub game: GameView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Short-lived user-facing notification.
pub struct NoticeEvent {
    pub message: String,
}
