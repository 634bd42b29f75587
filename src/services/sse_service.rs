use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::SharedState,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Open the public stream for one client.
///
/// The client first receives a `handshake` event of its own, then every
/// broadcast until it disconnects or the session closes.
pub async fn open_public_stream(
    state: SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.public_sse().subscribe();
    let configured = state.store().is_configured().await;
    let handshake = ServerEvent::json(
        Some("handshake".to_string()),
        &Handshake {
            stream: "public".into(),
            message: "public stream connected".into(),
            configured,
        },
    );
    let handshake = match handshake {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialise SSE handshake");
            None
        }
    };

    to_sse_stream(handshake, receiver, state.session().watch_active())
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Forward `receiver` into an SSE response, preceded by `first` when given.
fn to_sse_stream(
    first: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
    mut active: watch::Receiver<bool>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(first) = first
            && tx.send(Ok(to_event(first))).await.is_err()
        {
            return;
        }

        // Queued events are drained before a closed session ends the stream.
        loop {
            tokio::select! {
                biased;
                _ = tx.closed() => break,
                received = receiver.recv() => match received {
                    Ok(payload) => {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    // Clients resync from the next games_updated event.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "public SSE subscriber lagged");
                    }
                },
                _ = async {
                    let _ = active.wait_for(|active| !*active).await;
                } => {
                    debug!("session closed; ending public SSE stream");
                    break;
                }
            }
        }

        info!("Public SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
