use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/ws", get(participant_stream))
}

pub(crate) fn admin_router() -> Router<AppState> {
    Router::new().route("/events/ws", get(admin_stream))
}

async fn participant_stream(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    let events = state.events().subscribe_participants();
    upgrade.on_upgrade(move |socket| pump(socket, events))
}

async fn admin_stream(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    upgrade: WebSocketUpgrade,
) -> Response {
    let events = state.events().subscribe_admin();
    upgrade.on_upgrade(move |socket| pump(socket, events))
}

/// Forwards broadcast events to one socket until either side goes away.
/// Lagging subscribers lose events rather than slowing publishers; a client
/// that falls behind reconverges through its next status poll.
async fn pump<T>(mut socket: WebSocket, mut events: broadcast::Receiver<T>)
where
    T: Serialize + Clone,
{
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(err) => {
                            tracing::error!(error = %err, "Failed to serialize push event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Push stream lagged; client resyncs on next poll");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                // Inbound frames carry nothing; the stream is one-way.
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}
