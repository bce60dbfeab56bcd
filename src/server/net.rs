//! Per-connection WebSocket plumbing
//!
//! Each accepted socket gets a fresh id and an outbound channel, then
//! runs a select loop forwarding frames both ways. Malformed inbound
//! JSON is logged and dropped without touching the game; any exit path
//! ends with a `Disconnected` event so the game task can clean up.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{game::IncomingMessage, watcher::Id};

use super::{
    AppState,
    runtime::{ClientTunnel, Event, Outgoing},
};

/// Upgrades `GET /ws` requests into game connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = Id::new();
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel();

    if state
        .events
        .send(Event::Connected {
            id,
            tunnel: ClientTunnel::new(outgoing_tx),
        })
        .await
        .is_err()
    {
        return;
    }

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = outgoing_rx.recv() => match outbound {
                Some(Outgoing::Payload(payload)) => {
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Some(Outgoing::Close) | None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<IncomingMessage>(&text) {
                        Ok(message) => {
                            if state.events.send(Event::Incoming { id, message }).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => debug!(%id, %error, "ignoring malformed message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Pings are answered by axum; other frame types carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(%id, %error, "socket error");
                    break;
                }
            },
        }
    }

    let _ = state.events.send(Event::Disconnected { id }).await;
}
