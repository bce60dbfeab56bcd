//! The single game task and its tunnels
//!
//! The task is the only owner of the [`Game`] and of the id-to-channel
//! routing map. Every input reaches it as an [`Event`]; timers are
//! detached sleep tasks that feed alarms back into the same queue, so
//! the game never needs to cancel a timer — stale alarms are ignored by
//! the engine.

use std::{collections::HashMap, time::Duration};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    game::{AlarmMessage, Game, IncomingMessage},
    session::Tunnel,
    watcher::Id,
};

/// Outbound instructions for one connection's writer loop
#[derive(Debug)]
pub enum Outgoing {
    /// A serialized message to forward to the client
    Payload(String),
    /// Shut the connection down
    Close,
}

/// The server side of one participant's connection
///
/// Sends are non-blocking channel pushes; a slow or gone client only
/// fails its own channel and never stalls the game task.
#[derive(Debug, Clone)]
pub struct ClientTunnel {
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl ClientTunnel {
    /// Wraps the outbound channel of one connection
    pub fn new(outgoing: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self { outgoing }
    }
}

impl Tunnel for ClientTunnel {
    fn send(&self, payload: &str) {
        let _ = self.outgoing.send(Outgoing::Payload(payload.to_owned()));
    }

    fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }
}

/// Everything that can happen to the game, in queue order
#[derive(Debug, derive_more::From)]
pub enum Event {
    /// A WebSocket finished its handshake
    Connected {
        /// Id assigned to the connection
        id: Id,
        /// Outbound half of the connection
        tunnel: ClientTunnel,
    },
    /// A connection went away, cleanly or not
    Disconnected {
        /// Id of the departed connection
        id: Id,
    },
    /// A well-formed message arrived from a client
    Incoming {
        /// Sender's id
        id: Id,
        /// The decoded message
        message: IncomingMessage,
    },
    /// A scheduled timer fired
    #[from]
    Alarm(AlarmMessage),
}

/// Drives the game from the event queue until every sender is gone
///
/// `events_tx` is the same queue's sender; alarm timers clone it so
/// their wake-ups are serialized with everything else.
pub async fn game_task(
    mut game: Game,
    events_tx: mpsc::Sender<Event>,
    mut events: mpsc::Receiver<Event>,
) {
    let mut tunnels: HashMap<Id, ClientTunnel> = HashMap::new();

    while let Some(event) = events.recv().await {
        let schedule_message = |alarm: AlarmMessage, after: Duration| {
            let events_tx = events_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = events_tx.send(Event::Alarm(alarm)).await;
            });
        };

        match event {
            Event::Connected { id, tunnel } => {
                tunnels.insert(id, tunnel);
                let admitted =
                    game.add_player(id, schedule_message, |id| tunnels.get(&id).cloned());
                match admitted {
                    Ok(()) => info!(%id, players = game.player_count(), "player connected"),
                    Err(error) => {
                        warn!(%id, %error, "rejecting connection");
                        if let Some(tunnel) = tunnels.remove(&id) {
                            tunnel.close();
                        }
                    }
                }
            }
            Event::Disconnected { id } => {
                game.remove_player(id, |id| tunnels.get(&id).cloned());
                tunnels.remove(&id);
                info!(%id, players = game.player_count(), "player disconnected");
            }
            Event::Incoming { id, message } => {
                game.receive_message(id, message, schedule_message, |id| {
                    tunnels.get(&id).cloned()
                });
            }
            Event::Alarm(alarm) => {
                game.receive_alarm(alarm, schedule_message, |id| tunnels.get(&id).cloned());
            }
        }
    }
}
