//! WebSocket transport for the game engine
//!
//! All mutable game state lives in a single task ([`runtime::game_task`])
//! that drains an event queue; connection handlers ([`net`]) only
//! translate between WebSocket frames and queue events. The task owns
//! the routing map from participant ids to outbound channels, so the
//! engine itself never sees a socket.

use tokio::sync::mpsc;

pub mod net;
pub mod runtime;

/// Shared handle the connection handlers use to reach the game task
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sends lifecycle, inbound, and alarm events to the game task
    pub events: mpsc::Sender<runtime::Event>,
}
