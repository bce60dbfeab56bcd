//! Participant registry
//!
//! This module tracks every connected participant in the game session.
//! The registry owns the game-state side of a participant (their display
//! name); the routing side (id to live channel) stays in the transport
//! layer and is reached through `tunnel_finder` closures, so outbound
//! payloads can never accidentally serialize a transport handle.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use super::session::Tunnel;

/// A unique identifier for participants in the game
///
/// Each participant gets a unique id on connect that stays stable for
/// the lifetime of their connection.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Game-state view of a single participant
///
/// Only the display name lives here; the score accumulator is owned by
/// the scoreboard and this-round answers by the active round, all keyed
/// by the same [`Id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    name: String,
}

impl Player {
    /// Gets the participant's display name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Errors that can occur when managing the registry
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The game has reached the maximum number of allowed players
    #[error("maximum number of players reached")]
    MaximumPlayers,
}

/// Registry of all participants in the game session
///
/// Besides the id-to-player mapping, this struct carries the broadcast
/// helpers: every fan-out in the game goes through [`Watchers::announce`]
/// or [`Watchers::announce_with`], which serialize nothing themselves and
/// simply hand an already-encoded payload to each open tunnel.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Watchers {
    mapping: HashMap<Id, Player>,
}

impl Watchers {
    /// Adds a new participant with the given default display name
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaximumPlayers`] when the session is full.
    pub fn add_player(&mut self, watcher_id: Id, name: String) -> Result<(), Error> {
        if self.mapping.len() >= crate::constants::session::MAX_PLAYER_COUNT {
            return Err(Error::MaximumPlayers);
        }

        self.mapping.insert(watcher_id, Player { name });

        Ok(())
    }

    /// Replaces a participant's display name
    ///
    /// Unknown ids are ignored; the participant may already be gone by
    /// the time their rename arrives.
    pub fn set_name(&mut self, watcher_id: Id, name: String) {
        if let Some(player) = self.mapping.get_mut(&watcher_id) {
            player.name = name;
        }
    }

    /// Gets the display name of a participant
    pub fn get_name(&self, watcher_id: Id) -> Option<&str> {
        self.mapping.get(&watcher_id).map(Player::name)
    }

    /// Checks if a participant exists in the session
    pub fn has_watcher(&self, watcher_id: Id) -> bool {
        self.mapping.contains_key(&watcher_id)
    }

    /// Removes a participant, closing their tunnel if one is still open
    pub fn remove_watcher<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        self.mapping.remove(&watcher_id);
        if let Some(tunnel) = tunnel_finder(watcher_id) {
            tunnel.close();
        }
    }

    /// The number of participants currently registered
    pub fn count(&self) -> usize {
        self.mapping.len()
    }

    /// Iterates over all participants and their game state
    pub fn iter(&self) -> impl Iterator<Item = (Id, &Player)> {
        self.mapping.iter().map(|(id, player)| (*id, player))
    }

    /// Sends a serialized payload to a specific participant
    ///
    /// A missing tunnel means the participant is mid-disconnect; the
    /// payload is dropped for them and nobody else is affected.
    pub fn send_to<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        payload: &str,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(tunnel) = tunnel_finder(watcher_id) else {
            return;
        };

        tunnel.send(payload);
    }

    /// Broadcasts a serialized payload to every registered participant
    ///
    /// Participants without an open tunnel are skipped, never retried.
    pub fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, payload: &str, tunnel_finder: F) {
        for (id, _) in self.iter() {
            let Some(tunnel) = tunnel_finder(id) else {
                continue;
            };

            tunnel.send(payload);
        }
    }

    /// Sends personalized payloads to all participants using a sender function
    ///
    /// The sender is called once per registered participant and may return
    /// `None` to skip them.
    pub fn announce_with<S, T: Tunnel, F: Fn(Id) -> Option<T>>(&self, sender: S, tunnel_finder: F)
    where
        S: Fn(Id, &Player) -> Option<String>,
    {
        for (id, player) in self.iter() {
            let Some(payload) = sender(id, player) else {
                continue;
            };
            let Some(tunnel) = tunnel_finder(id) else {
                continue;
            };

            tunnel.send(&payload);
        }
    }
}
