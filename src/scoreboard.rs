//! Score tracking
//!
//! This module accumulates the points earned by each participant across
//! rounds and projects the registry into the public roster snapshot that
//! `player-update` and `reveal-answer` events carry. Scores live here
//! rather than on the participant record so that the reveal path can
//! award a whole round in one batch.

use std::collections::HashMap;

use serde::Serialize;

use super::watcher::{Id, Watchers};

/// Public projection of one participant: exactly what clients may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    /// The participant's display name
    pub name: String,
    /// Total points earned so far
    pub score: u64,
}

/// Cumulative scores for the game session
#[derive(Debug, Default, Serialize)]
pub struct Scoreboard {
    points: HashMap<Id, u64>,
}

impl Scoreboard {
    /// Adds the points earned in a round
    ///
    /// Each `(id, points)` pair is accumulated onto the participant's
    /// running total. Callers guarantee at most one entry per participant
    /// per round; the scoreboard itself never deduplicates.
    pub fn award(&mut self, scores: &[(Id, u64)]) {
        for (id, points) in scores {
            *self.points.entry(*id).or_default() += points;
        }
    }

    /// Gets a participant's current total score
    pub fn score(&self, watcher_id: Id) -> u64 {
        self.points.get(&watcher_id).copied().unwrap_or_default()
    }

    /// Forgets a participant's score when they leave the session
    pub fn remove(&mut self, watcher_id: Id) {
        self.points.remove(&watcher_id);
    }

    /// Builds the roster snapshot for the current registry state
    ///
    /// Every registered participant appears exactly once, with a zero
    /// score if they have not earned points yet. Participants who left
    /// the session never appear, even if they once held points.
    pub fn roster(&self, watchers: &Watchers) -> HashMap<Id, PlayerEntry> {
        watchers
            .iter()
            .map(|(id, player)| {
                (
                    id,
                    PlayerEntry {
                        name: player.name().to_owned(),
                        score: self.score(id),
                    },
                )
            })
            .collect()
    }
}
