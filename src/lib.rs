//! # Trivia Game Library
//!
//! This library provides the core logic for a server-authoritative
//! real-time trivia game. It handles the question bank, participant
//! management, timed rounds, scoring, and the wire messages that keep
//! every connected client in sync.
//!
//! The engine is transport-agnostic: it never touches sockets directly.
//! The [`server`] module plugs a WebSocket transport into the engine's
//! tunnel and alarm seams.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod bank;
pub mod constants;
pub mod game;
mod names;
pub mod round;
pub mod scoreboard;
pub mod server;
pub mod session;
pub mod watcher;
