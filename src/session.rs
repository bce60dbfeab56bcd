//! Communication session management
//!
//! This module defines the trait for tunneling messages between the game
//! engine and connected participants. The tunnel abstraction keeps the
//! engine independent of the transport: the server backs it with a
//! WebSocket write half, tests back it with an in-memory buffer.

/// Trait for sending messages through a communication tunnel
///
/// Payloads arrive already serialized so that a broadcast can encode an
/// event once and fan the same bytes out to every open tunnel. A send
/// must never block the caller: implementations queue or drop, and a
/// tunnel whose peer is gone simply swallows the payload until the
/// disconnect path removes it.
pub trait Tunnel {
    /// Queues a serialized event for delivery to the participant
    fn send(&self, payload: &str);

    /// Closes the communication tunnel
    ///
    /// Called when the participant is removed from the session and no
    /// further messages should be delivered.
    fn close(&self);
}
