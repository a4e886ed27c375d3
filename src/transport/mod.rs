//! The `transport` module is responsible for handling network communication
//! with browsers over WebSockets.
//!
//! It extracts what the live view needs from the handshake (path, challenge
//! key, viewer cookie), owns each connection from upgrade to close, and feeds
//! inbound frames to the [`LiveView`](crate::protocol::LiveView).

pub mod handshake;
pub mod websocket;

pub use handshake::{RequestInfo, resolve_topic};
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod tests;
