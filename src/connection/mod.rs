//! The `connection` module defines the representation of one live browser
//! connection.
//!
//! It provides the [`Connection`] struct, which encapsulates the unique
//! identifier of a socket, its framing mode and the channel feeding the
//! socket's writer task.

pub mod live_connection;

pub use live_connection::{Connection, ConnectionId, Framing};
