//! # HotView
//!
//! `hotview` is a server-driven live view engine built with Rust. A browser
//! keeps one WebSocket per page; change requests sent over it are dispatched
//! to handlers whose changes are rendered into HTML fragments and pushed to
//! every connection watching the same topic.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry, which groups connections and fans envelopes out to them.
//! - `config`: loads server and view settings from files and environment.
//! - `connection`: a connected WebSocket and its outbound queue.
//! - `flash`: timers that remove transient elements after a delay.
//! - `protocol`: change requests, changesets, handler sessions and the `LiveView` itself.
//! - `render`: named templates and the fragment renderer.
//! - `samples`: a small todo list built on the engine.
//! - `session`: per-viewer key/value state.
//! - `transport`: the WebSocket server and handshake parsing.
//! - `utils`: error types and logging setup.
//! - `wire`: the envelope format the browser consumes.

pub mod broker;
pub mod config;
pub mod connection;
pub mod flash;
pub mod protocol;
pub mod render;
pub mod samples;
pub mod session;
pub mod transport;
pub mod utils;
pub mod wire;

/// Loosely typed data handed to templates and stored in sessions.
pub type Data = serde_json::Map<String, serde_json::Value>;

pub use protocol::{ChangeRequest, Changeset, LiveSession, LiveView};
pub use utils::{LiveError, LiveResult};
pub use wire::{Action, Envelope, Selector};
