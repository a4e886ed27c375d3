//! The `error` module defines the error taxonomy of the live view engine.
//!
//! Every variant is scoped to a single frame or a single connection; none of
//! them is fatal to the process. The transport logs them and keeps serving.

use thiserror::Error;

/// Message shown in the error banner when a handler error carries no
/// user-facing cause.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

#[derive(Debug, Error)]
pub enum LiveError {
    /// The inbound frame was not a valid change request.
    #[error("decode change request: {0}")]
    Decode(String),

    /// No handler is registered for the request id.
    #[error("no handler found for change request {0}")]
    UnknownHandler(String),

    /// A handler returned an error; `message` is what the user was shown.
    #[error("handler {id} failed: {message}")]
    Handler { id: String, message: String },

    /// Template execution failed.
    #[error("render template {template}: {reason}")]
    Render { template: String, reason: String },

    /// A connection could not be written to or read from.
    #[error("transport error on connection {connection}: {reason}")]
    Transport { connection: String, reason: String },

    #[error("session store: {0}")]
    Session(String),

    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),
}

pub type LiveResult<T> = Result<T, LiveError>;

impl From<serde_json::Error> for LiveError {
    fn from(err: serde_json::Error) -> Self {
        LiveError::Decode(err.to_string())
    }
}

/// Derives the message shown to the user from a handler error.
///
/// The outermost layer of an `anyhow` chain is treated as internal context;
/// the layer directly beneath it is the message meant for the user.
pub fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .nth(1)
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| INTERNAL_ERROR_MESSAGE.to_string())
}
