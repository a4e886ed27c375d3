use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::utils::{LiveError, LiveResult};

pub type ConnectionId = String;

/// Whether envelopes are written as text or binary websocket frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    #[default]
    Text,
    Binary,
}

/// A connected websocket in the live view system.
///
/// Writes are queued on `sender`; a dedicated task drains the queue into the
/// socket. Once that task exits the queue is closed and every further write
/// fails, which is how a dead transport is detected.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier generated at subscribe time.
    pub id: ConnectionId,

    pub framing: Framing,

    /// Channel to send websocket messages to the connection's writer task.
    sender: UnboundedSender<WsMessage>,
}

impl Connection {
    pub fn new(sender: UnboundedSender<WsMessage>, framing: Framing) -> Self {
        Self {
            id: format!("conn-{}", uuid::Uuid::new_v4()),
            framing,
            sender,
        }
    }

    /// Queues an encoded envelope using this connection's framing.
    pub fn send_text(&self, text: &str) -> LiveResult<()> {
        let msg = match self.framing {
            Framing::Text => WsMessage::text(text.to_string()),
            Framing::Binary => WsMessage::binary(text.as_bytes().to_vec()),
        };
        self.send(msg)
    }

    pub fn close(&self) -> LiveResult<()> {
        self.send(WsMessage::Close(None))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, msg: WsMessage) -> LiveResult<()> {
        self.sender.send(msg).map_err(|e| LiveError::Transport {
            connection: self.id.clone(),
            reason: e.to_string(),
        })
    }
}
