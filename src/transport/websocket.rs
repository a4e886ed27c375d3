//! WebSocket transport
//!
//! Accepts TCP connections, upgrades them to WebSockets and runs one task per
//! connection:
//! - the handshake resolves the viewer (cookie, or a freshly allocated id
//!   returned with `Set-Cookie`) and the topic
//! - a writer task drains the connection's queue into the socket
//! - the reader loop hands every frame to the live view, in order
//! - on read error or close the connection is unsubscribed

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::HeaderValue;
use tungstenite::http::header::SET_COOKIE;
use tungstenite::protocol::Message as WsMessage;

use crate::connection::Connection;
use crate::protocol::LiveView;
use crate::session::ViewerId;
use crate::transport::RequestInfo;
use crate::transport::handshake::viewer_cookie;
use crate::utils::{LiveError, LiveResult};

pub async fn start_websocket_server(addr: &str, view: Arc<LiveView>) -> LiveResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LiveError::Transport {
            connection: addr.to_string(),
            reason: e.to_string(),
        })?;
    serve(listener, view).await
}

/// Accepts connections on an already bound listener until it fails.
pub async fn serve(listener: TcpListener, view: Arc<LiveView>) -> LiveResult<()> {
    if let Ok(local) = listener.local_addr() {
        info!("WebSocket server listening on ws://{local}");
    }
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| LiveError::Transport {
            connection: "listener".to_string(),
            reason: e.to_string(),
        })?;
        debug!("accepted {peer}");
        let view = view.clone();
        tokio::spawn(handle_connection(stream, view));
    }
}

async fn handle_connection(stream: TcpStream, view: Arc<LiveView>) {
    let mut handshake: Option<(RequestInfo, ViewerId)> = None;
    let callback = |req: &Request, mut resp: Response| {
        let info = RequestInfo::from_http(req);
        let (viewer, fresh) = view.resolve_viewer(&info);
        if fresh {
            let cookie = viewer_cookie(&view.settings().cookie_name(), viewer);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    resp.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => warn!("invalid viewer cookie {cookie}: {e}"),
            }
        }
        handshake = Some((info, viewer));
        Ok::<Response, ErrorResponse>(resp)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake error: {e}");
            return;
        }
    };
    let Some((info, viewer)) = handshake else {
        error!("WebSocket handshake completed without a request");
        return;
    };

    let frame = view.connect(&info, viewer);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let conn = Connection::new(tx, view.settings().framing);
    let conn_id = conn.id.clone();

    if let Some(topic) = &frame.topic {
        view.registry().subscribe(topic, conn.clone());
    }

    // Forward queued envelopes to the socket. Exiting drops the queue, which
    // makes further broadcasts to this connection fail and evict it.
    {
        let conn_id = conn_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {conn_id}: {e}");
                    break;
                }
            }
            debug!("Send loop closed for {conn_id}");
        });
    }

    while let Some(msg) = ws_receiver.next().await {
        let bytes = match msg {
            Ok(WsMessage::Text(text)) => text.as_bytes().to_vec(),
            Ok(WsMessage::Binary(bytes)) => bytes.to_vec(),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("read {conn_id}: {e}");
                break;
            }
        };
        match view.handle_frame(&frame, &bytes).await {
            Ok(()) => {}
            Err(LiveError::Handler { .. }) => {}
            Err(e) => warn!("{conn_id}: dropped frame: {e}"),
        }
    }

    if let Some(topic) = &frame.topic {
        if view.registry().unsubscribe(topic, &conn_id) {
            view.flash().cancel_topic(topic);
        }
    }
    info!("{conn_id} disconnected");
}
