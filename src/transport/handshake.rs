use std::collections::HashMap;

use tungstenite::http;

use crate::config::TopicStrategy;
use crate::session::ViewerId;

/// The parts of an HTTP request the live view cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub path: String,
    pub query: Option<String>,
    /// Header names are stored lowercase.
    headers: HashMap<String, String>,
}

impl RequestInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let mut info = Self::new(req.uri().path());
        info.query = req.uri().query().map(str::to_string);
        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                info.headers
                    .insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        info
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Sec-WebSocket-Key` sent by the browser.
    pub fn challenge_key(&self) -> Option<&str> {
        self.header("sec-websocket-key")
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?.split(';').find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then_some(v)
        })
    }

    /// The request path with `/` replaced by `_`.
    pub fn path_key(&self) -> String {
        self.path.replace('/', "_")
    }
}

/// Derives the topic of a new connection.
pub fn resolve_topic(strategy: TopicStrategy, req: &RequestInfo, viewer: ViewerId) -> String {
    match strategy {
        TopicStrategy::Handshake => {
            let key = req
                .challenge_key()
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
            format!("{}_{}", req.path_key(), key)
        }
        TopicStrategy::Viewer => format!("{}_{}", req.path_key(), viewer),
    }
}

/// `Set-Cookie` value assigning a viewer id.
pub(crate) fn viewer_cookie(name: &str, viewer: ViewerId) -> String {
    format!("{name}={viewer}; Path=/; HttpOnly; SameSite=Lax")
}
