use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::LiveError;

/// Name of the custom element carrying an update to the client.
pub const STREAM_TAG: &str = "turbo-stream";

/// How the client applies a fragment to the element(s) named by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Append,
    Prepend,
    Replace,
    Update,
    Before,
    After,
    Remove,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Append => "append",
            Action::Prepend => "prepend",
            Action::Replace => "replace",
            Action::Update => "update",
            Action::Before => "before",
            Action::After => "after",
            Action::Remove => "remove",
        }
    }

    /// `remove` never carries content.
    pub fn renders_content(self) -> bool {
        self != Action::Remove
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = LiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "append" => Action::Append,
            "prepend" => Action::Prepend,
            "replace" => Action::Replace,
            "update" => Action::Update,
            "before" => Action::Before,
            "after" => Action::After,
            "remove" => Action::Remove,
            other => return Err(LiveError::Decode(format!("unknown action {other:?}"))),
        })
    }
}

/// The element(s) an update applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A single element id.
    Target(String),
    /// A CSS selector matching any number of elements, conventionally `.class`.
    Targets(String),
}

impl Selector {
    pub fn value(&self) -> &str {
        match self {
            Selector::Target(v) | Selector::Targets(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }

    fn attribute(&self) -> &'static str {
        match self {
            Selector::Target(_) => "target",
            Selector::Targets(_) => "targets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub action: Action,
    pub selector: Selector,
    pub html: String,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    message: String,
}

impl Envelope {
    pub fn new(action: Action, selector: Selector, html: impl Into<String>) -> Self {
        Self {
            action,
            selector,
            html: html.into(),
        }
    }

    /// The `<turbo-stream>` element carried inside the JSON message.
    pub fn to_stream_element(&self) -> String {
        format!(
            r#"<{tag} action="{action}" {attr}="{selector}"><template>{html}</template></{tag}>"#,
            tag = STREAM_TAG,
            action = escape_html(self.action.as_str()),
            attr = self.selector.attribute(),
            selector = escape_html(self.selector.value()),
            html = self.html,
        )
    }

    /// Serializes the envelope into the JSON text sent over the socket.
    pub fn encode(&self) -> Result<String, LiveError> {
        let msg = WireMessage {
            message: self.to_stream_element(),
        };
        Ok(serde_json::to_string(&msg)?)
    }
}

/// Escapes text for use in HTML content or a double-quoted attribute value.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
