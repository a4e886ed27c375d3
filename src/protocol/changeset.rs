use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::Data;
use crate::protocol::ChangeRequest;
use crate::utils::{LiveError, LiveResult};
use crate::wire::{Action, Selector};

/// Keys of a raw map that are read as directives rather than template data.
pub const DIRECTIVE_KEYS: [&str; 4] = ["action", "target", "targets", "template"];

/// A change emitted by a handler.
///
/// Directives that are `None` fall back to those implied by the originating
/// request; `data` is handed to the template as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub action: Option<Action>,
    pub selector: Option<Selector>,
    pub template: Option<String>,
    pub data: Data,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directive-only change aimed at a single element id.
    pub fn target(action: Action, target: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            selector: Some(Selector::Target(target.into())),
            template: Some(template.into()),
            data: Data::new(),
        }
    }

    /// A directive-only change aimed at every element matching `targets`.
    pub fn targets(action: Action, targets: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            selector: Some(Selector::Targets(targets.into())),
            template: Some(template.into()),
            data: Data::new(),
        }
    }

    /// Builds a data-only changeset from any value serializing to an object.
    pub fn from_serialize<T: Serialize>(value: &T) -> LiveResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self::from(map)),
            Value::Null => Ok(Self::new()),
            other => Err(LiveError::Decode(format!(
                "changeset data must be an object, got {other}"
            ))),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.selector = Some(Selector::Target(target.into()));
        self
    }

    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.selector = Some(Selector::Targets(targets.into()));
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Overlays this changeset on the directives implied by `request`.
    /// Directives set here win.
    pub fn merged_over(self, request: &ChangeRequest) -> Changeset {
        Changeset {
            action: self.action.or(request.action),
            selector: self.selector.or_else(|| request.selector()),
            template: self.template.or_else(|| request.template.clone()),
            data: self.data,
        }
    }

    /// The data that may be persisted, minus `temporary` keys.
    pub fn persistent_data(&self, temporary: &BTreeSet<String>) -> Data {
        self.data
            .iter()
            .filter(|(k, _)| !temporary.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<Data> for Changeset {
    /// Lifts directive keys out of a raw map; every other key is data.
    fn from(mut data: Data) -> Self {
        let mut changeset = Changeset::new();
        if let Some(value) = data.remove("action") {
            match value.as_str().map(str::parse::<Action>) {
                Some(Ok(action)) => changeset.action = Some(action),
                _ => warn!("ignoring invalid action directive {value}"),
            }
        }
        if let Some(Value::String(target)) = data.remove("target") {
            changeset.selector = Some(Selector::Target(target));
        }
        if let Some(Value::String(targets)) = data.remove("targets") {
            if !targets.is_empty() {
                changeset.selector = Some(Selector::Targets(targets));
            }
        }
        if let Some(Value::String(template)) = data.remove("template") {
            changeset.template = Some(template);
        }
        changeset.data = data;
        changeset
    }
}
