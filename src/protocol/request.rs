use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::{LiveError, LiveResult};
use crate::wire::{Action, Selector};

/// A client event decoded from one websocket frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Selects the handler.
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_action")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub params: Value,
}

fn deserialize_action<'de, D>(deserializer: D) -> Result<Option<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl ChangeRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Parses a raw frame. An empty `id` is rejected.
    pub fn decode(frame: &[u8]) -> LiveResult<Self> {
        let req: ChangeRequest = serde_json::from_slice(frame)?;
        if req.id.is_empty() {
            return Err(LiveError::Decode("field id is required".to_string()));
        }
        Ok(req)
    }

    pub fn decode_params<T: DeserializeOwned>(&self) -> LiveResult<T> {
        Ok(serde_json::from_value(self.params.clone())?)
    }

    /// `targets` wins over `target` when both are present.
    pub fn selector(&self) -> Option<Selector> {
        match (&self.targets, &self.target) {
            (Some(targets), _) if !targets.is_empty() => Some(Selector::Targets(targets.clone())),
            (_, Some(target)) if !target.is_empty() => Some(Selector::Target(target.clone())),
            _ => None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.targets = Some(targets.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}
