use std::sync::Arc;

use crate::Data;
use crate::render::Templates;
use crate::utils::LiveResult;
use crate::wire::{Action, Envelope, Selector};

/// Renders fragments and wraps them into envelopes.
#[derive(Clone)]
pub struct FragmentRenderer {
    templates: Arc<dyn Templates>,
}

impl FragmentRenderer {
    pub fn new(templates: Arc<dyn Templates>) -> Self {
        Self { templates }
    }

    pub fn render(&self, template: &str, data: &Data) -> LiveResult<String> {
        self.templates.render(template, data)
    }

    /// Builds the envelope for one change.
    ///
    /// Content is empty when there is no template or the action is `remove`.
    pub fn envelope(
        &self,
        action: Action,
        selector: Selector,
        template: Option<&str>,
        data: &Data,
    ) -> LiveResult<Envelope> {
        let html = match template {
            Some(name) if !name.is_empty() && action.renders_content() => {
                self.templates.render(name, data)?
            }
            _ => String::new(),
        };
        Ok(Envelope::new(action, selector, html))
    }
}
