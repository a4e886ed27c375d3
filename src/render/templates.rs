use std::collections::HashMap;
use std::fmt;

use crate::Data;
use crate::utils::{LiveError, LiveResult};

/// Renders a named template against a data bag.
pub trait Templates: Send + Sync {
    fn render(&self, name: &str, data: &Data) -> LiveResult<String>;

    fn contains(&self, name: &str) -> bool;
}

type Fragment = Box<dyn Fn(&TemplateSet, &Data) -> LiveResult<String> + Send + Sync>;

/// A pre-loaded set of named fragments.
///
/// A fragment receives the set itself so it can include other fragments by
/// name, the way a layout includes its partials.
#[derive(Default)]
pub struct TemplateSet {
    fragments: HashMap<String, Fragment>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragment<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TemplateSet, &Data) -> LiveResult<String> + Send + Sync + 'static,
    {
        self.fragments.insert(name.into(), Box::new(f));
        self
    }

    /// Registers a fragment whose output does not depend on the data bag.
    pub fn fixed(self, name: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        self.fragment(name, move |_, _| Ok(html.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }
}

impl Templates for TemplateSet {
    fn render(&self, name: &str, data: &Data) -> LiveResult<String> {
        let fragment = self.fragments.get(name).ok_or_else(|| LiveError::Render {
            template: name.to_string(),
            reason: "no such template".to_string(),
        })?;
        fragment(self, data)
    }

    fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("TemplateSet").field("fragments", &names).finish()
    }
}
