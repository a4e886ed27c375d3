use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::Data;
use crate::config::ViewSettings;
use crate::protocol::changeset::DIRECTIVE_KEYS;
use crate::protocol::{ChangeRequest, Changeset, ViewContext};
use crate::session::{SessionStore, ViewerId};
use crate::utils::{LiveError, LiveResult};
use crate::wire::{Action, Selector};

/// What a connection contributes to every frame it receives.
#[derive(Clone)]
pub struct FrameContext {
    /// `None` when the connection was not subscribed to any topic.
    pub topic: Option<String>,
    pub viewer: ViewerId,
    pub store: Arc<dyn SessionStore>,
}

/// The capability handed to a handler for the duration of one request.
///
/// Every change is rendered and broadcast to the whole topic, then its data
/// (minus temporary keys) is merged into the viewer's session.
#[derive(Clone)]
pub struct LiveSession {
    inner: Arc<Inner>,
}

struct Inner {
    view: Arc<ViewContext>,
    topic: Option<String>,
    viewer: ViewerId,
    request: ChangeRequest,
    store: Arc<dyn SessionStore>,
    temporary: Mutex<BTreeSet<String>>,
}

impl LiveSession {
    pub(crate) fn new(view: Arc<ViewContext>, frame: &FrameContext, request: ChangeRequest) -> Self {
        let temporary = DIRECTIVE_KEYS.iter().map(|k| k.to_string()).collect();
        Self {
            inner: Arc::new(Inner {
                view,
                topic: frame.topic.clone(),
                viewer: frame.viewer,
                request,
                store: frame.store.clone(),
                temporary: Mutex::new(temporary),
            }),
        }
    }

    pub fn request(&self) -> &ChangeRequest {
        &self.inner.request
    }

    pub fn topic(&self) -> Option<&str> {
        self.inner.topic.as_deref()
    }

    pub fn viewer(&self) -> ViewerId {
        self.inner.viewer
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.inner.view.settings
    }

    pub fn change(&self, changeset: Changeset) {
        self.apply(changeset, true);
    }

    /// Shows a transient element now and removes it after `duration`.
    ///
    /// Missing directives default to appending the configured flash template
    /// to the flash target. The template receives a `flash_id` it must use as
    /// the id of the element it renders; `flash_id` is temporary, the rest of
    /// the data is persisted like any other change.
    pub fn flash(&self, duration: Duration, mut changeset: Changeset) {
        let settings = &self.inner.view.settings;
        let flash_id = format!("flash-{}", uuid::Uuid::new_v4().simple());

        changeset.action.get_or_insert(Action::Append);
        changeset
            .selector
            .get_or_insert_with(|| Selector::Target(settings.flash_target.clone()));
        changeset
            .template
            .get_or_insert_with(|| settings.flash_template.clone());
        changeset.data.insert("flash_id".into(), Value::String(flash_id.clone()));
        self.temporary(["flash_id"]);
        self.apply(changeset, true);

        let Some(topic) = self.topic() else {
            return;
        };
        if !self.inner.view.registry.contains(topic) {
            debug!("topic {topic} is gone, not scheduling {flash_id}");
            return;
        }
        let removal = Changeset::target(Action::Remove, flash_id.clone(), settings.flash_template.clone());
        let session = self.clone();
        self.inner
            .view
            .flash
            .schedule(topic, &flash_id, duration, move || session.apply(removal, false));
    }

    /// Marks changeset keys that must not be persisted in the session.
    pub fn temporary<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .temporary
            .lock()
            .extend(keys.into_iter().map(Into::into));
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.store.get(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> LiveResult<Option<T>> {
        match self.get(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| LiveError::Session(format!("decode {key}: {e}"))),
            None => Ok(None),
        }
    }

    pub fn set(&self, partial: Data) -> LiveResult<()> {
        self.inner.store.set(partial)
    }

    fn apply(&self, changeset: Changeset, persist: bool) {
        let persistent = persist.then(|| changeset.persistent_data(&self.inner.temporary.lock()));
        let merged = changeset.merged_over(&self.inner.request);
        self.write(&merged);

        if let Some(partial) = persistent {
            if let Err(e) = self.inner.store.set(partial) {
                error!("error store.set {e}");
            }
        }
    }

    /// Renders and broadcasts one merged change. Problems are logged and the
    /// write is skipped.
    fn write(&self, change: &Changeset) {
        let Some(action) = change.action else {
            warn!("action is empty for change request {}", self.inner.request.id);
            return;
        };
        let selector = match &change.selector {
            Some(selector) if !selector.is_empty() => selector.clone(),
            _ => {
                warn!("target/targets empty for change request {}", self.inner.request.id);
                return;
            }
        };
        let envelope = match self.inner.view.renderer.envelope(
            action,
            selector,
            change.template.as_deref(),
            &change.data,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("{e}, while executing template for change request {}", self.inner.request.id);
                return;
            }
        };
        match &self.inner.topic {
            Some(topic) => {
                let report = self.inner.view.registry.broadcast(topic, &envelope);
                debug!(
                    "{} {} delivered to {} connections",
                    envelope.action,
                    envelope.selector.value(),
                    report.delivered_count()
                );
                if report.topic_dropped {
                    let cancelled = self.inner.view.flash.cancel_topic(topic);
                    debug!("topic {topic} dropped, cancelled {cancelled} flashes");
                }
            }
            None => debug!("connection has no topic, dropping {}", envelope.action),
        }
    }

    pub(crate) fn set_error(&self, user_message: &str) {
        let settings = &self.inner.view.settings;
        let banner = Changeset::target(
            Action::Replace,
            settings.error_target.clone(),
            settings.error_template.clone(),
        )
        .insert("error", user_message);
        self.write(&banner);
    }

    pub(crate) fn unset_error(&self) {
        let settings = &self.inner.view.settings;
        self.write(&Changeset::target(
            Action::Replace,
            settings.error_target.clone(),
            settings.error_template.clone(),
        ));
    }
}
