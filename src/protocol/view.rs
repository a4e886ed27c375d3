use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::Data;
use crate::broker::TopicRegistry;
use crate::config::ViewSettings;
use crate::flash::FlashScheduler;
use crate::protocol::{ChangeRequest, FrameContext, Handler, LiveSession, OnMount};
use crate::render::{FragmentRenderer, Templates};
use crate::session::{InMemoryStore, SessionStore, UserSessions, ViewerId};
use crate::transport::{RequestInfo, resolve_topic};
use crate::utils::error::user_message;
use crate::utils::{LiveError, LiveResult};

/// Shared pieces every session of a view writes through.
pub struct ViewContext {
    pub renderer: FragmentRenderer,
    pub registry: Arc<TopicRegistry>,
    pub flash: Arc<FlashScheduler>,
    pub settings: ViewSettings,
}

/// Result of rendering the initial page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

type TopicResolver = Arc<dyn Fn(&RequestInfo, ViewerId) -> Option<String> + Send + Sync>;

pub struct LiveViewBuilder {
    templates: Arc<dyn Templates>,
    registry: Option<Arc<TopicRegistry>>,
    settings: ViewSettings,
    handlers: HashMap<String, Handler>,
    on_mount: Option<OnMount>,
    topic_resolver: Option<TopicResolver>,
}

impl LiveViewBuilder {
    /// Shares an existing registry, e.g. one owned by the server.
    pub fn registry(mut self, registry: Arc<TopicRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn settings(mut self, settings: ViewSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn handler(mut self, id: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(id.into(), handler);
        self
    }

    pub fn handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = (String, Handler)>,
    {
        self.handlers.extend(handlers);
        self
    }

    pub fn on_mount<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestInfo) -> (u16, Data) + Send + Sync + 'static,
    {
        self.on_mount = Some(Arc::new(f));
        self
    }

    /// Replaces the configured topic strategy. Returning `None` leaves the
    /// connection unsubscribed.
    pub fn topic_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestInfo, ViewerId) -> Option<String> + Send + Sync + 'static,
    {
        self.topic_resolver = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> LiveView {
        LiveView {
            ctx: Arc::new(ViewContext {
                renderer: FragmentRenderer::new(self.templates),
                registry: self.registry.unwrap_or_default(),
                flash: Arc::new(FlashScheduler::new()),
                settings: self.settings,
            }),
            handlers: self.handlers,
            on_mount: self.on_mount,
            topic_resolver: self.topic_resolver,
            users: UserSessions::new(),
        }
    }
}

/// A live page: its handlers, templates and viewer sessions.
pub struct LiveView {
    ctx: Arc<ViewContext>,
    handlers: HashMap<String, Handler>,
    on_mount: Option<OnMount>,
    topic_resolver: Option<TopicResolver>,
    users: UserSessions,
}

impl LiveView {
    pub fn builder(templates: Arc<dyn Templates>) -> LiveViewBuilder {
        LiveViewBuilder {
            templates,
            registry: None,
            settings: ViewSettings::default(),
            handlers: HashMap::new(),
            on_mount: None,
            topic_resolver: None,
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.ctx.registry
    }

    pub fn flash(&self) -> &Arc<FlashScheduler> {
        &self.ctx.flash
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.ctx.settings
    }

    pub fn users(&self) -> &UserSessions {
        &self.users
    }

    /// Returns the viewer named by the request cookie, allocating a new one
    /// when the cookie is absent or malformed. The flag is `true` for a new
    /// viewer whose cookie must be set.
    pub fn resolve_viewer(&self, req: &RequestInfo) -> (ViewerId, bool) {
        let existing = req
            .cookie(&self.ctx.settings.cookie_name())
            .and_then(|v| v.parse::<ViewerId>().ok())
            .filter(|v| *v > 0);
        match existing {
            Some(viewer) => (viewer, false),
            None => (self.users.next_viewer(), true),
        }
    }

    pub fn resolve_topic(&self, req: &RequestInfo, viewer: ViewerId) -> Option<String> {
        match &self.topic_resolver {
            Some(resolver) => resolver(req, viewer),
            None => Some(resolve_topic(self.ctx.settings.topic_strategy, req, viewer)),
        }
    }

    /// Runs the on-mount hook and merges its data into the viewer's session.
    fn mount(&self, req: &RequestInfo, viewer: ViewerId) -> (u16, Data, Arc<InMemoryStore>) {
        let store = self.users.get_or_create(viewer);
        let (status, data) = match &self.on_mount {
            Some(on_mount) => on_mount(req),
            None => (200, Data::new()),
        };
        if status <= 299 {
            if let Err(e) = store.set(data.clone()) {
                error!("seed session for viewer {viewer}: {e}");
            }
        }
        (status, data, store)
    }

    /// Renders the full page for a plain HTTP request.
    pub fn render_page(&self, req: &RequestInfo, viewer: ViewerId) -> PageResponse {
        let (status, data, _) = self.mount(req, viewer);
        if status > 299 {
            return PageResponse {
                status,
                body: format!(
                    r#"<div style="text-align:center"><h1>{status}</h1></div>
<div style="text-align:center"><a href="javascript:history.back()">back</a></div>"#
                ),
            };
        }
        match self.ctx.renderer.render(&self.ctx.settings.page_template, &data) {
            Ok(body) => PageResponse { status, body },
            Err(e) => {
                error!("render page {}: {e}", req.path);
                PageResponse {
                    status: 500,
                    body: "something went wrong".to_string(),
                }
            }
        }
    }

    /// Prepares the per-connection context after a websocket handshake.
    pub fn connect(&self, req: &RequestInfo, viewer: ViewerId) -> FrameContext {
        let topic = self.resolve_topic(req, viewer);
        let (_, _, store) = self.mount(req, viewer);
        let store: Arc<dyn SessionStore> = store;
        FrameContext {
            topic,
            viewer,
            store,
        }
    }

    /// Processes one inbound frame end to end.
    ///
    /// Malformed frames and unknown handler ids are returned as errors with
    /// nothing sent to the client. A handler error is shown in the error
    /// banner of the topic and returned as [`LiveError::Handler`].
    pub async fn handle_frame(&self, frame: &FrameContext, bytes: &[u8]) -> LiveResult<()> {
        let request = ChangeRequest::decode(bytes)?;
        let handler = self
            .handlers
            .get(&request.id)
            .cloned()
            .ok_or_else(|| LiveError::UnknownHandler(request.id.clone()))?;

        let id = request.id.clone();
        let session = LiveSession::new(self.ctx.clone(), frame, request.clone());
        session.unset_error();

        if let Err(err) = handler(request, session.clone()).await {
            let message = user_message(&err);
            warn!("{id}: err: {err:#}");
            session.set_error(&message);
            return Err(LiveError::Handler { id, message });
        }
        Ok(())
    }

    /// Cancels pending flashes and closes every connection.
    pub fn shutdown(&self) {
        self.ctx.flash.cancel_all();
        self.ctx.registry.close_all();
        info!("live view shut down");
    }
}
