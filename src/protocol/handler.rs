use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::Data;
use crate::protocol::{ChangeRequest, LiveSession};
use crate::transport::RequestInfo;

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Reacts to one change request. Side effects go through the session.
pub type Handler = Arc<dyn Fn(ChangeRequest, LiveSession) -> HandlerFuture + Send + Sync>;

/// Runs once per page render (and once per socket handshake) to produce the
/// status code and the initial data of the view.
pub type OnMount = Arc<dyn Fn(&RequestInfo) -> (u16, Data) + Send + Sync>;

/// Wraps an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(ChangeRequest, LiveSession) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |req, session| Box::pin(f(req, session)))
}
