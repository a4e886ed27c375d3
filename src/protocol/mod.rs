//! The `protocol` module is the change-request/change-response engine.
//!
//! A browser sends a [`ChangeRequest`] naming a handler. The handler receives
//! a [`LiveSession`] through which it emits [`Changeset`]s; each changeset is
//! merged with the directives implied by the request, rendered, wrapped in an
//! envelope and broadcast to every connection on the request's topic.
//!
//! [`LiveView`] ties handlers, templates, sessions and the topic registry
//! together and processes one inbound frame at a time.

pub mod changeset;
pub mod handler;
pub mod request;
pub mod session;
pub mod view;

pub use changeset::Changeset;
pub use handler::{Handler, OnMount, handler};
pub use request::ChangeRequest;
pub use session::{FrameContext, LiveSession};
pub use view::{LiveView, LiveViewBuilder, PageResponse, ViewContext};
