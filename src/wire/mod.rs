//! The `wire` module defines the message format consumed by the browser.
//!
//! An [`Envelope`] is an action, a target selector and a rendered HTML
//! fragment. It is serialized as a JSON object with a single `message` field
//! holding a `<turbo-stream>` element that the client script applies to the
//! DOM.

pub mod envelope;

pub use envelope::{Action, Envelope, Selector, escape_html};
