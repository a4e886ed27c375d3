//! The `render` module turns named templates and a data bag into HTML.
//!
//! Template discovery and parsing live outside this crate; the engine only
//! needs something implementing [`Templates`]. [`TemplateSet`] is a ready-made
//! implementation backed by closures registered under fragment names, and
//! [`FragmentRenderer`] wraps rendered output into a wire [`Envelope`].
//!
//! [`Envelope`]: crate::wire::Envelope

pub mod fragment;
pub mod templates;

pub use fragment::FragmentRenderer;
pub use templates::{TemplateSet, Templates};
