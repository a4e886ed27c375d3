//! The `session` module holds per-viewer UI state.
//!
//! A [`SessionStore`] is a string-keyed map that is updated by merging
//! partial maps into it. [`UserSessions`] owns one store per viewer identity
//! and creates them on first access. Stores live for the life of the process.

pub mod store;
pub mod users;

pub use store::{InMemoryStore, SessionStore};
pub use users::{UserSessions, ViewerId};
