//! The `utils` module provides the pieces shared by every other module of
//! `hotview`: the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{LiveError, LiveResult};
