//! The `flash` module schedules the deferred half of a flash message: the
//! change that removes a transient element some time after it was shown.
//!
//! Pending flashes are tracked per topic so that tearing a topic down can
//! cancel them before they write into a topic recreated for someone else.

pub mod scheduler;

pub use scheduler::FlashScheduler;
