//! Sample views built on the live view engine.
//!
//! `todos` is a small in-memory todo list that exercises every part of the
//! change protocol: request-supplied directives, loading states through
//! temporary keys, error banners and flash messages.

pub mod todos;

#[cfg(test)]
mod tests;
