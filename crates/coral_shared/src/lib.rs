//! Shared functionality for the coral CSS engine.
//!
//! This crate carries the plumbing the parser crates build on: the
//! bounded UTF-8 text stream with location tracking, the shared error
//! types, and the cancellation token used by asynchronous entry points.

pub mod cancel;
pub mod errors;
pub mod text_stream;
