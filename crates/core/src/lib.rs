//! Domain model and pure editor logic for the manga editor.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! store, the realtime channel, and any future tooling. Everything here
//! is synchronous and side-effect free.

pub mod error;
pub mod layout;
pub mod model;
pub mod patch;
pub mod placement;
pub mod types;

pub use error::CoreError;
