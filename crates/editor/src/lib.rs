//! Headless manga editor session.
//!
//! Wires the project store, local persistence, the realtime sync channel,
//! and the backend HTTP client into one [`EditorSession`] with an explicit
//! lifecycle: [`EditorSession::start`] at session start,
//! [`EditorSession::shutdown`] at the end.

pub mod config;
pub mod error;
pub mod session;

pub use config::{ConfigError, EditorConfig};
pub use error::SessionError;
pub use session::{Delivery, EditorSession};
