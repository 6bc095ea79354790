//! Realtime sync with the generation backend.
//!
//! Provides typed channel messages, a project-scoped WebSocket channel
//! with a bounded inbound queue, a single-channel slot that enforces one
//! open channel per active project, caller-driven reconnection with
//! backoff, reconciliation of inbound events into the project store, and
//! a thin HTTP client for the backend's REST endpoints.

pub mod api;
pub mod channel;
pub mod client;
pub mod messages;
pub mod processor;
pub mod queue;
pub mod reconcile;
pub mod reconnect;
pub mod slot;

pub use channel::{ConnectionState, SyncChannel, SyncError};
pub use client::SyncClient;
pub use messages::{InboundEvent, InboundMessage, OutboundMessage};
pub use queue::{InboundQueue, OverflowPolicy, QueueConfig};
pub use slot::ChannelSlot;
