//! Project-scoped realtime channel.
//!
//! A [`SyncChannel`] owns one spawned task that drives the socket. The
//! handle exposes the connection state, a fire-and-forget [`send`], and
//! the bounded inbound queue. A channel never reconnects on its own: once
//! it reaches [`ConnectionState::Disconnected`] it stays there, and the
//! caller opens a new one (see [`crate::reconnect`]).
//!
//! [`send`]: SyncChannel::send

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use manga_core::types::ProjectId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::client::SyncClient;
use crate::messages::{InboundMessage, OutboundMessage};
use crate::processor::run_session;
use crate::queue::{InboundQueue, QueueConfig};

/// How long [`SyncChannel::close`] waits for the socket task.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    /// `Disconnected` is terminal and reachable from every other state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Connected) | (Connecting, Disconnected) | (Connected, Disconnected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The message was dropped because the channel is not open.
    #[error("Channel not connected (state: {state})")]
    NotConnected { state: ConnectionState },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared state cell. Rejects transitions that are not allowed.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<watch::Sender<ConnectionState>>);

impl StateCell {
    fn new(initial: ConnectionState) -> Self {
        Self(Arc::new(watch::Sender::new(initial)))
    }

    pub(crate) fn transition(&self, project_id: ProjectId, next: ConnectionState) -> bool {
        self.0.send_if_modified(|state| {
            if state.can_transition_to(next) {
                tracing::debug!(project_id = %project_id, from = %state, to = %next, "Channel state");
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn get(&self) -> ConnectionState {
        *self.0.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.0.subscribe()
    }
}

pub struct SyncChannel {
    project_id: ProjectId,
    state: StateCell,
    outbound: mpsc::UnboundedSender<String>,
    inbound: Arc<InboundQueue>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncChannel {
    /// Start connecting to the channel for `project_id`.
    ///
    /// Returns immediately in [`ConnectionState::Connecting`]. Use
    /// [`wait_settled`](Self::wait_settled) to wait for the outcome.
    pub fn open(client: &SyncClient, project_id: ProjectId, queue: QueueConfig) -> Self {
        let state = StateCell::new(ConnectionState::Connecting);
        let inbound = Arc::new(InboundQueue::new(queue));
        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let task = {
            let client = client.clone();
            let state = state.clone();
            let inbound = Arc::clone(&inbound);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let connected = tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = client.connect(project_id) => match result {
                        Ok(ws) => Some(ws),
                        Err(e) => {
                            tracing::warn!(project_id = %project_id, error = %e, "Sync channel failed to connect");
                            None
                        }
                    },
                };

                if let Some(ws) = connected {
                    state.transition(project_id, ConnectionState::Connected);
                    run_session(ws, project_id, outbound_rx, &inbound, &cancel).await;
                }

                state.transition(project_id, ConnectionState::Disconnected);
                inbound.close();
            })
        };

        Self {
            project_id,
            state,
            outbound,
            inbound,
            cancel,
            task: Some(task),
        }
    }

    /// Wrap an already-established WebSocket. Starts out connected.
    pub fn from_stream<S>(project_id: ProjectId, ws: WebSocketStream<S>, queue: QueueConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let state = StateCell::new(ConnectionState::Connected);
        let inbound = Arc::new(InboundQueue::new(queue));
        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let task = {
            let state = state.clone();
            let inbound = Arc::clone(&inbound);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_session(ws, project_id, outbound_rx, &inbound, &cancel).await;
                state.transition(project_id, ConnectionState::Disconnected);
                inbound.close();
            })
        };

        Self {
            project_id,
            state,
            outbound,
            inbound,
            cancel,
            task: Some(task),
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Watch state changes.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Wait until the channel has left `Connecting`.
    pub async fn wait_settled(&self) -> ConnectionState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|s| *s != ConnectionState::Connecting).await {
            Ok(state) => *state,
            Err(_) => ConnectionState::Disconnected,
        };
        settled
    }

    /// Send an intent message. Fire-and-forget: no acknowledgement is
    /// awaited. When the channel is not connected the message is dropped
    /// and [`SyncError::NotConnected`] is returned.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), SyncError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            tracing::warn!(
                project_id = %self.project_id,
                kind = message.kind(),
                state = %state,
                "Dropping outbound message, channel not connected",
            );
            return Err(SyncError::NotConnected { state });
        }

        let text = serde_json::to_string(message)?;
        self.outbound.send(text).map_err(|_| {
            tracing::warn!(
                project_id = %self.project_id,
                kind = message.kind(),
                "Dropping outbound message, socket task gone",
            );
            SyncError::NotConnected {
                state: ConnectionState::Disconnected,
            }
        })
    }

    /// The inbound queue, shareable with a consumer task.
    pub fn inbound(&self) -> Arc<InboundQueue> {
        Arc::clone(&self.inbound)
    }

    /// Wait for the next inbound message. `None` once the channel is
    /// disconnected and the queue is drained.
    pub async fn recv(&self) -> Option<InboundMessage> {
        self.inbound.pop().await
    }

    pub fn try_recv(&self) -> Option<InboundMessage> {
        self.inbound.try_pop()
    }

    /// Close the socket and wait (bounded) for the task to finish.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                tracing::warn!(project_id = %self.project_id, "Sync channel task did not stop in time");
            }
        }
        self.state
            .transition(self.project_id, ConnectionState::Disconnected);
        self.inbound.close();
        tracing::info!(project_id = %self.project_id, "Sync channel closed");
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
