//! Holder for the single open sync channel.
//!
//! The editor keeps at most one channel open, scoped to the active
//! project. [`ChannelSlot::switch_to`] opens a channel when a project id
//! becomes available and closes the previous one whenever the id changes
//! or goes away.

use manga_core::types::ProjectId;

use crate::channel::{ConnectionState, SyncChannel};
use crate::client::SyncClient;
use crate::queue::QueueConfig;

pub struct ChannelSlot {
    client: SyncClient,
    queue: QueueConfig,
    active: Option<SyncChannel>,
}

impl ChannelSlot {
    pub fn new(client: SyncClient, queue: QueueConfig) -> Self {
        Self {
            client,
            queue,
            active: None,
        }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn queue_config(&self) -> QueueConfig {
        self.queue
    }

    /// The open channel, if any.
    pub fn channel(&self) -> Option<&SyncChannel> {
        self.active.as_ref()
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.active.as_ref().map(SyncChannel::project_id)
    }

    /// Make `project_id` the active project.
    ///
    /// Same id as the open channel: no-op. Different id: the old channel
    /// is closed before the new one opens. `None`: the slot is emptied.
    pub async fn switch_to(&mut self, project_id: Option<ProjectId>) {
        if self.project_id() == project_id {
            return;
        }

        self.close().await;

        if let Some(project_id) = project_id {
            tracing::info!(project_id = %project_id, "Opening sync channel");
            self.active = Some(SyncChannel::open(&self.client, project_id, self.queue));
        }
    }

    /// Replace the open channel for the same project, e.g. after a
    /// successful reconnect. A channel for another project goes through
    /// the same close-then-install path as [`switch_to`](Self::switch_to).
    pub async fn install(&mut self, channel: SyncChannel) {
        self.close().await;
        tracing::debug!(project_id = %channel.project_id(), "Installing sync channel");
        self.active = Some(channel);
    }

    /// Whether the open channel has dropped and needs replacing.
    pub fn needs_reconnect(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|c| c.state() == ConnectionState::Disconnected)
    }

    /// Close and forget the open channel.
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.active.take() {
            channel.close().await;
        }
    }
}
