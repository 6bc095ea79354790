//! Editor session.
//!
//! [`EditorSession`] owns every piece of editor state for one run: the
//! project store, its local storage, the single sync channel slot, and
//! the backend API client. Local edits are applied to the store first
//! and then announced on the channel; inbound events are drained from the
//! channel's queue and reconciled into the store.

use manga_core::error::CoreError;
use manga_core::model::{Point, Project, ProjectStatus, TrainingStatus};
use manga_core::patch::{CharacterPatch, PanelPatch, ProjectPatch};
use manga_core::placement::{resolve_drop, CanvasGeometry, DropOutcome};
use manga_core::types::{CharacterId, PageId, PanelId, ProjectId};
use manga_realtime::api::{MangaApi, NewCharacter};
use manga_realtime::reconcile::{reconcile_message, Reconciled};
use manga_realtime::reconnect::{reconnect_loop, ReconnectConfig};
use manga_realtime::{
    ChannelSlot, InboundMessage, OutboundMessage, SyncChannel, SyncClient, SyncError,
};
use manga_store::{LocalStorage, ProjectStore};
use tokio_util::sync::CancellationToken;

use crate::config::EditorConfig;
use crate::error::SessionError;

/// Fate of an outbound intent after the local update succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open channel.
    Sent,
    /// No connected channel; the backend was not told.
    Dropped,
}

pub struct EditorSession {
    config: EditorConfig,
    store: ProjectStore,
    storage: LocalStorage,
    slot: ChannelSlot,
    api: MangaApi,
}

impl EditorSession {
    /// Restore persisted state and open the channel for the current
    /// project, if there is one.
    ///
    /// `config.project_id` overrides the persisted current project when
    /// it names a project in the persisted list. A persisted current
    /// project with that id is kept as is.
    pub async fn start(config: EditorConfig) -> Result<Self, SessionError> {
        let storage = LocalStorage::new(config.storage_dir.clone()).await?;
        let mut store = ProjectStore::from_persisted(storage.load().await?);

        let switch_to = config
            .project_id
            .filter(|id| store.current_project_id() != Some(*id));
        if let Some(id) = switch_to {
            let chosen = store
                .projects()
                .iter()
                .find(|p| p.id == id)
                .map(|p| (**p).clone());
            match chosen {
                Some(project) => store.set_project(project),
                None => tracing::warn!(project_id = %id, "Configured project not in persisted list"),
            }
        }

        let slot = ChannelSlot::new(SyncClient::new(&config.ws_url), config.queue);
        let api = MangaApi::new(&config.api_url, config.auth_token.clone());

        let mut session = Self {
            config,
            store,
            storage,
            slot,
            api,
        };
        session.sync_channel().await;

        tracing::info!(
            project_id = ?session.store.current_project_id(),
            projects = session.store.projects().len(),
            "Editor session started",
        );
        Ok(session)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn api(&self) -> &MangaApi {
        &self.api
    }

    /// The open sync channel, if any.
    pub fn channel(&self) -> Option<&SyncChannel> {
        self.slot.channel()
    }

    /// Replace the open channel, e.g. with one built over an existing
    /// stream. A channel for a project other than the current one is
    /// rejected.
    pub async fn attach_channel(&mut self, channel: SyncChannel) -> Result<(), SessionError> {
        let current = self.current_id()?;
        if channel.project_id() != current {
            return Err(CoreError::Conflict(format!(
                "channel for {} does not match current project {current}",
                channel.project_id()
            ))
            .into());
        }
        self.slot.install(channel).await;
        Ok(())
    }

    // ---- projects ----

    /// Make `project` current, remember it in the project list, and move
    /// the channel over to it. The outgoing project's list entry already
    /// carries its latest edits.
    pub async fn open_project(&mut self, project: Project) -> Result<(), SessionError> {
        let id = project.id;
        let mut projects: Vec<Project> = self
            .store
            .projects()
            .iter()
            .filter(|p| p.id != id)
            .map(|p| (**p).clone())
            .collect();
        projects.insert(0, project.clone());
        self.store.set_projects(projects);
        self.store.set_project(project);

        self.sync_channel().await;
        self.save().await?;
        tracing::info!(project_id = %id, "Project opened");
        Ok(())
    }

    /// Refresh the project list from the backend.
    pub async fn refresh_projects(&mut self) -> Result<usize, SessionError> {
        let records = self.api.list_projects().await?;
        let count = records.len();
        self.store
            .set_projects(records.into_iter().map(|r| r.into_project()).collect());
        self.save().await?;
        Ok(count)
    }

    /// Unload the current project and close its channel.
    pub async fn close_project(&mut self) -> Result<(), SessionError> {
        self.store.clear_project();
        self.sync_channel().await;
        self.save().await
    }

    // ---- edits ----

    /// Apply a panel edit locally, persist it, then announce it on the
    /// channel.
    ///
    /// The local update stands even when the announcement is dropped.
    pub async fn edit_panel(&mut self, panel_id: PanelId, changes: PanelPatch) -> Result<Delivery, SessionError> {
        self.store.update_panel(panel_id, &changes)?;
        self.save().await?;
        self.announce(&OutboundMessage::EditPanel { panel_id, changes })
    }

    /// Ask the backend to redraw a panel. Goes over the channel when it is
    /// connected, otherwise over HTTP.
    pub async fn regenerate_panel(
        &mut self,
        panel_id: PanelId,
        modifications: PanelPatch,
    ) -> Result<Delivery, SessionError> {
        if self.store.panel(panel_id).is_none() {
            return Err(CoreError::not_found("panel", panel_id).into());
        }
        let message = OutboundMessage::RegeneratePanel {
            panel_id,
            modifications: modifications.clone(),
        };
        if self.announce(&message)? == Delivery::Sent {
            return Ok(Delivery::Sent);
        }

        let response = self.api.regenerate_panel(panel_id, &modifications).await?;
        tracing::info!(panel_id = %panel_id, status = %response.status, "Panel regeneration requested over HTTP");
        Ok(Delivery::Sent)
    }

    /// Resolve a drop gesture on a page and apply the resulting move.
    pub async fn drop_panel(
        &mut self,
        page_id: PageId,
        dragged: PanelId,
        point: Point,
        canvas: &CanvasGeometry,
    ) -> Result<DropOutcome, SessionError> {
        let page = self
            .store
            .page(page_id)
            .ok_or_else(|| CoreError::not_found("page", page_id))?;
        let outcome = resolve_drop(&page.layout, &page.panel_ids(), dragged, point, canvas)?;

        if let DropOutcome::Move { from, to } = outcome {
            self.store.move_panel(page_id, from, to)?;
            self.save().await?;
        }
        Ok(outcome)
    }

    // ---- generation and characters ----

    /// Start generating the current project. Uses the channel when it is
    /// connected, otherwise the HTTP endpoint.
    pub async fn start_generation(&mut self) -> Result<(), SessionError> {
        let project_id = self.current_id()?;
        if self.announce(&OutboundMessage::StartGeneration)? == Delivery::Dropped {
            self.api.start_generation(project_id).await?;
        }
        self.store
            .update_project(&ProjectPatch::status(ProjectStatus::Generating))?;
        self.save().await
    }

    /// Create a character on the backend and add it to the current project.
    pub async fn create_character(&mut self, character: &NewCharacter) -> Result<CharacterId, SessionError> {
        let project_id = self.current_id()?;
        let record = self.api.create_character(project_id, character).await?;
        let character = record.into_character();
        let id = character.id;
        self.store.add_character(character)?;
        self.save().await?;
        Ok(id)
    }

    /// Trigger training; the character moves to `training` once the
    /// backend accepts.
    pub async fn train_character(&mut self, id: CharacterId) -> Result<(), SessionError> {
        let character = self
            .store
            .character(id)
            .ok_or_else(|| CoreError::not_found("character", id))?;
        if !character.lora_status.can_transition_to(TrainingStatus::Training) {
            return Err(CoreError::InvalidTransition {
                from: character.lora_status,
                to: TrainingStatus::Training,
            }
            .into());
        }

        self.api.train_character(id).await?;
        self.store
            .update_character(id, &CharacterPatch::status(TrainingStatus::Training))?;
        self.save().await
    }

    // ---- inbound ----

    /// Reconcile everything queued on the channel and persist the result.
    /// Returns the number of events that changed the store. Failures are
    /// logged and skipped.
    pub async fn pump(&mut self) -> Result<usize, SessionError> {
        let Some(channel) = self.slot.channel() else {
            return Ok(0);
        };
        let messages = channel.inbound().drain();

        let mut applied = 0;
        for message in &messages {
            if self.reconcile(message) {
                applied += 1;
            }
        }
        if applied > 0 {
            self.save().await?;
        }
        Ok(applied)
    }

    /// Process inbound events until `shutdown` fires or the channel ends
    /// (and is not reopened). State is saved after every applied event.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SessionError> {
        loop {
            let Some(queue) = self.slot.channel().map(SyncChannel::inbound) else {
                tracing::info!("No project loaded, waiting for shutdown");
                shutdown.cancelled().await;
                return Ok(());
            };

            let next = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = queue.pop() => next,
            };

            match next {
                Some(message) => {
                    if self.reconcile(&message) {
                        self.save().await?;
                    }
                }
                None if self.config.reconnect => {
                    if !self.reconnect(&shutdown).await {
                        return Ok(());
                    }
                }
                None => {
                    tracing::warn!("Sync channel disconnected, reconnect disabled");
                    return Ok(());
                }
            }
        }
    }

    // ---- lifecycle ----

    pub async fn save(&self) -> Result<(), SessionError> {
        self.storage.save(&self.store.snapshot()).await?;
        Ok(())
    }

    /// Close the channel and persist state.
    pub async fn shutdown(mut self) -> Result<(), SessionError> {
        self.slot.close().await;
        self.save().await?;
        tracing::info!("Editor session shut down");
        Ok(())
    }

    // ---- private helpers ----

    fn current_id(&self) -> Result<ProjectId, CoreError> {
        self.store.current_project_id().ok_or(CoreError::NoProjectLoaded)
    }

    /// Point the channel slot at the current project.
    async fn sync_channel(&mut self) {
        self.slot.switch_to(self.store.current_project_id()).await;
    }

    fn announce(&self, message: &OutboundMessage) -> Result<Delivery, SessionError> {
        let Some(channel) = self.slot.channel() else {
            tracing::warn!(kind = message.kind(), "No sync channel open, message dropped");
            return Ok(Delivery::Dropped);
        };
        match channel.send(message) {
            Ok(()) => Ok(Delivery::Sent),
            Err(SyncError::NotConnected { .. }) => Ok(Delivery::Dropped),
            Err(e) => Err(e.into()),
        }
    }

    fn reconcile(&mut self, message: &InboundMessage) -> bool {
        match reconcile_message(&mut self.store, message) {
            Ok(Reconciled::Applied) => true,
            Ok(Reconciled::Progress { percent, stage }) => {
                tracing::info!(percent, stage = ?stage, "Generation progress");
                true
            }
            Ok(Reconciled::Ignored) => false,
            Err(e) => {
                tracing::warn!(kind = %message.kind, error = %e, "Inbound event not applied");
                false
            }
        }
    }

    /// Replace a dropped channel. Returns `false` when cancelled.
    async fn reconnect(&mut self, shutdown: &CancellationToken) -> bool {
        let Ok(project_id) = self.current_id() else {
            return false;
        };
        let channel = reconnect_loop(
            self.slot.client(),
            project_id,
            self.slot.queue_config(),
            &ReconnectConfig::default(),
            shutdown,
        )
        .await;

        match channel {
            Some(channel) => {
                self.slot.install(channel).await;
                true
            }
            None => false,
        }
    }
}
