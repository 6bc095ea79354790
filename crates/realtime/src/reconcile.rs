//! Apply inbound sync events to the project store.
//!
//! Each event becomes one targeted store update. Updates are
//! last-write-wins per field; no ordering with local edits is assumed.

use manga_core::error::CoreError;
use manga_core::model::ProjectStatus;
use manga_core::patch::{CharacterPatch, PanelPatch, ProjectPatch};
use manga_store::ProjectStore;

use crate::messages::{InboundEvent, InboundMessage};

/// What an event did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// The store was updated.
    Applied,
    /// Generation progress. The project is marked `generating`; the
    /// percentage is for the caller to display.
    Progress { percent: u8, stage: Option<String> },
    /// Nothing in the store corresponds to this event.
    Ignored,
}

/// Interpret and apply one raw inbound envelope.
pub fn reconcile_message(
    store: &mut ProjectStore,
    message: &InboundMessage,
) -> Result<Reconciled, CoreError> {
    let event = InboundEvent::interpret(message).map_err(|e| {
        CoreError::Validation(format!("malformed `{}` payload: {e}", message.kind))
    })?;
    apply_event(store, &event)
}

pub fn apply_event(store: &mut ProjectStore, event: &InboundEvent) -> Result<Reconciled, CoreError> {
    match event {
        InboundEvent::GenerationProgress { percent, stage } => {
            mark_generating(store)?;
            Ok(Reconciled::Progress {
                percent: *percent,
                stage: stage.clone(),
            })
        }
        InboundEvent::PanelGenerated {
            panel_id,
            image_url,
        } => {
            store.update_panel(*panel_id, &PanelPatch::image_url(image_url.clone()))?;
            tracing::debug!(panel_id = %panel_id, "Panel image reconciled");
            Ok(Reconciled::Applied)
        }
        InboundEvent::PageCompleted { page_id, image_url } => {
            store.set_page_image(*page_id, image_url.clone())?;
            tracing::debug!(page_id = %page_id, "Page image reconciled");
            Ok(Reconciled::Applied)
        }
        InboundEvent::GenerationCompleted { project: Some(project) } => {
            let current = store.current_project_id().ok_or(CoreError::NoProjectLoaded)?;
            if project.id != current {
                return Err(CoreError::Conflict(format!(
                    "completed project {} is not the current project {current}",
                    project.id
                )));
            }
            store.set_project((**project).clone());
            tracing::info!(project_id = %current, "Generated project tree installed");
            Ok(Reconciled::Applied)
        }
        InboundEvent::GenerationCompleted { project: None } => {
            store.update_project(&ProjectPatch::status(ProjectStatus::Completed))?;
            tracing::info!("Generation completed");
            Ok(Reconciled::Applied)
        }
        InboundEvent::GenerationError { error } => {
            store.update_project(&ProjectPatch::status(ProjectStatus::Error))?;
            tracing::warn!(error = %error, "Generation failed");
            Ok(Reconciled::Applied)
        }
        InboundEvent::CharacterTraining {
            character_id,
            status,
            lora_path,
        } => {
            let patch = CharacterPatch {
                lora_status: Some(*status),
                lora_path: lora_path.clone(),
                ..Default::default()
            };
            store.update_character(*character_id, &patch)?;
            tracing::debug!(character_id = %character_id, status = %status, "Character training reconciled");
            Ok(Reconciled::Applied)
        }
        InboundEvent::Other { kind } => {
            tracing::debug!(kind = %kind, "Ignoring unhandled inbound message");
            Ok(Reconciled::Ignored)
        }
    }
}

// ---- private helpers ----

/// Progress updates arrive many times per run; only the first one writes.
fn mark_generating(store: &mut ProjectStore) -> Result<(), CoreError> {
    let project = store.current_project().ok_or(CoreError::NoProjectLoaded)?;
    if project.status != ProjectStatus::Generating {
        store.update_project(&ProjectPatch::status(ProjectStatus::Generating))?;
    }
    Ok(())
}
