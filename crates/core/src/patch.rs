//! Partial updates for project tree entities.
//!
//! Every field is optional; `None` leaves the target field untouched.
//! Patches double as the `changes` payload of outbound `edit_panel`
//! messages, so they serialize without the absent fields.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{
    Chapter, Character, Dialogue, MangaStyle, Panel, Project, ProjectStatus, Rect, SoundEffect,
    TrainingStatus,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<MangaStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// Replaces the whole chapter sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Arc<Chapter>>>,
}

impl ProjectPatch {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether applying this patch replaces the chapter tree.
    pub fn replaces_tree(&self) -> bool {
        self.chapters.is_some()
    }

    pub fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(synopsis) = &self.synopsis {
            project.synopsis = synopsis.clone();
        }
        if let Some(style) = self.style {
            project.style = style;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(chapters) = &self.chapters {
            project.chapters = chapters.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Vec<Dialogue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_effects: Option<Vec<SoundEffect>>,
}

impl PanelPatch {
    pub fn description(text: impl Into<String>) -> Self {
        Self {
            description: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.dialogue.is_none()
            && self.image_url.is_none()
            && self.bounds.is_none()
            && self.sound_effects.is_none()
    }

    pub fn apply(&self, panel: &mut Panel) {
        if let Some(description) = &self.description {
            panel.description = description.clone();
        }
        if let Some(dialogue) = &self.dialogue {
            panel.dialogue = dialogue.clone();
        }
        if let Some(url) = &self.image_url {
            panel.image_url = Some(url.clone());
        }
        if let Some(bounds) = self.bounds {
            panel.bounds = Some(bounds);
        }
        if let Some(effects) = &self.sound_effects {
            panel.sound_effects = Some(effects.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_status: Option<TrainingStatus>,
}

impl CharacterPatch {
    pub fn status(status: TrainingStatus) -> Self {
        Self {
            lora_status: Some(status),
            ..Default::default()
        }
    }

    /// Merge into `character`.
    ///
    /// The training status transition is checked before any field is
    /// written, so a rejected patch leaves the character untouched.
    pub fn apply(&self, character: &mut Character) -> Result<(), CoreError> {
        if let Some(next) = self.lora_status {
            if !character.lora_status.can_transition_to(next) {
                return Err(CoreError::InvalidTransition {
                    from: character.lora_status,
                    to: next,
                });
            }
        }

        if let Some(name) = &self.name {
            character.name = name.clone();
        }
        if let Some(description) = &self.description {
            character.description = description.clone();
        }
        if let Some(visual) = &self.visual_description {
            character.visual_description = visual.clone();
        }
        if let Some(images) = &self.reference_images {
            character.reference_images = images.clone();
        }
        if let Some(path) = &self.lora_path {
            character.lora_path = Some(path.clone());
        }
        if let Some(status) = self.lora_status {
            character.lora_status = status;
        }
        Ok(())
    }
}
