//! Sync channel message types and parser.
//!
//! Every frame is a JSON text message tagged by a `"type"` field.
//! Outbound messages carry their payload inline
//! (`{"type":"edit_panel","panelId":..., "changes":{...}}`); inbound
//! messages wrap theirs in `"data"` (`{"type":"panel_generated","data":{...}}`).
//!
//! The inbound schema belongs to the backend, so [`InboundMessage`] keeps
//! the payload opaque and [`InboundEvent::interpret`] maps the types the
//! editor understands onto typed variants.

use manga_core::model::{Project, TrainingStatus};
use manga_core::patch::PanelPatch;
use manga_core::types::{CharacterId, PageId, PanelId};
use serde::{Deserialize, Serialize};

/// Well-known `"type"` values.
pub mod msg_types {
    pub const START_GENERATION: &str = "start_generation";
    pub const EDIT_PANEL: &str = "edit_panel";
    pub const REGENERATE_PANEL: &str = "regenerate_panel";

    pub const GENERATION_PROGRESS: &str = "generation_progress";
    pub const PANEL_GENERATED: &str = "panel_generated";
    pub const PAGE_COMPLETED: &str = "page_completed";
    pub const GENERATION_COMPLETED: &str = "generation_completed";
    pub const GENERATION_ERROR: &str = "generation_error";
    pub const CHARACTER_TRAINING: &str = "character_training";
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Intent messages pushed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Kick off generation of the whole project.
    StartGeneration,

    /// A local edit to one panel.
    EditPanel {
        #[serde(rename = "panelId")]
        panel_id: PanelId,
        changes: PanelPatch,
    },

    /// Ask the backend to redraw one panel with modifications.
    RegeneratePanel {
        #[serde(rename = "panelId")]
        panel_id: PanelId,
        modifications: PanelPatch,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartGeneration => msg_types::START_GENERATION,
            Self::EditPanel { .. } => msg_types::EDIT_PANEL,
            Self::RegeneratePanel { .. } => msg_types::REGENERATE_PANEL,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Raw inbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl InboundMessage {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Parse an inbound text frame.
///
/// Returns `Err` for malformed JSON or a missing `type`. Unknown types
/// parse fine and surface as [`InboundEvent::Other`].
pub fn parse_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Inbound messages the editor knows how to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Generation moved forward.
    GenerationProgress {
        /// Completion percentage (0-100).
        percent: u8,
        stage: Option<String>,
    },

    /// A panel image finished rendering.
    PanelGenerated { panel_id: PanelId, image_url: String },

    /// A full page was composed.
    PageCompleted { page_id: PageId, image_url: String },

    /// Generation finished; may carry the regenerated project tree.
    GenerationCompleted { project: Option<Box<Project>> },

    GenerationError { error: String },

    /// A character's training status changed.
    CharacterTraining {
        character_id: CharacterId,
        status: TrainingStatus,
        lora_path: Option<String>,
    },

    /// Any type this editor does not interpret.
    Other { kind: String },
}

#[derive(Deserialize)]
struct ProgressData {
    #[serde(default)]
    percent: f64,
    #[serde(default)]
    stage: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelGeneratedData {
    panel_id: PanelId,
    image_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageCompletedData {
    page_id: PageId,
    full_page_image: String,
}

#[derive(Deserialize)]
struct CompletedData {
    #[serde(default)]
    project: Option<Box<Project>>,
}

#[derive(Deserialize)]
struct ErrorData {
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrainingData {
    character_id: CharacterId,
    status: TrainingStatus,
    #[serde(default)]
    lora_path: Option<String>,
}

impl InboundEvent {
    /// Interpret an envelope. Fails only when a known type carries a
    /// payload that does not match its schema.
    pub fn interpret(message: &InboundMessage) -> Result<Self, serde_json::Error> {
        let data = || message.data.clone();
        let event = match message.kind.as_str() {
            msg_types::GENERATION_PROGRESS => {
                let d: ProgressData = serde_json::from_value(data())?;
                InboundEvent::GenerationProgress {
                    percent: d.percent.clamp(0.0, 100.0).round() as u8,
                    stage: d.stage,
                }
            }
            msg_types::PANEL_GENERATED => {
                let d: PanelGeneratedData = serde_json::from_value(data())?;
                InboundEvent::PanelGenerated {
                    panel_id: d.panel_id,
                    image_url: d.image_url,
                }
            }
            msg_types::PAGE_COMPLETED => {
                let d: PageCompletedData = serde_json::from_value(data())?;
                InboundEvent::PageCompleted {
                    page_id: d.page_id,
                    image_url: d.full_page_image,
                }
            }
            msg_types::GENERATION_COMPLETED => {
                // A bare `{"type":"generation_completed"}` carries no data.
                let d: CompletedData = if message.data.is_null() {
                    CompletedData { project: None }
                } else {
                    serde_json::from_value(data())?
                };
                InboundEvent::GenerationCompleted { project: d.project }
            }
            msg_types::GENERATION_ERROR => {
                let d: ErrorData = serde_json::from_value(data())?;
                InboundEvent::GenerationError { error: d.error }
            }
            msg_types::CHARACTER_TRAINING => {
                let d: TrainingData = serde_json::from_value(data())?;
                InboundEvent::CharacterTraining {
                    character_id: d.character_id,
                    status: d.status,
                    lora_path: d.lora_path,
                }
            }
            other => InboundEvent::Other {
                kind: other.to_string(),
            },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn start_generation_serializes_as_bare_tag() {
        let json = serde_json::to_value(OutboundMessage::StartGeneration).unwrap();
        assert_eq!(json, serde_json::json!({"type": "start_generation"}));
    }

    #[test]
    fn edit_panel_serializes_flat_with_changes() {
        let id = uuid::Uuid::new_v4();
        let msg = OutboundMessage::EditPanel {
            panel_id: id,
            changes: PanelPatch::description("storm clouds"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "edit_panel");
        assert_eq!(json["panelId"], id.to_string());
        assert_eq!(json["changes"], serde_json::json!({"description": "storm clouds"}));
        assert_eq!(msg.kind(), msg_types::EDIT_PANEL);
    }

    #[test]
    fn parse_envelope_keeps_payload_opaque() {
        let msg = parse_inbound(r#"{"type":"queue_status","data":{"depth":3}}"#).unwrap();
        assert_eq!(msg.kind, "queue_status");
        assert_eq!(msg.data["depth"], 3);
        assert_matches!(
            InboundEvent::interpret(&msg).unwrap(),
            InboundEvent::Other { kind } if kind == "queue_status"
        );
    }

    #[test]
    fn parse_envelope_without_data() {
        let msg = parse_inbound(r#"{"type":"generation_completed"}"#).unwrap();
        assert!(msg.data.is_null());
        assert_eq!(
            InboundEvent::interpret(&msg).unwrap(),
            InboundEvent::GenerationCompleted { project: None }
        );
    }

    #[test]
    fn parse_rejects_missing_type_and_garbage() {
        assert!(parse_inbound(r#"{"data":{}}"#).is_err());
        assert!(parse_inbound("not json at all").is_err());
    }

    #[test]
    fn interpret_progress_clamps_percent() {
        let msg = InboundMessage::new(
            msg_types::GENERATION_PROGRESS,
            serde_json::json!({"percent": 140.2, "stage": "inking"}),
        );
        assert_eq!(
            InboundEvent::interpret(&msg).unwrap(),
            InboundEvent::GenerationProgress {
                percent: 100,
                stage: Some("inking".into())
            }
        );
    }

    #[test]
    fn interpret_panel_generated() {
        let id = uuid::Uuid::new_v4();
        let msg = InboundMessage::new(
            msg_types::PANEL_GENERATED,
            serde_json::json!({"panelId": id, "imageUrl": "https://cdn/x.png"}),
        );
        assert_eq!(
            InboundEvent::interpret(&msg).unwrap(),
            InboundEvent::PanelGenerated {
                panel_id: id,
                image_url: "https://cdn/x.png".into()
            }
        );
    }

    #[test]
    fn interpret_character_training() {
        let id = uuid::Uuid::new_v4();
        let msg = InboundMessage::new(
            msg_types::CHARACTER_TRAINING,
            serde_json::json!({"characterId": id, "status": "completed", "loraPath": "l/x"}),
        );
        assert_eq!(
            InboundEvent::interpret(&msg).unwrap(),
            InboundEvent::CharacterTraining {
                character_id: id,
                status: TrainingStatus::Completed,
                lora_path: Some("l/x".into())
            }
        );
    }

    #[test]
    fn interpret_known_type_with_bad_payload_fails() {
        let msg = InboundMessage::new(msg_types::PANEL_GENERATED, serde_json::json!({"panelId": 5}));
        assert!(InboundEvent::interpret(&msg).is_err());
    }
}
