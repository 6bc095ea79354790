//! Project tree entities.
//!
//! A [`Project`] owns its chapters, pages, panels, and characters. Children
//! are held behind [`Arc`] so that a targeted update can rebuild only the
//! path from the project root to the changed entity while every untouched
//! sub-tree stays pointer-identical (see `manga_store`).
//!
//! JSON field names are camelCase to match the persisted blob and the
//! backend wire format.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{ChapterId, CharacterId, PageId, PanelId, ProjectId, Timestamp};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Target manga demographic style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MangaStyle {
    #[default]
    Shonen,
    Shojo,
    Seinen,
    Josei,
    Kodomo,
}

/// Lifecycle status of a project as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Generating,
    Completed,
    Error,
}

/// Training status of a character's dedicated model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    #[default]
    Pending,
    Training,
    Completed,
    Failed,
}

impl TrainingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Training => "training",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Status only moves forward (`pending -> training -> completed|failed`).
    /// A retry resets a finished run back to `training`. Re-reporting the
    /// current status is accepted.
    pub fn can_transition_to(self, next: TrainingStatus) -> bool {
        use TrainingStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Training)
                | (Training, Training)
                | (Training, Completed)
                | (Training, Failed)
                | (Completed, Completed)
                | (Completed, Training)
                | (Failed, Failed)
                | (Failed, Training)
        )
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lettering style for an onomatopoeia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundEffectStyle {
    Impact,
    Whisper,
    Echo,
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Scale a rectangle expressed in normalized canvas units to pixels.
    pub fn scaled(&self, width: f64, height: f64) -> Rect {
        Rect {
            x: self.x * width,
            y: self.y * height,
            width: self.width * width,
            height: self.height * height,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Regular grid, panels assigned row-major.
    Standard,
    /// One explicit placement per panel, by position.
    Dynamic,
    /// A single full-page panel.
    Splash,
}

/// Placement record for one panel of a `dynamic` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelLayout {
    /// Named grid-area token, e.g. `panel0`.
    pub grid_area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    /// Explicit area in normalized canvas units (`0..=1` on both axes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
}

impl PanelLayout {
    pub fn area(grid_area: impl Into<String>) -> Self {
        Self {
            grid_area: grid_area.into(),
            aspect_ratio: None,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: f64) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }
}

/// How a page arranges its panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(rename = "type")]
    pub kind: LayoutKind,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub panels: Vec<PanelLayout>,
}

impl Layout {
    pub fn standard(columns: u32, rows: u32) -> Self {
        Self {
            kind: LayoutKind::Standard,
            columns,
            rows,
            panels: Vec::new(),
        }
    }

    pub fn dynamic(panels: Vec<PanelLayout>) -> Self {
        Self {
            kind: LayoutKind::Dynamic,
            columns: 0,
            rows: 0,
            panels,
        }
    }

    pub fn splash() -> Self {
        Self {
            kind: LayoutKind::Splash,
            columns: 1,
            rows: 1,
            panels: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree entities
// ---------------------------------------------------------------------------

/// One spoken line. `character` is the speaker's display name, not a
/// [`Character`] id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    pub character: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEffect {
    pub text: String,
    pub style: SoundEffectStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: PanelId,
    /// Ordinal within the page, unique per page.
    pub panel_number: u32,
    #[serde(default)]
    pub description: String,
    /// Reading order is meaningful.
    #[serde(default)]
    pub dialogue: Vec<Dialogue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_effects: Option<Vec<SoundEffect>>,
}

impl Panel {
    pub fn new(panel_number: u32, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            panel_number,
            description: description.into(),
            dialogue: Vec::new(),
            image_url: None,
            bounds: None,
            sound_effects: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub page_number: u32,
    pub layout: Layout,
    #[serde(default)]
    pub panels: Vec<Arc<Panel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_page_image: Option<String>,
}

impl Page {
    pub fn new(page_number: u32, layout: Layout, panels: Vec<Panel>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            page_number,
            layout,
            panels: panels.into_iter().map(Arc::new).collect(),
            full_page_image: None,
        }
    }

    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.panels.iter().map(|p| p.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub pages: Vec<Arc<Page>>,
}

impl Chapter {
    pub fn new(number: u32, title: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            number,
            title: title.into(),
            synopsis: String::new(),
            pages: pages.into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visual_description: String,
    #[serde(default)]
    pub reference_images: Vec<String>,
    /// Reference to the trained model, once available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_path: Option<String>,
    #[serde(default)]
    pub lora_status: TrainingStatus,
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        visual_description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            visual_description: visual_description.into(),
            reference_images: Vec::new(),
            lora_path: None,
            lora_status: TrainingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub style: MangaStyle,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub chapters: Vec<Arc<Chapter>>,
    #[serde(default)]
    pub characters: Vec<Arc<Character>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Create an empty draft project.
    pub fn new(title: impl Into<String>, synopsis: impl Into<String>, style: MangaStyle) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            title: title.into(),
            synopsis: synopsis.into(),
            style,
            status: ProjectStatus::Draft,
            chapters: Vec::new(),
            characters: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters.into_iter().map(Arc::new).collect();
        self
    }

    /// Total number of panels across every chapter and page.
    pub fn panel_count(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(|c| c.pages.iter())
            .map(|p| p.panels.len())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
