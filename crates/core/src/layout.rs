//! Layout descriptor resolution.
//!
//! Maps a page's [`Layout`] and its panel count to one concrete
//! [`Placement`] per panel, in panel-sequence order. Pure and
//! deterministic: identical inputs always produce identical placements.

use crate::error::CoreError;
use crate::model::{Layout, LayoutKind, Rect};

// ---------------------------------------------------------------------------
// Canvas defaults
// ---------------------------------------------------------------------------

/// Column count the canvas falls back to when a standard layout carries zero.
pub const DEFAULT_COLUMNS: u32 = 2;

/// Row count the canvas falls back to when a standard layout carries zero.
pub const DEFAULT_ROWS: u32 = 3;

/// Spacing between grid cells, in pixels.
pub const GRID_GAP_PX: f64 = 10.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The concrete spot assigned to one panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Zero-based grid cell of a standard layout.
    Cell { row: u32, column: u32 },
    /// Named area of a dynamic layout.
    Area {
        name: String,
        aspect_ratio: Option<f64>,
        /// Declared rectangle in normalized canvas units, if any.
        bounds: Option<Rect>,
    },
    /// The whole canvas (splash page).
    FullPage,
}

/// Placements for every panel of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayout {
    pub kind: LayoutKind,
    pub columns: u32,
    pub rows: u32,
    pub placements: Vec<Placement>,
}

impl ResolvedLayout {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn placement(&self, index: usize) -> Option<&Placement> {
        self.placements.get(index)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve `layout` for a page holding `panel_count` panels.
///
/// - `standard`: panel `i` lands on row `i / columns`, column `i % columns`.
///   A panel beyond `columns * rows` is an [`CoreError::InvalidLayout`].
/// - `dynamic`: panel `i` takes the i-th explicit placement; fewer
///   placements than panels is a [`CoreError::LayoutMismatch`]. Surplus
///   placements are unused.
/// - `splash`: panel 0 takes the full page; any further panel is an
///   [`CoreError::InvalidLayout`].
pub fn resolve_layout(layout: &Layout, panel_count: usize) -> Result<ResolvedLayout, CoreError> {
    match layout.kind {
        LayoutKind::Standard => resolve_standard(layout, panel_count),
        LayoutKind::Dynamic => resolve_dynamic(layout, panel_count),
        LayoutKind::Splash => resolve_splash(panel_count),
    }
}

/// Validate the structural invariants of a layout independent of any page.
pub fn validate_layout(layout: &Layout) -> Result<(), CoreError> {
    if layout.kind == LayoutKind::Standard && (layout.columns == 0 || layout.rows == 0) {
        return Err(CoreError::InvalidLayout(format!(
            "standard layout needs at least one column and one row, got {}x{}",
            layout.columns, layout.rows
        )));
    }
    Ok(())
}

fn resolve_standard(layout: &Layout, panel_count: usize) -> Result<ResolvedLayout, CoreError> {
    validate_layout(layout)?;

    let columns = layout.columns as usize;
    let capacity = columns * layout.rows as usize;
    if panel_count > capacity {
        return Err(CoreError::InvalidLayout(format!(
            "panel {capacity} has no cell in a {}x{} grid ({panel_count} panels)",
            layout.columns, layout.rows
        )));
    }

    let placements = (0..panel_count)
        .map(|i| Placement::Cell {
            row: (i / columns) as u32,
            column: (i % columns) as u32,
        })
        .collect();

    Ok(ResolvedLayout {
        kind: LayoutKind::Standard,
        columns: layout.columns,
        rows: layout.rows,
        placements,
    })
}

fn resolve_dynamic(layout: &Layout, panel_count: usize) -> Result<ResolvedLayout, CoreError> {
    if layout.panels.len() < panel_count {
        return Err(CoreError::LayoutMismatch {
            placements: layout.panels.len(),
            panels: panel_count,
        });
    }

    let placements = layout
        .panels
        .iter()
        .take(panel_count)
        .map(|p| Placement::Area {
            name: p.grid_area.clone(),
            aspect_ratio: p.aspect_ratio,
            bounds: p.bounds,
        })
        .collect();

    Ok(ResolvedLayout {
        kind: LayoutKind::Dynamic,
        columns: layout.columns,
        rows: layout.rows,
        placements,
    })
}

fn resolve_splash(panel_count: usize) -> Result<ResolvedLayout, CoreError> {
    if panel_count > 1 {
        return Err(CoreError::InvalidLayout(format!(
            "splash layout holds a single panel, got {panel_count}"
        )));
    }

    Ok(ResolvedLayout {
        kind: LayoutKind::Splash,
        columns: 1,
        rows: 1,
        placements: (0..panel_count).map(|_| Placement::FullPage).collect(),
    })
}

// ---------------------------------------------------------------------------
// CSS grid template
// ---------------------------------------------------------------------------

/// CSS grid properties for rendering a page canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridTemplate {
    pub template_columns: Option<String>,
    pub template_rows: Option<String>,
    pub template_areas: Option<String>,
    pub gap: Option<String>,
}

/// Compute the grid template the canvas renders for `layout`.
///
/// Standard layouts with zero columns or rows fall back to
/// [`DEFAULT_COLUMNS`] / [`DEFAULT_ROWS`]. Dynamic layouts stack one
/// area per row (`"panel0" "panel1" ...`). Splash pages need no grid.
pub fn grid_template(layout: &Layout) -> GridTemplate {
    let gap = Some(format!("{GRID_GAP_PX}px"));
    match layout.kind {
        LayoutKind::Standard => {
            let columns = if layout.columns == 0 {
                DEFAULT_COLUMNS
            } else {
                layout.columns
            };
            let rows = if layout.rows == 0 {
                DEFAULT_ROWS
            } else {
                layout.rows
            };
            GridTemplate {
                template_columns: Some(format!("repeat({columns}, 1fr)")),
                template_rows: Some(format!("repeat({rows}, 1fr)")),
                template_areas: None,
                gap,
            }
        }
        LayoutKind::Dynamic => {
            let areas = (0..layout.panels.len())
                .map(|i| format!("\"panel{i}\""))
                .collect::<Vec<_>>()
                .join(" ");
            GridTemplate {
                template_areas: Some(areas),
                gap,
                ..Default::default()
            }
        }
        LayoutKind::Splash => GridTemplate::default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
