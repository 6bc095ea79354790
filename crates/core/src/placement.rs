//! Drag/drop placement engine.
//!
//! Turns a drop gesture (dragged panel, drop point relative to the
//! canvas's top-left corner, canvas size) into a [`DropOutcome`] for the
//! page's panel sequence, using the placements from
//! [`resolve_layout`](crate::layout::resolve_layout).

use crate::error::CoreError;
use crate::layout::{resolve_layout, ResolvedLayout, GRID_GAP_PX};
use crate::model::{Layout, LayoutKind, Point, Rect};
use crate::types::PanelId;

/// Pixel dimensions of the page canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub width: f64,
    pub height: f64,
    /// Spacing between areas; drops may land inside it.
    pub gap: f64,
}

impl CanvasGeometry {
    /// Canvas with the default grid gap.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            gap: GRID_GAP_PX,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(CoreError::Validation(format!(
                "canvas must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(CoreError::Validation(format!(
                "canvas gap must be a non-negative number, got {}",
                self.gap
            )));
        }
        Ok(())
    }
}

/// What a drop does to the panel sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Dropped back onto its own position.
    NoOp,
    /// Relocate the panel at `from` to `to` (remove-then-insert).
    Move { from: usize, to: usize },
}

/// Compute the outcome of dropping `dragged` at `point` on a page.
///
/// `panel_ids` is the page's panel sequence in order. Nothing is mutated;
/// apply a [`DropOutcome::Move`] with [`apply_move`].
pub fn resolve_drop(
    layout: &Layout,
    panel_ids: &[PanelId],
    dragged: PanelId,
    point: Point,
    canvas: &CanvasGeometry,
) -> Result<DropOutcome, CoreError> {
    canvas.validate()?;
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(CoreError::Validation(format!(
            "drop point must be finite, got ({}, {})",
            point.x, point.y
        )));
    }

    let from = panel_ids
        .iter()
        .position(|id| *id == dragged)
        .ok_or_else(|| CoreError::not_found("panel", dragged))?;

    let resolved = resolve_layout(layout, panel_ids.len())?;
    let target = drop_target_index(layout, &resolved, point, canvas)?;

    if target >= panel_ids.len() {
        return Err(CoreError::InvalidDropTarget {
            target,
            panel_count: panel_ids.len(),
        });
    }

    if target == from {
        Ok(DropOutcome::NoOp)
    } else {
        Ok(DropOutcome::Move { from, to: target })
    }
}

/// Map a drop point to a linear index into the panel sequence.
///
/// For `standard` layouts the result may be past the last panel (an
/// empty cell); [`resolve_drop`] turns that into
/// [`CoreError::InvalidDropTarget`].
pub fn drop_target_index(
    layout: &Layout,
    resolved: &ResolvedLayout,
    point: Point,
    canvas: &CanvasGeometry,
) -> Result<usize, CoreError> {
    match resolved.kind {
        LayoutKind::Standard => Ok(grid_index(resolved.columns, resolved.rows, point, canvas)),
        LayoutKind::Dynamic | LayoutKind::Splash => {
            let rects = area_rects(layout, resolved, canvas);
            nearest_area(&rects, point).ok_or(CoreError::InvalidDropTarget {
                target: 0,
                panel_count: resolved.len(),
            })
        }
    }
}

/// Relocate `seq[from]` to index `to`, shifting everything in between by
/// one and preserving the relative order of every other element.
pub fn apply_move<T>(seq: &mut Vec<T>, from: usize, to: usize) -> Result<(), CoreError> {
    let len = seq.len();
    if from >= len {
        return Err(CoreError::InvalidDropTarget {
            target: from,
            panel_count: len,
        });
    }
    if to >= len {
        return Err(CoreError::InvalidDropTarget {
            target: to,
            panel_count: len,
        });
    }
    if from != to {
        let item = seq.remove(from);
        seq.insert(to, item);
    }
    Ok(())
}

// ---- private helpers ----

fn grid_index(columns: u32, rows: u32, point: Point, canvas: &CanvasGeometry) -> usize {
    let x = (point.x / canvas.width).clamp(0.0, 1.0);
    let y = (point.y / canvas.height).clamp(0.0, 1.0);

    // x == 1.0 lands one past the last column; clamp it back.
    let (columns, rows) = (columns as usize, rows as usize);
    let col = ((x * columns as f64).floor() as usize).min(columns - 1);
    let row = ((y * rows as f64).floor() as usize).min(rows - 1);

    row * columns + col
}

/// Pixel rectangles of the placed areas, one per resolved placement.
fn area_rects(layout: &Layout, resolved: &ResolvedLayout, canvas: &CanvasGeometry) -> Vec<Rect> {
    if resolved.kind == LayoutKind::Splash {
        return resolved
            .placements
            .iter()
            .map(|_| Rect::new(0.0, 0.0, canvas.width, canvas.height))
            .collect();
    }

    // Areas without explicit bounds stack as equal-height full-width rows,
    // one row per declared area.
    let slots = layout.panels.len().max(resolved.len()).max(1);
    let gaps = canvas.gap * (slots - 1) as f64;
    let row_height = ((canvas.height - gaps) / slots as f64).max(0.0);

    layout
        .panels
        .iter()
        .take(resolved.len())
        .enumerate()
        .map(|(i, area)| match area.bounds {
            Some(bounds) => bounds.scaled(canvas.width, canvas.height),
            None => Rect::new(
                0.0,
                i as f64 * (row_height + canvas.gap),
                canvas.width,
                row_height,
            ),
        })
        .collect()
}

/// First rectangle containing the point, else the one whose centre is
/// closest. Ties go to the lower index.
fn nearest_area(rects: &[Rect], point: Point) -> Option<usize> {
    if let Some(hit) = rects.iter().position(|r| r.contains(point.x, point.y)) {
        return Some(hit);
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, rect) in rects.iter().enumerate() {
        let c = rect.center();
        let d = (c.x - point.x).powi(2) + (c.y - point.y).powi(2);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::PanelLayout;

    fn ids(n: usize) -> Vec<PanelId> {
        (0..n).map(|_| uuid::Uuid::new_v4()).collect()
    }

    fn pt(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    // -- standard ------------------------------------------------------------

    #[test]
    fn drop_last_panel_on_first_cell_moves_it_to_front() {
        let panels = ids(6);
        let layout = Layout::standard(2, 3);
        let canvas = CanvasGeometry::new(200.0, 300.0);

        let outcome = resolve_drop(&layout, &panels, panels[5], pt(10.0, 10.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 5, to: 0 });

        let mut seq = panels.clone();
        apply_move(&mut seq, 5, 0).unwrap();
        let expected: Vec<PanelId> = std::iter::once(panels[5])
            .chain(panels[..5].iter().copied())
            .collect();
        assert_eq!(seq, expected);
    }

    #[test]
    fn dropping_on_own_cell_is_noop() {
        let panels = ids(6);
        let layout = Layout::standard(2, 3);
        let canvas = CanvasGeometry::new(200.0, 300.0);

        // Panel 3 lives at row 1, column 1.
        let outcome = resolve_drop(&layout, &panels, panels[3], pt(150.0, 150.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::NoOp);
    }

    #[test]
    fn drop_outside_canvas_is_clamped() {
        let panels = ids(6);
        let layout = Layout::standard(2, 3);
        let canvas = CanvasGeometry::new(200.0, 300.0);

        let outcome =
            resolve_drop(&layout, &panels, panels[0], pt(999.0, 999.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 0, to: 5 });

        let outcome = resolve_drop(&layout, &panels, panels[5], pt(-50.0, -1.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 5, to: 0 });
    }

    #[test]
    fn drop_on_right_edge_stays_in_last_column() {
        let panels = ids(4);
        let layout = Layout::standard(2, 2);
        let canvas = CanvasGeometry::new(100.0, 100.0);
        let outcome = resolve_drop(&layout, &panels, panels[0], pt(100.0, 0.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 0, to: 1 });
    }

    #[test]
    fn drop_on_empty_cell_is_invalid_target() {
        let panels = ids(4);
        let layout = Layout::standard(2, 3);
        let canvas = CanvasGeometry::new(200.0, 300.0);

        // Row 2, column 1 -> index 5, but only 4 panels exist.
        let result = resolve_drop(&layout, &panels, panels[0], pt(150.0, 250.0), &canvas);
        assert_matches!(
            result,
            Err(CoreError::InvalidDropTarget { target: 5, panel_count: 4 })
        );
    }

    #[test]
    fn large_grid_index_does_not_overflow() {
        let panels = ids(2);
        let layout = Layout::standard(70_000, 70_000);
        let canvas = CanvasGeometry::new(100.0, 100.0);

        // Bottom row: 69_999 * 70_000 is past u32::MAX.
        let result = resolve_drop(&layout, &panels, panels[0], pt(0.0, 100.0), &canvas);
        assert_matches!(
            result,
            Err(CoreError::InvalidDropTarget { target: 4_899_930_000, panel_count: 2 })
        );

        let outcome = resolve_drop(&layout, &panels, panels[1], pt(0.0, 0.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 1, to: 0 });
    }

    #[test]
    fn unknown_dragged_panel_is_not_found() {
        let panels = ids(2);
        let canvas = CanvasGeometry::new(100.0, 100.0);
        let result = resolve_drop(
            &Layout::standard(2, 1),
            &panels,
            uuid::Uuid::new_v4(),
            pt(0.0, 0.0),
            &canvas,
        );
        assert_matches!(result, Err(CoreError::NotFound { entity: "panel", .. }));
    }

    #[test]
    fn degenerate_canvas_is_rejected() {
        let panels = ids(1);
        let canvas = CanvasGeometry::new(0.0, 100.0);
        let result = resolve_drop(&Layout::splash(), &panels, panels[0], pt(0.0, 0.0), &canvas);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn layout_errors_propagate() {
        let panels = ids(3);
        let canvas = CanvasGeometry::new(100.0, 100.0);
        let layout = Layout::dynamic(vec![PanelLayout::area("a")]);
        let result = resolve_drop(&layout, &panels, panels[0], pt(0.0, 0.0), &canvas);
        assert_matches!(result, Err(CoreError::LayoutMismatch { placements: 1, panels: 3 }));
    }

    // -- dynamic / splash ----------------------------------------------------

    #[test]
    fn dynamic_drop_uses_containing_area() {
        let panels = ids(3);
        let layout = Layout::dynamic(vec![
            PanelLayout::area("top").with_bounds(Rect::new(0.0, 0.0, 1.0, 0.5)),
            PanelLayout::area("bottom_left").with_bounds(Rect::new(0.0, 0.5, 0.5, 0.5)),
            PanelLayout::area("bottom_right").with_bounds(Rect::new(0.5, 0.5, 0.5, 0.5)),
        ]);
        let canvas = CanvasGeometry::new(400.0, 400.0);

        let outcome = resolve_drop(&layout, &panels, panels[0], pt(350.0, 350.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 0, to: 2 });
    }

    #[test]
    fn dynamic_drop_in_gap_picks_nearest_centre() {
        let panels = ids(3);
        // Default stacking: three rows of (320 - 20) / 3 = 100px, 10px gaps.
        let layout = Layout::dynamic(vec![
            PanelLayout::area("panel0"),
            PanelLayout::area("panel1"),
            PanelLayout::area("panel2"),
        ]);
        let canvas = CanvasGeometry::new(100.0, 320.0);

        // Gap between row 1 (110..210) and row 2 (220..320), closer to row 2.
        let outcome = resolve_drop(&layout, &panels, panels[0], pt(50.0, 216.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 0, to: 2 });

        // Inside row 1.
        let outcome = resolve_drop(&layout, &panels, panels[0], pt(50.0, 150.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::Move { from: 0, to: 1 });
    }

    #[test]
    fn splash_drop_is_always_noop() {
        let panels = ids(1);
        let canvas = CanvasGeometry::new(100.0, 100.0);
        let outcome =
            resolve_drop(&Layout::splash(), &panels, panels[0], pt(80.0, 20.0), &canvas).unwrap();
        assert_eq!(outcome, DropOutcome::NoOp);
    }

    // -- apply_move ----------------------------------------------------------

    #[test]
    fn apply_move_forward_shifts_intermediate_back() {
        let mut seq = vec!['a', 'b', 'c', 'd', 'e'];
        apply_move(&mut seq, 1, 3).unwrap();
        assert_eq!(seq, vec!['a', 'c', 'd', 'b', 'e']);
    }

    #[test]
    fn apply_move_same_index_is_identity() {
        let mut seq = vec![1, 2, 3];
        apply_move(&mut seq, 1, 1).unwrap();
        assert_eq!(seq, vec![1, 2, 3]);
    }

    #[test]
    fn apply_move_out_of_range_does_not_mutate() {
        let mut seq = vec![1, 2, 3];
        assert_matches!(
            apply_move(&mut seq, 0, 3),
            Err(CoreError::InvalidDropTarget { target: 3, panel_count: 3 })
        );
        assert_eq!(seq, vec![1, 2, 3]);
    }
}
