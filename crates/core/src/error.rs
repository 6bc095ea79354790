use crate::model::TrainingStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("No project is loaded")]
    NoProjectLoaded,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A `dynamic` layout declares fewer placements than the page has panels.
    #[error("Layout mismatch: {placements} placements for {panels} panels")]
    LayoutMismatch { placements: usize, panels: usize },

    /// The layout cannot place every panel (grid overflow, extra splash panels,
    /// or a degenerate grid).
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid drop target {target} for a page with {panel_count} panels")]
    InvalidDropTarget { target: usize, panel_count: usize },

    #[error("Invalid training status transition from {from} to {to}")]
    InvalidTransition {
        from: TrainingStatus,
        to: TrainingStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] keyed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
