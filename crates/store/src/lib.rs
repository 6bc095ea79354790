//! Project tree store for the manga editor.
//!
//! - [`ProjectStore`] holds the current project, the project list, and
//!   ephemeral selection state, and applies targeted updates with
//!   structural sharing.
//! - [`TreeIndex`] maps panel and page ids to their position in the tree
//!   so updates do not scan every chapter.
//! - [`LocalStorage`] persists `{projects, currentProject}` as a single
//!   namespaced JSON blob.

pub mod index;
pub mod storage;
pub mod store;

pub use index::{PagePath, PanelPath, TreeIndex};
pub use storage::{LocalStorage, PersistedState, StorageError, STORAGE_NAMESPACE};
pub use store::{ProjectStore, Selection};
