//! Local persistence for the project store.
//!
//! The whole persistable state lives in one JSON file named after
//! [`STORAGE_NAMESPACE`] inside the storage directory. Writes go to a
//! sibling temp file first and are renamed into place so a crash never
//! leaves a truncated blob behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use manga_core::model::Project;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Fixed namespace key of the persisted blob.
pub const STORAGE_NAMESPACE: &str = "manga-factory-storage";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything that survives a session: the project list and the current
/// project. Selection state is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub projects: Vec<Arc<Project>>,
    #[serde(default)]
    pub current_project: Option<Arc<Project>>,
}

/// File-backed store for [`PersistedState`].
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Open storage in `base_dir`, creating the directory if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the persisted blob.
    pub fn state_path(&self) -> PathBuf {
        self.base_dir.join(format!("{STORAGE_NAMESPACE}.json"))
    }

    /// Load persisted state. A missing file yields an empty state.
    pub async fn load(&self) -> Result<PersistedState, StorageError> {
        let path = self.state_path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No persisted state yet");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let state: PersistedState = serde_json::from_slice(&bytes)?;
        tracing::info!(
            path = %path.display(),
            projects = state.projects.len(),
            has_current = state.current_project.is_some(),
            "Loaded persisted state",
        );
        Ok(state)
    }

    /// Persist `state`, replacing the previous blob atomically.
    pub async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(state)?;
        let path = self.state_path();
        let tmp = self.base_dir.join(format!("{STORAGE_NAMESPACE}.json.tmp"));

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), bytes = json.len(), "Saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use manga_core::model::{Chapter, Character, Layout, MangaStyle, Page, Panel};

    use super::*;
    use crate::store::ProjectStore;

    fn sample_project() -> Project {
        let page = Page::new(
            1,
            Layout::standard(2, 3),
            vec![Panel::new(1, "opening"), Panel::new(2, "reveal")],
        );
        let mut project = Project::new("Blade of Dawn", "A ronin returns", MangaStyle::Seinen)
            .with_chapters(vec![Chapter::new(1, "Return", vec![page])]);
        project
            .characters
            .push(Arc::new(Character::new("Kenji", "ronin", "scarred, tall")));
        project
    }

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let state = storage.load().await.unwrap();
        assert_eq!(state, PersistedState::default());
    }

    #[tokio::test]
    async fn round_trip_is_structurally_equal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let project = sample_project();
        let state = PersistedState {
            projects: vec![Arc::new(project.clone())],
            current_project: Some(Arc::new(project)),
        };

        storage.save(&state).await.unwrap();
        let loaded = storage.load().await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn selection_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let mut store = ProjectStore::new();
        let project = sample_project();
        let panel_id = project.chapters[0].pages[0].panels[1].id;
        store.set_project(project);
        store.select_page(3);
        store.select_panel(Some(panel_id));

        storage.save(&store.snapshot()).await.unwrap();

        let raw = tokio::fs::read_to_string(storage.state_path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(value.get("projects").is_some());
        assert!(value.get("currentProject").is_some());

        let restored = ProjectStore::from_persisted(storage.load().await.unwrap());
        assert_eq!(restored.selection(), Default::default());
        assert!(restored.panel(panel_id).is_some());
    }

    #[tokio::test]
    async fn save_overwrites_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested")).await.unwrap();

        storage
            .save(&PersistedState {
                projects: vec![Arc::new(sample_project())],
                current_project: None,
            })
            .await
            .unwrap();
        storage.save(&PersistedState::default()).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), PersistedState::default());
        assert!(!dir.path().join("nested").join("manga-factory-storage.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_blob_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        tokio::fs::write(storage.state_path(), b"{not json").await.unwrap();
        assert!(matches!(
            storage.load().await,
            Err(StorageError::Serialization(_))
        ));
    }
}
