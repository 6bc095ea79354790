//! The in-memory project tree store.
//!
//! [`ProjectStore`] is constructed at session start and passed by
//! reference; there is no process-wide instance. Every targeted update
//! produces a new [`Project`] value: the path from the root to the changed
//! entity is copied, every other chapter, page, panel, and character is
//! shared by [`Arc`] with the previous value, so renderers can skip
//! unchanged sub-trees with [`Arc::ptr_eq`].
//!
//! Updates return `Err` instead of silently doing nothing when the target
//! is missing; callers decide whether that matters.

use std::sync::Arc;

use manga_core::error::CoreError;
use manga_core::model::{Character, Page, Panel, Project};
use manga_core::patch::{CharacterPatch, PanelPatch, ProjectPatch};
use manga_core::placement::apply_move;
use manga_core::types::{CharacterId, PageId, PanelId, ProjectId};

use crate::index::{PagePath, TreeIndex};
use crate::storage::PersistedState;

/// Ephemeral editor selection. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub chapter: usize,
    pub page: usize,
    /// Lookup key into the current project, not an owning reference.
    pub panel: Option<PanelId>,
}

#[derive(Debug, Default)]
pub struct ProjectStore {
    current: Option<Arc<Project>>,
    projects: Vec<Arc<Project>>,
    selection: Selection,
    index: TreeIndex,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted state. Selection starts at defaults.
    pub fn from_persisted(state: PersistedState) -> Self {
        let index = state
            .current_project
            .as_deref()
            .map(TreeIndex::build)
            .unwrap_or_default();
        Self {
            current: state.current_project,
            projects: state.projects,
            selection: Selection::default(),
            index,
        }
    }

    /// The persistable part of the store. Selection is excluded.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            projects: self.projects.clone(),
            current_project: self.current.clone(),
        }
    }

    // ---- reads ----

    pub fn current_project(&self) -> Option<&Arc<Project>> {
        self.current.as_ref()
    }

    pub fn current_project_id(&self) -> Option<ProjectId> {
        self.current.as_ref().map(|p| p.id)
    }

    pub fn projects(&self) -> &[Arc<Project>] {
        &self.projects
    }

    pub fn panel(&self, id: PanelId) -> Option<&Arc<Panel>> {
        let path = self.index.panel(id)?;
        self.page_at(path.page)?.panels.get(path.panel)
    }

    pub fn page(&self, id: PageId) -> Option<&Arc<Page>> {
        self.page_at(self.index.page(id)?)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Arc<Character>> {
        self.current
            .as_ref()?
            .characters
            .iter()
            .find(|c| c.id == id)
    }

    // ---- project-level writes ----

    /// Replace the project list.
    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects.into_iter().map(Arc::new).collect();
    }

    /// Replace the current project wholesale. A list entry with the same id
    /// is replaced too; every later write keeps that entry in step.
    ///
    /// Selection is left alone; out-of-range indices clamp on read.
    pub fn set_project(&mut self, project: Project) {
        tracing::debug!(project_id = %project.id, "Setting current project");
        self.index = TreeIndex::build(&project);
        self.current = Some(Arc::new(project));
        self.sync_list_entry();
    }

    /// Unload the current project.
    pub fn clear_project(&mut self) {
        self.current = None;
        self.index.clear();
    }

    pub fn update_project(&mut self, patch: &ProjectPatch) -> Result<(), CoreError> {
        let current = self.current.as_ref().ok_or(CoreError::NoProjectLoaded)?;
        let mut project = (**current).clone();
        patch.apply(&mut project);

        if patch.replaces_tree() {
            self.index = TreeIndex::build(&project);
        }
        self.commit(project);
        Ok(())
    }

    // ---- characters ----

    /// Append a character. A duplicate id is rejected, never merged.
    pub fn add_character(&mut self, character: Character) -> Result<(), CoreError> {
        let current = self.current.as_ref().ok_or(CoreError::NoProjectLoaded)?;
        if current.characters.iter().any(|c| c.id == character.id) {
            return Err(CoreError::Conflict(format!(
                "character {} already exists",
                character.id
            )));
        }

        let mut project = (**current).clone();
        project.characters.push(Arc::new(character));
        self.commit(project);
        Ok(())
    }

    pub fn update_character(
        &mut self,
        id: CharacterId,
        patch: &CharacterPatch,
    ) -> Result<(), CoreError> {
        let current = self.current.as_ref().ok_or(CoreError::NoProjectLoaded)?;
        let position = current
            .characters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found("character", id))?;

        let mut character = (*current.characters[position]).clone();
        patch.apply(&mut character)?;

        let mut project = (**current).clone();
        project.characters[position] = Arc::new(character);
        self.commit(project);
        Ok(())
    }

    // ---- pages and panels ----

    /// Merge `patch` into the panel with `panel_id`, wherever it lives.
    ///
    /// Never changes the length or order of any page's panel sequence.
    pub fn update_panel(&mut self, panel_id: PanelId, patch: &PanelPatch) -> Result<(), CoreError> {
        if self.current.is_none() {
            return Err(CoreError::NoProjectLoaded);
        }
        let path = self
            .index
            .panel(panel_id)
            .ok_or_else(|| CoreError::not_found("panel", panel_id))?;

        self.rewrite_page(path.page, |page| {
            let slot = page
                .panels
                .get_mut(path.panel)
                .ok_or_else(|| CoreError::not_found("panel", panel_id))?;
            let mut panel = (**slot).clone();
            patch.apply(&mut panel);
            *slot = Arc::new(panel);
            Ok(())
        })
    }

    /// Relocate a panel within its page (remove-then-insert).
    pub fn move_panel(&mut self, page_id: PageId, from: usize, to: usize) -> Result<(), CoreError> {
        if self.current.is_none() {
            return Err(CoreError::NoProjectLoaded);
        }
        let path = self
            .index
            .page(page_id)
            .ok_or_else(|| CoreError::not_found("page", page_id))?;

        self.rewrite_page(path, |page| apply_move(&mut page.panels, from, to))?;

        if let Some(page) = self.page_at(path).cloned() {
            self.index.reindex_page(path, &page);
        }
        tracing::debug!(page_id = %page_id, from, to, "Moved panel");
        Ok(())
    }

    /// Record the rendered full-page image for a page.
    pub fn set_page_image(&mut self, page_id: PageId, uri: impl Into<String>) -> Result<(), CoreError> {
        if self.current.is_none() {
            return Err(CoreError::NoProjectLoaded);
        }
        let path = self
            .index
            .page(page_id)
            .ok_or_else(|| CoreError::not_found("page", page_id))?;
        let uri = uri.into();
        self.rewrite_page(path, |page| {
            page.full_page_image = Some(uri);
            Ok(())
        })
    }

    // ---- selection ----

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn select_chapter(&mut self, index: usize) {
        self.selection.chapter = index;
    }

    pub fn select_page(&mut self, index: usize) {
        self.selection.page = index;
    }

    pub fn select_panel(&mut self, panel: Option<PanelId>) {
        self.selection.panel = panel;
    }

    /// Selected chapter index, clamped to the current project.
    pub fn selected_chapter(&self) -> Option<usize> {
        let len = self.current.as_ref()?.chapters.len();
        clamp_index(self.selection.chapter, len)
    }

    /// Selected page index within the selected chapter, clamped.
    pub fn selected_page(&self) -> Option<usize> {
        let chapter = self.selected_chapter()?;
        let len = self.current.as_ref()?.chapters[chapter].pages.len();
        clamp_index(self.selection.page, len)
    }

    pub fn selected_page_ref(&self) -> Option<&Arc<Page>> {
        self.page_at(PagePath {
            chapter: self.selected_chapter()?,
            page: self.selected_page()?,
        })
    }

    /// The selected panel, if it still exists in the current project.
    pub fn selected_panel(&self) -> Option<&Arc<Panel>> {
        self.panel(self.selection.panel?)
    }

    // ---- private helpers ----

    fn page_at(&self, path: PagePath) -> Option<&Arc<Page>> {
        self.current
            .as_ref()?
            .chapters
            .get(path.chapter)?
            .pages
            .get(path.page)
    }

    /// Copy the root-to-page path, let `edit` change the page copy, and
    /// commit. Siblings along the way keep their `Arc`s.
    fn rewrite_page<F>(&mut self, path: PagePath, edit: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Page) -> Result<(), CoreError>,
    {
        let current = self.current.as_ref().ok_or(CoreError::NoProjectLoaded)?;
        let stale = || CoreError::Internal(format!("stale tree index at {path:?}"));

        let chapter = current.chapters.get(path.chapter).ok_or_else(stale)?;
        let page = chapter.pages.get(path.page).ok_or_else(stale)?;

        let mut new_page = (**page).clone();
        edit(&mut new_page)?;

        let mut new_chapter = (**chapter).clone();
        new_chapter.pages[path.page] = Arc::new(new_page);

        let mut project = (**current).clone();
        project.chapters[path.chapter] = Arc::new(new_chapter);
        self.commit(project);
        Ok(())
    }

    fn commit(&mut self, mut project: Project) {
        project.updated_at = chrono::Utc::now();
        self.current = Some(Arc::new(project));
        self.sync_list_entry();
    }

    /// Point the list entry for the current project at the current tree.
    fn sync_list_entry(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        if let Some(entry) = self.projects.iter_mut().find(|p| p.id == current.id) {
            *entry = Arc::clone(current);
        }
    }
}

fn clamp_index(index: usize, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(index.min(len - 1))
    }
}
