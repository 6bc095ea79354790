//! Id-to-position index over a project tree.
//!
//! Panel ids are unique across a whole project, so a targeted update can
//! jump straight to the owning chapter and page. The index is rebuilt
//! whenever the shape of the tree changes (project replaced, chapters
//! replaced, panels reordered); field-level updates keep it valid.

use std::collections::HashMap;

use manga_core::model::{Page, Project};
use manga_core::types::{PageId, PanelId};

/// Position of a page: chapter index, page index within the chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PagePath {
    pub chapter: usize,
    pub page: usize,
}

/// Position of a panel: its page plus the panel's index on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelPath {
    pub page: PagePath,
    pub panel: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    pages: HashMap<PageId, PagePath>,
    panels: HashMap<PanelId, PanelPath>,
}

impl TreeIndex {
    pub fn build(project: &Project) -> Self {
        let mut index = Self::default();
        for (c, chapter) in project.chapters.iter().enumerate() {
            for (p, page) in chapter.pages.iter().enumerate() {
                index.insert_page(PagePath { chapter: c, page: p }, page);
            }
        }
        index
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.panels.clear();
    }

    pub fn page(&self, id: PageId) -> Option<PagePath> {
        self.pages.get(&id).copied()
    }

    pub fn panel(&self, id: PanelId) -> Option<PanelPath> {
        self.panels.get(&id).copied()
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Re-record the panel positions of one page after a reorder.
    pub fn reindex_page(&mut self, path: PagePath, page: &Page) {
        self.insert_page(path, page);
    }

    fn insert_page(&mut self, path: PagePath, page: &Page) {
        self.pages.insert(page.id, path);
        for (i, panel) in page.panels.iter().enumerate() {
            if self
                .panels
                .insert(panel.id, PanelPath { page: path, panel: i })
                .is_some_and(|prev| prev.page != path)
            {
                tracing::warn!(panel_id = %panel.id, "Panel id appears on more than one page");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use manga_core::model::{Chapter, Layout, MangaStyle, Panel};

    use super::*;

    fn project() -> Project {
        let p1 = Page::new(1, Layout::standard(2, 1), vec![Panel::new(1, "a"), Panel::new(2, "b")]);
        let p2 = Page::new(2, Layout::splash(), vec![Panel::new(1, "c")]);
        let p3 = Page::new(1, Layout::standard(1, 1), vec![Panel::new(1, "d")]);
        Project::new("t", "", MangaStyle::Shojo).with_chapters(vec![
            Chapter::new(1, "one", vec![p1, p2]),
            Chapter::new(2, "two", vec![p3]),
        ])
    }

    #[test]
    fn build_indexes_every_panel_and_page() {
        let project = project();
        let index = TreeIndex::build(&project);
        assert_eq!(index.panel_count(), 4);

        let last = &project.chapters[1].pages[0];
        assert_eq!(index.page(last.id), Some(PagePath { chapter: 1, page: 0 }));

        let second = project.chapters[0].pages[0].panels[1].id;
        assert_eq!(
            index.panel(second),
            Some(PanelPath {
                page: PagePath { chapter: 0, page: 0 },
                panel: 1
            })
        );
    }

    #[test]
    fn unknown_ids_are_absent() {
        let index = TreeIndex::build(&project());
        assert_eq!(index.panel(uuid::Uuid::new_v4()), None);
        assert_eq!(index.page(uuid::Uuid::new_v4()), None);
    }

    #[test]
    fn reindex_page_tracks_new_order() {
        let project = project();
        let mut index = TreeIndex::build(&project);
        let mut page = (*project.chapters[0].pages[0]).clone();
        page.panels.swap(0, 1);

        let path = PagePath { chapter: 0, page: 0 };
        index.reindex_page(path, &page);
        assert_eq!(index.panel(page.panels[0].id).map(|p| p.panel), Some(0));
        assert_eq!(index.panel(page.panels[1].id).map(|p| p.panel), Some(1));
    }
}
