//! `usePaginatedServerTask` (§9 Open Question, resolved): each page gets its own
//! [`ServerTask`] instance rather than one task being rebound to different pages, so a
//! slow page 2 fetch can't clobber an already-resolved page 1.

use std::collections::BTreeMap;

use crate::task::ServerTask;

/// A per-page collection of [`ServerTask`]s, indexed by page number.
#[derive(Default)]
pub struct PaginatedTasks<T> {
    pages: BTreeMap<usize, ServerTask<T>>,
}

impl<T> PaginatedTasks<T> {
    pub fn new() -> Self {
        PaginatedTasks {
            pages: BTreeMap::new(),
        }
    }

    /// The task for `page`, creating an idle one if this page hasn't been requested yet.
    pub fn page_mut(&mut self, page: usize) -> &mut ServerTask<T> {
        self.pages.entry(page).or_insert_with(ServerTask::idle)
    }

    /// The task for `page`, if it has been requested at least once.
    pub fn get(&self, page: usize) -> Option<&ServerTask<T>> {
        self.pages.get(&page)
    }

    /// Drop a page's task entirely (e.g. the page fell out of a windowed view).
    pub fn evict(&mut self, page: usize) {
        self.pages.remove(&page);
    }

    /// How many pages currently have a task instance (of any status).
    pub fn loaded_page_count(&self) -> usize {
        self.pages.len()
    }
}
