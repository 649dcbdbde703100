#![forbid(unsafe_code)]

//! Cursor and navigation behaviour of each view's state.

use crate::model::{
    Bucket, BucketList, BucketMode, ObjectView, PagedObjects, PagedRow, TreeView,
};
use crate::projection::matches_filter;
use crate::tree::{NodeId, PathTree, SEPARATOR};

/// Moves `cursor` by `delta` within `len` slots, wrapping at both ends.
/// An empty list leaves the cursor at 0.
pub fn wrap_step(cursor: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    (cursor as isize + delta).rem_euclid(len) as usize
}

impl BucketList {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self {
            buckets,
            filter: String::new(),
            cursor: 0,
            mode: BucketMode::Navigate,
            loading: false,
            error: None,
        }
    }

    pub fn loading() -> Self {
        Self { loading: true, ..Self::new(Vec::new()) }
    }

    /// The filter as currently typed, live while the filter prompt is open.
    pub fn active_filter(&self) -> &str {
        match &self.mode {
            BucketMode::Filter(input) => &input.value,
            _ => &self.filter,
        }
    }

    pub fn visible(&self) -> Vec<&Bucket> {
        let filter = self.active_filter();
        self.buckets.iter().filter(|bucket| matches_filter(*bucket, filter)).collect()
    }

    pub fn selected_bucket(&self) -> Option<&Bucket> {
        self.visible().get(self.cursor).copied()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = wrap_step(self.cursor, self.visible().len(), delta);
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        self.cursor = if len == 0 { 0 } else { self.cursor.min(len - 1) };
    }

    pub fn replace_buckets(&mut self, buckets: Vec<Bucket>) {
        self.buckets = buckets;
        self.loading = false;
        self.error = None;
        self.clamp_cursor();
    }
}

impl TreeView {
    pub fn loading(bucket: impl Into<String>) -> Self {
        let tree = PathTree::new();
        let cwd = tree.root();
        Self {
            bucket: bucket.into(),
            tree,
            cwd,
            cursor: 0,
            input: None,
            loading: true,
            error: None,
        }
    }

    pub fn entries(&self) -> &[NodeId] {
        self.tree.children(self.cwd)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.tree.child(self.cwd, self.cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = wrap_step(self.cursor, self.entries().len(), delta);
    }

    /// Enters the selected directory. Returns false when nothing changed.
    pub fn descend(&mut self) -> bool {
        let Some(id) = self.selected() else {
            return false;
        };
        if !self.tree.node(id).is_dir {
            return false;
        }
        self.cwd = id;
        self.cursor = 0;
        true
    }

    /// Moves to the parent, landing on the directory just left. False at root.
    pub fn ascend(&mut self) -> bool {
        let Some(parent) = self.tree.parent(self.cwd) else {
            return false;
        };
        let left = self.cwd;
        self.cwd = parent;
        self.cursor = self.tree.position(parent, left).unwrap_or(0);
        true
    }

    /// Swaps in a freshly built tree; `focus` names a key to land on.
    pub fn load(&mut self, tree: PathTree, focus: Option<&str>) {
        self.tree = tree;
        self.cwd = self.tree.root();
        self.cursor = 0;
        self.loading = false;
        self.error = None;
        let Some(id) = focus.and_then(|key| self.tree.find(key)) else {
            return;
        };
        if let Some(parent) = self.tree.parent(id) {
            self.cwd = parent;
            self.cursor = self.tree.position(parent, id).unwrap_or(0);
        }
    }

    pub fn cwd_path(&self) -> String {
        self.tree.path(self.cwd)
    }

    /// Full key for `name` placed in the current directory.
    pub fn key_in_cwd(&self, name: &str) -> String {
        let dir = self.cwd_path();
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}{SEPARATOR}{name}")
        }
    }
}

impl ObjectView {
    pub fn loading(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            object: None,
            scroll: 0,
            loading: true,
            error: None,
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let lines = self
            .object
            .as_ref()
            .map(|object| object.content_text().lines().count())
            .unwrap_or(0);
        let next = self.scroll.saturating_add_signed(delta);
        self.scroll = next.min(lines.saturating_sub(1));
    }
}

impl PagedObjects {
    pub fn loading(bucket: impl Into<String>, page_size: usize) -> Self {
        Self {
            bucket: bucket.into(),
            rows: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            cursor: 0,
            loading: true,
            error: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size.max(1))
    }

    pub fn page_rows(&self) -> &[PagedRow] {
        let size = self.page_size.max(1);
        let start = (self.page * size).min(self.rows.len());
        let end = (start + size).min(self.rows.len());
        &self.rows[start..end]
    }

    pub fn selected_row(&self) -> Option<&PagedRow> {
        self.page_rows().get(self.cursor)
    }

    pub fn turn_page(&mut self, delta: isize) {
        self.page = wrap_step(self.page, self.page_count(), delta);
        let len = self.page_rows().len();
        self.cursor = if len == 0 { 0 } else { self.cursor.min(len - 1) };
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = wrap_step(self.cursor, self.page_rows().len(), delta);
    }

    pub fn load(&mut self, rows: Vec<PagedRow>) {
        self.rows = rows;
        self.page = 0;
        self.cursor = 0;
        self.loading = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectSummary, Preview, StorageClass, TextInput};

    fn bucket(name: &str) -> Bucket {
        Bucket { name: name.to_string(), created_at: None }
    }

    fn tree_view(keys: &[&str]) -> TreeView {
        let mut view = TreeView::loading("b");
        view.load(PathTree::build(keys), None);
        view
    }

    fn paged(count: usize, page_size: usize) -> PagedObjects {
        let mut view = PagedObjects::loading("b", page_size);
        let rows = (0..count)
            .map(|i| PagedRow {
                summary: ObjectSummary {
                    key: format!("k{i}"),
                    last_modified: None,
                    size: 0,
                    etag: String::new(),
                    storage_class: StorageClass::Standard,
                },
                preview: Preview::NotFetched,
            })
            .collect();
        view.load(rows);
        view
    }

    #[test]
    fn wrap_step_wraps_both_ways() {
        assert_eq!(wrap_step(0, 3, -1), 2);
        assert_eq!(wrap_step(2, 3, 1), 0);
        assert_eq!(wrap_step(1, 3, 1), 2);
        assert_eq!(wrap_step(0, 0, 1), 0);
        assert_eq!(wrap_step(0, 0, -1), 0);
    }

    #[test]
    fn bucket_cursor_wraps_over_filtered_rows() {
        let mut list = BucketList::new(vec![bucket("alpha"), bucket("beta"), bucket("alps")]);
        list.filter = "al".to_string();
        assert_eq!(list.visible().len(), 2);
        list.move_cursor(-1);
        assert_eq!(list.selected_bucket().map(|b| b.name.as_str()), Some("alps"));
        list.move_cursor(1);
        assert_eq!(list.selected_bucket().map(|b| b.name.as_str()), Some("alpha"));
    }

    #[test]
    fn live_filter_comes_from_prompt() {
        let mut list = BucketList::new(vec![bucket("alpha"), bucket("beta")]);
        list.mode = BucketMode::Filter(TextInput { value: "BE".to_string(), cursor: 2 });
        assert_eq!(list.visible().len(), 1);
        assert_eq!(list.selected_bucket().map(|b| b.name.as_str()), Some("beta"));
    }

    #[test]
    fn replacing_buckets_clamps_cursor() {
        let mut list = BucketList::new(vec![bucket("a"), bucket("b"), bucket("c")]);
        list.cursor = 2;
        list.replace_buckets(vec![bucket("a")]);
        assert_eq!(list.cursor, 0);
        list.replace_buckets(Vec::new());
        assert_eq!(list.cursor, 0);
        list.move_cursor(1);
        assert_eq!(list.cursor, 0);
    }

    #[test]
    fn descend_and_ascend_restore_position() {
        let mut view = tree_view(&["a.txt", "docs/img/logo.png", "docs/readme.md", "src/x.rs"]);
        // root: docs/, src/, a.txt
        view.cursor = 1;
        assert!(view.descend());
        assert_eq!(view.cwd_path(), "src");
        assert!(view.ascend());
        assert_eq!(view.cursor, 1);
        assert!(!view.ascend());
    }

    #[test]
    fn descend_refuses_files_and_empty_dirs() {
        let mut view = tree_view(&["a.txt"]);
        assert!(!view.descend());
        let mut empty = tree_view(&[]);
        assert!(!empty.descend());
        empty.move_cursor(1);
        assert_eq!(empty.cursor, 0);
    }

    #[test]
    fn load_focuses_key() {
        let mut view = TreeView::loading("b");
        view.load(PathTree::build(["reports/q2.csv", "reports/q1.csv", "x"]), Some("reports/q2.csv"));
        assert_eq!(view.cwd_path(), "reports");
        assert_eq!(view.cursor, 1);
        assert_eq!(view.key_in_cwd("q3.csv"), "reports/q3.csv");

        view.load(PathTree::build(["x"]), Some("gone"));
        assert_eq!(view.cwd_path(), "");
        assert_eq!(view.key_in_cwd("y"), "y");
    }

    #[test]
    fn pages_wrap_and_clamp_cursor() {
        let mut view = paged(7, 3);
        assert_eq!(view.page_count(), 3);
        view.move_cursor(2);
        view.turn_page(-1);
        assert_eq!(view.page, 2);
        assert_eq!(view.page_rows().len(), 1);
        assert_eq!(view.cursor, 0);
        view.turn_page(1);
        assert_eq!(view.page, 0);
        view.move_cursor(-1);
        assert_eq!(view.selected_row().map(|r| r.summary.key.as_str()), Some("k2"));
    }

    #[test]
    fn empty_listing_pages_are_inert() {
        let mut view = paged(0, 10);
        assert_eq!(view.page_count(), 0);
        view.turn_page(1);
        view.move_cursor(1);
        assert_eq!((view.page, view.cursor), (0, 0));
        assert!(view.selected_row().is_none());
    }
}
