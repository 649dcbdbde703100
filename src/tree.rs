#![forbid(unsafe_code)]

//! Directory-tree projection of a bucket's flat key listing.
//!
//! Nodes live in an arena owned by [`PathTree`]; parents own their children by
//! index and the upward link is a plain index that is `None` only on the root.

use std::cmp::Ordering;

use time::OffsetDateTime;

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub is_dir: bool,
    pub last_modified: Option<OffsetDateTime>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: String::new(),
                is_dir: true,
                last_modified: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Builds a sorted tree from a flat key listing.
    pub fn build<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for key in keys {
            tree.insert(key.as_ref());
        }
        tree.sort();
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Upward link; `None` on the root so traversal stops there.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    /// Merges one key into the tree and returns the node of its last segment.
    ///
    /// Existing children are reused by name. A file segment that later turns
    /// out to have descendants is promoted to a directory.
    ///
    /// A folder placeholder such as `dir/` yields the directory `dir` rather
    /// than an unnamed file inside it, so its `path` has no trailing separator.
    pub fn insert(&mut self, key: &str) -> NodeId {
        let mut parts: Vec<&str> = key.split(SEPARATOR).collect();
        let placeholder = parts.len() > 1 && parts.last() == Some(&"");
        if placeholder {
            parts.pop();
        }
        let last = parts.len() - 1;
        let mut curr = self.root();
        for (i, part) in parts.into_iter().enumerate() {
            curr = self.insert_child(curr, part, placeholder || i < last);
        }
        curr
    }

    fn insert_child(&mut self, parent: NodeId, name: &str, is_dir: bool) -> NodeId {
        let existing = self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].name == name);
        if let Some(id) = existing {
            if is_dir && !self.nodes[id.0].is_dir {
                self.nodes[id.0].is_dir = true;
                self.nodes[id.0].last_modified = None;
            }
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            is_dir,
            last_modified: None,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Re-orders every level: directories first, then by name.
    pub fn sort(&mut self) {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let mut children = std::mem::take(&mut self.nodes[id.0].children);
            children.sort_by(|a, b| cmp_nodes(&self.nodes[a.0], &self.nodes[b.0]));
            stack.extend(children.iter().copied());
            self.nodes[id.0].children = children;
        }
    }

    /// Reconstructs the flat key for a node by walking up to the root.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut curr = id;
        while let Some(parent) = self.parent(curr) {
            parts.push(self.nodes[curr.0].name.as_str());
            curr = parent;
        }
        parts.reverse();
        parts.join(&SEPARATOR.to_string())
    }

    /// Looks a key up segment by segment.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        let mut curr = self.root();
        for part in key.split(SEPARATOR) {
            curr = self
                .children(curr)
                .iter()
                .copied()
                .find(|id| self.nodes[id.0].name == part)?;
        }
        Some(curr)
    }

    pub fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|id| *id == child)
    }

    /// Builds a sorted tree from listing entries, stamping file nodes with
    /// their modification time.
    pub fn from_listing<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<OffsetDateTime>)>,
    {
        let mut tree = Self::new();
        for (key, modified) in entries {
            let id = tree.insert(key);
            if !tree.nodes[id.0].is_dir {
                tree.nodes[id.0].last_modified = modified;
            }
        }
        tree.sort();
        tree
    }

    /// All nodes without children, in depth-first order.
    #[cfg(test)]
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let children = self.children(id);
            if children.is_empty() && !self.is_root(id) {
                out.push(id);
            }
            stack.extend(children.iter().rev().copied());
        }
        out
    }
}

fn cmp_nodes(a: &Node, b: &Node) -> Ordering {
    match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &PathTree, id: NodeId) -> Vec<(String, bool)> {
        tree.children(id)
            .iter()
            .map(|c| (tree.node(*c).name.clone(), tree.node(*c).is_dir))
            .collect()
    }

    fn shape(tree: &PathTree, id: NodeId) -> String {
        let mut out = tree.node(id).name.clone();
        if tree.node(id).is_dir {
            out.push('[');
            for child in tree.children(id) {
                out.push_str(&shape(tree, *child));
                out.push(',');
            }
            out.push(']');
        }
        out
    }

    #[test]
    fn builds_docs_scenario() {
        let tree = PathTree::build(["docs/readme.md", "docs/img/logo.png", "main.go"]);
        let root = tree.root();
        assert_eq!(
            names(&tree, root),
            vec![("docs".to_string(), true), ("main.go".to_string(), false)]
        );
        let docs = tree.child(root, 0).unwrap();
        assert_eq!(
            names(&tree, docs),
            vec![("img".to_string(), true), ("readme.md".to_string(), false)]
        );
        let img = tree.child(docs, 0).unwrap();
        assert_eq!(names(&tree, img), vec![("logo.png".to_string(), false)]);
    }

    #[test]
    fn leaf_paths_round_trip() {
        let sets: Vec<Vec<&str>> = vec![
            vec!["docs/readme.md", "docs/img/logo.png", "main.go"],
            vec!["a", "b/c", "b/d/e", "b/d/f", "z/y/x/w"],
            vec!["/leading", "trailing/", "double//slash", "x"],
            vec!["same/name/same", "same/other"],
        ];
        for keys in sets {
            let tree = PathTree::build(keys.iter().copied());
            let mut recovered: Vec<String> = tree.leaves().into_iter().map(|id| tree.path(id)).collect();
            recovered.sort();
            let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
            expected.sort();
            assert_eq!(recovered, expected);
        }
    }

    #[test]
    fn siblings_are_dirs_first_then_by_name() {
        let tree = PathTree::build(["b.txt", "a/x", "c/x", "a.txt", "B/x", "0.txt"]);
        let kids = names(&tree, tree.root());
        let first_file = kids.iter().position(|(_, d)| !d).unwrap();
        assert!(kids[..first_file].iter().all(|(_, d)| *d));
        assert!(kids[first_file..].iter().all(|(_, d)| !*d));
        assert!(kids[..first_file].windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(kids[first_file..].windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn sort_is_idempotent() {
        let mut tree = PathTree::build(["q/w", "e", "r/t/y", "a", "q/a"]);
        let before = shape(&tree, tree.root());
        tree.sort();
        assert_eq!(shape(&tree, tree.root()), before);
    }

    #[test]
    fn insert_is_idempotent() {
        let once = PathTree::build(["x/y/z.txt", "x/k"]);
        let twice = PathTree::build(["x/y/z.txt", "x/k", "x/y/z.txt", "x/k"]);
        assert_eq!(shape(&once, once.root()), shape(&twice, twice.root()));
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn empty_key_is_anonymous_root_file() {
        let tree = PathTree::build([""]);
        let id = tree.child(tree.root(), 0).unwrap();
        assert_eq!(tree.node(id).name, "");
        assert!(!tree.node(id).is_dir);
        assert_eq!(tree.path(id), "");
    }

    #[test]
    fn key_without_separator_is_root_file() {
        let tree = PathTree::build(["plain"]);
        let id = tree.child(tree.root(), 0).unwrap();
        assert!(!tree.node(id).is_dir);
        assert_eq!(tree.parent(id), Some(tree.root()));
        assert_eq!(tree.path(id), "plain");
    }

    #[test]
    fn file_segment_is_promoted_when_a_key_continues_past_it() {
        let tree = PathTree::build(["logs", "logs/today.txt"]);
        let kids = names(&tree, tree.root());
        assert_eq!(kids, vec![("logs".to_string(), true)]);
        let logs = tree.find("logs").unwrap();
        assert_eq!(names(&tree, logs), vec![("today.txt".to_string(), false)]);

        let reversed = PathTree::build(["logs/today.txt", "logs"]);
        assert_eq!(names(&reversed, reversed.root()), kids);
    }

    #[test]
    fn folder_placeholders_are_directories_without_blank_rows() {
        let tree = PathTree::build(["dir/", "dir/a.txt", "empty/", "x/y/"]);
        assert_eq!(
            names(&tree, tree.root()),
            vec![("dir".to_string(), true), ("empty".to_string(), true), ("x".to_string(), true)]
        );
        let dir = tree.find("dir").unwrap();
        assert_eq!(names(&tree, dir), vec![("a.txt".to_string(), false)]);
        let empty = tree.find("empty").unwrap();
        assert!(tree.children(empty).is_empty());
        assert_eq!(tree.path(empty), "empty");
        let y = tree.find("x/y").unwrap();
        assert!(tree.node(y).is_dir);
        assert!(tree.children(y).is_empty());
    }

    #[test]
    fn root_has_no_parent_and_empty_path() {
        let tree = PathTree::build(["a/b"]);
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.path(tree.root()), "");
        assert!(tree.node(tree.root()).is_dir);
    }

    #[test]
    fn find_and_position() {
        let tree = PathTree::build(["reports/q1.csv", "reports/q2.csv", "readme"]);
        let q2 = tree.find("reports/q2.csv").unwrap();
        let reports = tree.parent(q2).unwrap();
        assert_eq!(tree.path(reports), "reports");
        assert_eq!(tree.position(reports, q2), Some(1));
        assert!(tree.find("reports/missing").is_none());
    }

    #[test]
    fn listing_stamps_files_only() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let tree = PathTree::from_listing([("a/b.txt", Some(at)), ("c", None)]);
        let b = tree.find("a/b.txt").unwrap();
        assert_eq!(tree.node(b).last_modified, Some(at));
        assert_eq!(tree.node(tree.find("a").unwrap()).last_modified, None);
        assert_eq!(tree.node(tree.find("c").unwrap()).last_modified, None);
    }

    #[test]
    fn empty_listing_is_empty_tree() {
        let tree = PathTree::build(Vec::<String>::new());
        assert!(tree.is_empty());
        assert!(tree.leaves().is_empty());
    }
}
