#![forbid(unsafe_code)]

use std::fmt;

use time::OffsetDateTime;

use crate::tree::{NodeId, PathTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
    ReducedRedundancy,
    StandardIa,
    OnezoneIa,
    IntelligentTiering,
    Glacier,
    GlacierIr,
    DeepArchive,
    Outposts,
    Other(String),
}

impl StorageClass {
    /// Maps the provider's wire name; unknown names are kept verbatim.
    pub fn from_provider(name: &str) -> Self {
        match name {
            "" | "STANDARD" => Self::Standard,
            "REDUCED_REDUNDANCY" => Self::ReducedRedundancy,
            "STANDARD_IA" => Self::StandardIa,
            "ONEZONE_IA" => Self::OnezoneIa,
            "INTELLIGENT_TIERING" => Self::IntelligentTiering,
            "GLACIER" => Self::Glacier,
            "GLACIER_IR" => Self::GlacierIr,
            "DEEP_ARCHIVE" => Self::DeepArchive,
            "OUTPOSTS" => Self::Outposts,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Standard => "STANDARD",
            Self::ReducedRedundancy => "REDUCED_REDUNDANCY",
            Self::StandardIa => "STANDARD_IA",
            Self::OnezoneIa => "ONEZONE_IA",
            Self::IntelligentTiering => "INTELLIGENT_TIERING",
            Self::Glacier => "GLACIER",
            Self::GlacierIr => "GLACIER_IR",
            Self::DeepArchive => "DEEP_ARCHIVE",
            Self::Outposts => "OUTPOSTS",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing metadata for one key; never carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<OffsetDateTime>,
    pub size: u64,
    pub etag: String,
    pub storage_class: StorageClass,
}

/// A fetched object. `content` is only populated when the object is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub key: String,
    pub last_modified: Option<OffsetDateTime>,
    pub size: u64,
    pub etag: String,
    pub storage_class: StorageClass,
    pub content: Vec<u8>,
}

impl StorageObject {
    pub fn content_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Last path segment of the key, used to tag scratch files.
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }
}

pub fn file_name(key: &str) -> &str {
    key.rsplit(crate::tree::SEPARATOR).next().unwrap_or(key)
}

/// Extension of the last key segment, without the dot.
pub fn file_extension(key: &str) -> Option<&str> {
    let name = file_name(key);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() { None } else { Some(ext) }
}

/// Single-line text entry used by the create and filter overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    /// Cursor position in chars.
    pub cursor: usize,
}

impl TextInput {
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index();
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.value.remove(at);
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketMode {
    Navigate,
    Create(TextInput),
    Filter(TextInput),
    /// Delete confirmation modal; `armed` is the "Yes" side.
    ConfirmDelete { bucket: String, armed: bool },
}

#[derive(Debug, Clone)]
pub struct BucketList {
    pub buckets: Vec<Bucket>,
    pub filter: String,
    pub cursor: usize,
    pub mode: BucketMode,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TreeView {
    pub bucket: String,
    pub tree: PathTree,
    pub cwd: NodeId,
    pub cursor: usize,
    pub input: Option<TextInput>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectView {
    pub bucket: String,
    pub key: String,
    pub object: Option<StorageObject>,
    pub scroll: usize,
    pub loading: bool,
    pub error: Option<String>,
}

/// Content preview of one row in the paged listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    NotFetched,
    Text(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PagedRow {
    pub summary: ObjectSummary,
    pub preview: Preview,
}

#[derive(Debug, Clone)]
pub struct PagedObjects {
    pub bucket: String,
    pub rows: Vec<PagedRow>,
    pub page: usize,
    pub page_size: usize,
    /// Row index within the current page.
    pub cursor: usize,
    pub loading: bool,
    pub error: Option<String>,
}

/// The active screen. Exactly one is live at a time; overlays are part of
/// each view's own state.
#[derive(Debug, Clone)]
pub enum View {
    BucketList(BucketList),
    Tree(TreeView),
    Object(ObjectView),
    Paged(PagedObjects),
}

impl View {
    pub fn error(&self) -> Option<&str> {
        match self {
            View::BucketList(v) => v.error.as_deref(),
            View::Tree(v) => v.error.as_deref(),
            View::Object(v) => v.error.as_deref(),
            View::Paged(v) => v.error.as_deref(),
        }
    }

    /// Shows `message` inline and ends any loading state.
    pub fn set_error(&mut self, message: String) {
        let (error, loading) = match self {
            View::BucketList(v) => (&mut v.error, &mut v.loading),
            View::Tree(v) => (&mut v.error, &mut v.loading),
            View::Object(v) => (&mut v.error, &mut v.loading),
            View::Paged(v) => (&mut v.error, &mut v.loading),
        };
        *error = Some(message);
        *loading = false;
    }

    pub fn is_loading(&self) -> bool {
        match self {
            View::BucketList(v) => v.loading,
            View::Tree(v) => v.loading,
            View::Object(v) => v.loading,
            View::Paged(v) => v.loading,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            View::BucketList(_) => "buckets",
            View::Tree(_) => "tree",
            View::Object(_) => "object",
            View::Paged(_) => "paged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_class_round_trips_known_names() {
        for name in ["STANDARD", "GLACIER_IR", "DEEP_ARCHIVE", "ONEZONE_IA"] {
            assert_eq!(StorageClass::from_provider(name).as_str(), name);
        }
        assert_eq!(StorageClass::from_provider(""), StorageClass::Standard);
        assert_eq!(
            StorageClass::from_provider("SNOW"),
            StorageClass::Other("SNOW".to_string())
        );
    }

    #[test]
    fn extension_of_last_segment() {
        assert_eq!(file_extension("reports/q1.csv"), Some("csv"));
        assert_eq!(file_extension("a.b/readme"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_name("reports/q1.csv"), "q1.csv");
        assert_eq!(file_name("plain"), "plain");
    }

    #[test]
    fn text_input_edits_by_char() {
        let mut input = TextInput::default();
        for ch in "näme".chars() {
            input.insert(ch);
        }
        input.left();
        input.backspace();
        assert_eq!(input.value, "näe");
        assert_eq!(input.cursor, 2);
        input.right();
        input.right();
        assert_eq!(input.cursor, 3);
        input.backspace();
        input.backspace();
        input.backspace();
        input.backspace();
        assert_eq!(input.value, "");
        assert_eq!(input.cursor, 0);
    }
}
