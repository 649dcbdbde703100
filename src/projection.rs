#![forbid(unsafe_code)]

//! Row text for the list widgets.

use ftui::render::cell::PackedRgba;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::model::{file_extension, Bucket, ObjectSummary, PagedRow, Preview, StorageObject};
use crate::tree::{NodeId, PathTree, SEPARATOR};

const STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SHORT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]-[month]-[year repr:last_two]");
const SHORT_CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const SYNTAX_THEME: &str = "base16-ocean.dark";

/// Anything shown as a selectable row.
pub trait ListItem {
    fn title(&self) -> String;
    fn description(&self) -> String;
    /// Text the `/` filter matches against.
    fn filter_value(&self) -> String;
}

impl ListItem for Bucket {
    fn title(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match self.created_at {
            Some(at) => format!("Created {}", format_stamp(at)),
            None => String::new(),
        }
    }

    fn filter_value(&self) -> String {
        self.name.clone()
    }
}

impl ListItem for ObjectSummary {
    fn title(&self) -> String {
        self.key.clone()
    }

    fn description(&self) -> String {
        let modified = self.last_modified.map(format_stamp).unwrap_or_default();
        format!("{} {}", format_size(self.size), modified).trim_end().to_string()
    }

    fn filter_value(&self) -> String {
        self.key.clone()
    }
}

impl ListItem for StorageObject {
    fn title(&self) -> String {
        self.key.clone()
    }

    fn description(&self) -> String {
        self.last_modified.map(format_stamp).unwrap_or_default()
    }

    fn filter_value(&self) -> String {
        self.key.clone()
    }
}

impl ListItem for PagedRow {
    fn title(&self) -> String {
        self.summary.title()
    }

    fn description(&self) -> String {
        match &self.preview {
            Preview::NotFetched => self.summary.description(),
            Preview::Text(text) => {
                let first = text.lines().next().unwrap_or_default();
                format!("{} | {}", self.summary.description(), first)
            }
            Preview::Failed(err) => format!("{} | preview failed: {err}", self.summary.description()),
        }
    }

    fn filter_value(&self) -> String {
        self.summary.filter_value()
    }
}

/// Case-insensitive substring match; an empty filter matches everything.
pub fn matches_filter(item: &impl ListItem, filter: &str) -> bool {
    filter.is_empty() || item.filter_value().to_lowercase().contains(&filter.to_lowercase())
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn format_stamp(at: OffsetDateTime) -> String {
    format_stamp_in(at, local_offset())
}

pub fn format_stamp_in(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset).format(STAMP).unwrap_or_default()
}

/// Date and clock columns for tree rows.
pub fn format_short(at: Option<OffsetDateTime>) -> (String, String) {
    let Some(at) = at else {
        return (String::new(), String::new());
    };
    let at = at.to_offset(local_offset());
    (
        at.format(SHORT_DATE).unwrap_or_default(),
        at.format(SHORT_CLOCK).unwrap_or_default(),
    )
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Tree row label; directories carry a trailing separator.
pub fn node_label(tree: &PathTree, id: NodeId) -> String {
    let node = tree.node(id);
    if node.is_dir {
        format!("{}{SEPARATOR}", node.name)
    } else {
        node.name.clone()
    }
}

/// Metadata lines shown above an object's content, ending with `---`.
pub fn format_header(object: &StorageObject) -> String {
    format_header_in(object, local_offset())
}

pub fn format_header_in(object: &StorageObject, offset: UtcOffset) -> String {
    let modified = object
        .last_modified
        .map(|at| format_stamp_in(at, offset))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Key: {}\nLast Modified: {}\nSize: {}\nETag: {}\nStorage Class: {}\n---",
        object.key,
        modified,
        format_size(object.size),
        object.etag,
        object.storage_class,
    )
}

/// A run of text in one colour; `None` keeps the panel's own foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub fg: Option<PackedRgba>,
    pub text: String,
}

pub type StyledLine = Vec<StyledSpan>;

/// Syntax colouring for object bodies, picked by the key's extension.
#[derive(Debug)]
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let mut themes = ThemeSet::load_defaults();
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme: themes.themes.remove(SYNTAX_THEME).unwrap_or_default(),
        }
    }

    /// Plain text unless the extension names a known syntax.
    pub fn syntax_for(&self, key: &str) -> &SyntaxReference {
        file_extension(key)
            .and_then(|ext| self.syntaxes.find_syntax_by_extension(&ext.to_ascii_lowercase()))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    pub fn highlight(&self, key: &str, body: &str) -> Vec<StyledLine> {
        let syntax = self.syntax_for(key);
        if syntax.name == self.syntaxes.find_syntax_plain_text().name {
            return body.lines().map(plain_line).collect();
        }
        let mut lines = HighlightLines::new(syntax, &self.theme);
        LinesWithEndings::from(body)
            .map(|line| match lines.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges
                    .into_iter()
                    .map(|(style, text)| (style.foreground, text.trim_end_matches(['\n', '\r'])))
                    .filter(|(_, text)| !text.is_empty())
                    .map(|(color, text)| StyledSpan { fg: Some(to_rgba(color)), text: text.to_string() })
                    .collect(),
                Err(err) => {
                    tracing::debug!(key, error = %err, "highlighting failed, showing plain line");
                    plain_line(line.trim_end_matches(['\n', '\r']))
                }
            })
            .collect()
    }
}

fn plain_line(line: &str) -> StyledLine {
    if line.is_empty() {
        return Vec::new();
    }
    vec![StyledSpan { fg: None, text: line.to_string() }]
}

fn to_rgba(color: Color) -> PackedRgba {
    PackedRgba::rgb(color.r, color.g, color.b)
}
