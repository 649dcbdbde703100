#![forbid(unsafe_code)]

use ftui::core::geometry::Rect;
use ftui::layout::{Constraint, Flex};
use ftui::style::Style;
use ftui::text::{Line, Span, Text, WrapMode, display_width};
use ftui::widgets::block::Block;
use ftui::widgets::borders::Borders;
use ftui::widgets::paragraph::Paragraph;
use ftui::widgets::status_line::{StatusItem, StatusLine};
use ftui::widgets::table::{Row, Table, TableState};
use ftui::widgets::{StatefulWidget, Widget};
use ftui::Frame;

use crate::app::ThemeColors;
use crate::controller::Controller;
use crate::keymap::{label_for, Action};
use crate::model::{BucketList, BucketMode, ObjectView, PagedObjects, TextInput, TreeView, View};
use crate::projection::{format_header, format_short, format_size, node_label, ListItem, StyledLine};

pub const TITLE_HEIGHT: u16 = 1;
pub const STATUS_HEIGHT: u16 = 1;
pub const KEYBAR_HEIGHT: u16 = 1;
pub const HEADER_HEIGHT: u16 = 1;

pub fn ensure_visible(state: &mut TableState, view_height: usize) {
    if view_height == 0 {
        return;
    }
    let Some(selected) = state.selected else {
        return;
    };
    if selected < state.offset {
        state.offset = selected;
    } else if selected >= state.offset + view_height {
        state.offset = selected.saturating_sub(view_height - 1);
    }
}

fn full_area(frame: &Frame) -> Rect {
    Rect::new(0, 0, frame.width(), frame.height())
}

pub fn render_background(frame: &mut Frame, theme: ThemeColors) {
    let background = Block::new().style(Style::new().fg(theme.panel_fg).bg(theme.screen_bg));
    background.render(full_area(frame), frame);
}

/// `body` holds the highlighted content of the open object, if any.
pub fn render(frame: &mut Frame, controller: &Controller, body: &[StyledLine], theme: ThemeColors) {
    let layout = Flex::vertical().constraints([
        Constraint::Fixed(TITLE_HEIGHT),
        Constraint::Fill,
        Constraint::Fixed(STATUS_HEIGHT),
        Constraint::Fixed(KEYBAR_HEIGHT),
    ]);
    let areas = layout.split(full_area(frame));
    let view = controller.view();

    render_title(frame, areas[0], view, theme);
    match view {
        View::BucketList(list) => render_buckets(frame, areas[1], list, theme),
        View::Tree(tree) => render_tree(frame, areas[1], tree, theme),
        View::Object(object) => render_object(frame, areas[1], object, body, theme),
        View::Paged(paged) => render_paged(frame, areas[1], paged, theme),
    }
    render_status(frame, areas[2], view, controller.status(), theme);
    render_keybar(frame, areas[3], view, theme);

    match view {
        View::BucketList(list) => match &list.mode {
            BucketMode::Navigate => {}
            BucketMode::Create(input) => render_prompt(frame, "Create bucket", "Name:", input, theme),
            BucketMode::Filter(input) => render_prompt(frame, "Filter buckets", "Contains:", input, theme),
            BucketMode::ConfirmDelete { bucket, armed } => render_confirm(frame, bucket, *armed, theme),
        },
        View::Tree(tree) => {
            if let Some(input) = &tree.input {
                let label = format!("Key in /{}:", tree.cwd_path());
                render_prompt(frame, "Create object", &label, input, theme);
            }
        }
        _ => {}
    }
}

fn render_title(frame: &mut Frame, area: Rect, view: &View, theme: ThemeColors) {
    let title = match view {
        View::BucketList(list) if list.filter.is_empty() => " Buckets".to_string(),
        View::BucketList(list) => format!(" Buckets matching \"{}\"", list.filter),
        View::Tree(tree) => format!(" {}:/{}", tree.bucket, tree.cwd_path()),
        View::Object(object) => format!(" {}:/{}", object.bucket, object.key),
        View::Paged(paged) => format!(
            " {}  page {}/{}",
            paged.bucket,
            paged.page + 1,
            paged.page_count().max(1)
        ),
    };
    let style = Style::new().fg(theme.menu_fg).bg(theme.menu_bg);
    Block::new().style(style).render(area, frame);
    Paragraph::new(Text::from(title)).style(style).render(area, frame);
}

/// Draws a bordered panel and returns the area inside the border.
fn render_panel(frame: &mut Frame, area: Rect, title: &str, theme: ThemeColors) -> Rect {
    let block = Block::bordered()
        .borders(Borders::ALL)
        .border_style(Style::new().fg(theme.panel_border_active))
        .style(Style::new().fg(theme.panel_fg).bg(theme.panel_bg))
        .title(title);
    let inner = block.inner(area);
    block.render(area, frame);
    inner
}

fn render_message(frame: &mut Frame, area: Rect, title: &str, message: &str, theme: ThemeColors) {
    let inner = render_panel(frame, area, title, theme);
    Paragraph::new(Text::from(message.to_string()))
        .style(Style::new().fg(theme.panel_fg).bg(theme.panel_bg))
        .render(inner, frame);
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    header: [&str; 2],
    rows: Vec<Row>,
    second_width: u16,
    cursor: usize,
    theme: ThemeColors,
) {
    let inner = render_panel(frame, area, title, theme);
    let header = Row::new(header)
        .style(Style::new().fg(theme.header_fg).bg(theme.header_bg))
        .height(HEADER_HEIGHT);
    let has_rows = !rows.is_empty();
    let widths = [Constraint::Fill, Constraint::Fixed(second_width)];
    let table = Table::new(rows, widths)
        .header(header)
        .style(Style::new().fg(theme.panel_fg).bg(theme.panel_bg))
        .highlight_style(Style::new().fg(theme.selection_fg).bg(theme.selection_bg));

    let mut state = TableState::default();
    state.select(has_rows.then_some(cursor));
    let view_height = inner.height.saturating_sub(HEADER_HEIGHT) as usize;
    ensure_visible(&mut state, view_height);
    StatefulWidget::render(&table, inner, frame, &mut state);
}

fn render_buckets(frame: &mut Frame, area: Rect, list: &BucketList, theme: ThemeColors) {
    let visible = list.visible();
    if visible.is_empty() {
        let message = if list.loading {
            "Loading buckets..."
        } else if list.buckets.is_empty() {
            "No buckets. Press c to create one."
        } else {
            "No bucket matches the filter."
        };
        render_message(frame, area, "Buckets", message, theme);
        return;
    }
    let rows = visible
        .iter()
        .map(|bucket| Row::new([bucket.title(), bucket.description()]).height(1))
        .collect();
    render_table(frame, area, "Buckets", ["Name", "Created"], rows, 28, list.cursor, theme);
}

fn render_tree(frame: &mut Frame, area: Rect, tree: &TreeView, theme: ThemeColors) {
    let title = format!("/{}", tree.cwd_path());
    if tree.entries().is_empty() {
        let message = if tree.loading { "Loading keys..." } else { "Empty directory." };
        render_message(frame, area, &title, message, theme);
        return;
    }
    let rows = tree
        .entries()
        .iter()
        .map(|id| {
            let (date, clock) = format_short(tree.tree.node(*id).last_modified);
            let when = format!("{date} {clock}").trim().to_string();
            Row::new([node_label(&tree.tree, *id), when]).height(1)
        })
        .collect();
    render_table(frame, area, &title, ["Name", "Modified"], rows, 14, tree.cursor, theme);
}

fn render_object(frame: &mut Frame, area: Rect, object: &ObjectView, body: &[StyledLine], theme: ThemeColors) {
    let Some(loaded) = &object.object else {
        let message = if object.loading { "Fetching object..." } else { "Object unavailable." };
        render_message(frame, area, &object.key, message, theme);
        return;
    };
    let title = format!("{} ({})", loaded.file_name(), format_size(loaded.size));
    let inner = render_panel(frame, area, &title, theme);
    let mut lines: Vec<Line> = format_header(loaded).lines().map(|line| Line::from(line.to_string())).collect();
    lines.extend(body.iter().map(|spans| {
        Line::from_spans(
            spans
                .iter()
                .map(|span| {
                    let fg = span.fg.unwrap_or(theme.panel_fg);
                    Span::styled(span.text.clone(), Style::new().fg(fg).bg(theme.panel_bg))
                })
                .collect::<Vec<_>>(),
        )
    }));
    Paragraph::new(Text::from_lines(lines))
        .wrap(WrapMode::None)
        .scroll((object.scroll.min(u16::MAX as usize) as u16, 0))
        .style(Style::new().fg(theme.panel_fg).bg(theme.panel_bg))
        .render(inner, frame);
}

fn render_paged(frame: &mut Frame, area: Rect, paged: &PagedObjects, theme: ThemeColors) {
    if paged.rows.is_empty() {
        let message = if paged.loading { "Listing objects..." } else { "Bucket is empty." };
        render_message(frame, area, &paged.bucket, message, theme);
        return;
    }
    let rows = paged
        .page_rows()
        .iter()
        .map(|row| Row::new([row.title(), row.description()]).height(1))
        .collect();
    render_table(frame, area, &paged.bucket, ["Key", "Details"], rows, 48, paged.cursor, theme);
}

fn render_status(frame: &mut Frame, area: Rect, view: &View, status: &str, theme: ThemeColors) {
    let (left, style) = match view.error() {
        Some(err) => (
            format!(" Error: {err}"),
            Style::new().fg(theme.error_fg).bg(theme.status_bg),
        ),
        None => (format!(" {status}"), Style::new().fg(theme.status_fg).bg(theme.status_bg)),
    };
    let right = if view.is_loading() { "working... " } else { "" };
    let spacing = (area.width as usize).saturating_sub(display_width(&left) + right.len());
    let line = format!("{left}{}{right}", " ".repeat(spacing));
    Block::new().style(style).render(area, frame);
    Paragraph::new(Text::from(line)).style(style).render(area, frame);
}

/// Key hints for whatever currently has input focus.
pub fn key_hints(view: &View) -> Vec<(&'static str, &'static str)> {
    let hint = |action: Action, label: &'static str| (label_for(action), label);
    match view {
        View::BucketList(list) => match list.mode {
            BucketMode::Create(_) | BucketMode::Filter(_) => {
                vec![("enter", "Submit"), ("esc", "Cancel"), ("ctrl+c", "Quit")]
            }
            BucketMode::ConfirmDelete { .. } => vec![
                ("h/l", "Toggle"),
                hint(Action::Select, "Confirm"),
                hint(Action::Quit, "Quit"),
            ],
            BucketMode::Navigate => vec![
                hint(Action::Select, "Open"),
                hint(Action::Create, "Create"),
                hint(Action::Delete, "Delete"),
                hint(Action::Filter, "Filter"),
                hint(Action::Quit, "Quit"),
            ],
        },
        View::Tree(tree) if tree.input.is_some() => {
            vec![("enter", "Edit new"), ("esc", "Cancel"), ("ctrl+c", "Quit")]
        }
        View::Tree(_) => vec![
            hint(Action::Select, "Open"),
            hint(Action::Ascend, "Up"),
            hint(Action::Descend, "Into"),
            hint(Action::Create, "New object"),
            hint(Action::Back, "Buckets"),
            hint(Action::Quit, "Quit"),
        ],
        View::Object(_) => vec![
            hint(Action::Edit, "Edit"),
            hint(Action::Down, "Scroll"),
            hint(Action::Back, "Back"),
            hint(Action::Quit, "Quit"),
        ],
        View::Paged(_) => vec![
            hint(Action::Select, "Open"),
            ("h/l", "Page"),
            hint(Action::Back, "Buckets"),
            hint(Action::Quit, "Quit"),
        ],
    }
}

fn render_keybar(frame: &mut Frame, area: Rect, view: &View, theme: ThemeColors) {
    let style = Style::new().fg(theme.keybar_fg).bg(theme.keybar_bg);
    Block::new().style(style).render(area, frame);
    let mut status = StatusLine::new().style(style);
    for (key, label) in key_hints(view) {
        status = status.right(StatusItem::key_hint(key, label));
    }
    status.render(area, frame);
}

fn centered(frame: &Frame, width: u16, height: u16) -> Rect {
    let full = full_area(frame);
    let width = full.width.min(width).max(20);
    let x = full.x + full.width.saturating_sub(width) / 2;
    let y = full.y + full.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

fn render_prompt(frame: &mut Frame, title: &str, label: &str, input: &TextInput, theme: ThemeColors) {
    let area = centered(frame, 60, 6);
    let style = Style::new().fg(theme.dialog_fg).bg(theme.dialog_bg);
    Block::new().style(style).render(area, frame);
    let block = Block::bordered()
        .border_style(Style::new().fg(theme.panel_border_active))
        .style(style)
        .title(title);
    let text = format!("{label}\n\n{}", input.value);
    Paragraph::new(Text::from(text)).style(style).block(block).render(area, frame);
    let before: String = input.value.chars().take(input.cursor).collect();
    let cursor_x = area.x + 1 + display_width(&before) as u16;
    frame.set_cursor(Some((cursor_x, area.y + 3)));
}

fn render_confirm(frame: &mut Frame, bucket: &str, armed: bool, theme: ThemeColors) {
    let area = centered(frame, 50, 7);
    let style = Style::new().fg(theme.dialog_fg).bg(theme.dialog_bg);
    Block::new().style(style).render(area, frame);
    let block = Block::bordered()
        .border_style(Style::new().fg(theme.panel_border_active))
        .style(style)
        .title("Delete bucket");
    let (yes, no) = if armed { ("[ Yes ]", "  No  ") } else { ("  Yes  ", "[ No ]") };
    let text = format!("Delete bucket {bucket}?\n\n    {yes}    {no}");
    Paragraph::new(Text::from(text)).style(style).block(block).render(area, frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bucket;

    #[test]
    fn ensure_visible_scrolls_both_ways() {
        let mut state = TableState::default();
        state.select(Some(12));
        ensure_visible(&mut state, 5);
        assert_eq!(state.offset, 8);
        state.select(Some(3));
        ensure_visible(&mut state, 5);
        assert_eq!(state.offset, 3);
    }

    #[test]
    fn hints_follow_focus() {
        let mut list = BucketList::new(vec![Bucket { name: "a".to_string(), created_at: None }]);
        let view = View::BucketList(list.clone());
        assert!(key_hints(&view).contains(&("d", "Delete")));

        list.mode = BucketMode::ConfirmDelete { bucket: "a".to_string(), armed: false };
        let hints = key_hints(&View::BucketList(list));
        assert!(hints.contains(&("enter", "Confirm")));
        assert!(!hints.iter().any(|(_, label)| *label == "Delete"));

        let mut tree = TreeView::loading("b");
        tree.input = Some(TextInput::default());
        assert_eq!(key_hints(&View::Tree(tree))[1], ("esc", "Cancel"));
    }
}
