#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use ftui::prelude::*;
use ftui::render::budget::FrameBudgetConfig;
use ftui::render::cell::PackedRgba;
use ftui::{Program, ProgramConfig};

use crate::commands::{self, Completion, EditJob, Effect};
use crate::config::AppContext;
use crate::controller::Controller;
use crate::editor::EditorLauncher;
use crate::keymap::Key;
use crate::model::View;
use crate::projection::{Highlighter, StyledLine};
use crate::ui::{render, render_background};

#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    pub screen_bg: PackedRgba,
    pub menu_bg: PackedRgba,
    pub menu_fg: PackedRgba,
    pub panel_bg: PackedRgba,
    pub panel_fg: PackedRgba,
    pub panel_border_active: PackedRgba,
    pub header_bg: PackedRgba,
    pub header_fg: PackedRgba,
    pub selection_bg: PackedRgba,
    pub selection_fg: PackedRgba,
    pub keybar_bg: PackedRgba,
    pub keybar_fg: PackedRgba,
    pub status_bg: PackedRgba,
    pub status_fg: PackedRgba,
    pub error_fg: PackedRgba,
    pub dialog_bg: PackedRgba,
    pub dialog_fg: PackedRgba,
}

impl ThemeColors {
    /// Blue-panel VGA palette.
    pub fn classic() -> Self {
        Self {
            screen_bg: PackedRgba::rgb(0, 0, 170),
            menu_bg: PackedRgba::rgb(0, 170, 170),
            menu_fg: PackedRgba::rgb(255, 255, 255),
            panel_bg: PackedRgba::rgb(0, 0, 170),
            panel_fg: PackedRgba::rgb(170, 170, 170),
            panel_border_active: PackedRgba::rgb(85, 255, 255),
            header_bg: PackedRgba::rgb(0, 0, 170),
            header_fg: PackedRgba::rgb(255, 255, 85),
            selection_bg: PackedRgba::rgb(0, 170, 170),
            selection_fg: PackedRgba::rgb(0, 0, 0),
            keybar_bg: PackedRgba::rgb(0, 170, 170),
            keybar_fg: PackedRgba::rgb(0, 0, 0),
            status_bg: PackedRgba::rgb(0, 0, 170),
            status_fg: PackedRgba::rgb(255, 255, 255),
            error_fg: PackedRgba::rgb(255, 85, 85),
            dialog_bg: PackedRgba::rgb(170, 170, 170),
            dialog_fg: PackedRgba::rgb(0, 0, 0),
        }
    }
}

#[derive(Debug)]
pub enum Msg {
    Event(Event),
    Completed(Completion),
}

impl From<Event> for Msg {
    fn from(event: Event) -> Self {
        Msg::Event(event)
    }
}

/// Highlighted body of the object last shown, keyed by what it was built from.
#[derive(Debug)]
struct HighlightCache {
    key: String,
    etag: String,
    lines: Vec<StyledLine>,
}

#[derive(Debug)]
pub struct App {
    ctx: AppContext,
    controller: Controller,
    editor: Arc<dyn EditorLauncher>,
    theme: ThemeColors,
    highlighter: Highlighter,
    highlighted: RefCell<Option<HighlightCache>>,
    force_clear_frames: RefCell<u8>,
}

impl App {
    pub fn new(ctx: AppContext, controller: Controller, editor: Arc<dyn EditorLauncher>) -> Self {
        Self {
            ctx,
            controller,
            editor,
            theme: ThemeColors::classic(),
            highlighter: Highlighter::new(),
            highlighted: RefCell::new(None),
            force_clear_frames: RefCell::new(0),
        }
    }

    pub fn run(self) -> io::Result<()> {
        let mut budget = FrameBudgetConfig::with_total(Duration::from_millis(50));
        budget.allow_frame_skip = false;
        let config = ProgramConfig::fullscreen().with_budget(budget);
        let mut program = Program::with_config(self, config)?;
        program.run()
    }

    /// Turns a reducer effect into work for the runtime.
    fn dispatch(&mut self, effect: Effect) -> Cmd<Msg> {
        match effect {
            Effect::None => Cmd::none(),
            Effect::Quit => {
                tracing::info!("quitting");
                Cmd::quit()
            }
            Effect::Request(request) => {
                tracing::debug!(request = request.label(), view = self.controller.view().name(), "issuing");
                let gateway = Arc::clone(&self.ctx.gateway);
                Cmd::task(move || Msg::Completed(commands::execute(gateway.as_ref(), request)))
            }
            Effect::OpenEditor(job) => Cmd::msg(Msg::Completed(self.run_editor(job))),
        }
    }

    /// Rebuilds the highlighted body when the open object changed.
    fn refresh_highlight(&self) {
        let View::Object(view) = self.controller.view() else {
            return;
        };
        let Some(object) = &view.object else {
            return;
        };
        let mut cache = self.highlighted.borrow_mut();
        if cache.as_ref().is_some_and(|c| c.key == object.key && c.etag == object.etag) {
            return;
        }
        *cache = Some(HighlightCache {
            key: object.key.clone(),
            etag: object.etag.clone(),
            lines: self.highlighter.highlight(&object.key, &object.content_text()),
        });
    }

    /// The editor owns the terminal until it exits, so this blocks the loop.
    fn run_editor(&mut self, job: EditJob) -> Completion {
        let result = self.editor.edit(&job.content, job.extension.as_deref());
        *self.force_clear_frames.borrow_mut() = 3;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "editor session failed");
        }
        Completion::EditorFinished { purpose: job.purpose, result }
    }
}

impl Model for App {
    type Message = Msg;

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::Event(Event::Key(event)) => {
                let Some(key) = Key::from_event(&event) else {
                    return Cmd::none();
                };
                tracing::trace!(?key, view = self.controller.view().name(), "key");
                let effect = self.controller.handle_key(&self.ctx, key);
                self.dispatch(effect)
            }
            Msg::Event(_) => Cmd::none(),
            Msg::Completed(completion) => {
                let effect = self.controller.apply(&self.ctx, completion);
                self.dispatch(effect)
            }
        }
    }

    fn view(&self, frame: &mut Frame) {
        frame.set_cursor(None);
        {
            let mut force_clear = self.force_clear_frames.borrow_mut();
            if *force_clear > 0 {
                frame.clear();
                *force_clear = force_clear.saturating_sub(1);
            }
        }
        render_background(frame, self.theme);
        self.refresh_highlight();
        let cache = self.highlighted.borrow();
        let body = cache.as_ref().map(|c| c.lines.as_slice()).unwrap_or(&[]);
        render(frame, &self.controller, body, self.theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::EditorError;
    use crate::memory::MemoryGateway;
    use crate::storage::StorageGateway;
    use std::result::Result;

    #[derive(Debug)]
    struct ScriptedEditor(Vec<u8>);

    impl EditorLauncher for ScriptedEditor {
        fn edit(&self, _content: &[u8], _extension: Option<&str>) -> Result<Vec<u8>, EditorError> {
            Ok(self.0.clone())
        }
    }

    fn app(gateway: MemoryGateway, editor: Vec<u8>) -> App {
        let gateway: Arc<dyn StorageGateway> = Arc::new(gateway);
        let controller = Controller::new(gateway.list_buckets().unwrap());
        let ctx = AppContext::new(AppConfig::default(), gateway);
        App::new(ctx, controller, Arc::new(ScriptedEditor(editor)))
    }

    #[test]
    fn editor_effect_forces_full_redraws() {
        let mut app = app(MemoryGateway::with_objects("data", [("a.txt", "a")]), b"b".to_vec());
        let done = app.run_editor(EditJob {
            content: Vec::new(),
            extension: Some("txt".to_string()),
            purpose: commands::EditPurpose::CreateObject {
                bucket: "data".to_string(),
                key: "b.txt".to_string(),
            },
        });
        assert_eq!(*app.force_clear_frames.borrow(), 3);
        assert!(matches!(done, Completion::EditorFinished { result: Ok(ref body), .. } if body == b"b"));
    }

    #[test]
    fn highlight_is_rebuilt_only_when_the_object_changes() {
        let mut app = app(MemoryGateway::with_objects("data", [("main.rs", "fn main() {}\n")]), Vec::new());
        let effect = app.controller.handle_key(&app.ctx, Key::Enter);
        let _ = app.update(Msg::Completed(run(&app, effect)));
        let effect = app.controller.handle_key(&app.ctx, Key::Enter);
        let _ = app.update(Msg::Completed(run(&app, effect)));
        assert!(matches!(app.controller.view(), View::Object(_)));

        app.refresh_highlight();
        let first = app.highlighted.borrow().as_ref().map(|c| (c.key.clone(), c.lines.len()));
        assert_eq!(first, Some(("main.rs".to_string(), 1)));
        if let Some(cache) = app.highlighted.borrow_mut().as_mut() {
            cache.lines.clear();
        }
        app.refresh_highlight();
        assert!(app.highlighted.borrow().as_ref().is_some_and(|c| c.lines.is_empty()));
    }

    fn run(app: &App, effect: Effect) -> Completion {
        let Effect::Request(request) = effect else { panic!("expected a request, got {effect:?}") };
        commands::execute(app.ctx.gateway.as_ref(), request)
    }

    #[test]
    fn completions_route_through_controller() {
        let mut app = app(MemoryGateway::with_objects("data", [("a.txt", "a")]), Vec::new());
        let listing = Completion::BucketsListed(Ok(Vec::new()));
        let _ = app.update(Msg::Completed(listing));
        let View::BucketList(list) = app.controller.view() else { panic!("expected bucket list") };
        assert!(list.buckets.is_empty());
    }
}
