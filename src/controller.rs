#![forbid(unsafe_code)]

//! The navigation state machine.
//!
//! `handle_key` and `apply` are the only entry points. Both mutate the active
//! view synchronously and return at most one [`Effect`] for the runtime; no
//! I/O happens in here.

use crate::commands::{AfterPut, Completion, EditJob, EditPurpose, Effect, Request};
use crate::config::{AppContext, Listing};
use crate::keymap::{action_for, Action, Key};
use crate::model::{
    file_extension, Bucket, BucketList, BucketMode, ObjectView, PagedObjects, PagedRow, TextInput,
    TreeView, View,
};
use crate::tree::PathTree;

const SCROLL_PAGE: isize = 10;

#[derive(Debug)]
pub struct Controller {
    view: View,
    status: String,
}

/// Outcome of feeding a key to a text prompt.
enum Prompt {
    Editing,
    Submit(String),
    Cancel,
    Quit,
}

fn edit_prompt(input: &mut TextInput, key: Key) -> Prompt {
    match key {
        Key::Enter => Prompt::Submit(input.value.trim().to_string()),
        Key::Esc => Prompt::Cancel,
        Key::CtrlC => Prompt::Quit,
        Key::Backspace => {
            input.backspace();
            Prompt::Editing
        }
        Key::Left => {
            input.left();
            Prompt::Editing
        }
        Key::Right => {
            input.right();
            Prompt::Editing
        }
        Key::Char(ch) => {
            input.insert(ch);
            Prompt::Editing
        }
        _ => Prompt::Editing,
    }
}

impl Controller {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self { view: View::BucketList(BucketList::new(buckets)), status: String::from("Ready") }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn handle_key(&mut self, ctx: &AppContext, key: Key) -> Effect {
        match &self.view {
            View::BucketList(_) => self.bucket_list_key(ctx, key),
            View::Tree(_) => self.tree_key(key),
            View::Object(_) => self.object_key(ctx, key),
            View::Paged(_) => self.paged_key(key),
        }
    }

    fn bucket_list_key(&mut self, ctx: &AppContext, key: Key) -> Effect {
        let View::BucketList(list) = &mut self.view else {
            return Effect::None;
        };
        match &mut list.mode {
            BucketMode::Create(input) => match edit_prompt(input, key) {
                Prompt::Editing => Effect::None,
                Prompt::Cancel => {
                    list.mode = BucketMode::Navigate;
                    Effect::None
                }
                Prompt::Quit => Effect::Quit,
                Prompt::Submit(name) if name.is_empty() => Effect::None,
                Prompt::Submit(name) => {
                    list.mode = BucketMode::Navigate;
                    list.loading = true;
                    self.status = format!("Creating bucket {name}");
                    Effect::Request(Request::CreateBucket { name, region: ctx.config.region.clone() })
                }
            },
            BucketMode::Filter(input) => {
                match edit_prompt(input, key) {
                    Prompt::Editing => {}
                    Prompt::Quit => return Effect::Quit,
                    Prompt::Cancel => {
                        list.filter.clear();
                        list.mode = BucketMode::Navigate;
                    }
                    Prompt::Submit(_) => {
                        list.filter = input.value.clone();
                        list.mode = BucketMode::Navigate;
                    }
                }
                list.clamp_cursor();
                Effect::None
            }
            BucketMode::ConfirmDelete { bucket, armed } => match action_for(key) {
                Some(Action::Ascend | Action::Descend) => {
                    *armed = !*armed;
                    Effect::None
                }
                Some(Action::Select) => {
                    let name = bucket.clone();
                    let confirmed = *armed;
                    list.mode = BucketMode::Navigate;
                    if !confirmed {
                        return Effect::None;
                    }
                    list.loading = true;
                    self.status = format!("Deleting bucket {name}");
                    Effect::Request(Request::DeleteBucket { name })
                }
                Some(Action::Quit) => Effect::Quit,
                _ => Effect::None,
            },
            BucketMode::Navigate => match action_for(key) {
                Some(Action::Quit) => Effect::Quit,
                Some(Action::Up) => {
                    list.move_cursor(-1);
                    Effect::None
                }
                Some(Action::Down) => {
                    list.move_cursor(1);
                    Effect::None
                }
                Some(Action::Create) => {
                    list.mode = BucketMode::Create(TextInput::default());
                    Effect::None
                }
                Some(Action::Delete) => {
                    if let Some(bucket) = list.selected_bucket() {
                        let bucket = bucket.name.clone();
                        list.mode = BucketMode::ConfirmDelete { bucket, armed: false };
                    }
                    Effect::None
                }
                Some(Action::Filter) => {
                    let value = list.filter.clone();
                    let cursor = value.chars().count();
                    list.mode = BucketMode::Filter(TextInput { value, cursor });
                    Effect::None
                }
                Some(Action::Back) => {
                    list.filter.clear();
                    list.clamp_cursor();
                    Effect::None
                }
                Some(Action::Select | Action::Descend) => match list.selected_bucket() {
                    Some(bucket) => {
                        let name = bucket.name.clone();
                        self.open_bucket(ctx, name)
                    }
                    None => Effect::None,
                },
                _ => Effect::None,
            },
        }
    }

    fn tree_key(&mut self, key: Key) -> Effect {
        let View::Tree(tree) = &mut self.view else {
            return Effect::None;
        };
        if let Some(input) = tree.input.as_mut() {
            return match edit_prompt(input, key) {
                Prompt::Editing => Effect::None,
                Prompt::Cancel => {
                    tree.input = None;
                    Effect::None
                }
                Prompt::Quit => Effect::Quit,
                Prompt::Submit(name) if name.is_empty() => Effect::None,
                Prompt::Submit(name) => {
                    tree.input = None;
                    let key = tree.key_in_cwd(&name);
                    Effect::OpenEditor(EditJob {
                        content: Vec::new(),
                        extension: file_extension(&key).map(str::to_string),
                        purpose: EditPurpose::CreateObject { bucket: tree.bucket.clone(), key },
                    })
                }
            };
        }
        match action_for(key) {
            Some(Action::Quit) => Effect::Quit,
            Some(Action::Up) => {
                tree.move_cursor(-1);
                Effect::None
            }
            Some(Action::Down) => {
                tree.move_cursor(1);
                Effect::None
            }
            Some(Action::Create) => {
                tree.input = Some(TextInput::default());
                Effect::None
            }
            Some(Action::Select | Action::Descend) => {
                let Some(id) = tree.selected() else {
                    return Effect::None;
                };
                if tree.descend() {
                    return Effect::None;
                }
                let bucket = tree.bucket.clone();
                let key = tree.tree.path(id);
                self.open_object(bucket, key)
            }
            Some(Action::Ascend) => {
                if tree.ascend() {
                    Effect::None
                } else {
                    self.open_bucket_list()
                }
            }
            Some(Action::Back) => self.open_bucket_list(),
            _ => Effect::None,
        }
    }

    fn object_key(&mut self, ctx: &AppContext, key: Key) -> Effect {
        let View::Object(object) = &mut self.view else {
            return Effect::None;
        };
        match action_for(key) {
            Some(Action::Quit) => Effect::Quit,
            Some(Action::Up) => {
                object.scroll_by(-1);
                Effect::None
            }
            Some(Action::Down) => {
                object.scroll_by(1);
                Effect::None
            }
            Some(Action::PageUp) => {
                object.scroll_by(-SCROLL_PAGE);
                Effect::None
            }
            Some(Action::PageDown) => {
                object.scroll_by(SCROLL_PAGE);
                Effect::None
            }
            Some(Action::Edit) => match &object.object {
                Some(loaded) => Effect::OpenEditor(EditJob {
                    content: loaded.content.clone(),
                    extension: file_extension(&object.key).map(str::to_string),
                    purpose: EditPurpose::UpdateObject {
                        bucket: object.bucket.clone(),
                        key: object.key.clone(),
                    },
                }),
                None => Effect::None,
            },
            Some(Action::Back | Action::Ascend) => {
                let bucket = object.bucket.clone();
                let key = object.key.clone();
                self.return_to_listing(ctx, bucket, key)
            }
            _ => Effect::None,
        }
    }

    fn paged_key(&mut self, key: Key) -> Effect {
        let View::Paged(paged) = &mut self.view else {
            return Effect::None;
        };
        match action_for(key) {
            Some(Action::Quit) => Effect::Quit,
            Some(Action::Up) => {
                paged.move_cursor(-1);
                Effect::None
            }
            Some(Action::Down) => {
                paged.move_cursor(1);
                Effect::None
            }
            Some(Action::Ascend | Action::PageUp) => {
                paged.turn_page(-1);
                Effect::None
            }
            Some(Action::Descend | Action::PageDown) => {
                paged.turn_page(1);
                Effect::None
            }
            Some(Action::Select) => match paged.selected_row() {
                Some(row) => {
                    let key = row.summary.key.clone();
                    let bucket = paged.bucket.clone();
                    self.open_object(bucket, key)
                }
                None => Effect::None,
            },
            Some(Action::Back) => self.open_bucket_list(),
            _ => Effect::None,
        }
    }

    fn open_bucket_list(&mut self) -> Effect {
        self.view = View::BucketList(BucketList::loading());
        Effect::Request(Request::ListBuckets)
    }

    /// Re-lists buckets in place, keeping the filter and cursor.
    fn refresh_bucket_list(&mut self) -> Effect {
        match &mut self.view {
            View::BucketList(list) => {
                list.loading = true;
                Effect::Request(Request::ListBuckets)
            }
            _ => self.open_bucket_list(),
        }
    }

    fn open_bucket(&mut self, ctx: &AppContext, bucket: String) -> Effect {
        match ctx.config.listing {
            Listing::Tree => {
                self.view = View::Tree(TreeView::loading(bucket.clone()));
                Effect::Request(Request::ListKeys { bucket, focus: None })
            }
            Listing::Paged => {
                self.view = View::Paged(PagedObjects::loading(bucket.clone(), ctx.config.page_size));
                Effect::Request(Request::ListObjects { bucket, prefetch: ctx.config.prefetch_content })
            }
        }
    }

    fn open_object(&mut self, bucket: String, key: String) -> Effect {
        self.view = View::Object(ObjectView::loading(bucket.clone(), key.clone()));
        Effect::Request(Request::GetObject { bucket, key })
    }

    /// Leaves the object view for the bucket's listing, focused on `key` when
    /// the listing is a tree.
    fn return_to_listing(&mut self, ctx: &AppContext, bucket: String, key: String) -> Effect {
        match ctx.config.listing {
            Listing::Tree => {
                self.view = View::Tree(TreeView::loading(bucket.clone()));
                Effect::Request(Request::ListKeys { bucket, focus: Some(key) })
            }
            Listing::Paged => self.open_bucket(ctx, bucket),
        }
    }

    /// Merges a finished request or editor session into the active view.
    pub fn apply(&mut self, _ctx: &AppContext, completion: Completion) -> Effect {
        match completion {
            Completion::BucketsListed(result) => {
                let View::BucketList(list) = &mut self.view else {
                    return self.stale("buckets listed");
                };
                match result {
                    Ok(buckets) => list.replace_buckets(buckets),
                    Err(err) => return self.fail(err),
                }
                Effect::None
            }
            Completion::BucketCreated { name, result } | Completion::BucketDeleted { name, result }
                if !matches!(self.view, View::BucketList(_)) =>
            {
                tracing::debug!(bucket = %name, ok = result.is_ok(), "bucket change after leaving list");
                Effect::None
            }
            Completion::BucketCreated { name, result } => match result {
                Ok(()) => {
                    tracing::info!(bucket = %name, "bucket created");
                    self.status = format!("Created bucket {name}");
                    self.refresh_bucket_list()
                }
                Err(err) => self.fail(err),
            },
            Completion::BucketDeleted { name, result } => match result {
                Ok(()) => {
                    tracing::info!(bucket = %name, "bucket deleted");
                    self.status = format!("Deleted bucket {name}");
                    self.refresh_bucket_list()
                }
                Err(err) => self.fail(err),
            },
            Completion::KeysListed { bucket, focus, result } => {
                let View::Tree(tree) = &mut self.view else {
                    return self.stale("keys listed");
                };
                if tree.bucket != bucket {
                    return self.stale("keys listed");
                }
                match result {
                    Ok(summaries) => {
                        let listing = summaries.iter().map(|s| (s.key.as_str(), s.last_modified));
                        tree.load(PathTree::from_listing(listing), focus.as_deref());
                        Effect::None
                    }
                    Err(err) => self.fail(err),
                }
            }
            Completion::ObjectsListed { bucket, result } => {
                let View::Paged(paged) = &mut self.view else {
                    return self.stale("objects listed");
                };
                if paged.bucket != bucket {
                    return self.stale("objects listed");
                }
                match result {
                    Ok(rows) => {
                        let rows = rows
                            .into_iter()
                            .map(|(summary, preview)| PagedRow { summary, preview })
                            .collect();
                        paged.load(rows);
                        Effect::None
                    }
                    Err(err) => self.fail(err),
                }
            }
            Completion::ObjectFetched { bucket, key, result } => {
                let View::Object(view) = &mut self.view else {
                    return self.stale("object fetched");
                };
                if view.bucket != bucket || view.key != key {
                    return self.stale("object fetched");
                }
                match result {
                    Ok(object) => {
                        view.object = Some(object);
                        view.loading = false;
                        view.error = None;
                        view.scroll_by(0);
                        Effect::None
                    }
                    Err(err) => self.fail(err),
                }
            }
            Completion::ObjectWritten { bucket, key, then, result } => {
                let current = match (&self.view, then) {
                    (View::Object(view), AfterPut::Refetch) => view.bucket == bucket && view.key == key,
                    (View::Tree(view), AfterPut::Rebuild) => view.bucket == bucket,
                    _ => false,
                };
                if !current {
                    return self.stale("object written");
                }
                if let Err(err) = result {
                    return self.fail(err);
                }
                tracing::info!(%bucket, %key, "object written");
                match then {
                    AfterPut::Refetch => {
                        self.status = format!("Saved {key}");
                        self.open_object(bucket, key)
                    }
                    AfterPut::Rebuild => {
                        self.status = format!("Created {key}");
                        self.view = View::Tree(TreeView::loading(bucket.clone()));
                        Effect::Request(Request::ListKeys { bucket, focus: Some(key) })
                    }
                }
            }
            Completion::EditorFinished { purpose, result } => {
                let content = match result {
                    Ok(content) => content,
                    Err(err) => {
                        tracing::error!(error = %err, "editor failed, ending session");
                        return Effect::Quit;
                    }
                };
                let request = match purpose {
                    EditPurpose::UpdateObject { bucket, key } => {
                        Request::PutObject { bucket, key, content, then: AfterPut::Refetch }
                    }
                    EditPurpose::CreateObject { bucket, key } => {
                        Request::PutObject { bucket, key, content, then: AfterPut::Rebuild }
                    }
                };
                match &mut self.view {
                    View::Object(view) => view.loading = true,
                    View::Tree(view) => view.loading = true,
                    _ => {}
                }
                Effect::Request(request)
            }
        }
    }

    fn fail(&mut self, err: impl std::fmt::Display) -> Effect {
        let message = err.to_string();
        tracing::warn!(view = self.view.name(), error = %message, "request failed");
        self.view.set_error(message);
        Effect::None
    }

    fn stale(&self, what: &str) -> Effect {
        tracing::debug!(view = self.view.name(), what, "dropping stale completion");
        Effect::None
    }
}
