//! Main editor orchestration.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` is the one type a front end talks to. It owns the session, the
//! mode, the open prompt and the status line. Each input goes through
//! [`transition`], and the returned [`Effect`] is applied here. Some effects
//! open a follow-up prompt (save as, confirm close, the replace steps); those
//! move the mode on again from inside [`Editor::handle_event`].

use std::collections::HashMap;
use std::path::Path;

use quire_buffer::{BufferResult, TextBuffer};
use quire_syntax::Theme;

use crate::command::{Command, Motion};
use crate::command_line::{self, LineCommand};
use crate::context::EditorContext;
use crate::document::{Document, DocumentId};
use crate::event::{EditorEvent, EventBus};
use crate::keymap::Keymap;
use crate::mode::{Effect, Event, Mode, transition};
use crate::prompt::{Prompt, PromptHistory, PromptKind};
use crate::search::{ReplaceSession, Search, SearchOptions};
use crate::session::Session;
use crate::status::Status;
use crate::CoreResult;

/// What the front end should do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the process; send [`Event::Resume`] when it comes back
    Suspend,
    /// Every buffer is closed
    Quit,
}

/// How the prompt line should look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub label: String,
    pub text: String,
    /// Cursor column within `text`, in characters
    pub cursor: usize,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOutcome {
    Saved,
    /// The buffer has no name yet; a save-as prompt is open
    Prompted,
    Failed,
}

/// The main editor state.
///
/// Owned by the UI thread. Other parts of the program follow along through
/// [`Editor::subscribe`].
pub struct Editor {
    /// Configuration, theme and grammars
    ctx: EditorContext,

    /// Open documents
    session: Session,

    keymap: Keymap,
    mode: Mode,

    /// The prompt being edited, if any
    prompt: Option<Prompt>,

    /// Prompt histories by name, loaded on first use
    histories: HashMap<&'static str, PromptHistory>,

    status: Status,

    /// Pattern waiting for its replacement text
    pending_replace: Option<Search>,

    /// Interactive replace in progress
    replace: Option<ReplaceSession>,

    /// Close the active document once the save-as prompt succeeds
    close_after_save: bool,

    /// A `:qall` is working through the documents
    closing_all: bool,

    /// Event bus for notifications
    events: EventBus,
}

impl Editor {
    /// Creates an editor with no documents and a text area of the given size.
    pub fn new(ctx: EditorContext, height: usize, width: usize) -> Self {
        let keymap = Keymap::from_config(&ctx.config);
        let status = Status::new(ctx.config.editor.status_ticks);
        Self {
            ctx,
            session: Session::new(height, width),
            keymap,
            mode: Mode::Normal,
            prompt: None,
            histories: HashMap::new(),
            status,
            pending_replace: None,
            replace: None,
            close_after_save: false,
            closing_all: false,
            events: EventBus::new(),
        }
    }

    // ==================== Documents ====================

    /// Opens a file, or switches to it if it is already open.
    pub fn open(&mut self, path: impl AsRef<Path>) -> CoreResult<DocumentId> {
        let path = path.as_ref();
        if let Some(index) = self.session.find_by_path(path) {
            self.session.switch_to(index);
            if let Some(doc) = self.session.active() {
                let id = doc.id();
                self.events.emit(EditorEvent::ActiveChanged(id));
                return Ok(id);
            }
        }

        let doc = Document::open(path, &self.ctx)?;
        if doc.is_mixed() {
            let ending = doc.line_ending().as_str().escape_default().to_string();
            self.status
                .set(format!("mixed newlines will be converted to {ending}"));
        }
        Ok(self.add_document(doc))
    }

    /// Opens an empty, unnamed document.
    pub fn new_document(&mut self) -> DocumentId {
        let doc = Document::new(&self.ctx);
        self.add_document(doc)
    }

    /// Adds a document and makes it active.
    pub fn add_document(&mut self, doc: Document) -> DocumentId {
        let id = self.session.add(doc);
        tracing::info!(%id, "document opened");
        self.events.emit(EditorEvent::DocumentOpened(id));
        self.sync_active();
        id
    }

    /// Makes the document at `index` active.
    pub fn switch_to(&mut self, index: usize) -> bool {
        if !self.session.switch_to(index) {
            return false;
        }
        if let Some(doc) = self.session.active() {
            self.events.emit(EditorEvent::ActiveChanged(doc.id()));
        }
        true
    }

    /// Moves the cursor of the active document to a 1-based line.
    pub fn goto_line(&mut self, number: i64) {
        if let Some(doc) = self.session.active_mut() {
            doc.buffer_mut().goto_line(number);
            doc.sync();
        }
    }

    // ==================== Input ====================

    /// Applies one input event.
    pub fn handle_event(&mut self, event: Event) -> Flow {
        if matches!(event, Event::Key(_)) {
            self.status.tick();
        }

        let (next, effect) = transition(self.mode, &event, &self.keymap);
        tracing::trace!(?effect, ?next, "dispatch");
        self.set_mode(next);
        let flow = self.apply(effect);
        self.sync_active();

        if self.session.is_empty() {
            tracing::info!("last document closed");
            self.events.emit(EditorEvent::Quit);
            return Flow::Quit;
        }
        flow
    }

    fn apply(&mut self, effect: Effect) -> Flow {
        match effect {
            Effect::None => {}
            Effect::Unbound(key) => self.status.set(format!("unknown key: {key}")),
            Effect::Run(command) => self.run(command),
            Effect::Type(c) => self.edit(|buffer| buffer.type_char(c)),
            Effect::Paste(text) => self.edit(|buffer| buffer.paste(&text)),
            Effect::Resize { width, height } => self.session.resize(height, width),
            Effect::OpenPrompt(kind) => self.open_prompt(kind, ""),
            Effect::PromptEdit(edit) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.edit(edit, history_entries(&self.histories, prompt.kind()));
                }
            }
            Effect::PromptType(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.insert_char(c);
                }
            }
            Effect::PromptPaste(text) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.insert_str(&text);
                }
            }
            Effect::Submit(kind) => self.submit(kind),
            Effect::Cancel(kind) => self.cancel(kind),
            Effect::Answer(kind, answer) => self.answer(kind, answer),
            Effect::ReverseStart => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.reverse_start();
                }
            }
            Effect::ReverseType(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.reverse_type(c, history_entries(&self.histories, prompt.kind()));
                }
            }
            Effect::ReverseBackspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.reverse_backspace(history_entries(&self.histories, prompt.kind()));
                }
            }
            Effect::ReverseNext => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.reverse_next(history_entries(&self.histories, prompt.kind()));
                }
            }
            Effect::ReverseAccept(edit) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    let history = history_entries(&self.histories, prompt.kind());
                    prompt.reverse_accept(history);
                    prompt.edit(edit, history);
                }
            }
            Effect::ReverseCancel => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.reverse_cancel();
                }
            }
            Effect::Suspend => return Flow::Suspend,
            Effect::Resume => {
                let (height, width) = self.session.screen();
                self.session.resize(height, width);
            }
        }
        Flow::Continue
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "mode change");
            self.mode = mode;
            if let Some(doc) = self.session.active_mut() {
                doc.buffer_mut().seal();
            }
            self.events.emit(EditorEvent::ModeChanged(mode));
        }
    }

    fn sync_active(&mut self) {
        if let Some(doc) = self.session.active_mut() {
            doc.sync();
        }
    }

    // ==================== Normal Mode ====================

    fn run(&mut self, command: Command) {
        match command {
            Command::Move { motion, extend } => self.motion(motion, extend),
            Command::ScrollUp => self.scroll(-1),
            Command::ScrollDown => self.scroll(1),
            Command::Newline => self.edit(TextBuffer::newline),
            Command::Tab => self.edit(TextBuffer::tab),
            Command::Dedent => self.edit(TextBuffer::dedent),
            Command::Backspace => self.edit(TextBuffer::backspace),
            Command::Delete => self.edit(TextBuffer::delete_forward),
            Command::Cut => self.cut(),
            Command::Uncut => {
                if let Some(text) = self.session.clipboard().map(str::to_string) {
                    self.edit(|buffer| buffer.uncut(&text));
                }
            }
            Command::Undo => self.undo(false),
            Command::Redo => self.undo(true),
            Command::Save => {
                self.save();
            }
            Command::Close => self.close_active(false),
            Command::NextBuffer => self.switch(true),
            Command::PrevBuffer => self.switch(false),
            Command::Position => self.position(),
            Command::Search
            | Command::Replace
            | Command::GotoLine
            | Command::CommandPrompt
            | Command::Open
            | Command::SaveAs
            | Command::Suspend => {
                tracing::debug!(%command, "handled by the mode transition");
            }
        }
    }

    fn motion(&mut self, motion: Motion, extend: bool) {
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        match motion {
            Motion::PageUp => doc.page(-1, extend),
            Motion::PageDown => doc.page(1, extend),
            _ => {
                let buffer = doc.buffer_mut();
                match motion {
                    Motion::Left => buffer.move_left(extend),
                    Motion::Right => buffer.move_right(extend),
                    Motion::Up => buffer.move_up(extend),
                    Motion::Down => buffer.move_down(extend),
                    Motion::Home => buffer.move_home(extend),
                    Motion::End => buffer.move_end(extend),
                    Motion::BufferStart => buffer.move_buffer_start(extend),
                    Motion::BufferEnd => buffer.move_buffer_end(extend),
                    Motion::WordLeft => buffer.move_word_left(extend),
                    Motion::WordRight => buffer.move_word_right(extend),
                    Motion::ParagraphUp => buffer.move_paragraph_up(extend),
                    Motion::ParagraphDown => buffer.move_paragraph_down(extend),
                    Motion::PageUp | Motion::PageDown => {}
                }
            }
        }
    }

    fn scroll(&mut self, delta: isize) {
        if let Some(doc) = self.session.active_mut() {
            doc.scroll(delta);
        }
    }

    /// Runs an edit on the active buffer, reporting errors on the status line.
    fn edit(&mut self, f: impl FnOnce(&mut TextBuffer) -> BufferResult<()>) {
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let revision = doc.buffer().revision();
        if let Err(e) = f(doc.buffer_mut()) {
            tracing::warn!("edit failed: {e}");
            self.status.set(e.to_string());
        }
        if doc.buffer().revision() != revision {
            self.events.emit(EditorEvent::DocumentChanged(doc.id()));
        }
    }

    fn cut(&mut self) {
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let id = doc.id();
        match doc.buffer_mut().cut() {
            Ok(cut) => {
                if !cut.text.is_empty() {
                    self.session.store_cut(cut.text, cut.continued);
                    self.events.emit(EditorEvent::DocumentChanged(id));
                }
            }
            Err(e) => self.status.set(e.to_string()),
        }
    }

    fn undo(&mut self, redo: bool) {
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let result = if redo {
            doc.buffer_mut().redo()
        } else {
            doc.buffer_mut().undo()
        };
        match result {
            Ok(label) => {
                let verb = if redo { "redo" } else { "undo" };
                self.status.set(format!("{verb}: {label}"));
                self.events.emit(EditorEvent::DocumentChanged(doc.id()));
            }
            Err(e) => self.status.set(e.to_string()),
        }
    }

    fn switch(&mut self, forward: bool) {
        if forward {
            self.session.next();
        } else {
            self.session.prev();
        }
        if let Some(doc) = self.session.active() {
            self.events.emit(EditorEvent::ActiveChanged(doc.id()));
        }
    }

    fn position(&mut self) {
        let Some(doc) = self.session.active() else {
            return;
        };
        let pos = doc.buffer().position();
        let total = doc.line_count();
        let noun = if total == 1 { "line" } else { "lines" };
        self.status.set(format!(
            "line {}, col {} (of {total} {noun})",
            pos.line + 1,
            pos.column + 1
        ));
    }

    // ==================== Saving and Closing ====================

    fn save(&mut self) -> SaveOutcome {
        let Some(doc) = self.session.active_mut() else {
            return SaveOutcome::Failed;
        };
        if doc.path().is_none() {
            self.open_prompt(PromptKind::SaveAs, "");
            return SaveOutcome::Prompted;
        }
        match doc.save() {
            Ok(lines) => {
                self.status.set(saved_message(lines));
                self.events.emit(EditorEvent::DocumentSaved(doc.id()));
                SaveOutcome::Saved
            }
            Err(e) => {
                tracing::warn!("save failed: {e}");
                self.status.set(format!("cannot save file: {e}"));
                SaveOutcome::Failed
            }
        }
    }

    fn save_as(&mut self, path: String) {
        if path.is_empty() {
            self.status.set("cancelled");
            self.abandon_close();
            return;
        }
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        match doc.save_as(&path, &self.ctx) {
            Ok(lines) => {
                self.status.set(saved_message(lines));
                self.events.emit(EditorEvent::DocumentSaved(doc.id()));
                if std::mem::take(&mut self.close_after_save) {
                    self.close_active(true);
                }
            }
            Err(e) => {
                tracing::warn!(%path, "save failed: {e}");
                self.status.set(format!("cannot save file: {e}"));
                self.abandon_close();
            }
        }
    }

    /// Closes the active document, asking first if it has unsaved changes.
    ///
    /// During `:qall` this keeps going until every document is closed or one
    /// needs an answer.
    fn close_active(&mut self, force: bool) {
        let mut force = force;
        loop {
            let Some(doc) = self.session.active() else {
                return;
            };
            if !force && doc.is_modified() {
                self.open_prompt(PromptKind::ConfirmClose, "");
                return;
            }
            if let Some(doc) = self.session.close_active() {
                tracing::info!(id = %doc.id(), "document closed");
                self.events.emit(EditorEvent::DocumentClosed(doc.id()));
            }
            if let Some(doc) = self.session.active() {
                self.events.emit(EditorEvent::ActiveChanged(doc.id()));
            }
            if !self.closing_all {
                return;
            }
            force = false;
        }
    }

    fn close_all(&mut self, force: bool) {
        if force {
            for doc in self.session.close_all() {
                self.events.emit(EditorEvent::DocumentClosed(doc.id()));
            }
            return;
        }
        self.closing_all = true;
        self.close_active(false);
    }

    fn abandon_close(&mut self) {
        self.close_after_save = false;
        self.closing_all = false;
    }

    fn reload(&mut self) {
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        match doc.reload(&self.ctx) {
            Ok(()) => {
                self.status.set("reloaded!");
                self.events.emit(EditorEvent::DocumentReloaded(doc.id()));
            }
            Err(e) => {
                tracing::warn!("reload failed: {e}");
                self.status.set(e.to_string());
            }
        }
    }

    // ==================== Prompts ====================

    fn open_prompt(&mut self, kind: PromptKind, initial: &str) {
        if let Some(name) = kind.history_name() {
            self.history_mut(name);
        }
        self.prompt = Some(Prompt::new(kind, initial));
        self.set_mode(Mode::Prompt(kind));
    }

    fn history_mut(&mut self, name: &'static str) -> &mut PromptHistory {
        let config = &self.ctx.config;
        self.histories.entry(name).or_insert_with(|| {
            let max = config.history.max_entries;
            match config.history_dir() {
                Some(dir) => PromptHistory::load(&dir, name, max),
                None => PromptHistory::in_memory(max),
            }
        })
    }

    fn submit(&mut self, kind: PromptKind) {
        let Some(mut prompt) = self.prompt.take() else {
            return;
        };
        if prompt.is_reverse_searching() {
            prompt.reverse_accept(history_entries(&self.histories, kind));
        }
        let text = prompt.text();
        if let Some(name) = kind.history_name() {
            self.history_mut(name).push(&text);
        }

        match kind {
            PromptKind::Search => self.search(text),
            PromptKind::ReplacePattern => self.replace_pattern(text),
            PromptKind::ReplaceText => self.replace_text(text),
            PromptKind::Command => self.command_line(&text),
            PromptKind::SaveAs => self.save_as(text),
            PromptKind::GotoLine => {
                if text.trim().is_empty() {
                    return;
                }
                match command_line::parse_line_number(&text) {
                    Ok(number) => self.goto_line(number),
                    Err(e) => self.status.set(e.to_string()),
                }
            }
            PromptKind::Open => {
                if text.is_empty() {
                    self.status.set("cancelled");
                } else if let Err(e) = self.open(&text) {
                    tracing::warn!("{e}");
                    self.status.set(e.to_string());
                }
            }
            PromptKind::ConfirmClose | PromptKind::ConfirmReplace | PromptKind::ConfirmReload => {}
        }
    }

    fn cancel(&mut self, kind: PromptKind) {
        self.prompt = None;
        self.pending_replace = None;
        self.abandon_close();
        if kind == PromptKind::ConfirmReplace {
            self.finish_replace();
        } else {
            self.status.set("cancelled");
        }
    }

    fn answer(&mut self, kind: PromptKind, answer: char) {
        self.prompt = None;
        match (kind, answer) {
            (PromptKind::ConfirmClose, 'y') => match self.save() {
                SaveOutcome::Saved => self.close_active(true),
                SaveOutcome::Prompted => self.close_after_save = true,
                SaveOutcome::Failed => self.abandon_close(),
            },
            (PromptKind::ConfirmClose, _) => self.close_active(true),
            (PromptKind::ConfirmReload, 'y') => self.reload(),
            (PromptKind::ConfirmReload, _) => {}
            (PromptKind::ConfirmReplace, answer) => self.answer_replace(answer),
            _ => {}
        }
    }

    // ==================== Search and Replace ====================

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            regex: self.ctx.config.editor.search_regex,
            case_sensitive: self.ctx.config.editor.search_case_sensitive,
        }
    }

    /// Compiles a submitted pattern. An empty one repeats the last search.
    fn compile(&mut self, text: String) -> Option<Search> {
        let pattern = if text.is_empty() {
            let last = self.history_mut("search").last().map(str::to_string);
            match last {
                Some(last) => last,
                None => {
                    self.status.set("cancelled");
                    return None;
                }
            }
        } else {
            text
        };
        match Search::new(&pattern, self.search_options()) {
            Ok(search) => Some(search),
            Err(e) => {
                self.status.set(e.to_string());
                None
            }
        }
    }

    fn search(&mut self, text: String) {
        let Some(mut search) = self.compile(text) else {
            return;
        };
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let from = doc.buffer().position();
        match search.find_next(doc.buffer(), from) {
            Some(hit) => {
                doc.buffer_mut().move_to(hit.found.start, false);
                if let Some(message) = hit.status() {
                    self.status.set(message);
                }
            }
            None => self.status.set("no matches"),
        }
    }

    fn replace_pattern(&mut self, text: String) {
        if let Some(search) = self.compile(text) {
            self.pending_replace = Some(search);
            self.open_prompt(PromptKind::ReplaceText, "");
        }
    }

    fn replace_text(&mut self, replacement: String) {
        let Some(search) = self.pending_replace.take() else {
            return;
        };
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let from = doc.buffer().position();
        let session = ReplaceSession::start(search, &replacement, doc.buffer_mut(), from);
        self.replace = Some(session);
        self.continue_replace();
    }

    fn answer_replace(&mut self, answer: char) {
        let (Some(session), Some(doc)) = (self.replace.as_mut(), self.session.active_mut())
        else {
            return;
        };
        let buffer = doc.buffer_mut();
        let result = match answer {
            'y' => session.answer_yes(buffer),
            'a' => session.replace_rest(buffer),
            _ => {
                session.answer_no(buffer);
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!("replace failed: {e}");
            self.finish_replace();
            self.status.set(e.to_string());
            return;
        }
        self.continue_replace();
    }

    /// Selects the next match and asks about it, or wraps the session up.
    fn continue_replace(&mut self) {
        let current = self.replace.as_ref().and_then(ReplaceSession::current);
        match (current, self.session.active_mut()) {
            (Some(m), Some(doc)) => {
                let buffer = doc.buffer_mut();
                buffer.move_to(m.start, false);
                buffer.move_to(m.end, true);
                self.open_prompt(PromptKind::ConfirmReplace, "");
            }
            _ => self.finish_replace(),
        }
    }

    fn finish_replace(&mut self) {
        let Some(session) = self.replace.take() else {
            return;
        };
        let Some(doc) = self.session.active_mut() else {
            return;
        };
        let buffer = doc.buffer_mut();
        let count = session.finish(buffer);
        let pos = buffer.position();
        buffer.move_to(pos, false);
        if count == 0 {
            self.status.set("no matches");
        } else {
            self.status.set(ReplaceSession::summary(count));
            self.events.emit(EditorEvent::DocumentChanged(doc.id()));
        }
    }

    // ==================== Command Line ====================

    fn command_line(&mut self, text: &str) {
        match command_line::parse(text) {
            Ok(Some(command)) => {
                tracing::debug!(?command, "command line");
                self.line_command(command);
            }
            Ok(None) => {}
            Err(e) => self.status.set(e.to_string()),
        }
    }

    fn line_command(&mut self, command: LineCommand) {
        match command {
            LineCommand::Quit { force } => self.close_active(force),
            LineCommand::Write => {
                self.save();
            }
            LineCommand::WriteQuit => match self.save() {
                SaveOutcome::Saved => self.close_active(true),
                SaveOutcome::Prompted => self.close_after_save = true,
                SaveOutcome::Failed => {}
            },
            LineCommand::QuitAll { force } => self.close_all(force),
            LineCommand::Sort { reverse } => {
                let Some(doc) = self.session.active_mut() else {
                    return;
                };
                match doc.buffer_mut().sort_lines(reverse) {
                    Ok(changed) => {
                        if changed {
                            self.events.emit(EditorEvent::DocumentChanged(doc.id()));
                        }
                        self.status.set("sorted!");
                    }
                    Err(e) => self.status.set(e.to_string()),
                }
            }
            LineCommand::Comment(prefix) => {
                let Some(doc) = self.session.active() else {
                    return;
                };
                let prefix = prefix
                    .or_else(|| self.ctx.config.language(doc.language()).comment)
                    .unwrap_or_else(|| "#".to_string());
                self.edit(|buffer| buffer.toggle_comment(&prefix));
            }
            LineCommand::Reload => {
                let Some(doc) = self.session.active() else {
                    return;
                };
                if doc.path().is_none() {
                    self.status.set(crate::CoreError::Unnamed.to_string());
                } else if doc.is_modified() {
                    self.open_prompt(PromptKind::ConfirmReload, "");
                } else {
                    self.reload();
                }
            }
            LineCommand::TabSize(size) => self.set_tabs(Some(size), None),
            LineCommand::ExpandTabs(expand) => self.set_tabs(None, Some(expand)),
            LineCommand::Retheme => {
                self.ctx.reload_theme();
                tracing::info!("theme reloaded");
                self.events.emit(EditorEvent::ThemeChanged);
            }
            LineCommand::GotoLine(number) => self.goto_line(number),
        }
    }

    fn set_tabs(&mut self, size: Option<usize>, expand: Option<bool>) {
        if let Some(doc) = self.session.active_mut() {
            let buffer = doc.buffer_mut();
            let config = buffer.config();
            let size = size.unwrap_or(config.tab_width);
            let expand = expand.unwrap_or(config.use_spaces);
            buffer.set_tabs(size, expand);
            self.status.set("updated!");
        }
    }

    // ==================== Accessors ====================

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    pub fn theme(&self) -> &Theme {
        &self.ctx.theme
    }

    /// Returns the active document, if any.
    pub fn active_document(&self) -> Option<&Document> {
        self.session.active()
    }

    /// Returns the current status message.
    pub fn status(&self) -> Option<&str> {
        self.status.message()
    }

    /// Sets the status message, e.g. for errors found while starting up.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status.set(message);
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// Returns the prompt line contents, if a prompt is open.
    pub fn prompt_view(&self) -> Option<PromptView> {
        let prompt = self.prompt.as_ref()?;
        let kind = prompt.kind();
        let history = history_entries(&self.histories, kind);
        if let Some((query, found)) = prompt.reverse_state(history) {
            let text = found.unwrap_or_default().to_string();
            return Some(PromptView {
                label: format!("{}(reverse-search)`{query}`", kind.label()),
                cursor: text.chars().count(),
                text,
            });
        }
        if kind.is_confirm() {
            return Some(PromptView {
                label: kind.label().to_string(),
                text: String::new(),
                cursor: 0,
            });
        }
        Some(PromptView {
            label: kind.label().to_string(),
            text: prompt.text(),
            cursor: prompt.cursor(),
        })
    }

    /// Subscribe to editor events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }
}

fn history_entries<'a>(
    histories: &'a HashMap<&'static str, PromptHistory>,
    kind: PromptKind,
) -> &'a [String] {
    kind.history_name()
        .and_then(|name| histories.get(name))
        .map(PromptHistory::entries)
        .unwrap_or_default()
}

fn saved_message(lines: usize) -> String {
    let noun = if lines == 1 { "line" } else { "lines" };
    format!("saved! ({lines} {noun} written)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::EventHandler;
    use crate::keymap::{Key, KeyPress, Modifiers};

    fn context() -> EditorContext {
        let mut config = Config::default();
        config.history.enabled = false;
        config.syntax.enabled = false;
        EditorContext::with_config(config)
    }

    fn editor_with(text: &str) -> Editor {
        let mut editor = Editor::new(context(), 20, 80);
        let doc = Document::from_text(text, editor.context());
        editor.add_document(doc);
        editor
    }

    fn press(editor: &mut Editor, key: KeyPress) -> Flow {
        editor.handle_event(Event::Key(key))
    }

    fn type_text(editor: &mut Editor, text: &str) {
        for c in text.chars() {
            press(editor, KeyPress::plain(Key::Char(c)));
        }
    }

    fn enter(editor: &mut Editor) -> Flow {
        press(editor, KeyPress::plain(Key::Enter))
    }

    fn command(editor: &mut Editor, line: &str) -> Flow {
        press(editor, KeyPress::plain(Key::Escape));
        type_text(editor, line);
        enter(editor)
    }

    fn text(editor: &Editor) -> String {
        editor.active_document().map(|d| d.buffer().text()).unwrap_or_default()
    }

    #[test]
    fn test_type_and_undo() {
        let mut editor = editor_with("abc\ndef\n");
        press(&mut editor, KeyPress::plain(Key::Right));
        type_text(&mut editor, "XY");
        assert_eq!(text(&editor), "aXYbc\ndef\n");
        assert!(editor.active_document().is_some_and(Document::is_modified));

        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(text(&editor), "abc\ndef\n");
        assert_eq!(editor.status(), Some("undo: text"));

        press(&mut editor, KeyPress::alt('U'));
        assert_eq!(text(&editor), "aXYbc\ndef\n");
        assert_eq!(editor.status(), Some("redo: text"));
    }

    #[test]
    fn test_prompt_round_trip_breaks_typing_run() {
        let mut editor = editor_with("");
        type_text(&mut editor, "ab");
        press(&mut editor, KeyPress::ctrl('w'));
        press(&mut editor, KeyPress::plain(Key::Escape));
        assert_eq!(editor.mode(), Mode::Normal);
        type_text(&mut editor, "c");
        assert_eq!(text(&editor), "abc");

        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(text(&editor), "ab");
        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(text(&editor), "");
    }

    #[test]
    fn test_nothing_to_undo() {
        let mut editor = editor_with("abc\n");
        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(editor.status(), Some("nothing to undo!"));
        press(&mut editor, KeyPress::alt('U'));
        assert_eq!(editor.status(), Some("nothing to redo!"));
    }

    #[test]
    fn test_search_wraps() {
        let mut editor = editor_with("foo\nbar\nfoo\n");
        press(&mut editor, KeyPress::plain(Key::Down));
        press(&mut editor, KeyPress::plain(Key::Down));
        press(&mut editor, KeyPress::plain(Key::Right));

        press(&mut editor, KeyPress::ctrl('w'));
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::Search));
        type_text(&mut editor, "foo");
        enter(&mut editor);

        assert_eq!(editor.mode(), Mode::Normal);
        let pos = editor.active_document().map(|d| d.buffer().position());
        assert_eq!(pos.map(|p| (p.line, p.column)), Some((0, 0)));
        assert_eq!(editor.status(), Some("search wrapped"));
    }

    #[test]
    fn test_empty_search_repeats_last() {
        let mut editor = editor_with("x a x\n");
        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "x");
        enter(&mut editor);
        let pos = editor.active_document().map(|d| d.buffer().position());
        assert_eq!(pos.map(|p| p.column), Some(4));

        press(&mut editor, KeyPress::ctrl('w'));
        enter(&mut editor);
        let pos = editor.active_document().map(|d| d.buffer().position());
        assert_eq!(pos.map(|p| p.column), Some(0));
        assert_eq!(editor.status(), Some("search wrapped"));
    }

    #[test]
    fn test_search_errors() {
        let mut editor = editor_with("abc\n");
        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "zzz");
        enter(&mut editor);
        assert_eq!(editor.status(), Some("no matches"));

        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "(");
        enter(&mut editor);
        assert_eq!(editor.status(), Some("invalid regex: '('"));
    }

    #[test]
    fn test_interactive_replace() {
        let mut editor = editor_with("a a a\n");
        press(&mut editor, KeyPress::ctrl('\\'));
        type_text(&mut editor, "a");
        enter(&mut editor);
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ReplaceText));
        type_text(&mut editor, "b");
        enter(&mut editor);
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ConfirmReplace));

        type_text(&mut editor, "y");
        type_text(&mut editor, "n");
        type_text(&mut editor, "y");
        assert_eq!(editor.mode(), Mode::Normal);
        assert_eq!(text(&editor), "b a b\n");
        assert_eq!(editor.status(), Some("replaced 2 occurrences"));

        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(text(&editor), "a a a\n");
    }

    #[test]
    fn test_replace_all_and_cancel() {
        let mut editor = editor_with("aaa\n");
        press(&mut editor, KeyPress::ctrl('\\'));
        type_text(&mut editor, "a");
        enter(&mut editor);
        type_text(&mut editor, "bb");
        enter(&mut editor);
        type_text(&mut editor, "a");
        assert_eq!(text(&editor), "bbbbbb\n");
        assert_eq!(editor.status(), Some("replaced 3 occurrences"));

        let mut editor = editor_with("a a\n");
        press(&mut editor, KeyPress::ctrl('\\'));
        type_text(&mut editor, "a");
        enter(&mut editor);
        type_text(&mut editor, "c");
        enter(&mut editor);
        type_text(&mut editor, "y");
        press(&mut editor, KeyPress::ctrl('c'));
        assert_eq!(text(&editor), "c a\n");
        assert_eq!(editor.status(), Some("replaced 1 occurrence"));
        assert!(editor.active_document().is_some_and(|d| d.buffer().selection().is_none()));
    }

    #[test]
    fn test_sort_selection_and_undo() {
        let mut editor = editor_with("b\na\nc\n");
        press(&mut editor, KeyPress::new(Key::Down, Modifiers::SHIFT));
        press(&mut editor, KeyPress::new(Key::Down, Modifiers::SHIFT));
        command(&mut editor, ":sort");
        assert_eq!(text(&editor), "a\nb\nc\n");
        assert_eq!(editor.status(), Some("sorted!"));

        press(&mut editor, KeyPress::alt('u'));
        assert_eq!(text(&editor), "b\na\nc\n");
        assert_eq!(editor.status(), Some("undo: sort"));
    }

    #[test]
    fn test_comment_prefix() {
        let mut editor = editor_with("x\n");
        command(&mut editor, ":comment");
        assert_eq!(text(&editor), "# x\n");
        command(&mut editor, ":comment //");
        assert_eq!(text(&editor), "// # x\n");
    }

    #[test]
    fn test_command_errors() {
        let mut editor = editor_with("x\n");
        command(&mut editor, ":fly");
        assert_eq!(editor.status(), Some("invalid command: :fly"));
        command(&mut editor, ":tabsize x");
        assert_eq!(editor.status(), Some("invalid size: x"));
        command(&mut editor, ":reload");
        assert_eq!(editor.status(), Some("file has not been saved yet!"));
        command(&mut editor, ":tabsize 2");
        assert_eq!(editor.status(), Some("updated!"));
        assert_eq!(
            editor.active_document().map(|d| d.buffer().config().tab_width),
            Some(2)
        );
    }

    #[test]
    fn test_goto_line() {
        let mut editor = editor_with("a\nb\nc\n");
        press(&mut editor, KeyPress::ctrl('_'));
        type_text(&mut editor, "x");
        enter(&mut editor);
        assert_eq!(editor.status(), Some("not an integer: 'x'"));

        press(&mut editor, KeyPress::ctrl('_'));
        type_text(&mut editor, "3");
        enter(&mut editor);
        let line = editor.active_document().map(|d| d.buffer().position().line);
        assert_eq!(line, Some(2));

        command(&mut editor, ":1");
        let line = editor.active_document().map(|d| d.buffer().position().line);
        assert_eq!(line, Some(0));
    }

    #[test]
    fn test_position_status() {
        let mut editor = editor_with("ab\ncd\n");
        press(&mut editor, KeyPress::plain(Key::Down));
        press(&mut editor, KeyPress::plain(Key::Right));
        press(&mut editor, KeyPress::ctrl('c'));
        assert_eq!(editor.status(), Some("line 2, col 2 (of 3 lines)"));
    }

    #[test]
    fn test_cut_accumulates() {
        let mut editor = editor_with("one\ntwo\nthree\n");
        press(&mut editor, KeyPress::ctrl('k'));
        press(&mut editor, KeyPress::ctrl('k'));
        assert_eq!(text(&editor), "three\n");
        assert_eq!(editor.session().clipboard(), Some("one\ntwo\n"));

        press(&mut editor, KeyPress::plain(Key::Down));
        press(&mut editor, KeyPress::ctrl('u'));
        assert_eq!(text(&editor), "three\none\ntwo\n");
    }

    #[test]
    fn test_unknown_key() {
        let mut editor = editor_with("x\n");
        press(&mut editor, KeyPress::ctrl('q'));
        assert!(editor.status().is_some_and(|s| s.starts_with("unknown key: ")));
        assert_eq!(text(&editor), "x\n");
    }

    #[test]
    fn test_close_dirty_asks() {
        let mut editor = editor_with("x\n");
        type_text(&mut editor, "y");
        press(&mut editor, KeyPress::ctrl('x'));
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ConfirmClose));

        press(&mut editor, KeyPress::ctrl('c'));
        assert_eq!(editor.mode(), Mode::Normal);
        assert_eq!(editor.session().len(), 1);

        press(&mut editor, KeyPress::ctrl('x'));
        assert_eq!(type_answer(&mut editor, 'n'), Flow::Quit);
        assert!(editor.session().is_empty());
    }

    fn type_answer(editor: &mut Editor, c: char) -> Flow {
        press(editor, KeyPress::plain(Key::Char(c)))
    }

    #[test]
    fn test_close_unnamed_saves_as() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let mut editor = editor_with("");
        type_text(&mut editor, "hi");
        press(&mut editor, KeyPress::ctrl('x'));
        type_answer(&mut editor, 'y');
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::SaveAs));

        type_text(&mut editor, path.to_str().unwrap());
        assert_eq!(enter(&mut editor), Flow::Quit);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
    }

    #[test]
    fn test_qall_walks_documents() {
        let mut editor = editor_with("a\n");
        let doc = Document::from_text("b\n", editor.context());
        editor.add_document(doc);
        type_text(&mut editor, "z");

        command(&mut editor, ":qall");
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ConfirmClose));
        assert_eq!(type_answer(&mut editor, 'n'), Flow::Quit);

        let mut editor = editor_with("a\n");
        type_text(&mut editor, "z");
        assert_eq!(command(&mut editor, ":qall!"), Flow::Quit);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let mut editor = Editor::new(context(), 20, 80);
        editor.open(&path).unwrap();
        type_text(&mut editor, "x");
        press(&mut editor, KeyPress::ctrl('s'));
        assert_eq!(editor.status(), Some("saved! (2 lines written)"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xone\ntwo\n");

        type_text(&mut editor, "y");
        command(&mut editor, ":reload");
        assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ConfirmReload));
        type_answer(&mut editor, 'y');
        assert_eq!(editor.status(), Some("reloaded!"));
        assert_eq!(text(&editor), "xone\ntwo\n");
    }

    #[test]
    fn test_open_switches_to_existing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "a\n").unwrap();
        std::fs::write(&b, "b\n").unwrap();

        let mut editor = Editor::new(context(), 20, 80);
        let first = editor.open(&a).unwrap();
        editor.open(&b).unwrap();
        assert_eq!(editor.open(&a).unwrap(), first);
        assert_eq!(editor.session().len(), 2);
        assert_eq!(editor.session().active_index(), 0);

        press(&mut editor, KeyPress::new(Key::Right, Modifiers::ALT));
        assert_eq!(text(&editor), "b\n");
    }

    #[test]
    fn test_mixed_newlines_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        std::fs::write(&path, "a\r\nb\nc\r\n").unwrap();

        let mut editor = Editor::new(context(), 20, 80);
        editor.open(&path).unwrap();
        assert_eq!(
            editor.status(),
            Some("mixed newlines will be converted to \\r\\n")
        );
    }

    #[test]
    fn test_prompt_view() {
        let mut editor = editor_with("x\n");
        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "ab");
        let view = editor.prompt_view().unwrap();
        assert_eq!(view.label, "search");
        assert_eq!(view.text, "ab");
        assert_eq!(view.cursor, 2);

        press(&mut editor, KeyPress::plain(Key::Escape));
        assert!(editor.prompt_view().is_none());
        assert_eq!(editor.status(), Some("cancelled"));
    }

    #[test]
    fn test_reverse_search_history() {
        let mut editor = editor_with("foo bar\n");
        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "bar");
        enter(&mut editor);
        press(&mut editor, KeyPress::ctrl('w'));
        type_text(&mut editor, "foo");
        enter(&mut editor);

        press(&mut editor, KeyPress::ctrl('w'));
        press(&mut editor, KeyPress::ctrl('r'));
        assert_eq!(editor.mode(), Mode::ReverseSearch(PromptKind::Search));
        type_text(&mut editor, "ba");
        let view = editor.prompt_view().unwrap();
        assert_eq!(view.label, "search(reverse-search)`ba`");
        assert_eq!(view.text, "bar");

        enter(&mut editor);
        let pos = editor.active_document().map(|d| d.buffer().position());
        assert_eq!(pos.map(|p| p.column), Some(4));
    }

    #[tokio::test]
    async fn test_events() {
        let mut editor = editor_with("x\n");
        let mut events = EventHandler::new(editor.subscribe());
        type_text(&mut editor, "a");
        press(&mut editor, KeyPress::ctrl('w'));

        let seen = events.drain();
        assert!(matches!(seen.first(), Some(EditorEvent::DocumentChanged(_))));
        assert!(seen.contains(&EditorEvent::ModeChanged(Mode::Prompt(PromptKind::Search))));
    }

    #[test]
    fn test_suspend_and_resume() {
        let mut editor = editor_with("x\n");
        assert_eq!(press(&mut editor, KeyPress::ctrl('z')), Flow::Suspend);
        assert_eq!(editor.mode(), Mode::Suspended);
        assert_eq!(editor.handle_event(Event::Resume), Flow::Continue);
        assert_eq!(editor.mode(), Mode::Normal);
    }
}
