//! The one-line prompt under the text area, and its history.
//!
//! A [`Prompt`] is a small line editor. Up/Down walk the history of the
//! prompt's kind; `^R` starts a reverse incremental search through that
//! history, which narrows with every typed character.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Search,
    ReplacePattern,
    ReplaceText,
    Command,
    SaveAs,
    GotoLine,
    Open,
    ConfirmClose,
    ConfirmReplace,
    ConfirmReload,
}

impl PromptKind {
    /// Text shown before the input.
    pub fn label(self) -> &'static str {
        match self {
            PromptKind::Search => "search",
            PromptKind::ReplacePattern => "search (to replace)",
            PromptKind::ReplaceText => "replace with",
            PromptKind::Command => "",
            PromptKind::SaveAs => "enter filename",
            PromptKind::GotoLine => "enter line number",
            PromptKind::Open => "open file",
            PromptKind::ConfirmClose => "file is modified - save [yes, no]?",
            PromptKind::ConfirmReplace => "replace [yes, no, all]?",
            PromptKind::ConfirmReload => "reload will discard changes - continue [yes, no]?",
        }
    }

    /// True for prompts answered with a single key.
    pub fn is_confirm(self) -> bool {
        !self.answers().is_empty()
    }

    /// Keys that answer a confirmation prompt.
    pub fn answers(self) -> &'static [char] {
        match self {
            PromptKind::ConfirmClose | PromptKind::ConfirmReload => &['y', 'n'],
            PromptKind::ConfirmReplace => &['y', 'n', 'a'],
            _ => &[],
        }
    }

    /// Name of the history this prompt reads and extends.
    pub fn history_name(self) -> Option<&'static str> {
        match self {
            PromptKind::Search | PromptKind::ReplacePattern => Some("search"),
            PromptKind::ReplaceText => Some("replace"),
            PromptKind::Command => Some("command"),
            PromptKind::SaveAs => Some("filename"),
            PromptKind::Open => Some("open"),
            PromptKind::GotoLine => Some("goto"),
            _ => None,
        }
    }
}

/// A line-editing key inside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptEdit {
    Left,
    Right,
    Home,
    End,
    WordLeft,
    WordRight,
    Backspace,
    Delete,
    /// Cut from the cursor to the end of the input
    CutToEnd,
    HistoryPrev,
    HistoryNext,
}

#[derive(Debug, Clone, Default)]
struct ReverseSearch {
    query: String,
    /// History index of the current match
    found: Option<usize>,
}

/// The prompt being edited.
#[derive(Debug, Clone)]
pub struct Prompt {
    kind: PromptKind,
    text: Vec<char>,
    cursor: usize,
    /// Position in the history while browsing it
    history_index: Option<usize>,
    /// Input to come back to after browsing
    saved: String,
    reverse: Option<ReverseSearch>,
}

impl Prompt {
    pub fn new(kind: PromptKind, initial: &str) -> Self {
        let text: Vec<char> = initial.chars().collect();
        Self {
            kind,
            cursor: text.len(),
            text,
            history_index: None,
            saved: String::new(),
            reverse: None,
        }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    /// Cursor as a char offset into [`Prompt::text`].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    // ==================== Editing ====================

    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += 1;
    }

    /// Inserts pasted text, keeping only its first line.
    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().take_while(|c| *c != '\n' && *c != '\r') {
            self.insert_char(c);
        }
    }

    pub fn edit(&mut self, edit: PromptEdit, history: &[String]) {
        match edit {
            PromptEdit::Left => self.cursor = self.cursor.saturating_sub(1),
            PromptEdit::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
            PromptEdit::Home => self.cursor = 0,
            PromptEdit::End => self.cursor = self.text.len(),
            PromptEdit::WordLeft => {
                while self.cursor > 0 && !is_word(self.text[self.cursor - 1]) {
                    self.cursor -= 1;
                }
                while self.cursor > 0 && is_word(self.text[self.cursor - 1]) {
                    self.cursor -= 1;
                }
            }
            PromptEdit::WordRight => {
                let len = self.text.len();
                while self.cursor < len && !is_word(self.text[self.cursor]) {
                    self.cursor += 1;
                }
                while self.cursor < len && is_word(self.text[self.cursor]) {
                    self.cursor += 1;
                }
            }
            PromptEdit::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.text.remove(self.cursor);
                }
            }
            PromptEdit::Delete => {
                if self.cursor < self.text.len() {
                    self.text.remove(self.cursor);
                }
            }
            PromptEdit::CutToEnd => self.text.truncate(self.cursor),
            PromptEdit::HistoryPrev => self.history_prev(history),
            PromptEdit::HistoryNext => self.history_next(history),
        }
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.chars().collect();
        self.cursor = self.text.len();
    }

    fn history_prev(&mut self, history: &[String]) {
        let index = match self.history_index {
            Some(0) => return,
            Some(i) => i - 1,
            None if history.is_empty() => return,
            None => {
                self.saved = self.text();
                history.len() - 1
            }
        };
        self.history_index = Some(index);
        self.set_text(&history[index]);
    }

    fn history_next(&mut self, history: &[String]) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < history.len() {
            self.history_index = Some(index + 1);
            self.set_text(&history[index + 1]);
        } else {
            self.history_index = None;
            let saved = std::mem::take(&mut self.saved);
            self.set_text(&saved);
        }
    }

    // ==================== Reverse Search ====================

    pub fn is_reverse_searching(&self) -> bool {
        self.reverse.is_some()
    }

    /// The reverse-search query and the entry it currently matches.
    pub fn reverse_state<'h>(&self, history: &'h [String]) -> Option<(&str, Option<&'h str>)> {
        let reverse = self.reverse.as_ref()?;
        let found = reverse
            .found
            .and_then(|i| history.get(i))
            .map(String::as_str);
        Some((&reverse.query, found))
    }

    pub fn reverse_start(&mut self) {
        self.reverse = Some(ReverseSearch::default());
    }

    /// Narrows the reverse search with another character.
    pub fn reverse_type(&mut self, c: char, history: &[String]) {
        if let Some(reverse) = &mut self.reverse {
            reverse.query.push(c);
            let from = reverse.found.map_or(history.len(), |i| i + 1);
            reverse.found = find_back(history, &reverse.query, from);
        }
    }

    pub fn reverse_backspace(&mut self, history: &[String]) {
        if let Some(reverse) = &mut self.reverse {
            reverse.query.pop();
            reverse.found = find_back(history, &reverse.query, history.len());
        }
    }

    /// Steps to the next older match.
    pub fn reverse_next(&mut self, history: &[String]) {
        if let Some(reverse) = &mut self.reverse {
            let from = reverse.found.unwrap_or(history.len());
            if let Some(older) = find_back(history, &reverse.query, from) {
                reverse.found = Some(older);
            }
        }
    }

    /// Leaves reverse search, taking the match as the input.
    pub fn reverse_accept(&mut self, history: &[String]) {
        if let Some(reverse) = self.reverse.take() {
            if let Some(entry) = reverse.found.and_then(|i| history.get(i)) {
                self.history_index = reverse.found;
                self.set_text(entry);
            }
        }
    }

    /// Leaves reverse search, keeping the input as it was.
    pub fn reverse_cancel(&mut self) {
        self.reverse = None;
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Newest entry before `before` containing `query`.
fn find_back(history: &[String], query: &str, before: usize) -> Option<usize> {
    history[..before.min(history.len())]
        .iter()
        .rposition(|entry| entry.contains(query))
}

/// Submitted inputs of one prompt kind, oldest first.
///
/// With a directory, entries are loaded from and appended to
/// `‹dir›/‹name›`, one per line.
#[derive(Debug, Clone, Default)]
pub struct PromptHistory {
    entries: Vec<String>,
    path: Option<PathBuf>,
    max_entries: usize,
}

impl PromptHistory {
    /// A history kept in memory only.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            path: None,
            max_entries,
        }
    }

    /// Loads `‹dir›/‹name›`. A missing file is an empty history.
    pub fn load(dir: &Path, name: &str, max_entries: usize) -> Self {
        let path = dir.join(name);
        let mut entries: Vec<String> = match std::fs::read_to_string(&path) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), "cannot read history: {e}");
                }
                Vec::new()
            }
        };
        if entries.len() > max_entries {
            entries.drain(..entries.len() - max_entries);
        }
        Self {
            entries,
            path: Some(path),
            max_entries,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Records a submitted input. Empty inputs and repeats of the newest
    /// entry are not recorded.
    pub fn push(&mut self, entry: &str) {
        if entry.is_empty() || self.entries.last().is_some_and(|last| last == entry) {
            return;
        }
        self.entries.push(entry.to_string());
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, entry) {
                tracing::warn!(path = %path.display(), "cannot write history: {e}");
            }
        }
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

fn append_line(path: &Path, entry: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{entry}")
}
