//! The editable text buffer: lines, undo log, cursor and dirty tracking.
//!
//! ## Learning: One Door for Mutations
//!
//! Every change to the text goes through `insert_with` / `delete_with`
//! (or, for undo and redo, `apply_raw`). Those two doors are the only
//! places that touch the line store, so they are also the only places
//! that have to remember to:
//!
//! 1. record the edit in the history
//! 2. shift the cursor and selection
//! 3. note the touched lines for the highlighter
//! 4. bump the revision counter
//!
//! ```rust,ignore
//! let mut buffer = TextBuffer::from("abc\ndef");
//! buffer.insert(Position::new(0, 1), "X")?;  // ["aXbc", "def"]
//! buffer.undo()?;                            // ["abc", "def"]
//! ```

use std::borrow::Cow;

use crate::cursor::{Cursor, Position};
use crate::history::{Edit, EditKind, GroupId, History};
use crate::lines::LineStore;
use crate::selection::Selection;
use crate::{BufferError, BufferResult};

/// Configuration for buffer behavior
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Maximum history entries to keep
    pub max_history: usize,

    /// Tab width in spaces
    pub tab_width: usize,

    /// Use spaces instead of tabs
    pub use_spaces: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_history: 1000,
            tab_width: 4,
            use_spaces: true,
        }
    }
}

/// A range of lines replaced by an edit.
///
/// Lines `first..first + removed` of the old text became lines
/// `first..first + inserted` of the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplice {
    pub first: usize,
    pub removed: usize,
    pub inserted: usize,
}

/// Where the buffer was last saved, in terms of the undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SavePoint {
    /// Clean while the newest undo group has this id
    At(Option<GroupId>),
    /// Dirty until the next save
    Lost,
}

/// A line-oriented text buffer with undo/redo.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send` but not `Sync` - it can be moved between threads
/// but shouldn't be accessed from multiple threads simultaneously.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    /// The lines holding our text content
    lines: LineStore,

    /// Edit history for undo/redo
    history: History,

    /// Cursor and selection anchor
    pub(crate) cursor: Cursor,

    /// Buffer-specific settings
    config: BufferConfig,

    /// Undo position of the last save
    save_point: SavePoint,

    /// Bumped on every change to the text
    revision: u64,

    /// Line ranges touched since the last `take_splices`
    splices: Vec<LineSplice>,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use quire_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert_eq!(buffer.len_lines(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    /// Creates a buffer with custom configuration.
    pub fn with_config(config: BufferConfig) -> Self {
        Self::from_store(LineStore::new(), config)
    }

    /// Creates a clean buffer over existing lines.
    pub fn from_store(lines: LineStore, config: BufferConfig) -> Self {
        Self {
            lines,
            history: History::new(config.max_history),
            cursor: Cursor::at_start(),
            config,
            save_point: SavePoint::At(None),
            revision: 0,
            splices: Vec::new(),
        }
    }

    /// Replaces the whole content, forgetting history.
    ///
    /// The buffer is clean afterwards and the cursor is clamped.
    pub fn reset(&mut self, lines: LineStore) {
        let removed = self.lines.len_lines();
        self.lines = lines;
        self.history.clear();
        self.save_point = SavePoint::At(None);
        self.cursor = self.clamp_cursor(Cursor::new(self.cursor.position));
        self.note_change(LineSplice {
            first: 0,
            removed,
            inserted: self.lines.len_lines(),
        });
    }

    // ==================== Text Access ====================

    /// Returns the underlying lines.
    pub fn lines(&self) -> &LineStore {
        &self.lines
    }

    /// Returns the entire text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.text()
    }

    /// Returns a specific line (0-indexed) without its separator.
    pub fn line(&self, line_idx: usize) -> BufferResult<Cow<'_, str>> {
        self.lines.line(line_idx)
    }

    /// Returns every line as an owned string.
    pub fn lines_vec(&self) -> Vec<String> {
        self.lines.lines().map(Cow::into_owned).collect()
    }

    /// Returns the number of lines in the buffer (at least 1).
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.lines.len_lines()
    }

    /// Returns the length of a specific line in characters.
    pub fn line_len(&self, line_idx: usize) -> BufferResult<usize> {
        self.lines.line_len(line_idx)
    }

    /// Returns the text between two positions.
    pub fn slice(&self, start: Position, end: Position) -> BufferResult<String> {
        self.lines.slice(start, end)
    }

    // ==================== Cursor ====================

    /// Returns the cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Returns the cursor position.
    pub fn position(&self) -> Position {
        self.cursor.position
    }

    /// Returns the non-empty selection, if any.
    pub fn selection(&self) -> Option<Selection> {
        self.cursor.selection()
    }

    /// Replaces the cursor, clamping it into the text.
    ///
    /// This is a jump: pending typing stops coalescing.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.history.seal();
        self.cursor = self.clamp_cursor(cursor);
    }

    fn clamp_cursor(&self, cursor: Cursor) -> Cursor {
        Cursor {
            position: self.lines.clamp(cursor.position),
            anchor: cursor.anchor.map(|a| self.lines.clamp(a)),
            preferred_column: cursor.preferred_column,
        }
    }

    // ==================== Mutations ====================

    /// Inserts text at a position, returning where it ends.
    pub fn insert(&mut self, pos: Position, text: &str) -> BufferResult<Position> {
        self.insert_with(pos, text, "text")
    }

    /// Inserts text, recording it under the given undo label.
    ///
    /// # Learning: `&mut self`
    ///
    /// This method requires exclusive (mutable) access to the buffer.
    /// Rust's borrow checker ensures no other code can read or write
    /// the buffer while this method executes.
    pub fn insert_with(
        &mut self,
        pos: Position,
        text: &str,
        label: &'static str,
    ) -> BufferResult<Position> {
        self.insert_from(self.cursor, pos, text, label)
    }

    /// Inserts text, recording `before` as the cursor to restore on undo.
    pub(crate) fn insert_from(
        &mut self,
        before: Cursor,
        pos: Position,
        text: &str,
        label: &'static str,
    ) -> BufferResult<Position> {
        if text.is_empty() {
            self.lines.position_to_char_idx(pos)?;
            return Ok(pos);
        }

        let end = self.raw_insert(pos, text)?;
        self.history
            .record(Edit::insert(pos, text), label, before, self.cursor);
        Ok(end)
    }

    /// Deletes `start..end`, returning the removed text.
    pub fn delete(&mut self, start: Position, end: Position) -> BufferResult<String> {
        self.delete_with(start, end, "delete text")
    }

    /// Deletes text, recording it under the given undo label.
    pub fn delete_with(
        &mut self,
        start: Position,
        end: Position,
        label: &'static str,
    ) -> BufferResult<String> {
        self.delete_from(self.cursor, start, end, label)
    }

    /// Deletes text, recording `before` as the cursor to restore on undo.
    pub(crate) fn delete_from(
        &mut self,
        before: Cursor,
        start: Position,
        end: Position,
        label: &'static str,
    ) -> BufferResult<String> {
        let removed = self.lines.slice(start, end)?;
        if removed.is_empty() {
            return Ok(removed);
        }

        self.raw_delete(start, end)?;
        self.history
            .record(Edit::delete(start, removed.as_str()), label, before, self.cursor);
        Ok(removed)
    }

    /// Replaces `start..end` with `text` as one undo step.
    pub fn replace(
        &mut self,
        start: Position,
        end: Position,
        text: &str,
        label: &'static str,
    ) -> BufferResult<Position> {
        self.begin_group(label);
        let result = self
            .delete_with(start, end, label)
            .and_then(|_| self.insert_with(start, text, label));
        self.end_group();
        result
    }

    // ==================== Undo Groups ====================

    /// Starts an undo group; see [`History::begin_group`].
    pub fn begin_group(&mut self, label: &'static str) {
        self.history.begin_group(label, self.cursor);
    }

    /// Starts or continues a chained undo group.
    pub fn begin_chain(&mut self, label: &'static str) -> bool {
        self.history.begin_chain(label, self.cursor)
    }

    /// Ends the current undo group.
    pub fn end_group(&mut self) {
        self.history.end_group(self.cursor);
    }

    /// Ends the open undo group by reverting everything it recorded.
    ///
    /// The group is discarded, not offered for redo.
    pub fn abort_group(&mut self) -> BufferResult<()> {
        let Some(group) = self.history.abort_group() else {
            return Ok(());
        };
        let inverses: Vec<Edit> = group.edits.iter().rev().map(Edit::inverse).collect();
        self.apply_all(&inverses)?;
        self.cursor = self.clamp_cursor(group.before);
        Ok(())
    }

    /// Stops any further coalescing into the last undo group.
    pub fn seal(&mut self) {
        self.history.seal();
    }

    /// Returns the undo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    // ==================== Undo/Redo ====================

    /// Undoes the most recent group, returning its label.
    ///
    /// # Learning: State Management
    ///
    /// Undo pops from the undo stack and pushes to the redo stack. If the
    /// text no longer matches what the group expects, every edit applied so
    /// far is rolled back and the group goes back where it came from.
    pub fn undo(&mut self) -> BufferResult<&'static str> {
        let group = self.history.take_undo().ok_or(BufferError::NothingToUndo)?;
        let inverses: Vec<Edit> = group.edits.iter().rev().map(Edit::inverse).collect();

        if let Err(e) = self.apply_all(&inverses) {
            self.history.restore_undo(group);
            return Err(e);
        }

        self.cursor = self.clamp_cursor(group.before);
        let label = group.label;
        self.history.push_undone(group);
        Ok(label)
    }

    /// Redoes the most recently undone group, returning its label.
    pub fn redo(&mut self) -> BufferResult<&'static str> {
        let group = self.history.take_redo().ok_or(BufferError::NothingToRedo)?;

        if let Err(e) = self.apply_all(&group.edits) {
            self.history.restore_redo(group);
            return Err(e);
        }

        self.cursor = self.clamp_cursor(group.after);
        let label = group.label;
        self.history.push_redone(group);
        Ok(label)
    }

    /// Returns true if there are edits to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns true if there are edits to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies edits in order without recording them.
    fn apply_all(&mut self, edits: &[Edit]) -> BufferResult<()> {
        for (i, edit) in edits.iter().enumerate() {
            if let Err(e) = self.apply_raw(edit) {
                for done in edits[..i].iter().rev() {
                    if let Err(rollback) = self.apply_raw(&done.inverse()) {
                        tracing::warn!("undo rollback failed: {rollback}");
                    }
                }
                return Err(BufferError::InvalidUndo(e.to_string()));
            }
        }
        Ok(())
    }

    /// Applies one edit without recording it.
    ///
    /// A delete only goes through if the text at its position is exactly
    /// the text it expects to remove.
    fn apply_raw(&mut self, edit: &Edit) -> BufferResult<()> {
        match edit.kind {
            EditKind::Insert => {
                self.raw_insert(edit.position, &edit.content)?;
            }
            EditKind::Delete => {
                let end = edit.end_position();
                let found = self.lines.slice(edit.position, end)?;
                if found != edit.content {
                    return Err(BufferError::InvalidUndo(format!(
                        "expected {:?} at {}, found {:?}",
                        edit.content, edit.position, found
                    )));
                }
                self.raw_delete(edit.position, end)?;
            }
        }
        Ok(())
    }

    fn raw_insert(&mut self, pos: Position, text: &str) -> BufferResult<Position> {
        let end = self.lines.insert(pos, text)?;
        self.shift_cursor(|p| p.shifted_by_insert(pos, end));
        self.note_change(LineSplice {
            first: pos.line,
            removed: 1,
            inserted: end.line - pos.line + 1,
        });
        Ok(end)
    }

    fn raw_delete(&mut self, start: Position, end: Position) -> BufferResult<()> {
        self.lines.delete(start, end)?;
        self.shift_cursor(|p| p.shifted_by_delete(start, end));
        self.note_change(LineSplice {
            first: start.line,
            removed: end.line - start.line + 1,
            inserted: 1,
        });
        Ok(())
    }

    fn shift_cursor(&mut self, shift: impl Fn(Position) -> Position) {
        self.cursor.position = shift(self.cursor.position);
        self.cursor.anchor = self.cursor.anchor.map(&shift);
        if self.cursor.anchor == Some(self.cursor.position) {
            self.cursor.anchor = None;
        }
    }

    fn note_change(&mut self, splice: LineSplice) {
        self.revision += 1;
        self.splices.push(splice);
    }

    // ==================== State Queries ====================

    /// Returns true if the buffer has unsaved changes.
    pub fn is_modified(&self) -> bool {
        match self.save_point {
            SavePoint::At(id) => self.history.top_id() != id,
            SavePoint::Lost => true,
        }
    }

    /// Marks the current state as saved.
    pub fn mark_saved(&mut self) {
        self.history.seal();
        self.save_point = SavePoint::At(self.history.top_id());
    }

    /// Marks the buffer dirty until the next save.
    pub fn mark_modified(&mut self) {
        self.save_point = SavePoint::Lost;
    }

    /// Returns a counter that changes whenever the text changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drains the line ranges touched since the last call.
    pub fn take_splices(&mut self) -> Vec<LineSplice> {
        std::mem::take(&mut self.splices)
    }

    /// Returns the buffer's configuration.
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Changes the tab settings.
    pub fn set_tabs(&mut self, tab_width: usize, use_spaces: bool) {
        self.config.tab_width = tab_width.max(1);
        self.config.use_spaces = use_spaces;
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self::from_store(LineStore::from_text(s), BufferConfig::default())
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    #[test]
    fn test_insert_moves_cursor_after_text() {
        let mut buffer = TextBuffer::from("abc");
        buffer.set_cursor(Cursor::new(at(0, 1)));
        buffer.insert(at(0, 1), "XY").unwrap();
        assert_eq!(buffer.position(), at(0, 3));

        buffer.insert(at(0, 0), "\n").unwrap();
        assert_eq!(buffer.position(), at(1, 3));
    }

    #[test]
    fn test_delete_collapses_selection() {
        let mut buffer = TextBuffer::from("hello world");
        let mut cursor = Cursor::new(at(0, 2));
        cursor.select_to(at(0, 4));
        buffer.set_cursor(cursor);

        buffer.delete(at(0, 0), at(0, 6)).unwrap();
        assert_eq!(buffer.text(), "world");
        assert_eq!(buffer.position(), at(0, 0));
        assert!(buffer.selection().is_none());
    }

    #[test]
    fn test_undo_restores_cursor_and_selection() {
        let mut buffer = TextBuffer::from("b\na\nc");
        let mut cursor = Cursor::new(at(0, 0));
        cursor.select_to(at(1, 0));
        buffer.set_cursor(cursor);

        buffer.replace(at(0, 0), at(1, 1), "a\nb", "sort").unwrap();
        assert_eq!(buffer.lines_vec(), ["a", "b", "c"]);

        assert_eq!(buffer.undo().unwrap(), "sort");
        assert_eq!(buffer.lines_vec(), ["b", "a", "c"]);
        assert_eq!(buffer.cursor(), cursor);

        assert_eq!(buffer.redo().unwrap(), "sort");
        assert_eq!(buffer.lines_vec(), ["a", "b", "c"]);
    }

    #[test]
    fn test_typing_is_one_undo_step() {
        let mut buffer = TextBuffer::new();
        for (i, c) in "hello".chars().enumerate() {
            buffer.insert(at(0, i), &c.to_string()).unwrap();
        }
        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "");
        assert!(!buffer.can_undo());
    }

    #[test]
    fn test_cursor_jump_splits_typing() {
        let mut buffer = TextBuffer::new();
        buffer.insert(at(0, 0), "a").unwrap();
        buffer.set_cursor(Cursor::new(at(0, 1)));
        buffer.insert(at(0, 1), "b").unwrap();

        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "a");
    }

    #[test]
    fn test_modified_tracks_save_point() {
        let mut buffer = TextBuffer::from("abc");
        assert!(!buffer.is_modified());

        buffer.insert(at(0, 3), "d").unwrap();
        assert!(buffer.is_modified());

        buffer.mark_saved();
        assert!(!buffer.is_modified());

        buffer.undo().unwrap();
        assert!(buffer.is_modified());

        buffer.redo().unwrap();
        assert!(!buffer.is_modified());

        buffer.mark_modified();
        assert!(buffer.is_modified());
    }

    #[test]
    fn test_undo_after_external_change_is_rejected() {
        let mut buffer = TextBuffer::from("abc");
        buffer.insert(at(0, 3), "def\nghi").unwrap();
        // Simulate a mutation the log does not know about.
        buffer.lines.delete(at(0, 0), at(1, 0)).unwrap();
        let before = buffer.text();

        assert!(matches!(buffer.undo(), Err(BufferError::InvalidUndo(_))));
        assert_eq!(buffer.text(), before);
        assert!(buffer.can_undo());
    }

    #[test]
    fn test_failed_undo_rolls_back_partial_group() {
        let mut buffer = TextBuffer::from("one\ntwo");
        buffer.begin_group("pair");
        buffer.insert(at(0, 0), "A").unwrap();
        buffer.insert(at(1, 0), "B").unwrap();
        buffer.end_group();
        // Break only the first edit of the group.
        buffer.lines.delete(at(0, 0), at(0, 1)).unwrap();
        let before = buffer.text();

        assert!(buffer.undo().is_err());
        assert_eq!(buffer.text(), before);
    }

    #[test]
    fn test_abort_group_reverts_partial_work() {
        let mut buffer = TextBuffer::from("one\ntwo");
        buffer.insert(at(0, 3), "!").unwrap();
        buffer.set_cursor(Cursor::new(at(1, 1)));
        let before = buffer.text();

        buffer.begin_group("batch");
        buffer.insert(at(1, 0), "new\n").unwrap();
        assert!(buffer.delete(at(9, 0), at(9, 1)).is_err());
        buffer.abort_group().unwrap();

        assert_eq!(buffer.text(), before);
        assert_eq!(buffer.position(), at(1, 1));
        assert_eq!(buffer.undo().unwrap(), "text");
        assert_eq!(buffer.text(), "one\ntwo");
    }

    #[test]
    fn test_splices_describe_touched_lines() {
        let mut buffer = TextBuffer::from("a\nb\nc");
        buffer.take_splices();
        let revision = buffer.revision();

        buffer.insert(at(1, 1), "x\ny").unwrap();
        buffer.delete(at(0, 1), at(1, 0)).unwrap();

        assert_eq!(
            buffer.take_splices(),
            [
                LineSplice { first: 1, removed: 1, inserted: 2 },
                LineSplice { first: 0, removed: 2, inserted: 1 },
            ]
        );
        assert_eq!(buffer.revision(), revision + 2);
        assert!(buffer.take_splices().is_empty());
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut buffer = TextBuffer::from("abc");
        buffer.insert(at(0, 0), "x").unwrap();
        buffer.set_cursor(Cursor::new(at(0, 4)));

        buffer.reset(LineStore::from_text("z"));
        assert_eq!(buffer.text(), "z");
        assert!(!buffer.can_undo());
        assert!(!buffer.is_modified());
        assert_eq!(buffer.position(), at(0, 1));
    }

    fn edit_strategy() -> impl Strategy<Value = (bool, usize, usize, String)> {
        (
            any::<bool>(),
            0usize..200,
            0usize..200,
            "[a-c\n]{0,4}",
        )
    }

    proptest! {
        #[test]
        fn undo_everything_restores_original(
            initial in "[a-z\n]{0,20}",
            edits in prop::collection::vec(edit_strategy(), 1..20),
        ) {
            let mut buffer = TextBuffer::from(initial.as_str());
            let original_cursor = buffer.cursor();
            let mut snapshots = Vec::new();

            for (is_insert, a, b, text) in edits {
                let len = buffer.lines().len_chars();
                let from = buffer.lines().char_idx_to_position(a % (len + 1)).unwrap();
                let to = buffer.lines().char_idx_to_position(b % (len + 1)).unwrap();
                buffer.seal();
                let before = buffer.text();
                let changed = if is_insert {
                    buffer.insert(from, &text).unwrap();
                    !text.is_empty()
                } else {
                    let (start, end) = if from <= to { (from, to) } else { (to, from) };
                    !buffer.delete(start, end).unwrap().is_empty()
                };
                if changed {
                    snapshots.push(before);
                }
            }

            let after = buffer.text();
            let mut undone = 0;
            while let Some(expected) = snapshots.pop() {
                buffer.undo().unwrap();
                prop_assert_eq!(buffer.text(), expected);
                undone += 1;
            }
            prop_assert!(!buffer.can_undo());
            prop_assert_eq!(buffer.text(), initial);
            prop_assert_eq!(buffer.cursor(), original_cursor);

            for _ in 0..undone {
                buffer.redo().unwrap();
            }
            prop_assert_eq!(buffer.text(), after);
        }
    }
}
