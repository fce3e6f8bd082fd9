//! The undo log.
//!
//! ## Learning: Storing Edits, Deriving Inverses
//!
//! Only the forward edit is kept. Its inverse is computed on demand
//! ([`Edit::inverse`]): an insert undoes as a delete of the same text and
//! the other way round, so no second copy of the text is stored.
//!
//! Edits are collected into groups. A group is one user-visible step:
//! undo pops a whole group and reverses its edits in reverse order.
//!
//! ## Grouping Rules
//!
//! - `begin_group` / `end_group` bracket a compound operation. Nested
//!   pairs are flattened, only the outermost pair delimits.
//! - A lone single-character edit leaves its group open for coalescing:
//!   the next adjacent single-character edit with the same label joins it.
//! - `seal` closes the last group. Cursor jumps and mode changes call it.
//! - A *chain* is a group that keeps accepting the same chained operation
//!   (repeated cuts) until something else is recorded or `seal` is called.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::cursor::{Cursor, Position};
use crate::lines::LineStore;

/// The type of edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    /// Text was inserted
    Insert,
    /// Text was deleted
    Delete,
}

/// A single edit operation.
///
/// Not `Copy`: the text is an owned `String`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// What kind of edit this is
    pub kind: EditKind,
    /// Where the edit starts
    pub position: Position,
    /// The text that was inserted or deleted
    pub content: String,
}

impl Edit {
    /// Creates an insert edit.
    pub fn insert(position: Position, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert,
            position,
            content: content.into(),
        }
    }

    /// Creates a delete edit.
    pub fn delete(position: Position, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Delete,
            position,
            content: content.into(),
        }
    }

    /// Returns the inverse of this edit (for undo).
    pub fn inverse(&self) -> Self {
        Self {
            kind: match self.kind {
                EditKind::Insert => EditKind::Delete,
                EditKind::Delete => EditKind::Insert,
            },
            position: self.position,
            content: self.content.clone(),
        }
    }

    /// Returns the position just past the edited text.
    pub fn end_position(&self) -> Position {
        LineStore::end_of_insert(self.position, &self.content)
    }

    /// Returns true if this edit can be coalesced with another.
    ///
    /// Two edits can be coalesced if:
    /// - They're the same kind
    /// - They're adjacent (next character for insert, same position or
    ///   the character before for delete)
    /// - Neither contains a newline
    pub fn can_coalesce(&self, other: &Edit) -> bool {
        if self.kind != other.kind {
            return false;
        }

        // Don't coalesce across newlines
        if self.content.contains('\n') || other.content.contains('\n') {
            return false;
        }
        if self.position.line != other.position.line {
            return false;
        }

        let (ours, theirs) = (self.position.column, other.position.column);
        match self.kind {
            EditKind::Insert => ours + self.content.chars().count() == theirs,
            EditKind::Delete => {
                // Backspace: other ends where this one starts.
                // Forward delete: same position.
                theirs + other.content.chars().count() == ours || ours == theirs
            }
        }
    }

    /// Coalesces another edit into this one.
    pub fn coalesce(&mut self, other: Edit) {
        match self.kind {
            EditKind::Insert => {
                self.content.push_str(&other.content);
            }
            EditKind::Delete => {
                if other.position < self.position {
                    // Backspace: prepend
                    self.content = other.content + &self.content;
                    self.position = other.position;
                } else {
                    // Forward delete: append
                    self.content.push_str(&other.content);
                }
            }
        }
    }

    fn is_single_char(&self) -> bool {
        let mut chars = self.content.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c != '\n')
    }
}

/// Identifies an undo group. Ids are never reused within one history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

/// A group of edits that are undone/redone together.
#[derive(Debug, Clone)]
pub struct UndoGroup {
    /// Unique id
    pub id: GroupId,
    /// User-visible name, e.g. "text" or "sort"
    pub label: &'static str,
    /// The edits, in the order they were applied
    pub edits: Vec<Edit>,
    /// Cursor and selection before the first edit
    pub before: Cursor,
    /// Cursor and selection after the last edit
    pub after: Cursor,
}

/// Undo and redo stacks.
///
/// The undo side is a `VecDeque` so the oldest group can be dropped from the
/// front once `max_size` is reached, while undo pops from the back.
#[derive(Debug, Clone)]
pub struct History {
    /// Stack of undoable edit groups
    undo_stack: VecDeque<UndoGroup>,
    /// Stack of redoable edit groups
    redo_stack: Vec<UndoGroup>,
    /// Maximum number of edit groups to keep
    max_size: usize,
    /// Nesting depth of open groups
    depth: usize,
    /// Whether the last group refuses further coalescing
    sealed: bool,
    /// Whether the last group is a chain
    chained: bool,
    next_id: u64,
}

impl History {
    /// Creates a new history with the given capacity.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_size.min(64)),
            redo_stack: Vec::new(),
            max_size,
            depth: 0,
            sealed: true,
            chained: false,
            next_id: 0,
        }
    }

    /// Records an applied edit.
    ///
    /// Clears the redo stack (can't redo after a new edit).
    pub fn record(&mut self, edit: Edit, label: &'static str, before: Cursor, after: Cursor) {
        self.redo_stack.clear();

        if self.depth > 0 {
            if let Some(group) = self.undo_stack.back_mut() {
                Self::append(group, edit);
                group.after = after;
                return;
            }
        }

        if !self.sealed && !self.chained && edit.is_single_char() {
            if let Some(group) = self.undo_stack.back_mut() {
                if group.label == label {
                    if let Some(last) = group.edits.last_mut() {
                        if last.can_coalesce(&edit) {
                            last.coalesce(edit);
                            group.after = after;
                            return;
                        }
                    }
                }
            }
        }

        self.sealed = !edit.is_single_char();
        self.chained = false;
        let id = self.fresh_id();
        self.undo_stack.push_back(UndoGroup {
            id,
            label,
            edits: vec![edit],
            before,
            after,
        });
        self.enforce_capacity();
    }

    /// Starts an edit group.
    ///
    /// All edits until the matching `end_group()` are one undo step.
    pub fn begin_group(&mut self, label: &'static str, before: Cursor) {
        if self.depth == 0 {
            let id = self.fresh_id();
            self.undo_stack.push_back(UndoGroup {
                id,
                label,
                edits: Vec::new(),
                before,
                after: before,
            });
            self.chained = false;
        }
        self.depth += 1;
    }

    /// Starts or continues a chained group.
    ///
    /// Returns true when the previous group was the same chain and is being
    /// continued.
    pub fn begin_chain(&mut self, label: &'static str, before: Cursor) -> bool {
        if self.chain_label() == Some(label) && self.depth == 0 {
            self.depth = 1;
            return true;
        }
        self.begin_group(label, before);
        if self.depth == 1 {
            self.chained = true;
        }
        false
    }

    /// Ends the current edit group.
    pub fn end_group(&mut self, after: Cursor) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth > 0 {
            return;
        }

        let empty = self.undo_stack.back().is_some_and(|g| g.edits.is_empty());
        if empty {
            self.undo_stack.pop_back();
            self.sealed = true;
            self.chained = false;
            return;
        }
        if let Some(group) = self.undo_stack.back_mut() {
            group.after = after;
        }
        self.sealed = !self.chained;
        self.enforce_capacity();
    }

    /// Closes every open group and takes the outermost one back off the
    /// stack, so the caller can revert it. Returns `None` when no group is
    /// open.
    pub fn abort_group(&mut self) -> Option<UndoGroup> {
        if self.depth == 0 {
            return None;
        }
        self.depth = 0;
        self.seal();
        self.undo_stack.pop_back()
    }

    /// Closes the last group: nothing more coalesces or chains into it.
    pub fn seal(&mut self) {
        self.sealed = true;
        self.chained = false;
    }

    /// Returns the label of the chain the next chained edit would continue.
    pub fn chain_label(&self) -> Option<&'static str> {
        if self.sealed || !self.chained {
            return None;
        }
        self.undo_stack.back().map(|g| g.label)
    }

    /// Returns true while a group is open.
    pub fn in_group(&self) -> bool {
        self.depth > 0
    }

    // ==================== Undo/Redo ====================

    /// Takes the most recent group off the undo stack.
    pub fn take_undo(&mut self) -> Option<UndoGroup> {
        let group = self.undo_stack.pop_back()?;
        self.seal();
        Some(group)
    }

    /// Takes the most recently undone group off the redo stack.
    pub fn take_redo(&mut self) -> Option<UndoGroup> {
        let group = self.redo_stack.pop()?;
        self.seal();
        Some(group)
    }

    /// Stores a group that has just been undone.
    pub fn push_undone(&mut self, group: UndoGroup) {
        self.redo_stack.push(group);
    }

    /// Stores a group that has just been redone.
    pub fn push_redone(&mut self, group: UndoGroup) {
        self.undo_stack.push_back(group);
        self.enforce_capacity();
    }

    /// Puts back a group whose undo failed.
    pub fn restore_undo(&mut self, group: UndoGroup) {
        self.undo_stack.push_back(group);
    }

    /// Puts back a group whose redo failed.
    pub fn restore_redo(&mut self, group: UndoGroup) {
        self.redo_stack.push(group);
    }

    /// Returns true if there are edits to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are edits to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns the id of the most recent undoable group.
    pub fn top_id(&self) -> Option<GroupId> {
        self.undo_stack.back().map(|g| g.id)
    }

    /// Clears all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.depth = 0;
        self.seal();
    }

    /// Returns the number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Returns the number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    // ==================== Helpers ====================

    fn append(group: &mut UndoGroup, edit: Edit) {
        if let Some(last) = group.edits.last_mut() {
            if edit.is_single_char() && last.can_coalesce(&edit) {
                last.coalesce(edit);
                return;
            }
        }
        group.edits.push(edit);
    }

    fn fresh_id(&mut self) -> GroupId {
        self.next_id += 1;
        GroupId(self.next_id)
    }

    fn enforce_capacity(&mut self) {
        // Never drop the group that is still being filled.
        let keep = if self.depth > 0 { 1 } else { 0 };
        while self.undo_stack.len() > self.max_size.max(keep) {
            self.undo_stack.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    fn cursor() -> Cursor {
        Cursor::at_start()
    }

    #[test]
    fn test_edit_inverse() {
        let insert = Edit::insert(at(0, 0), "hello");
        let inverse = insert.inverse();

        assert_eq!(inverse.kind, EditKind::Delete);
        assert_eq!(inverse.position, at(0, 0));
        assert_eq!(inverse.content, "hello");
    }

    #[test]
    fn test_edit_end_position() {
        assert_eq!(Edit::insert(at(1, 2), "ab").end_position(), at(1, 4));
        assert_eq!(Edit::insert(at(1, 2), "a\nbc").end_position(), at(2, 2));
    }

    #[test]
    fn test_edit_coalescing() {
        let mut e1 = Edit::insert(at(0, 0), "a");
        let e2 = Edit::insert(at(0, 1), "b");

        assert!(e1.can_coalesce(&e2));
        e1.coalesce(e2);
        assert_eq!(e1.content, "ab");

        let mut back = Edit::delete(at(0, 3), "c");
        let earlier = Edit::delete(at(0, 2), "b");
        assert!(back.can_coalesce(&earlier));
        back.coalesce(earlier);
        assert_eq!(back.content, "bc");
        assert_eq!(back.position, at(0, 2));

        assert!(!Edit::insert(at(0, 0), "a").can_coalesce(&Edit::insert(at(1, 1), "b")));
        assert!(!Edit::insert(at(0, 0), "a").can_coalesce(&Edit::insert(at(0, 1), "\n")));
    }

    #[test]
    fn test_typing_coalesces_into_one_group() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "a"), "text", cursor(), cursor());
        history.record(Edit::insert(at(0, 1), "b"), "text", cursor(), cursor());
        history.record(Edit::insert(at(0, 2), "c"), "text", cursor(), cursor());

        assert_eq!(history.undo_count(), 1);
        let group = history.take_undo().unwrap();
        assert_eq!(group.edits, vec![Edit::insert(at(0, 0), "abc")]);
    }

    #[test]
    fn test_seal_stops_coalescing() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "a"), "text", cursor(), cursor());
        history.seal();
        history.record(Edit::insert(at(0, 1), "b"), "text", cursor(), cursor());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_different_labels_do_not_coalesce() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "a"), "text", cursor(), cursor());
        history.record(Edit::delete(at(0, 0), "a"), "backspace text", cursor(), cursor());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_multi_char_edit_is_its_own_group() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "pasted"), "paste", cursor(), cursor());
        history.record(Edit::insert(at(0, 6), "x"), "paste", cursor(), cursor());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_groups_nest() {
        let mut history = History::new(100);
        history.begin_group("sort", cursor());
        history.record(Edit::delete(at(0, 0), "b\na"), "delete text", cursor(), cursor());
        history.begin_group("inner", cursor());
        history.record(Edit::insert(at(0, 0), "a\nb"), "text", cursor(), cursor());
        history.end_group(cursor());
        assert!(history.in_group());
        history.end_group(cursor());

        assert_eq!(history.undo_count(), 1);
        let group = history.take_undo().unwrap();
        assert_eq!(group.label, "sort");
        assert_eq!(group.edits.len(), 2);
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut history = History::new(100);
        history.begin_group("sort", cursor());
        history.end_group(cursor());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_abort_group_takes_open_group() {
        let mut history = History::default();
        history.record(Edit::insert(Position::ZERO, "keep"), "text", cursor(), cursor());
        let kept = history.top_id();

        assert!(history.abort_group().is_none());
        history.begin_group("reload", cursor());
        history.begin_group("inner", cursor());
        history.record(Edit::insert(Position::ZERO, "x"), "reload", cursor(), cursor());

        let aborted = history.abort_group().unwrap();
        assert_eq!(aborted.label, "reload");
        assert_eq!(aborted.edits.len(), 1);
        assert!(!history.in_group());
        assert_eq!(history.top_id(), kept);
    }

    #[test]
    fn test_chain_continues_until_sealed() {
        let mut history = History::new(100);
        assert!(!history.begin_chain("cut", cursor()));
        history.record(Edit::delete(at(0, 0), "a\n"), "cut", cursor(), cursor());
        history.end_group(cursor());

        assert!(history.begin_chain("cut", cursor()));
        history.record(Edit::delete(at(0, 0), "b\n"), "cut", cursor(), cursor());
        history.end_group(cursor());
        assert_eq!(history.undo_count(), 1);

        history.seal();
        assert!(!history.begin_chain("cut", cursor()));
        history.record(Edit::delete(at(0, 0), "c\n"), "cut", cursor(), cursor());
        history.end_group(cursor());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "a"), "text", cursor(), cursor());
        let group = history.take_undo().unwrap();
        history.push_undone(group);
        assert!(history.can_redo());

        history.record(Edit::insert(at(0, 0), "b"), "text", cursor(), cursor());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut history = History::new(2);
        for i in 0..5 {
            history.record(Edit::insert(at(i, 0), "x\n"), "text", cursor(), cursor());
        }
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_group_ids_are_unique() {
        let mut history = History::new(100);
        history.record(Edit::insert(at(0, 0), "x\n"), "text", cursor(), cursor());
        let first = history.top_id();
        let group = history.take_undo().unwrap();
        history.push_undone(group);
        history.record(Edit::insert(at(0, 0), "y\n"), "text", cursor(), cursor());
        assert_ne!(history.top_id(), first);
    }
}
