//! Positions and the cursor.
//!
//! ## Learning: Positions that follow edits
//!
//! A `Position` is a (line, column) pair ordered line-first. Anything that
//! holds one across an edit (the cursor, a selection anchor, a saved search
//! origin) re-maps it with [`Position::shifted_by_insert`] or
//! [`Position::shifted_by_delete`] instead of recomputing it from scratch.

use serde::{Deserialize, Serialize};

use crate::selection::Selection;

/// A position in the text buffer (line and column).
///
/// Both line and column are 0-indexed. The column counts `char`s, and may
/// equal the line length (the end-of-line position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters not bytes)
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Top of the document.
    pub const ZERO: Position = Position { line: 0, column: 0 };

    /// Strictly earlier in the document.
    pub fn is_before(&self, other: &Position) -> bool {
        self < other
    }

    /// Strictly later in the document.
    pub fn is_after(&self, other: &Position) -> bool {
        self > other
    }

    /// Where this position ends up after `inserted` text is placed at `at`,
    /// given that the inserted text ends at `end`.
    ///
    /// Positions at or after the insertion point move with the text.
    pub fn shifted_by_insert(self, at: Position, end: Position) -> Position {
        if self < at {
            self
        } else if self.line == at.line {
            Position::new(end.line, end.column + (self.column - at.column))
        } else {
            Position::new(self.line + (end.line - at.line), self.column)
        }
    }

    /// Where this position ends up after `start..end` is removed.
    ///
    /// Positions inside the removed range collapse to `start`.
    pub fn shifted_by_delete(self, start: Position, end: Position) -> Position {
        if self <= start {
            self
        } else if self < end {
            start
        } else if self.line == end.line {
            Position::new(start.line, start.column + (self.column - end.column))
        } else {
            Position::new(self.line - (end.line - start.line), self.column)
        }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Equal => self.column.cmp(&other.column),
            other => other,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // line:column, counted from 1
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// The insertion point, plus the anchor of a selection being extended.
///
/// `Cursor` is `Copy`, which makes it a cheap snapshot for the undo log:
/// every undo group stores the cursor before and after its edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Where text is inserted; the moving end of a selection.
    pub position: Position,

    /// Fixed end of the selection, if one is being made.
    pub anchor: Option<Position>,

    /// Column that up/down motions aim for across short lines.
    pub preferred_column: Option<usize>,
}

impl Cursor {
    /// A cursor at `position` with nothing selected.
    pub fn new(position: Position) -> Self {
        Self {
            position,
            anchor: None,
            preferred_column: None,
        }
    }

    /// A cursor at the top of the document.
    pub fn at_start() -> Self {
        Self::new(Position::ZERO)
    }

    /// Moves the cursor, clearing any selection.
    pub fn move_to(&mut self, position: Position) {
        self.position = position;
        self.anchor = None;
        self.preferred_column = None;
    }

    /// Moves the cursor while extending the selection.
    ///
    /// The anchor is dropped at the old position if no selection exists yet.
    pub fn select_to(&mut self, position: Position) {
        if self.anchor.is_none() {
            self.anchor = Some(self.position);
        }
        self.position = position;
        self.preferred_column = None;
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        self.selection().is_some()
    }

    /// Returns the selection, if it is non-empty.
    pub fn selection(&self) -> Option<Selection> {
        let anchor = self.anchor?;
        let selection = Selection::new(anchor, self.position);
        (!selection.is_empty()).then_some(selection)
    }

    /// Selected range as `(start, end)`, start first.
    pub fn selection_range(&self) -> Option<(Position, Position)> {
        self.selection().map(|s| (s.start(), s.end()))
    }
}
