//! Text selection handling.
//!
//! ## Learning: Range Types
//!
//! Rust's standard library has `Range<T>` (exclusive end) and
//! `RangeInclusive<T>` (inclusive end). A selection is an exclusive
//! range over positions, so an empty selection (`anchor == active`)
//! selects nothing and is treated as "no selection".

use crate::cursor::Position;

/// A selection with direction information.
///
/// `anchor` stays where the selection started; `active` follows the
/// cursor. `start()`/`end()` give the same range in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Where the selection started (fixed)
    pub anchor: Position,
    /// The moving end (where the cursor is)
    pub active: Position,
}

impl Selection {
    /// Creates a new selection.
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// Returns the earlier of the two ends.
    pub fn start(&self) -> Position {
        self.anchor.min(self.active)
    }

    /// Returns the later of the two ends.
    pub fn end(&self) -> Position {
        self.anchor.max(self.active)
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }

    /// Returns true if the selection was made backwards.
    pub fn is_backward(&self) -> bool {
        self.active < self.anchor
    }

    /// Returns true if the selection spans multiple lines.
    pub fn is_multiline(&self) -> bool {
        self.anchor.line != self.active.line
    }

    /// Returns true if the position is inside the selection.
    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start() && pos < self.end()
    }

    /// Returns the first and last line touched by the selection.
    ///
    /// Both ends count, even when the selection ends at column 0.
    pub fn line_span(&self) -> (usize, usize) {
        (self.start().line, self.end().line)
    }

    /// The selected columns of `line`, given that line's length.
    ///
    /// Returns `None` when the line is outside the selection.
    pub fn columns_on(&self, line: usize, line_len: usize) -> Option<(usize, usize)> {
        let (start, end) = (self.start(), self.end());
        if line < start.line || line > end.line {
            return None;
        }
        let from = if line == start.line { start.column } else { 0 };
        let to = if line == end.line { end.column } else { line_len };
        Some((from, to.max(from)))
    }
}
