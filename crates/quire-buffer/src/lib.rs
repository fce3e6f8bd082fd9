//! # Quire Buffer
//!
//! Line-oriented text buffer with an undo log, backed by a rope.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Ownership & Borrowing
//! - `TextBuffer` owns its `LineStore`, `History` and `Cursor`
//! - Methods like `line()` return borrowed data (`Cow<str>`)
//! - Mutations require `&mut self` (exclusive access)
//!
//! ### Invariants Enforced by Types
//! - A `LineStore` always holds at least one line
//! - Every mutation goes through one place that records its inverse
//! - Cursor and selection are clamped after every edit

mod buffer;
mod cursor;
mod editing;
mod history;
mod lines;
mod motion;
mod selection;

pub use buffer::{BufferConfig, LineSplice, TextBuffer};
pub use cursor::{Cursor, Position};
pub use editing::Cut;
pub use history::{Edit, EditKind, GroupId, History, UndoGroup};
pub use lines::{Decoded, LineEnding, LineStore};
pub use selection::Selection;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Position {line}:{column} is out of bounds")]
    PositionOutOfBounds { line: usize, column: usize },

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: Position, end: Position },

    #[error("invalid utf-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("file contains a NUL byte at offset {offset}")]
    NulByte { offset: usize },

    #[error("nothing to undo!")]
    NothingToUndo,

    #[error("nothing to redo!")]
    NothingToRedo,

    #[error("undo log is inconsistent with the buffer: {0}")]
    InvalidUndo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_has_one_empty_line() {
        let buffer = TextBuffer::new();
        assert_eq!(buffer.len_lines(), 1);
        assert_eq!(buffer.line(0).unwrap(), "");
        assert!(!buffer.is_modified());
    }

    #[test]
    fn test_multi_line_insert_then_delete_across_lines() {
        let mut buffer = TextBuffer::from("head
tail");
        buffer.insert(Position::new(0, 4), " one
two").unwrap();
        assert_eq!(buffer.lines_vec(), ["head one", "two", "tail"]);

        buffer
            .delete(Position::new(0, 4), Position::new(2, 0))
            .unwrap();
        assert_eq!(buffer.text(), "headtail");
        assert!(buffer.is_modified());
    }

    #[test]
    fn test_undo_redo() {
        let mut buffer = TextBuffer::from("abc\ndef");
        buffer.insert(Position::new(0, 1), "X").unwrap();
        assert_eq!(buffer.lines_vec(), ["aXbc", "def"]);

        buffer.undo().unwrap();
        assert_eq!(buffer.lines_vec(), ["abc", "def"]);

        buffer.redo().unwrap();
        assert_eq!(buffer.lines_vec(), ["aXbc", "def"]);
    }

    #[test]
    fn test_empty_stacks_are_reported() {
        let mut buffer = TextBuffer::new();
        assert!(matches!(buffer.undo(), Err(BufferError::NothingToUndo)));
        assert!(matches!(buffer.redo(), Err(BufferError::NothingToRedo)));
    }
}
