//! The line store: an ordered, never-empty sequence of lines.
//!
//! ## Why Rope?
//!
//! A rope keeps insertions and deletions at O(log n) even for very large
//! files, and gives us line indexing for free. Lines are stored with `\n`
//! separators only; the file's real line ending is remembered separately
//! and re-applied when serializing.
//!
//! ## Learning: `Cow<str>`
//!
//! `line()` returns a `Cow<'_, str>`: borrowed when the line lives in a
//! single rope chunk, owned when it has to be stitched together.

use std::borrow::Cow;

use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::{BufferError, BufferResult, Position};

/// Line ending style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix-style: \n
    #[default]
    Lf,
    /// Windows-style: \r\n
    CrLf,
}

impl LineEnding {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Returns an escaped form for status messages.
    pub fn escaped(&self) -> &'static str {
        match self {
            LineEnding::Lf => "'\\n'",
            LineEnding::CrLf => "'\\r\\n'",
        }
    }
}

/// Result of decoding raw file bytes.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The decoded lines
    pub store: LineStore,
    /// The most common separator, or `None` if the file has none
    pub line_ending: Option<LineEnding>,
    /// True if both `\n` and `\r\n` were found
    pub mixed: bool,
}

/// An ordered sequence of lines backed by a rope.
///
/// Invariant: there is always at least one line. An empty store is a
/// single empty line, and text ending with `\n` has a final empty line.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    rope: Rope,
}

impl LineStore {
    /// Creates a store holding one empty line.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a store from `\n`-separated text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Decodes file bytes into lines.
    ///
    /// `\r\n` and `\n` both separate lines. Anything that is not UTF-8, or
    /// that contains a NUL byte, is rejected.
    pub fn decode(bytes: &[u8]) -> BufferResult<Decoded> {
        let text = std::str::from_utf8(bytes).map_err(|e| BufferError::InvalidUtf8 {
            offset: e.valid_up_to(),
        })?;
        if let Some(offset) = bytes.iter().position(|&b| b == 0) {
            return Err(BufferError::NulByte { offset });
        }

        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count() - crlf;
        let line_ending = match (lf, crlf) {
            (0, 0) => None,
            (lf, crlf) if crlf > lf => Some(LineEnding::CrLf),
            _ => Some(LineEnding::Lf),
        };

        let normalized: Cow<'_, str> = if crlf > 0 {
            Cow::Owned(text.replace("\r\n", "\n"))
        } else {
            Cow::Borrowed(text)
        };

        Ok(Decoded {
            store: Self::from_text(&normalized),
            line_ending,
            mixed: lf > 0 && crlf > 0,
        })
    }

    /// Serializes the lines, joined with `ending`.
    pub fn encode(&self, ending: LineEnding) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.rope.len_bytes() + self.len_lines());
        for chunk in self.rope.chunks() {
            match ending {
                LineEnding::Lf => out.extend_from_slice(chunk.as_bytes()),
                LineEnding::CrLf => {
                    for (i, part) in chunk.split('\n').enumerate() {
                        if i > 0 {
                            out.extend_from_slice(b"\r\n");
                        }
                        out.extend_from_slice(part.as_bytes());
                    }
                }
            }
        }
        out
    }

    // ==================== Text Access ====================

    /// Returns the number of lines (always at least 1).
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns the number of characters, counting each separator as one.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the index of the last line.
    #[inline]
    pub fn last_line(&self) -> usize {
        self.len_lines() - 1
    }

    /// Returns a line without its separator.
    pub fn line(&self, idx: usize) -> BufferResult<Cow<'_, str>> {
        self.check_line(idx)?;
        let slice = self.rope.line(idx);
        let len = Self::content_len(&slice);
        Ok(slice.slice(..len).into())
    }

    /// Returns the length of a line in characters, without its separator.
    pub fn line_len(&self, idx: usize) -> BufferResult<usize> {
        self.check_line(idx)?;
        Ok(Self::content_len(&self.rope.line(idx)))
    }

    /// Iterates over all lines, without separators.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> + '_ {
        self.rope.lines().map(|slice| {
            let len = Self::content_len(&slice);
            slice.slice(..len).into()
        })
    }

    /// Returns the whole text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Returns the text between two positions.
    pub fn slice(&self, start: Position, end: Position) -> BufferResult<String> {
        let (from, to) = self.char_range(start, end)?;
        Ok(self.rope.slice(from..to).to_string())
    }

    // ==================== Position Conversion ====================

    /// Converts a Position (line, column) to a character index.
    pub fn position_to_char_idx(&self, pos: Position) -> BufferResult<usize> {
        let out_of_bounds = || BufferError::PositionOutOfBounds {
            line: pos.line,
            column: pos.column,
        };
        if pos.line >= self.len_lines() {
            return Err(out_of_bounds());
        }
        if pos.column > Self::content_len(&self.rope.line(pos.line)) {
            return Err(out_of_bounds());
        }
        Ok(self.rope.line_to_char(pos.line) + pos.column)
    }

    /// Converts a character index to a Position (line, column).
    pub fn char_idx_to_position(&self, char_idx: usize) -> BufferResult<Position> {
        if char_idx > self.len_chars() {
            return Err(BufferError::PositionOutOfBounds {
                line: self.len_lines(),
                column: 0,
            });
        }
        let line = self.rope.char_to_line(char_idx);
        Ok(Position::new(line, char_idx - self.rope.line_to_char(line)))
    }

    /// Returns true if the position addresses an existing character slot.
    pub fn is_valid(&self, pos: Position) -> bool {
        self.position_to_char_idx(pos).is_ok()
    }

    /// Clamps a position into the store's bounds.
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.last_line());
        let len = Self::content_len(&self.rope.line(line));
        Position::new(line, pos.column.min(len))
    }

    /// Returns the position just past the last character.
    pub fn end_position(&self) -> Position {
        let last = self.last_line();
        Position::new(last, Self::content_len(&self.rope.line(last)))
    }

    // ==================== Mutations ====================

    /// Inserts text at a position, returning the position after it.
    ///
    /// Embedded `\n` characters split the line.
    pub fn insert(&mut self, pos: Position, text: &str) -> BufferResult<Position> {
        let idx = self.position_to_char_idx(pos)?;
        self.rope.insert(idx, text);
        Ok(Self::end_of_insert(pos, text))
    }

    /// Removes `start..end`, returning the removed text.
    ///
    /// Removing across a separator merges the lines around it.
    pub fn delete(&mut self, start: Position, end: Position) -> BufferResult<String> {
        let (from, to) = self.char_range(start, end)?;
        let removed = self.rope.slice(from..to).to_string();
        self.rope.remove(from..to);
        Ok(removed)
    }

    /// Computes where an insertion of `text` at `pos` ends.
    pub fn end_of_insert(pos: Position, text: &str) -> Position {
        match text.rfind('\n') {
            None => Position::new(pos.line, pos.column + text.chars().count()),
            Some(last_nl) => Position::new(
                pos.line + text.matches('\n').count(),
                text[last_nl + 1..].chars().count(),
            ),
        }
    }

    // ==================== Helpers ====================

    fn check_line(&self, idx: usize) -> BufferResult<()> {
        if idx >= self.len_lines() {
            return Err(BufferError::PositionOutOfBounds {
                line: idx,
                column: 0,
            });
        }
        Ok(())
    }

    fn char_range(&self, start: Position, end: Position) -> BufferResult<(usize, usize)> {
        if start > end {
            return Err(BufferError::InvalidRange { start, end });
        }
        Ok((
            self.position_to_char_idx(start)?,
            self.position_to_char_idx(end)?,
        ))
    }

    fn content_len(slice: &ropey::RopeSlice<'_>) -> usize {
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }
}

impl From<&str> for LineStore {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}
