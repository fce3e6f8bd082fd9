//! Editing operations built on `insert` and `delete`.
//!
//! Each operation picks its undo label and grouping. Single keystrokes
//! (`type_char`, `backspace`, `delete_forward`) record plain edits so the
//! history can coalesce them; compound operations wrap their edits in a
//! group so they undo as one step.

use crate::buffer::TextBuffer;
use crate::cursor::Position;
use crate::BufferResult;

/// Text removed by a cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// The removed text
    pub text: String,
    /// True if this cut continued the previous one; the text should then be
    /// appended to the clipboard instead of replacing it
    pub continued: bool,
}

const CUT: &str = "cut";
const CUT_SELECTION: &str = "cut selection";

impl TextBuffer {
    // ==================== Keystrokes ====================

    /// Types a character at the cursor, dropping any selection.
    pub fn type_char(&mut self, c: char) -> BufferResult<()> {
        let before = self.cursor;
        self.cursor.clear_selection();
        let mut encoded = [0u8; 4];
        self.insert_from(before, self.cursor.position, c.encode_utf8(&mut encoded), "text")?;
        Ok(())
    }

    /// Deletes the character before the cursor, joining with the previous
    /// line at column 0.
    pub fn backspace(&mut self) -> BufferResult<()> {
        let before = self.cursor;
        self.cursor.clear_selection();
        let pos = self.cursor.position;
        let start = if pos.column > 0 {
            Position::new(pos.line, pos.column - 1)
        } else if pos.line > 0 {
            Position::new(pos.line - 1, self.line_len(pos.line - 1)?)
        } else {
            return Ok(());
        };
        self.delete_from(before, start, pos, "backspace text")?;
        Ok(())
    }

    /// Deletes the character at the cursor, joining the next line at the
    /// end of a line. Does nothing at the end of the buffer.
    pub fn delete_forward(&mut self) -> BufferResult<()> {
        let before = self.cursor;
        self.cursor.clear_selection();
        let pos = self.cursor.position;
        let end = if pos.column < self.line_len(pos.line)? {
            Position::new(pos.line, pos.column + 1)
        } else if pos.line < self.lines().last_line() {
            Position::new(pos.line + 1, 0)
        } else {
            return Ok(());
        };
        self.delete_from(before, pos, end, "delete text")?;
        Ok(())
    }

    /// Splits the line at the cursor.
    pub fn newline(&mut self) -> BufferResult<()> {
        let before = self.cursor;
        self.cursor.clear_selection();
        self.insert_from(before, self.cursor.position, "\n", "line break")?;
        self.cursor.preferred_column = None;
        Ok(())
    }

    /// Tab key: indents the selection, or inserts a tab at the cursor.
    pub fn tab(&mut self) -> BufferResult<()> {
        if self.selection().is_some() {
            self.indent()
        } else {
            self.insert_tab()
        }
    }

    /// Inserts spaces up to the next tab stop, or a `\t` when tabs are not
    /// expanded.
    pub fn insert_tab(&mut self) -> BufferResult<()> {
        let pos = self.cursor.position;
        let text = if self.config().use_spaces {
            let width = self.config().tab_width;
            " ".repeat(width - pos.column % width)
        } else {
            "\t".to_string()
        };
        self.insert_with(pos, &text, "insert tab")?;
        self.seal();
        Ok(())
    }

    /// Pastes a string at the cursor as one undo step.
    ///
    /// `\r\n` from the terminal is normalized to `\n`.
    pub fn paste(&mut self, text: &str) -> BufferResult<()> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let before = self.cursor;
        self.cursor.clear_selection();
        self.insert_from(before, self.cursor.position, &text, "paste")?;
        self.seal();
        Ok(())
    }

    // ==================== Indentation ====================

    /// One level of indentation: a tab, or `tab_width` spaces.
    pub fn indent_unit(&self) -> String {
        if self.config().use_spaces {
            " ".repeat(self.config().tab_width)
        } else {
            "\t".to_string()
        }
    }

    /// Indents every non-empty line touched by the selection (or the
    /// current line).
    pub fn indent(&mut self) -> BufferResult<()> {
        let unit = self.indent_unit();
        let anchor = self.cursor.anchor;
        let (first, last) = self.touched_lines();

        self.grouped("indent", |buffer| {
            for line in first..=last {
                if buffer.line_len(line)? > 0 {
                    buffer.insert_with(Position::new(line, 0), &unit, "indent")?;
                }
            }
            // An anchor at the start of a line stays there.
            if let Some(a) = anchor {
                if a.column == 0 {
                    buffer.cursor.anchor = Some(a);
                }
            }
            Ok(())
        })
    }

    /// Removes up to one level of leading whitespace from every line
    /// touched by the selection (or the current line).
    pub fn dedent(&mut self) -> BufferResult<()> {
        let width = self.indent_unit().chars().count();
        let (first, last) = self.touched_lines();

        self.grouped("dedent", |buffer| {
            for line in first..=last {
                let n = buffer
                    .line(line)?
                    .chars()
                    .take(width)
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .count();
                if n > 0 {
                    buffer.delete_with(Position::new(line, 0), Position::new(line, n), "dedent")?;
                }
            }
            Ok(())
        })
    }

    // ==================== Cut & Uncut ====================

    /// Cuts the selection, or the current line when nothing is selected.
    ///
    /// Repeated line cuts with nothing in between form one undo step and
    /// report `continued` so the caller can accumulate the clipboard.
    pub fn cut(&mut self) -> BufferResult<Cut> {
        match self.selection() {
            Some(selection) => {
                let continued = self.begin_chain(CUT_SELECTION);
                self.cursor.clear_selection();
                let result =
                    self.delete_with(selection.start(), selection.end(), CUT_SELECTION);
                self.end_group();
                Ok(Cut {
                    text: result?,
                    continued,
                })
            }
            None => {
                let continued = self.begin_chain(CUT);
                let result = self.cut_current_line();
                self.end_group();
                Ok(Cut {
                    text: result?,
                    continued,
                })
            }
        }
    }

    fn cut_current_line(&mut self) -> BufferResult<String> {
        let line = self.cursor.position.line;
        let start = Position::new(line, 0);
        let end = if line < self.lines().last_line() {
            Position::new(line + 1, 0)
        } else {
            Position::new(line, self.line_len(line)?)
        };
        let text = self.delete_with(start, end, CUT)?;
        self.cursor.move_to(start);
        Ok(text)
    }

    /// Inserts previously cut text at the cursor.
    ///
    /// Right after a cut the insertion joins the cut's undo step.
    pub fn uncut(&mut self, text: &str) -> BufferResult<()> {
        match self.history().chain_label() {
            Some(label) if label == CUT || label == CUT_SELECTION => {
                self.begin_chain(label);
            }
            _ => self.begin_group("uncut"),
        }
        self.cursor.clear_selection();
        let pos = self.cursor.position;
        let result = self.insert_with(pos, text, "uncut");
        self.end_group();
        self.seal();
        result.map(|_| ())
    }

    // ==================== Line Operations ====================

    /// The half-open line range a line-wise command works on.
    ///
    /// With a selection: every line it touches, including a final line
    /// reached at column 0, but not the empty line after a trailing
    /// newline. Without one: the whole buffer, minus that empty line.
    pub fn selected_lines(&self) -> (usize, usize) {
        let last = self.lines().last_line();
        let trailing_empty = last > 0 && self.line_len(last).unwrap_or(0) == 0;

        match self.selection() {
            Some(selection) => {
                let (first, end_line) = selection.line_span();
                if end_line > first && end_line == last && trailing_empty {
                    (first, end_line)
                } else {
                    (first, end_line + 1)
                }
            }
            None if trailing_empty => (0, last),
            None => (0, last + 1),
        }
    }

    /// Sorts the selected lines (or the whole buffer). Returns true if the
    /// order changed.
    pub fn sort_lines(&mut self, reverse: bool) -> BufferResult<bool> {
        let (first, end) = self.selected_lines();
        let original: Vec<String> = (first..end)
            .map(|i| self.line(i).map(|l| l.into_owned()))
            .collect::<BufferResult<_>>()?;

        let mut sorted = original.clone();
        sorted.sort();
        if reverse {
            sorted.reverse();
        }

        let start = Position::new(first, 0);
        let changed = sorted != original;
        self.grouped("sort", |buffer| {
            if changed {
                let last = end - 1;
                let stop = Position::new(last, buffer.line_len(last)?);
                buffer.delete_with(start, stop, "sort")?;
                buffer.insert_with(start, &sorted.join("\n"), "sort")?;
            }
            buffer.cursor.move_to(start);
            Ok(())
        })?;
        Ok(changed)
    }

    /// Toggles a line comment on the current line or the selected lines.
    ///
    /// The first line decides: if it is commented, the prefix is removed
    /// from every line, otherwise `prefix ` is added at the smallest
    /// indentation of the range.
    pub fn toggle_comment(&mut self, prefix: &str) -> BufferResult<()> {
        let (first, end) = match self.selection() {
            Some(_) => self.selected_lines(),
            None => {
                let line = self.cursor.position.line;
                (line, line + 1)
            }
        };
        let lines: Vec<String> = (first..end)
            .map(|i| self.line(i).map(|l| l.into_owned()))
            .collect::<BufferResult<_>>()?;
        let Some(head) = lines.first() else {
            return Ok(());
        };

        let commented = head.trim_start().starts_with(prefix);
        let selected = self.selection().is_some();
        let min_indent = lines.iter().map(|l| indent_of(l)).min().unwrap_or(0);
        let prefix_len = prefix.chars().count();

        self.grouped("comment", |buffer| {
            if selected {
                buffer.cursor.clear_selection();
            }
            for (i, text) in lines.iter().enumerate() {
                let line = first + i;
                let indent = indent_of(text);
                if commented {
                    let rest: String = text.chars().skip(indent).collect();
                    let n = if rest.starts_with(&format!("{prefix} ")) {
                        prefix_len + 1
                    } else if rest.starts_with(prefix) {
                        prefix_len
                    } else {
                        0
                    };
                    buffer.delete_with(
                        Position::new(line, indent),
                        Position::new(line, indent + n),
                        "comment",
                    )?;
                } else if text.is_empty() {
                    buffer.insert_with(Position::new(line, 0), prefix, "comment")?;
                } else {
                    let at = if selected { min_indent } else { indent };
                    buffer.insert_with(Position::new(line, at), &format!("{prefix} "), "comment")?;
                }
            }
            Ok(())
        })
    }

    // ==================== Helpers ====================

    /// Lines touched by the selection, inclusive, or the cursor line.
    fn touched_lines(&self) -> (usize, usize) {
        match self.selection() {
            Some(selection) => selection.line_span(),
            None => {
                let line = self.cursor.position.line;
                (line, line)
            }
        }
    }

    /// Runs `f` inside an undo group, closing the group on every path.
    fn grouped<T>(
        &mut self,
        label: &'static str,
        f: impl FnOnce(&mut Self) -> BufferResult<T>,
    ) -> BufferResult<T> {
        self.begin_group(label);
        let result = f(self);
        self.end_group();
        result
    }
}

/// Length of the leading whitespace, in chars.
fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}
