//! Cursor movement.
//!
//! Every movement takes an `extend` flag. When true the selection anchor
//! is dropped at the old position (if there is no selection yet) and the
//! cursor becomes the active end; when false any selection is cleared.
//!
//! Movement is a cursor jump as far as the undo log is concerned, so it
//! always seals the last undo group.

use crate::buffer::TextBuffer;
use crate::cursor::Position;

impl TextBuffer {
    /// Moves the cursor to a position, clamped into the text.
    pub fn move_to(&mut self, pos: Position, extend: bool) {
        let pos = self.lines().clamp(pos);
        self.seal();
        if extend {
            self.cursor.select_to(pos);
        } else {
            self.cursor.move_to(pos);
        }
    }

    /// Moves one character left, wrapping to the end of the previous line.
    pub fn move_left(&mut self, extend: bool) {
        let pos = self.step_left(self.cursor.position);
        self.move_to(pos, extend);
    }

    /// Moves one character right, wrapping to the start of the next line.
    pub fn move_right(&mut self, extend: bool) {
        let pos = self.step_right(self.cursor.position);
        self.move_to(pos, extend);
    }

    /// Moves up one line, keeping the preferred column.
    pub fn move_up(&mut self, extend: bool) {
        self.move_lines(-1, extend);
    }

    /// Moves down one line, keeping the preferred column.
    pub fn move_down(&mut self, extend: bool) {
        self.move_lines(1, extend);
    }

    /// Moves `delta` lines up (negative) or down, keeping the preferred
    /// column. Stops at the first and last line.
    pub fn move_lines(&mut self, delta: isize, extend: bool) {
        let current = self.cursor.position;
        let preferred = self.cursor.preferred_column.unwrap_or(current.column);
        let line = current
            .line
            .saturating_add_signed(delta)
            .min(self.lines().last_line());
        let column = preferred.min(self.line_len_or_zero(line));

        self.move_to(Position::new(line, column), extend);
        self.cursor.preferred_column = Some(preferred);
    }

    /// Moves to the start of the line.
    pub fn move_home(&mut self, extend: bool) {
        let line = self.cursor.position.line;
        self.move_to(Position::new(line, 0), extend);
    }

    /// Moves to the end of the line.
    pub fn move_end(&mut self, extend: bool) {
        let line = self.cursor.position.line;
        let len = self.line_len_or_zero(line);
        self.move_to(Position::new(line, len), extend);
    }

    /// Moves to the start of the buffer.
    pub fn move_buffer_start(&mut self, extend: bool) {
        self.move_to(Position::ZERO, extend);
    }

    /// Moves to the end of the last line.
    pub fn move_buffer_end(&mut self, extend: bool) {
        let end = self.lines().end_position();
        self.move_to(end, extend);
    }

    // ==================== Word Movement ====================

    /// Moves to the end of the current word, or past whitespace and line
    /// breaks to the next word.
    pub fn move_word_right(&mut self, extend: bool) {
        let mut pos = self.cursor.position;
        let line = self.line_chars(pos.line);

        if !line.is_empty() && pos.column == line.len() - 1 {
            pos = self.step_right(pos);
        } else if pos.column >= line.len() {
            // Over line breaks and whitespace to the next word, or the end.
            while pos.column == self.line_len_or_zero(pos.line)
                || self.char_at(pos).is_some_and(char::is_whitespace)
            {
                let next = self.step_right(pos);
                if next == pos {
                    break;
                }
                pos = next;
            }
        } else {
            pos = self.step_right(pos);
            let alnum = line[pos.column].is_alphanumeric();
            while pos.column < line.len() && line[pos.column].is_alphanumeric() == alnum {
                pos = self.step_right(pos);
            }
        }

        self.move_to(pos, extend);
    }

    /// Moves to the start of the current word, or back across whitespace
    /// and line breaks to the end of the previous word.
    pub fn move_word_left(&mut self, extend: bool) {
        let mut pos = self.cursor.position;
        let line = self.line_chars(pos.line);
        let column = pos.column.min(line.len());
        let leading_space = column > 0 && line[..column].iter().all(|c| c.is_whitespace());

        if column == 1 && !leading_space {
            pos = self.step_left(pos);
        } else if column == 0 || leading_space {
            pos.column = 0;
            while pos.line > 0 && pos.column == 0 {
                pos = self.step_left(pos);
            }
        } else {
            pos = self.step_left(pos);
            let alnum = line[pos.column - 1].is_alphanumeric();
            while pos.column > 0 && line[pos.column - 1].is_alphanumeric() == alnum {
                pos = self.step_left(pos);
            }
        }

        self.move_to(pos, extend);
    }

    // ==================== Paragraph Movement ====================

    /// Moves to the previous paragraph boundary (blank-line separated).
    pub fn move_paragraph_up(&mut self, extend: bool) {
        let y = self.cursor.position.line;
        if y == 0 {
            self.move_to(Position::ZERO, extend);
            return;
        }

        let mut offset = 1;
        while self.is_blank(y - offset) && y > offset {
            offset += 1;
        }
        if offset < 2 {
            while y > offset && !self.is_blank(y - offset - 1) {
                offset += 1;
            }
        }

        self.move_to(Position::new(y - offset, 0), extend);
    }

    /// Moves to the next paragraph boundary (blank-line separated).
    pub fn move_paragraph_down(&mut self, extend: bool) {
        let y = self.cursor.position.line;
        let count = self.len_lines();
        let last = count - 1;
        if y >= last {
            let end = self.lines().end_position();
            self.move_to(end, extend);
            return;
        }

        let mut offset = 0;
        while y + offset < count && !self.is_blank(y + offset) {
            offset += 1;
        }
        let target = if offset > 1 {
            y + offset - 1
        } else {
            while y + offset < last && self.is_blank(y + offset) {
                offset += 1;
            }
            y + offset
        };

        self.move_to(Position::new(target.min(last), 0), extend);
    }

    // ==================== Jumps ====================

    /// Goes to a 1-based line number.
    ///
    /// `0` is the first line, numbers past the end go to the last line and
    /// negative numbers count back from the end.
    pub fn goto_line(&mut self, number: i64) {
        let count = self.len_lines() as i64;
        let line = if number == 0 {
            0
        } else if number > count {
            count - 1
        } else if number < 0 {
            (count + number).max(0)
        } else {
            number - 1
        };
        self.move_to(Position::new(line as usize, 0), false);
    }

    // ==================== Helpers ====================

    fn step_left(&self, pos: Position) -> Position {
        if pos.column > 0 {
            Position::new(pos.line, pos.column - 1)
        } else if pos.line > 0 {
            Position::new(pos.line - 1, self.line_len_or_zero(pos.line - 1))
        } else {
            pos
        }
    }

    fn step_right(&self, pos: Position) -> Position {
        if pos.column < self.line_len_or_zero(pos.line) {
            Position::new(pos.line, pos.column + 1)
        } else if pos.line < self.lines().last_line() {
            Position::new(pos.line + 1, 0)
        } else {
            pos
        }
    }

    fn line_len_or_zero(&self, line: usize) -> usize {
        self.lines().line_len(line).unwrap_or(0)
    }

    fn line_chars(&self, line: usize) -> Vec<char> {
        self.lines()
            .line(line)
            .map(|l| l.chars().collect())
            .unwrap_or_default()
    }

    fn char_at(&self, pos: Position) -> Option<char> {
        self.lines().line(pos.line).ok()?.chars().nth(pos.column)
    }

    fn is_blank(&self, line: usize) -> bool {
        self.line_len_or_zero(line) == 0
    }
}
