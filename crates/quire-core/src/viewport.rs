//! The visible window onto a document.

use std::ops::Range;

use quire_buffer::Position;

/// A `height` x `width` window whose top-left corner is at line `top`,
/// column `left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl Viewport {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            top: 0,
            left: 0,
            height: height.max(1),
            width: width.max(1),
        }
    }

    pub fn resize(&mut self, height: usize, width: usize) {
        self.height = height.max(1);
        self.width = width.max(1);
    }

    /// Lines moved by page up / page down.
    pub fn page_size(&self) -> usize {
        self.height.saturating_sub(2).max(1)
    }

    /// Highest valid `top` for a document of `line_count` lines.
    pub fn max_top(&self, line_count: usize) -> usize {
        line_count.saturating_sub(self.height)
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.top..self.bottom()).contains(&line)
    }

    /// Lines currently on screen.
    pub fn visible_lines(&self, line_count: usize) -> Range<usize> {
        self.top.min(line_count)..self.bottom().min(line_count)
    }

    /// The on-screen line closest to `line`.
    pub fn nearest_visible(&self, line: usize) -> usize {
        line.clamp(self.top, self.bottom() - 1)
    }

    /// Scrolls so that `cursor` is on screen.
    pub fn ensure_visible(&mut self, cursor: Position, line_count: usize) {
        if cursor.line < self.top {
            self.top = cursor.line;
        } else if cursor.line >= self.bottom() {
            self.top = cursor.line + 1 - self.height;
        }
        self.top = self.top.min(self.max_top(line_count));

        if cursor.column < self.left {
            self.left = cursor.column;
        } else if cursor.column >= self.left + self.width {
            self.left = cursor.column + 1 - self.width;
        }
    }

    /// Moves `top` by `delta` lines without regard for the cursor.
    pub fn scroll(&mut self, delta: isize, line_count: usize) {
        let top = self.top.saturating_add_signed(delta);
        self.top = top.min(self.max_top(line_count));
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cursor_below_scrolls_down() {
        let mut view = Viewport::new(10, 20);
        view.ensure_visible(Position::new(15, 0), 100);
        assert_eq!(view.top, 6);
        view.ensure_visible(Position::new(3, 0), 100);
        assert_eq!(view.top, 3);
    }

    #[test]
    fn test_short_document_keeps_top_at_zero() {
        let mut view = Viewport::new(10, 20);
        view.top = 4;
        view.ensure_visible(Position::new(4, 0), 5);
        assert_eq!(view.top, 0);
    }

    #[test]
    fn test_horizontal_scroll() {
        let mut view = Viewport::new(10, 20);
        view.ensure_visible(Position::new(0, 25), 1);
        assert_eq!(view.left, 6);
        view.ensure_visible(Position::new(0, 2), 1);
        assert_eq!(view.left, 2);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut view = Viewport::new(10, 20);
        view.scroll(-3, 50);
        assert_eq!(view.top, 0);
        view.scroll(100, 50);
        assert_eq!(view.top, 40);
        view.scroll(5, 8);
        assert_eq!(view.top, 0);
    }

    #[test]
    fn test_page_size() {
        assert_eq!(Viewport::new(10, 1).page_size(), 8);
        assert_eq!(Viewport::new(2, 1).page_size(), 1);
    }

    proptest! {
        #[test]
        fn test_cursor_always_visible(
            steps in prop::collection::vec((0usize..200, 0usize..300, 1usize..60, 1usize..120), 1..40),
            line_count in 1usize..200,
        ) {
            let mut view = Viewport::default();
            for (line, column, height, width) in steps {
                let cursor = Position::new(line.min(line_count - 1), column);
                view.resize(height, width);
                view.ensure_visible(cursor, line_count);
                prop_assert!(view.contains_line(cursor.line));
                prop_assert!(cursor.column >= view.left && cursor.column < view.left + view.width);
                prop_assert!(view.top <= view.max_top(line_count));
            }
        }
    }
}
