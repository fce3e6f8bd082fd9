//! Drawing the editor onto the terminal.
//!
//! The screen is one header row, the text area, and one row for the status
//! message or the open prompt:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          [1/2] main.rs *             │  header
//! │ fn main() {                          │
//! │     println!("hi");                  │  text area
//! │ }                                    │
//! │        [ saved! (3 lines written) ]  │  status / prompt
//! └──────────────────────────────────────┘
//! ```
//!
//! ## Learning: Pure Layout, Thin Output
//!
//! Everything that decides *what* goes on screen ([`line_spans`],
//! [`header`], [`status_line`]) is a pure function of editor state and
//! returns plain data. [`draw`] only turns that data into crossterm
//! commands, so the layout can be tested without a terminal.

use std::io::{self, Write};
use std::ops::Range;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, Attributes, ContentStyle, PrintStyledContent, StyledContent},
    terminal::{BeginSynchronizedUpdate, EndSynchronizedUpdate},
};
use quire_buffer::Selection;
use quire_core::Editor;
use quire_syntax::{Color, Style, Theme, Token};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Rows used by the header and the status line.
const CHROME_ROWS: u16 = 2;

/// Returns the `(height, width)` of the text area for a terminal size.
pub fn text_area(columns: u16, rows: u16) -> (usize, usize) {
    (
        usize::from(rows.saturating_sub(CHROME_ROWS)),
        usize::from(columns),
    )
}

/// A run of cells drawn with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
    pub selected: bool,
}

impl Span {
    fn width(&self) -> usize {
        self.text.width()
    }
}

// ==================== Layout ====================

/// Screen cells for each character of a line: `(char index, text, width)`.
///
/// Tabs expand to the next tab stop and control characters show as `?`.
fn glyphs(line: &str, tab_width: usize) -> impl Iterator<Item = (usize, String, usize)> + '_ {
    let tab_width = tab_width.max(1);
    let mut column = 0;
    line.chars().enumerate().map(move |(i, c)| {
        let (text, width) = match c {
            '\t' => {
                let width = tab_width - column % tab_width;
                (" ".repeat(width), width)
            }
            c if c.is_control() => ("?".to_string(), 1),
            c => (c.to_string(), c.width().unwrap_or(0)),
        };
        column += width;
        (i, text, width)
    })
}

/// Lays out the visible part of a line.
///
/// `left` is the first character shown and `width` the number of cells
/// available. `selected` is the selected character range on this line.
pub fn line_spans(
    line: &str,
    tokens: &[Token],
    theme: &Theme,
    selected: Option<Range<usize>>,
    left: usize,
    width: usize,
    tab_width: usize,
) -> Vec<Span> {
    let styles: Vec<(Range<usize>, Style)> = tokens
        .iter()
        .map(|token| (token.start..token.end, theme.style_for(&token.scopes)))
        .collect();
    let default = theme.default_style();

    let mut spans: Vec<Span> = Vec::new();
    let mut next_style = 0;
    let mut used = 0;
    for (i, text, cells) in glyphs(line, tab_width).skip(left) {
        if used + cells > width {
            break;
        }
        used += cells;

        while styles.get(next_style).is_some_and(|(range, _)| range.end <= i) {
            next_style += 1;
        }
        let style = match styles.get(next_style) {
            Some((range, style)) if range.contains(&i) => *style,
            _ => default,
        };
        let selected = selected.as_ref().is_some_and(|range| range.contains(&i));

        match spans.last_mut() {
            Some(last) if last.style == style && last.selected == selected => {
                last.text.push_str(&text)
            }
            _ => spans.push(Span {
                text,
                style,
                selected,
            }),
        }
    }
    spans
}

/// Screen column of the cursor, counted from the first visible character.
pub fn cursor_cell(line: &str, left: usize, column: usize, tab_width: usize) -> usize {
    glyphs(line, tab_width)
        .take(column)
        .skip(left)
        .map(|(_, _, width)| width)
        .sum()
}

/// The part of `selection` that lies on `line`, as a character range.
pub fn selected_columns(selection: Option<Selection>, line: usize) -> Option<Range<usize>> {
    let selection = selection?;
    let (start, end) = (selection.start(), selection.end());
    if line < start.line || line > end.line {
        return None;
    }
    let from = if line == start.line { start.column } else { 0 };
    let to = if line == end.line { end.column } else { usize::MAX };
    (from < to).then_some(from..to)
}

/// Cuts `text` to `width` cells on grapheme boundaries, padding with spaces.
pub fn fit(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let cells = grapheme.width();
        if used + cells > width {
            break;
        }
        used += cells;
        out.push_str(grapheme);
    }
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

/// Centers `text` in `width` cells.
pub fn center(text: &str, width: usize) -> String {
    let cells = text.width();
    if cells >= width {
        return fit(text, width);
    }
    let pad = (width - cells) / 2;
    fit(&format!("{}{text}", " ".repeat(pad)), width)
}

/// The header row: buffer position in the session, name and modified mark.
pub fn header(editor: &Editor, width: usize) -> String {
    let Some(doc) = editor.active_document() else {
        return fit("", width);
    };
    let session = editor.session();
    let position = if session.len() > 1 {
        format!("[{}/{}] ", session.active_index() + 1, session.len())
    } else {
        String::new()
    };
    let modified = if doc.is_modified() { " *" } else { "" };
    let name = match doc.name() {
        name if name.is_empty() => "<unnamed>".to_string(),
        name => name,
    };
    center(&format!("{position}{name}{modified}"), width)
}

/// The bottom row, and the cursor column when a prompt is open.
pub fn status_line(editor: &Editor, width: usize) -> (String, Option<usize>) {
    if let Some(view) = editor.prompt_view() {
        let prefix = if view.label.is_empty() {
            String::new()
        } else if view.label.ends_with('?') {
            format!("{} ", view.label)
        } else {
            format!("{}: ", view.label)
        };
        let before: String = view.text.chars().take(view.cursor).collect();
        let cursor = (prefix.width() + before.width()).min(width.saturating_sub(1));
        return (fit(&format!("{prefix}{}", view.text), width), Some(cursor));
    }
    match editor.status() {
        Some(message) => (center(&format!("[ {message} ]"), width), None),
        None => (fit("", width), None),
    }
}

// ==================== Output ====================

fn term_color(color: Color) -> crossterm::style::Color {
    crossterm::style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Converts a theme style, optionally drawn in reverse video.
fn content_style(style: Style, reverse: bool) -> ContentStyle {
    let mut attributes = Attributes::default();
    if style.bold {
        attributes.set(Attribute::Bold);
    }
    if style.italic {
        attributes.set(Attribute::Italic);
    }
    if style.underline {
        attributes.set(Attribute::Underlined);
    }
    if reverse {
        attributes.set(Attribute::Reverse);
    }
    let mut content = ContentStyle::new();
    content.foreground_color = style.fg.map(term_color);
    content.background_color = style.bg.map(term_color);
    content.attributes = attributes;
    content
}

fn print<W: Write>(out: &mut W, style: Style, reverse: bool, text: String) -> io::Result<()> {
    queue!(
        out,
        PrintStyledContent(StyledContent::new(content_style(style, reverse), text))
    )
}

/// Draws a full frame.
pub fn draw<W: Write>(out: &mut W, editor: &Editor, columns: u16, rows: u16) -> io::Result<()> {
    let (height, width) = text_area(columns, rows);
    let theme = editor.theme();
    let base = theme.default_style();

    queue!(out, BeginSynchronizedUpdate, Hide, MoveTo(0, 0))?;
    print(out, base, true, header(editor, width))?;

    let mut cursor = None;
    if let Some(doc) = editor.active_document() {
        let buffer = doc.buffer();
        let viewport = doc.viewport();
        let tab_width = buffer.config().tab_width;
        let selection = buffer.selection();

        for row in 0..height {
            queue!(out, MoveTo(0, row as u16 + 1))?;
            let index = viewport.top + row;
            let mut used = 0;
            if index < doc.line_count() {
                let line = buffer.line(index).unwrap_or_default();
                let tokens = doc.highlight().tokens(index).unwrap_or_default();
                let selected = selected_columns(selection, index);
                for span in line_spans(
                    &line,
                    tokens,
                    theme,
                    selected,
                    viewport.left,
                    width,
                    tab_width,
                ) {
                    used += span.width();
                    print(out, span.style, span.selected, span.text)?;
                }
            }
            print(out, base, false, " ".repeat(width.saturating_sub(used)))?;
        }

        let pos = buffer.position();
        if let Ok(line) = buffer.line(pos.line) {
            let column = cursor_cell(&line, viewport.left, pos.column, tab_width);
            let row = pos.line.saturating_sub(viewport.top) + 1;
            cursor = Some((column.min(width.saturating_sub(1)), row));
        }
    }

    let status_row = rows.saturating_sub(1);
    let (status, prompt_cursor) = status_line(editor, width);
    queue!(out, MoveTo(0, status_row))?;
    let reverse = prompt_cursor.is_none() && editor.status().is_some();
    print(out, base, reverse, status)?;

    let cursor = match prompt_cursor {
        Some(column) => Some((column, usize::from(status_row))),
        None => cursor,
    };
    if let Some((column, row)) = cursor {
        queue!(out, MoveTo(column as u16, row as u16), Show)?;
    }
    queue!(out, EndSynchronizedUpdate)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_buffer::Position;
    use quire_core::{Config, Document, EditorContext, Event, Key, KeyPress};

    fn token(start: usize, end: usize, scope: &str) -> Token {
        Token {
            start,
            end,
            scopes: vec![scope.to_string()],
        }
    }

    fn editor_with(text: &str) -> Editor {
        let mut config = Config::default();
        config.history.enabled = false;
        config.syntax.enabled = false;
        let mut editor = Editor::new(EditorContext::with_config(config), 10, 40);
        let doc = Document::from_text(text, editor.context());
        editor.add_document(doc);
        editor
    }

    #[test]
    fn test_text_area() {
        assert_eq!(text_area(80, 24), (22, 80));
        assert_eq!(text_area(80, 1), (0, 80));
    }

    #[test]
    fn test_spans_follow_tokens() {
        let theme = Theme::default();
        let tokens = [token(0, 2, "keyword"), token(2, 4, "keyword")];
        let spans = line_spans("fn x", &tokens, &theme, None, 0, 80, 4);
        let keyword = theme.style_for(&["keyword".to_string()]);
        assert_eq!(spans[0].text, "fn x");
        assert_eq!(spans[0].style, keyword);
    }

    #[test]
    fn test_spans_selection_and_clip() {
        let theme = Theme::default();
        let spans = line_spans("abcdef", &[], &theme, Some(1..3), 0, 4, 4);
        let texts: Vec<(&str, bool)> = spans.iter().map(|s| (s.text.as_str(), s.selected)).collect();
        assert_eq!(texts, vec![("a", false), ("bc", true), ("d", false)]);

        let spans = line_spans("abcdef", &[], &theme, None, 2, 80, 4);
        assert_eq!(spans[0].text, "cdef");
    }

    #[test]
    fn test_tabs_and_wide_chars() {
        let theme = Theme::default();
        let spans = line_spans("a\tb", &[], &theme, None, 0, 80, 4);
        assert_eq!(spans[0].text, "a   b");
        assert_eq!(cursor_cell("a\tb", 0, 2, 4), 4);
        assert_eq!(cursor_cell("日本", 0, 1, 4), 2);

        let spans = line_spans("日本", &[], &theme, None, 0, 3, 4);
        assert_eq!(spans[0].text, "日");
    }

    #[test]
    fn test_selected_columns() {
        let selection = Some(Selection::new(Position::new(0, 2), Position::new(2, 1)));
        assert_eq!(selected_columns(selection, 0), Some(2..usize::MAX));
        assert_eq!(selected_columns(selection, 1), Some(0..usize::MAX));
        assert_eq!(selected_columns(selection, 2), Some(0..1));
        assert_eq!(selected_columns(selection, 3), None);
        assert_eq!(selected_columns(None, 0), None);
    }

    #[test]
    fn test_fit_and_center() {
        assert_eq!(fit("hello", 3), "hel");
        assert_eq!(fit("hi", 4), "hi  ");
        assert_eq!(center("ab", 6), "  ab  ");
    }

    #[test]
    fn test_header_and_status() {
        let mut editor = editor_with("x\n");
        assert_eq!(header(&editor, 13), "  <unnamed>  ");

        editor.handle_event(Event::Key(KeyPress::plain(Key::Char('y'))));
        assert!(header(&editor, 20).trim_end().ends_with('*'));

        editor.handle_event(Event::Key(KeyPress::ctrl('c')));
        let (status, cursor) = status_line(&editor, 40);
        assert!(status.contains("[ line 1, col 2 (of 2 lines) ]"));
        assert_eq!(cursor, None);

        editor.handle_event(Event::Key(KeyPress::ctrl('w')));
        editor.handle_event(Event::Key(KeyPress::plain(Key::Char('q'))));
        let (status, cursor) = status_line(&editor, 40);
        assert!(status.starts_with("search: q"));
        assert_eq!(cursor, Some(9));
    }

    #[test]
    fn test_draw_frame() {
        let editor = editor_with("hello\n");
        let mut out = Vec::new();
        draw(&mut out, &editor, 20, 5).unwrap();
        let frame = String::from_utf8_lossy(&out);
        assert!(frame.contains("hello"));
    }
}
