//! Pattern search and replace over a buffer.
//!
//! Matches never span lines. A [`Search`] compiles its pattern once and
//! caches the match list per buffer revision, so repeated `find_next`
//! calls on unchanged text do no rescanning.

use regex::{Regex, RegexBuilder};

use quire_buffer::{BufferResult, Position, TextBuffer};

use crate::{CoreError, CoreResult};

/// How a pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Regular expression (true) or literal text (false)
    pub regex: bool,
    pub case_sensitive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            regex: true,
            case_sensitive: true,
        }
    }
}

/// A match on a single line; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: Position,
    pub end: Position,
}

impl Match {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of `find_next` / `find_previous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub found: Match,
    /// The scan went past one end of the buffer
    pub wrapped: bool,
    /// The match is the one the search started on, and there is no other
    pub only: bool,
}

impl Hit {
    /// Status line text for this hit, if any.
    pub fn status(&self) -> Option<&'static str> {
        if self.only {
            Some("this is the only occurrence")
        } else if self.wrapped {
            Some("search wrapped")
        } else {
            None
        }
    }
}

/// A compiled search pattern.
#[derive(Debug, Clone)]
pub struct Search {
    pattern: String,
    options: SearchOptions,
    regex: Regex,
    /// Matches of the whole buffer at a given revision
    cache: Option<(u64, Vec<Match>)>,
}

impl Search {
    /// Compiles `pattern`.
    pub fn new(pattern: &str, options: SearchOptions) -> CoreResult<Self> {
        let source = if options.regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|_| CoreError::InvalidRegex(pattern.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            options,
            regex,
            cache: None,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Every match in the buffer, in order.
    pub fn matches(&mut self, buffer: &TextBuffer) -> &[Match] {
        let revision = buffer.revision();
        let stale = !matches!(&self.cache, Some((r, _)) if *r == revision);
        if stale {
            let found = self.scan(buffer);
            self.cache = Some((revision, found));
        }
        match &self.cache {
            Some((_, found)) => found,
            None => &[],
        }
    }

    fn scan(&self, buffer: &TextBuffer) -> Vec<Match> {
        let mut found = Vec::new();
        for (line, text) in buffer.lines().lines().enumerate() {
            for m in self.regex.find_iter(&text) {
                found.push(Match {
                    start: Position::new(line, char_column(&text, m.start())),
                    end: Position::new(line, char_column(&text, m.end())),
                });
            }
        }
        found
    }

    // ==================== Navigation ====================

    /// The first match starting after `from`, wrapping to the top.
    pub fn find_next(&mut self, buffer: &TextBuffer, from: Position) -> Option<Hit> {
        let found = self.matches(buffer);
        let (index, wrapped) = match found.iter().position(|m| m.start > from) {
            Some(i) => (i, false),
            None => (0, true),
        };
        Self::hit(found, index, wrapped, from)
    }

    /// The last match starting before `from`, wrapping to the bottom.
    pub fn find_previous(&mut self, buffer: &TextBuffer, from: Position) -> Option<Hit> {
        let found = self.matches(buffer);
        let (index, wrapped) = match found.iter().rposition(|m| m.start < from) {
            Some(i) => (i, false),
            None => (found.len().checked_sub(1)?, true),
        };
        Self::hit(found, index, wrapped, from)
    }

    fn hit(found: &[Match], index: usize, wrapped: bool, from: Position) -> Option<Hit> {
        let m = *found.get(index)?;
        let only = found.len() == 1 && m.start == from;
        Some(Hit {
            found: m,
            wrapped: wrapped && !only,
            only,
        })
    }

    /// The first match starting at or after `from`, without wrapping.
    pub fn match_from(&self, buffer: &TextBuffer, from: Position) -> Option<Match> {
        for (line, text) in buffer.lines().lines().enumerate().skip(from.line) {
            let offset = if line == from.line {
                match byte_offset(&text, from.column) {
                    Some(offset) => offset,
                    None => continue,
                }
            } else {
                0
            };
            if let Some(m) = self.regex.find_at(&text, offset) {
                return Some(Match {
                    start: Position::new(line, char_column(&text, m.start())),
                    end: Position::new(line, char_column(&text, m.end())),
                });
            }
        }
        None
    }

    // ==================== Replacing ====================

    /// Text that replaces `m`, with `$1` / `${name}` expanded in regex mode.
    pub fn expand(&self, buffer: &TextBuffer, m: Match, replacement: &str) -> String {
        if !self.options.regex {
            return replacement.to_string();
        }
        let Ok(text) = buffer.line(m.start.line) else {
            return replacement.to_string();
        };
        let captures = byte_offset(&text, m.start.column)
            .and_then(|offset| self.regex.captures_at(&text, offset));
        match captures {
            Some(captures) => {
                let mut out = String::new();
                captures.expand(replacement, &mut out);
                out
            }
            None => replacement.to_string(),
        }
    }

    /// Replaces every match as one undo step. Returns the count.
    pub fn replace_all(self, buffer: &mut TextBuffer, replacement: &str) -> BufferResult<usize> {
        let mut session = ReplaceSession::start(self, replacement, buffer, Position::ZERO);
        let result = session.replace_rest(buffer);
        let count = session.finish(buffer);
        result.map(|_| count)
    }
}

/// Byte offset of char column `column`, if the line is that long.
fn byte_offset(text: &str, column: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(column)
}

fn char_column(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// An interactive replace in progress.
///
/// Starts at a position, runs to the end of the buffer, wraps once and stops
/// where it began. All replacements form one undo group, closed by
/// [`ReplaceSession::finish`].
#[derive(Debug)]
pub struct ReplaceSession {
    search: Search,
    replacement: String,
    /// Where the next scan starts
    next: Position,
    /// Where the wrapped scan must stop
    stop: Position,
    wrapped: bool,
    current: Option<Match>,
    count: usize,
}

impl ReplaceSession {
    pub const LABEL: &'static str = "replace";

    /// Opens the undo group and finds the first match at or after `from`.
    pub fn start(
        search: Search,
        replacement: &str,
        buffer: &mut TextBuffer,
        from: Position,
    ) -> Self {
        buffer.begin_group(Self::LABEL);
        let mut session = Self {
            search,
            replacement: replacement.to_string(),
            next: from,
            stop: from,
            wrapped: false,
            current: None,
            count: 0,
        };
        session.seek(buffer);
        session
    }

    /// The match awaiting an answer.
    pub fn current(&self) -> Option<Match> {
        self.current
    }

    pub fn is_done(&self) -> bool {
        self.current.is_none()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Replaces the current match and moves on.
    pub fn answer_yes(&mut self, buffer: &mut TextBuffer) -> BufferResult<()> {
        let Some(m) = self.current else {
            return Ok(());
        };
        let text = self.search.expand(buffer, m, &self.replacement);
        let end = buffer.replace(m.start, m.end, &text, Self::LABEL)?;
        if self.wrapped {
            self.stop = self
                .stop
                .shifted_by_delete(m.start, m.end)
                .shifted_by_insert(m.start, end);
        }
        self.count += 1;
        self.advance(buffer, m.is_empty(), end);
        Ok(())
    }

    /// Skips the current match.
    pub fn answer_no(&mut self, buffer: &TextBuffer) {
        if let Some(m) = self.current {
            self.advance(buffer, m.is_empty(), m.end);
        }
    }

    /// Replaces the current match and every one after it.
    pub fn replace_rest(&mut self, buffer: &mut TextBuffer) -> BufferResult<()> {
        while !self.is_done() {
            self.answer_yes(buffer)?;
        }
        Ok(())
    }

    /// Closes the undo group. Returns the number of replacements.
    pub fn finish(self, buffer: &mut TextBuffer) -> usize {
        buffer.end_group();
        buffer.seal();
        self.count
    }

    /// Status text for a finished session.
    pub fn summary(count: usize) -> String {
        format!(
            "replaced {count} occurrence{}",
            if count == 1 { "" } else { "s" }
        )
    }

    fn advance(&mut self, buffer: &TextBuffer, empty: bool, end: Position) {
        self.next = end;
        if empty {
            // Step past an empty match so the scan makes progress.
            match step_right(buffer, end) {
                Some(pos) => self.next = pos,
                None if self.wrapped => {
                    self.current = None;
                    return;
                }
                None => {
                    self.wrapped = true;
                    self.next = Position::ZERO;
                }
            }
        }
        self.seek(buffer);
    }

    fn seek(&mut self, buffer: &TextBuffer) {
        if !self.wrapped {
            if let Some(m) = self.search.match_from(buffer, self.next) {
                self.current = Some(m);
                return;
            }
            self.wrapped = true;
            self.next = Position::ZERO;
        }
        let stop = self.stop;
        self.current = self
            .search
            .match_from(buffer, self.next)
            .filter(|m| m.start < stop);
    }
}

fn step_right(buffer: &TextBuffer, pos: Position) -> Option<Position> {
    let len = buffer.line_len(pos.line).ok()?;
    if pos.column < len {
        Some(Position::new(pos.line, pos.column + 1))
    } else if pos.line + 1 < buffer.len_lines() {
        Some(Position::new(pos.line + 1, 0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(pattern: &str) -> Search {
        Search::new(pattern, SearchOptions::default()).unwrap()
    }

    #[test]
    fn test_find_next_and_wrap() {
        let buffer = TextBuffer::from("foo bar\nbar foo\nfoo");
        let mut s = search("foo");
        let hit = s.find_next(&buffer, Position::new(0, 0)).unwrap();
        assert_eq!(hit.found.start, Position::new(1, 4));
        assert!(!hit.wrapped);

        let hit = s.find_next(&buffer, Position::new(2, 0)).unwrap();
        assert_eq!(hit.found.start, Position::new(0, 0));
        assert!(hit.wrapped);
        assert_eq!(hit.status(), Some("search wrapped"));
    }

    #[test]
    fn test_wraparound_returns_to_start() {
        let buffer = TextBuffer::from("a x a\nx\n\nxx a");
        let mut s = search("x");
        let count = s.matches(&buffer).len();
        assert_eq!(count, 4);

        let start = s.matches(&buffer)[1].start;
        let mut pos = start;
        for _ in 0..count {
            pos = s.find_next(&buffer, pos).unwrap().found.start;
        }
        assert_eq!(pos, start);
    }

    #[test]
    fn test_find_previous() {
        let buffer = TextBuffer::from("ab ab\nab");
        let mut s = search("ab");
        let hit = s.find_previous(&buffer, Position::new(0, 3)).unwrap();
        assert_eq!(hit.found.start, Position::new(0, 0));
        let hit = s.find_previous(&buffer, Position::new(0, 0)).unwrap();
        assert_eq!(hit.found.start, Position::new(1, 0));
        assert!(hit.wrapped);
    }

    #[test]
    fn test_only_occurrence_and_no_match() {
        let buffer = TextBuffer::from("one two");
        let mut s = search("two");
        let hit = s.find_next(&buffer, Position::new(0, 4)).unwrap();
        assert!(hit.only);
        assert_eq!(hit.status(), Some("this is the only occurrence"));

        assert!(search("zzz").find_next(&buffer, Position::ZERO).is_none());
    }

    #[test]
    fn test_literal_and_case_options() {
        let buffer = TextBuffer::from("a.b AXB");
        let literal = SearchOptions {
            regex: false,
            case_sensitive: true,
        };
        let mut s = Search::new("a.b", literal).unwrap();
        assert_eq!(s.matches(&buffer).len(), 1);

        let folded = SearchOptions {
            regex: true,
            case_sensitive: false,
        };
        let mut s = Search::new("a.b", folded).unwrap();
        assert_eq!(s.matches(&buffer).len(), 2);
    }

    #[test]
    fn test_invalid_regex() {
        let err = Search::new("(", SearchOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid regex: '('");
    }

    #[test]
    fn test_char_columns() {
        let buffer = TextBuffer::from("héé x");
        let mut s = search("x");
        assert_eq!(s.matches(&buffer)[0].start, Position::new(0, 4));
    }

    #[test]
    fn test_cache_follows_edits() {
        let mut buffer = TextBuffer::from("x");
        let mut s = search("x");
        assert_eq!(s.matches(&buffer).len(), 1);
        buffer.insert(Position::new(0, 1), "x").unwrap();
        assert_eq!(s.matches(&buffer).len(), 2);
    }

    #[test]
    fn test_replace_all_is_one_undo_step() {
        let mut buffer = TextBuffer::from("aaa");
        let count = search("a").replace_all(&mut buffer, "bb").unwrap();
        assert_eq!(count, 3);
        assert_eq!(buffer.lines_vec(), vec!["bbbbbb"]);

        assert_eq!(buffer.undo().unwrap(), "replace");
        assert_eq!(buffer.lines_vec(), vec!["aaa"]);
        assert!(!buffer.can_undo());
    }

    #[test]
    fn test_replace_expands_groups() {
        let mut buffer = TextBuffer::from("key=value\nx=y");
        search(r"(\w+)=(\w+)")
            .replace_all(&mut buffer, "$2=$1")
            .unwrap();
        assert_eq!(buffer.text(), "value=key\ny=x");

        let mut buffer = TextBuffer::from("ab");
        search(r"(?P<first>a)")
            .replace_all(&mut buffer, "${first}${first}")
            .unwrap();
        assert_eq!(buffer.text(), "aab");
    }

    #[test]
    fn test_literal_replacement_is_not_expanded() {
        let mut buffer = TextBuffer::from("cost");
        let literal = SearchOptions {
            regex: false,
            case_sensitive: true,
        };
        Search::new("cost", literal)
            .unwrap()
            .replace_all(&mut buffer, "$1")
            .unwrap();
        assert_eq!(buffer.text(), "$1");
    }

    #[test]
    fn test_empty_matches_make_progress() {
        let mut buffer = TextBuffer::from("ab");
        let count = search("x*").replace_all(&mut buffer, "-").unwrap();
        assert_eq!(count, 3);
        assert_eq!(buffer.text(), "-a-b-");
    }

    #[test]
    fn test_interactive_session_wraps_and_stops() {
        let mut buffer = TextBuffer::from("a a\na a");
        let mut session = ReplaceSession::start(search("a"), "bb", &mut buffer, Position::new(1, 0));

        assert_eq!(session.current().unwrap().start, Position::new(1, 0));
        session.answer_yes(&mut buffer).unwrap();
        assert_eq!(session.current().unwrap().start, Position::new(1, 3));
        session.answer_no(&buffer);
        assert_eq!(session.current().unwrap().start, Position::new(0, 0));
        session.answer_yes(&mut buffer).unwrap();
        assert_eq!(session.current().unwrap().start, Position::new(0, 3));
        session.answer_yes(&mut buffer).unwrap();
        assert!(session.is_done());

        assert_eq!(session.finish(&mut buffer), 3);
        assert_eq!(buffer.text(), "bb bb\nbb a");
        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "a a\na a");
    }

    #[test]
    fn test_session_without_matches_leaves_no_history() {
        let mut buffer = TextBuffer::from("abc");
        let session = ReplaceSession::start(search("z"), "y", &mut buffer, Position::ZERO);
        assert!(session.is_done());
        assert_eq!(session.finish(&mut buffer), 0);
        assert!(!buffer.can_undo());
        assert!(!buffer.is_modified());
    }

    #[test]
    fn test_summary() {
        assert_eq!(ReplaceSession::summary(1), "replaced 1 occurrence");
        assert_eq!(ReplaceSession::summary(3), "replaced 3 occurrences");
    }
}
