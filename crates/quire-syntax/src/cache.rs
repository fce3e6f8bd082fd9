//! Per-line highlight state.
//!
//! The cache keeps, for every line, the [`RuleStack`] the tokenizer starts
//! that line with and the tokens it produced. Edits arrive as
//! [`LineSplice`]s; spliced lines lose their tokens and are redone on the
//! next refresh, propagating forward only until the output stack matches
//! what was cached before.

use std::sync::Arc;

use quire_buffer::{LineSplice, LineStore};

use crate::tokenizer::{PlainText, RuleStack, Token, Tokenizer};

pub struct HighlightCache {
    tokenizer: Arc<dyn Tokenizer>,
    /// Input stack of each line
    states: Vec<Option<RuleStack>>,
    /// Tokens of each line; `None` means the line must be redone
    tokens: Vec<Option<Vec<Token>>>,
}

impl std::fmt::Debug for HighlightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightCache")
            .field("scope", &self.tokenizer.scope_name())
            .field("lines", &self.tokens.len())
            .field("dirty", &self.dirty_lines())
            .finish()
    }
}

impl HighlightCache {
    /// Creates a cache for `line_count` lines, all of them dirty.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, line_count: usize) -> Self {
        let mut cache = Self {
            tokenizer,
            states: Vec::new(),
            tokens: Vec::new(),
        };
        cache.invalidate_all(line_count);
        cache
    }

    /// A cache that never highlights anything.
    pub fn plain(line_count: usize) -> Self {
        Self::new(Arc::new(PlainText), line_count)
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Swaps the tokenizer and forgets everything.
    pub fn set_tokenizer(&mut self, tokenizer: Arc<dyn Tokenizer>) {
        self.tokenizer = tokenizer;
        let line_count = self.tokens.len();
        self.invalidate_all(line_count);
    }

    fn invalidate_all(&mut self, line_count: usize) {
        let line_count = line_count.max(1);
        self.states = vec![None; line_count];
        self.tokens = vec![None; line_count];
        self.states[0] = Some(self.tokenizer.initial_state());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of lines waiting to be retokenized.
    pub fn dirty_lines(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_none()).count()
    }

    /// Tokens of a line, if it is up to date.
    pub fn tokens(&self, line: usize) -> Option<&[Token]> {
        self.tokens.get(line)?.as_deref()
    }

    /// Stack the tokenizer starts `line` with, if known.
    pub fn state(&self, line: usize) -> Option<&RuleStack> {
        self.states.get(line)?.as_ref()
    }

    // ==================== Invalidation ====================

    /// Records that lines `first..first + removed` were replaced by
    /// `inserted` new lines.
    pub fn splice(&mut self, splice: LineSplice) {
        let first = splice.first.min(self.tokens.len());
        let removed = splice.removed.min(self.tokens.len() - first);
        let input = self.states.get(first).cloned().flatten();

        self.tokens
            .splice(first..first + removed, std::iter::repeat_n(None, splice.inserted));
        self.states
            .splice(first..first + removed, std::iter::repeat_n(None, splice.inserted));

        if let Some(slot) = self.states.get_mut(first) {
            *slot = input;
        }
        if self.tokens.is_empty() {
            self.invalidate_all(1);
        }
    }

    // ==================== Tokenizing ====================

    /// Brings every line up to date.
    pub fn refresh(&mut self, lines: &LineStore) {
        self.refresh_until(lines, usize::MAX);
    }

    /// Brings lines up to `last` (inclusive) up to date. Later lines may
    /// stay dirty.
    pub fn refresh_until(&mut self, lines: &LineStore, last: usize) {
        let count = lines.len_lines();
        if self.tokens.len() != count {
            tracing::debug!(cached = self.tokens.len(), count, "highlight cache out of sync");
            self.invalidate_all(count);
        }
        let last = last.min(count - 1);

        let Some(mut i) = self.next_dirty(0) else {
            return;
        };
        while i <= last {
            let input = match self.states[i].clone() {
                Some(state) => state,
                None => {
                    // Resume from the nearest line with a known input.
                    i = self.states[..i].iter().rposition(Option::is_some).unwrap_or(0);
                    self.states[i]
                        .clone()
                        .unwrap_or_else(|| self.tokenizer.initial_state())
                }
            };

            let text = lines.line(i).unwrap_or_default();
            let (tokens, output) = self.tokenizer.tokenize_line(&text, &input);
            self.states[i] = Some(input);
            self.tokens[i] = Some(tokens);

            let next = i + 1;
            if next == count {
                break;
            }
            let converged =
                self.tokens[next].is_some() && self.states[next].as_ref() == Some(&output);
            if converged {
                match self.next_dirty(next) {
                    Some(dirty) => i = dirty,
                    None => break,
                }
            } else {
                self.states[next] = Some(output);
                if next > last {
                    // Stopped early: pick up here next time.
                    self.tokens[next] = None;
                }
                i = next;
            }
        }
    }

    /// Drops all cached state and tokenizes the whole text from scratch.
    pub fn rebuild(&mut self, lines: &LineStore) {
        self.invalidate_all(lines.len_lines());
        self.refresh(lines);
    }

    fn next_dirty(&self, from: usize) -> Option<usize> {
        self.tokens[from..]
            .iter()
            .position(Option::is_none)
            .map(|offset| from + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grammar;
    use proptest::prelude::*;
    use quire_buffer::{Position, TextBuffer};

    const GRAMMAR: &str = r#"{
        "scopeName": "source.test",
        "patterns": [
            {"begin": "/\\*", "end": "\\*/", "name": "comment.block"},
            {"match": "\\bfn\\b", "name": "keyword"}
        ]
    }"#;

    fn grammar() -> Arc<dyn Tokenizer> {
        Arc::new(Grammar::from_json(GRAMMAR).unwrap())
    }

    fn snapshot(cache: &HighlightCache) -> Vec<Option<Vec<Token>>> {
        (0..cache.len()).map(|i| cache.tokens(i).map(<[Token]>::to_vec)).collect()
    }

    fn apply(cache: &mut HighlightCache, buffer: &mut TextBuffer) {
        for splice in buffer.take_splices() {
            cache.splice(splice);
        }
        cache.refresh(buffer.lines());
    }

    #[test]
    fn test_plain_cache() {
        let lines = LineStore::from_text("ab\n\ncd");
        let mut cache = HighlightCache::plain(lines.len_lines());
        cache.refresh(&lines);
        assert_eq!(cache.tokens(0), Some(&[Token::new(0, 2, vec![])][..]));
        assert_eq!(cache.tokens(1), Some(&[][..]));
        assert_eq!(cache.dirty_lines(), 0);
    }

    #[test]
    fn test_opening_comment_propagates() {
        let mut buffer = TextBuffer::from("a\nfn b\nc");
        let mut cache = HighlightCache::new(grammar(), buffer.len_lines());
        cache.refresh(buffer.lines());
        assert_eq!(cache.tokens(1).unwrap()[0].scopes, vec!["source.test", "keyword"]);

        buffer.insert(Position::new(0, 0), "/* ").unwrap();
        apply(&mut cache, &mut buffer);
        for line in 0..3 {
            let tokens = cache.tokens(line).unwrap();
            assert!(tokens.iter().all(|t| t.scopes.contains(&"comment.block".to_string())));
        }

        buffer.insert(Position::new(0, 4), " */").unwrap();
        apply(&mut cache, &mut buffer);
        assert_eq!(cache.tokens(1).unwrap()[0].scopes, vec!["source.test", "keyword"]);
        assert_eq!(cache.state(2), Some(&RuleStack::default()));
    }

    #[test]
    fn test_refresh_until_leaves_rest_dirty() {
        let lines = LineStore::from_text("a\nb\nc\nd");
        let mut cache = HighlightCache::new(grammar(), lines.len_lines());
        cache.refresh_until(&lines, 1);
        assert!(cache.tokens(1).is_some());
        assert!(cache.tokens(2).is_none());

        cache.refresh(&lines);
        assert_eq!(cache.dirty_lines(), 0);
    }

    #[test]
    fn test_resized_store_resets() {
        let mut cache = HighlightCache::new(grammar(), 2);
        let lines = LineStore::from_text("x\ny\nz");
        cache.refresh(&lines);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.dirty_lines(), 0);
    }

    fn edit_strategy() -> impl Strategy<Value = (bool, usize, usize, String)> {
        (
            any::<bool>(),
            0usize..8,
            0usize..12,
            prop::sample::select(vec!["/*", "*/", "fn ", "\n", "x", "*/\n/*", "\nfn\n"])
                .prop_map(str::to_string),
        )
    }

    proptest! {
        #[test]
        fn test_incremental_matches_rebuild(edits in prop::collection::vec(edit_strategy(), 1..20)) {
            let mut buffer = TextBuffer::from("fn a\n/* b\nc */ fn\nd");
            let mut cache = HighlightCache::new(grammar(), buffer.len_lines());
            cache.refresh(buffer.lines());

            for (delete, line, column, text) in edits {
                let line = line.min(buffer.len_lines() - 1);
                let column = column.min(buffer.line_len(line).unwrap());
                let pos = Position::new(line, column);
                if delete {
                    let end = if line + 1 < buffer.len_lines() {
                        Position::new(line + 1, 0)
                    } else {
                        buffer.lines().end_position()
                    };
                    buffer.delete(pos, end).unwrap();
                } else {
                    buffer.insert(pos, &text).unwrap();
                }
                apply(&mut cache, &mut buffer);

                let mut fresh = HighlightCache::new(grammar(), buffer.len_lines());
                fresh.rebuild(buffer.lines());
                prop_assert_eq!(snapshot(&cache), snapshot(&fresh));
            }
        }
    }
}
