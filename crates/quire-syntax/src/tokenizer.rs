//! The tokenizer interface and the plain-text fallback.

use std::sync::Arc;

/// One frame of tokenizer state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Frame {
    /// Rule that opened this frame
    pub rule: u32,
    /// Expanded `end` / `while` pattern, if the rule has one
    pub end: Option<Arc<str>>,
}

/// Opaque tokenizer state carried from the end of one line to the start
/// of the next.
///
/// Cheap to clone and comparable, so the highlight cache can tell when a
/// retokenized line left the state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleStack(pub(crate) Arc<[Frame]>);

impl RuleStack {
    pub(crate) fn new(frames: Vec<Frame>) -> Self {
        Self(frames.into())
    }

    pub(crate) fn frames(&self) -> &[Frame] {
        &self.0
    }

    /// Number of nested rules, including the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl Default for RuleStack {
    fn default() -> Self {
        Self::new(vec![Frame { rule: 0, end: None }])
    }
}

/// A run of characters on one line sharing the same scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// First column (in chars)
    pub start: usize,
    /// Column just past the token (in chars)
    pub end: usize,
    /// Scopes, outermost first
    pub scopes: Vec<String>,
}

impl Token {
    pub fn new(start: usize, end: usize, scopes: Vec<String>) -> Self {
        Self { start, end, scopes }
    }
}

/// Turns lines into tokens.
///
/// Implementations must be deterministic: the same line and state always
/// produce the same tokens and output state.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Root scope, e.g. `source.python`.
    fn scope_name(&self) -> &str;

    /// State before the first line.
    fn initial_state(&self) -> RuleStack;

    /// Tokenizes one line (without its newline).
    fn tokenize_line(&self, line: &str, state: &RuleStack) -> (Vec<Token>, RuleStack);
}

/// The fallback tokenizer: one unscoped token per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Tokenizer for PlainText {
    fn scope_name(&self) -> &str {
        "text.plain"
    }

    fn initial_state(&self) -> RuleStack {
        RuleStack::default()
    }

    fn tokenize_line(&self, line: &str, state: &RuleStack) -> (Vec<Token>, RuleStack) {
        let len = line.chars().count();
        let tokens = if len == 0 {
            Vec::new()
        } else {
            vec![Token::new(0, len, Vec::new())]
        };
        (tokens, state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_token() {
        let (tokens, state) = PlainText.tokenize_line("héllo", &PlainText.initial_state());
        assert_eq!(tokens, vec![Token::new(0, 5, vec![])]);
        assert_eq!(state, PlainText.initial_state());
    }

    #[test]
    fn test_plain_text_empty_line() {
        let (tokens, _) = PlainText.tokenize_line("", &RuleStack::default());
        assert!(tokens.is_empty());
    }
}
