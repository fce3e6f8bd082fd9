//! # Quire Syntax
//!
//! Incremental, line-by-line syntax highlighting with TextMate grammars.
//!
//! ## How it fits together
//!
//! - A [`Tokenizer`] turns one line plus the [`RuleStack`] left over from
//!   the previous line into tokens and a new stack.
//! - [`HighlightCache`] remembers the stack at the start of every line, so
//!   after an edit only the lines whose input stack changed are redone.
//! - [`Theme`] maps a token's scope list to a [`Style`].
//! - [`GrammarRegistry`] picks a grammar for a file name.
//!
//! ## Learning: Trait Objects
//!
//! The cache holds an `Arc<dyn Tokenizer>`. The concrete tokenizer (a
//! TextMate grammar or plain text) is chosen at runtime, and `Arc` lets
//! every buffer of the same language share one compiled grammar.

mod cache;
mod grammar;
mod registry;
mod theme;
mod tokenizer;

pub use cache::HighlightCache;
pub use grammar::Grammar;
pub use registry::GrammarRegistry;
pub use theme::{Color, Style, Theme};
pub use tokenizer::{PlainText, RuleStack, Token, Tokenizer};

/// Result type for syntax operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors that can occur while loading grammars and themes.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    #[error("grammar has no scopeName")]
    MissingScope,
}
