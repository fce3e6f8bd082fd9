//! Grammar lookup by file name.

use std::path::Path;
use std::sync::Arc;

use crate::grammar::Grammar;
use crate::tokenizer::{PlainText, Tokenizer};

/// The set of grammars available to the editor.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: Vec<Arc<Grammar>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` grammar in `dir`.
    ///
    /// A missing directory gives an empty registry. Files that fail to load
    /// are logged and skipped.
    pub fn load_dir(dir: &Path) -> Self {
        let mut registry = Self::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), "no grammars loaded: {e}");
                return registry;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match Grammar::load(&path) {
                Ok(grammar) => {
                    tracing::debug!(scope = grammar.scope_name(), "loaded grammar");
                    registry.add(grammar);
                }
                Err(e) => tracing::warn!(path = %path.display(), "skipping grammar: {e}"),
            }
        }
        tracing::info!(count = registry.len(), dir = %dir.display(), "grammars loaded");
        registry
    }

    pub fn add(&mut self, grammar: Grammar) {
        self.grammars.push(Arc::new(grammar));
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Finds a grammar by its root scope.
    pub fn by_scope(&self, scope: &str) -> Option<Arc<dyn Tokenizer>> {
        self.grammars
            .iter()
            .find(|g| g.scope_name() == scope)
            .map(|g| g.clone() as Arc<dyn Tokenizer>)
    }

    /// Picks a tokenizer for a file: by extension (or whole file name)
    /// first, then by the first line, else plain text.
    pub fn for_file(&self, path: Option<&Path>, first_line: &str) -> Arc<dyn Tokenizer> {
        let file_name = path
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let extension = path
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let by_name = self.grammars.iter().find(|g| {
            g.file_types()
                .iter()
                .any(|t| (!extension.is_empty() && t == extension) || t == file_name)
        });
        let chosen = by_name.or_else(|| self.grammars.iter().find(|g| g.matches_first_line(first_line)));

        match chosen {
            Some(grammar) => grammar.clone() as Arc<dyn Tokenizer>,
            None => Arc::new(PlainText),
        }
    }
}
