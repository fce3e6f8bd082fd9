//! Shared, read-mostly editor resources.

use std::path::Path;
use std::sync::Arc;

use quire_syntax::{GrammarRegistry, PlainText, Theme, Tokenizer};

use crate::config::Config;

/// Configuration, theme and grammars, passed explicitly to whatever needs
/// them.
#[derive(Debug, Default)]
pub struct EditorContext {
    pub config: Config,
    pub theme: Theme,
    pub grammars: GrammarRegistry,
}

impl EditorContext {
    /// Loads the theme and grammars named by `config`.
    ///
    /// Nothing here is fatal: a missing or broken theme falls back to the
    /// built-in one and unusable grammars are skipped.
    pub fn load(config: Config) -> Self {
        let theme = load_theme(&config);
        let grammars = if config.syntax.enabled {
            config
                .grammar_dir()
                .map(|dir| GrammarRegistry::load_dir(&dir))
                .unwrap_or_default()
        } else {
            GrammarRegistry::new()
        };
        Self {
            config,
            theme,
            grammars,
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Reads the theme file again.
    pub fn reload_theme(&mut self) {
        self.theme = load_theme(&self.config);
    }

    /// Tokenizer for a file, or plain text when highlighting is off.
    pub fn tokenizer_for(&self, path: Option<&Path>, first_line: &str) -> Arc<dyn Tokenizer> {
        if self.config.syntax.enabled {
            self.grammars.for_file(path, first_line)
        } else {
            Arc::new(PlainText)
        }
    }

    /// Language key of a grammar scope: `python` for `source.python`.
    pub fn language_of(scope: &str) -> &str {
        scope.rsplit('.').next().unwrap_or(scope)
    }
}

fn load_theme(config: &Config) -> Theme {
    let Some(path) = config.theme_path() else {
        return Theme::default();
    };
    if !path.exists() {
        return Theme::default();
    }
    match Theme::load(&path) {
        Ok(theme) => {
            tracing::info!(path = %path.display(), "loaded theme");
            theme
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "using default theme: {e}");
            Theme::default()
        }
    }
}
