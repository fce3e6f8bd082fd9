//! Editor configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! Serde is Rust's standard for serialization/deserialization.
//! The `#[derive(Serialize, Deserialize)]` macro generates
//! code to convert structs to/from JSON, TOML, etc.
//!
//! `#[serde(default)]` uses Default::default() for missing fields,
//! so a config file only needs the settings it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quire_buffer::LineEnding;

/// Main editor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub editor: EditorConfig,

    /// File handling
    pub files: FileConfig,

    /// Key binding overrides
    pub keyboard: KeyboardConfig,

    /// Grammar and theme locations
    pub syntax: SyntaxConfig,

    /// Prompt history persistence
    pub history: HistoryConfig,

    /// Per-language settings, keyed by the last part of the grammar scope
    /// (`python` for `source.python`)
    pub languages: HashMap<String, LanguageConfig>,
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is tried; a missing file gives defaults and a broken one is
    /// logged and ignored.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = match Self::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("using default config: {e}");
                return Ok(Self::default());
            }
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        tracing::info!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// `‹config dir›/quire`
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("quire"))
    }

    /// `‹data dir›/quire`
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("quire"))
    }

    /// Theme file to load.
    pub fn theme_path(&self) -> Option<PathBuf> {
        self.syntax
            .theme
            .clone()
            .or_else(|| Self::config_dir().ok().map(|d| d.join("theme.json")))
    }

    /// Directory holding grammar files.
    pub fn grammar_dir(&self) -> Option<PathBuf> {
        self.syntax
            .grammar_dir
            .clone()
            .or_else(|| Self::data_dir().ok().map(|d| d.join("grammar_v1")))
    }

    /// Directory holding prompt history, if persistence is on.
    pub fn history_dir(&self) -> Option<PathBuf> {
        if !self.history.enabled {
            return None;
        }
        self.history
            .dir
            .clone()
            .or_else(|| Self::data_dir().ok().map(|d| d.join("history")))
    }

    /// Returns config for a specific language.
    pub fn language(&self, lang: &str) -> LanguageConfig {
        self.languages.get(lang).cloned().unwrap_or_default()
    }
}

/// Editing behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tab width in columns
    pub tab_size: usize,

    /// Insert spaces instead of a tab character
    pub expand_tabs: bool,

    /// Undo history limit (groups)
    pub undo_limit: usize,

    /// Search patterns are regular expressions
    pub search_regex: bool,

    /// Search is case sensitive
    pub search_case_sensitive: bool,

    /// Key presses a status message stays visible for
    pub status_ticks: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_size: 4,
            expand_tabs: true,
            undo_limit: 1000,
            search_regex: true,
            search_case_sensitive: true,
            status_ticks: 4,
        }
    }
}

/// How line endings are chosen for a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndingPolicy {
    /// Keep each file's own ending; new buffers use `\n`
    #[default]
    Preserve,
    Lf,
    Crlf,
}

impl LineEndingPolicy {
    /// Ending forced on every buffer, if any.
    pub fn forced(self) -> Option<LineEnding> {
        match self {
            Self::Preserve => None,
            Self::Lf => Some(LineEnding::Lf),
            Self::Crlf => Some(LineEnding::CrLf),
        }
    }

    /// Ending for a buffer that has none of its own.
    pub fn default_ending(self) -> LineEnding {
        self.forced().unwrap_or_default()
    }
}

/// File handling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub line_ending: LineEndingPolicy,
}

/// Keyboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Custom key bindings, e.g. `"ctrl+s" = "save"`
    pub bindings: HashMap<String, String>,
}

/// Where themes and grammars come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    /// Turn highlighting off entirely
    pub enabled: bool,
    /// Theme file, instead of `‹config dir›/quire/theme.json`
    pub theme: Option<PathBuf>,
    /// Grammar directory, instead of `‹data dir›/quire/grammar_v1`
    pub grammar_dir: Option<PathBuf>,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: None,
            grammar_dir: None,
        }
    }
}

/// Prompt history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Directory instead of `‹data dir›/quire/history`
    pub dir: Option<PathBuf>,
    /// Entries kept per prompt kind
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_entries: 1000,
        }
    }
}

/// Language-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Tab size for this language
    pub tab_size: Option<usize>,

    /// Expand tabs for this language
    pub expand_tabs: Option<bool>,

    /// Line comment prefix
    pub comment: Option<String>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
