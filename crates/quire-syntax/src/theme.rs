//! VS Code style color themes.
//!
//! A theme is a default style plus `tokenColors` rules keyed by scope
//! selectors. Rules are stored in a trie of dotted scope parts so that
//! `string.quoted.double` finds `string.quoted` when there is no exact rule.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::{SyntaxError, SyntaxResult};

const DEFAULT_THEME: &str = include_str!("../resources/default-theme.json");

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = SyntaxError;

    /// Parses `#rrggbb`, `#rgb`, `#rrggbbaa` (alpha ignored), `white` and
    /// `black`.
    fn from_str(s: &str) -> SyntaxResult<Self> {
        let invalid = || SyntaxError::InvalidColor(s.to_string());
        match s {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            _ => {}
        }
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).map(|d| d * 0x11);
                Ok(Self::new(
                    digit(0).map_err(|_| invalid())?,
                    digit(1).map_err(|_| invalid())?,
                    digit(2).map_err(|_| invalid())?,
                ))
            }
            6 | 8 => Ok(Self::new(
                channel(0..2).map_err(|_| invalid())?,
                channel(2..4).map_err(|_| invalid())?,
                channel(4..6).map_err(|_| invalid())?,
            )),
            _ => Err(invalid()),
        }
    }
}

/// A fully resolved text style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// Attributes set by one theme rule; `None` leaves the attribute alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PartialStyle {
    fg: Option<Color>,
    bg: Option<Color>,
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
}

impl PartialStyle {
    fn from_settings(settings: &Settings) -> Self {
        let mut style = Self {
            fg: parse_color("foreground", settings.foreground.as_deref()),
            bg: parse_color("background", settings.background.as_deref()),
            ..Self::default()
        };
        if let Some(font) = settings.font_style.as_deref() {
            style.bold = Some(font.contains("bold"));
            style.italic = Some(font.contains("italic"));
            style.underline = Some(font.contains("underline"));
        }
        style
    }

    /// Layers `other` on top of `self`.
    fn merge(self, other: PartialStyle) -> Self {
        Self {
            fg: other.fg.or(self.fg),
            bg: other.bg.or(self.bg),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
        }
    }

    fn apply(self, style: Style) -> Style {
        Style {
            fg: self.fg.or(style.fg),
            bg: self.bg.or(style.bg),
            bold: self.bold.unwrap_or(style.bold),
            italic: self.italic.unwrap_or(style.italic),
            underline: self.underline.unwrap_or(style.underline),
        }
    }
}

fn parse_color(key: &str, raw: Option<&str>) -> Option<Color> {
    match raw?.parse() {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!("ignoring theme {key}: {e}");
            None
        }
    }
}

// ==================== Theme File ====================

/// The parts of a VS Code theme file that are used.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ThemeFile {
    colors: HashMap<String, String>,
    token_colors: Option<TokenColors>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenColors {
    Rules(Vec<TokenColor>),
    /// A path to a separate file; not followed.
    Path(String),
}

#[derive(Debug, Deserialize)]
struct TokenColor {
    #[serde(default)]
    scope: Option<Selector>,
    settings: Option<Settings>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Selector {
    /// Comma separated list.
    List(String),
    Array(Vec<String>),
}

impl Selector {
    fn scopes(&self) -> Vec<&str> {
        match self {
            Selector::List(s) => s.split(',').map(str::trim).collect(),
            Selector::Array(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Settings {
    foreground: Option<String>,
    background: Option<String>,
    font_style: Option<String>,
}

// ==================== Scope Trie ====================

#[derive(Debug, Default)]
struct TrieNode {
    style: PartialStyle,
    children: HashMap<String, TrieNode>,
}

impl TrieNode {
    fn insert(&mut self, scope: &str, style: PartialStyle) {
        let node = scope
            .split('.')
            .fold(self, |node, part| node.children.entry(part.to_string()).or_default());
        node.style = node.style.merge(style);
    }

    /// Merges the styles along the longest matching prefix of `scope`.
    fn find(&self, scope: &str) -> PartialStyle {
        let mut node = self;
        let mut style = self.style;
        for part in scope.split('.') {
            match node.children.get(part) {
                Some(child) => {
                    node = child;
                    style = style.merge(child.style);
                }
                None => break,
            }
        }
        style
    }
}

/// Maps scope lists to styles.
#[derive(Debug)]
pub struct Theme {
    default: Style,
    rules: TrieNode,
}

impl Theme {
    /// Parses a VS Code style theme.
    pub fn from_json(json: &str) -> SyntaxResult<Self> {
        let file: ThemeFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    /// Loads a theme file.
    pub fn load(path: &Path) -> SyntaxResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SyntaxError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn from_file(file: ThemeFile) -> Self {
        let color = |keys: [&str; 2]| {
            keys.iter()
                .filter_map(|k| file.colors.get(*k))
                .find_map(|s| s.parse::<Color>().ok())
        };
        let mut default = PartialStyle {
            fg: color(["foreground", "editor.foreground"]),
            bg: color(["background", "editor.background"]),
            ..PartialStyle::default()
        };

        let token_colors: &[TokenColor] = match &file.token_colors {
            Some(TokenColors::Rules(rules)) => rules.as_slice(),
            Some(TokenColors::Path(path)) => {
                tracing::warn!("theme tokenColors file {path} is not loaded");
                &[]
            }
            None => &[],
        };

        let mut rules = TrieNode::default();
        for rule in token_colors {
            let Some(settings) = &rule.settings else {
                continue;
            };
            let style = PartialStyle::from_settings(settings);
            let scopes = rule.scope.as_ref().map_or_else(|| vec![""], Selector::scopes);
            for scope in scopes {
                if scope.is_empty() {
                    default = default.merge(style);
                } else if scope.contains(' ') {
                    // Descendant selectors are not supported.
                    continue;
                } else {
                    rules.insert(scope, style);
                }
            }
        }

        Self {
            default: default.apply(Style {
                fg: Some(Color::WHITE),
                bg: Some(Color::BLACK),
                ..Style::default()
            }),
            rules,
        }
    }

    /// Style for text outside any rule.
    pub fn default_style(&self) -> Style {
        self.default
    }

    /// Resolves a token's scopes (outermost first) to a style.
    pub fn style_for(&self, scopes: &[String]) -> Style {
        scopes
            .iter()
            .fold(self.default, |style, scope| self.rules.find(scope).apply(style))
    }
}

impl Default for Theme {
    fn default() -> Self {
        match Self::from_json(DEFAULT_THEME) {
            Ok(theme) => theme,
            Err(e) => {
                tracing::warn!("built-in theme is invalid: {e}");
                Self::from_file(ThemeFile::default())
            }
        }
    }
}
