//! Keyboard mapping.
//!
//! ## Learning: Lookup Tables over Branching
//!
//! Key handling is two `HashMap`s: one from key presses to [`Command`]s
//! for normal editing, one from key presses to [`PromptAction`]s for the
//! prompt line. Defaults are data, so a config file can override any of
//! them without touching the dispatch code.

use std::collections::HashMap;

use crate::command::{Command, Motion};
use crate::config::Config;
use crate::prompt::PromptEdit;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    /// No modifiers pressed.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
    };

    /// Ctrl modifier.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
    };

    /// Shift modifier.
    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: true,
    };

    /// Alt modifier.
    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        alt: true,
        shift: false,
    };

    /// Ctrl+Shift.
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: true,
    };

    /// Returns true if no modifiers are pressed.
    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift
    }

    /// Parses one modifier name, adding it to `self`.
    fn add(&mut self, name: &str) -> bool {
        match name.to_lowercase().as_str() {
            "ctrl" | "control" | "c" => self.ctrl = true,
            "alt" | "meta" | "option" | "m" => self.alt = true,
            "shift" | "s" => self.shift = true,
            _ => return false,
        }
        true
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8), // F1-F12
}

impl Key {
    /// Parses a key from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        let key = match lower.as_str() {
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "backspace" | "bs" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "escape" | "esc" => Key::Escape,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            "insert" | "ins" => Key::Insert,
            "space" => Key::Char(' '),
            _ if lower.starts_with('f') && (2..=3).contains(&lower.len()) => {
                return lower[1..].parse().ok().map(Key::F);
            }
            _ => {
                let mut chars = s.chars();
                let c = chars.next()?;
                return chars.next().is_none().then_some(Key::Char(c));
            }
        };
        Some(key)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "Space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Escape => write!(f, "Escape"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
            Key::PageUp => write!(f, "PageUp"),
            Key::PageDown => write!(f, "PageDown"),
            Key::Insert => write!(f, "Insert"),
            Key::F(n) => write!(f, "F{n}"),
        }
    }
}

/// A key press event.
///
/// Character keys never carry `shift`: the character itself is already
/// upper or lower case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    /// Creates a new key press.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A key with no modifiers.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// `Ctrl` + a character.
    pub fn ctrl(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::CTRL)
    }

    /// `Alt` + a character.
    pub fn alt(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::ALT)
    }

    /// Parses a key binding string like `"ctrl+s"` or `"shift+up"`.
    pub fn parse(s: &str) -> Option<Self> {
        // A trailing "+" is the plus key itself.
        let (mods, key) = match s.strip_suffix("++") {
            Some(mods) => (mods, "+"),
            None => match s.rsplit_once('+') {
                Some((mods, key)) => (mods, key),
                None => ("", s),
            },
        };

        let mut modifiers = Modifiers::NONE;
        for name in mods.split('+').filter(|m| !m.is_empty()) {
            if !modifiers.add(name) {
                return None;
            }
        }
        let mut key = Key::parse(key)?;
        if let Key::Char(c) = key {
            if modifiers.ctrl {
                key = Key::Char(c.to_ascii_lowercase());
            }
            modifiers.shift = false;
        }
        Some(Self { key, modifiers })
    }

    /// The character this key types, if it types one.
    pub fn typed_char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.ctrl && !self.modifiers.alt => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// What a key does while a prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptAction {
    Edit(PromptEdit),
    Submit,
    Cancel,
    ReverseSearch,
}

/// Keyboard mapping configuration.
#[derive(Debug, Clone)]
pub struct Keymap {
    normal: HashMap<KeyPress, Command>,
    prompt: HashMap<KeyPress, PromptAction>,
}

impl Keymap {
    /// Creates a keymap with the default bindings.
    pub fn new() -> Self {
        let mut keymap = Self {
            normal: HashMap::new(),
            prompt: HashMap::new(),
        };
        keymap.add_default_bindings();
        keymap
    }

    /// Creates the default keymap with the config's bindings on top.
    pub fn from_config(config: &Config) -> Self {
        let mut keymap = Self::new();

        for (key_str, cmd_str) in &config.keyboard.bindings {
            let Some(key) = KeyPress::parse(key_str) else {
                tracing::warn!("ignoring binding for unknown key {key_str:?}");
                continue;
            };
            match cmd_str.parse::<Command>() {
                Ok(command) => {
                    tracing::debug!(%key, %command, "user binding");
                    keymap.bind(key, command);
                }
                Err(e) => tracing::warn!("ignoring binding for {key_str:?}: {e}"),
            }
        }
        keymap
    }

    /// Adds default key bindings.
    fn add_default_bindings(&mut self) {
        use Command::*;
        use Motion::*;

        let movement = [
            (Key::Left, Left),
            (Key::Right, Right),
            (Key::Up, Up),
            (Key::Down, Down),
            (Key::Home, Home),
            (Key::End, End),
            (Key::PageUp, PageUp),
            (Key::PageDown, PageDown),
        ];
        for (key, motion) in movement {
            self.bind(KeyPress::plain(key), Command::go(motion));
            self.bind(KeyPress::new(key, Modifiers::SHIFT), Command::select(motion));
        }

        let ctrl_movement = [
            (Key::Home, BufferStart),
            (Key::End, BufferEnd),
            (Key::Left, WordLeft),
            (Key::Right, WordRight),
        ];
        for (key, motion) in ctrl_movement {
            self.bind(KeyPress::new(key, Modifiers::CTRL), Command::go(motion));
            self.bind(KeyPress::new(key, Modifiers::CTRL_SHIFT), Command::select(motion));
        }

        let bindings = [
            (KeyPress::ctrl('a'), Command::go(Home)),
            (KeyPress::ctrl('e'), Command::go(End)),
            (KeyPress::ctrl('y'), Command::go(PageUp)),
            (KeyPress::ctrl('v'), Command::go(PageDown)),
            (KeyPress::new(Key::Up, Modifiers::ALT), Command::go(ParagraphUp)),
            (KeyPress::new(Key::Down, Modifiers::ALT), Command::go(ParagraphDown)),
            (KeyPress::new(Key::Up, Modifiers::CTRL), ScrollUp),
            (KeyPress::new(Key::Down, Modifiers::CTRL), ScrollDown),
            // Editing
            (KeyPress::plain(Key::Enter), Newline),
            (KeyPress::plain(Key::Tab), Tab),
            (KeyPress::new(Key::Tab, Modifiers::SHIFT), Dedent),
            (KeyPress::plain(Key::Backspace), Backspace),
            (KeyPress::plain(Key::Delete), Delete),
            (KeyPress::ctrl('k'), Cut),
            (KeyPress::ctrl('u'), Uncut),
            (KeyPress::alt('u'), Undo),
            (KeyPress::alt('U'), Redo),
            (KeyPress::alt('e'), Redo),
            // Prompts
            (KeyPress::ctrl('w'), Search),
            (KeyPress::ctrl('\\'), Replace),
            (KeyPress::ctrl('_'), GotoLine),
            (KeyPress::plain(Key::Escape), CommandPrompt),
            (KeyPress::ctrl('p'), Open),
            (KeyPress::ctrl('o'), SaveAs),
            // Files and buffers
            (KeyPress::ctrl('s'), Save),
            (KeyPress::ctrl('x'), Close),
            (KeyPress::ctrl('c'), Position),
            (KeyPress::new(Key::Left, Modifiers::ALT), PrevBuffer),
            (KeyPress::new(Key::Right, Modifiers::ALT), NextBuffer),
            (KeyPress::ctrl('z'), Suspend),
        ];
        for (key, command) in bindings {
            self.bind(key, command);
        }

        let prompt = [
            (KeyPress::plain(Key::Left), PromptAction::Edit(PromptEdit::Left)),
            (KeyPress::plain(Key::Right), PromptAction::Edit(PromptEdit::Right)),
            (KeyPress::plain(Key::Home), PromptAction::Edit(PromptEdit::Home)),
            (KeyPress::plain(Key::End), PromptAction::Edit(PromptEdit::End)),
            (KeyPress::ctrl('a'), PromptAction::Edit(PromptEdit::Home)),
            (KeyPress::ctrl('e'), PromptAction::Edit(PromptEdit::End)),
            (
                KeyPress::new(Key::Left, Modifiers::CTRL),
                PromptAction::Edit(PromptEdit::WordLeft),
            ),
            (
                KeyPress::new(Key::Right, Modifiers::CTRL),
                PromptAction::Edit(PromptEdit::WordRight),
            ),
            (KeyPress::plain(Key::Backspace), PromptAction::Edit(PromptEdit::Backspace)),
            (KeyPress::plain(Key::Delete), PromptAction::Edit(PromptEdit::Delete)),
            (KeyPress::ctrl('k'), PromptAction::Edit(PromptEdit::CutToEnd)),
            (KeyPress::plain(Key::Up), PromptAction::Edit(PromptEdit::HistoryPrev)),
            (KeyPress::plain(Key::Down), PromptAction::Edit(PromptEdit::HistoryNext)),
            (KeyPress::ctrl('r'), PromptAction::ReverseSearch),
            (KeyPress::plain(Key::Enter), PromptAction::Submit),
            (KeyPress::ctrl('c'), PromptAction::Cancel),
            (KeyPress::plain(Key::Escape), PromptAction::Cancel),
        ];
        self.prompt.extend(prompt);
    }

    /// Binds a key in normal mode, replacing any previous binding.
    pub fn bind(&mut self, key: KeyPress, command: Command) {
        self.normal.insert(key, command);
    }

    /// Command bound to a key in normal mode.
    pub fn command(&self, key: &KeyPress) -> Option<Command> {
        self.normal.get(key).copied()
    }

    /// Action bound to a key while a prompt is open.
    pub fn prompt_action(&self, key: &KeyPress) -> Option<PromptAction> {
        self.prompt.get(key).copied()
    }

    /// Number of normal mode bindings.
    pub fn len(&self) -> usize {
        self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normal.is_empty()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}
