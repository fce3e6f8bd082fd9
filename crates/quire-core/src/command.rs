//! Commands bound to keys.
//!
//! ## Learning: The Command Pattern
//!
//! Commands encapsulate actions as values:
//! - Key bindings map keys to commands, not to code
//! - The same command can come from the default table or the config file
//! - The editor executes them in one `match`
//!
//! Every command has a stable name (`"save"`, `"select-word-left"`) so
//! it can be written in the config file.

use std::fmt;
use std::str::FromStr;

/// A cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    BufferStart,
    BufferEnd,
    WordLeft,
    WordRight,
    ParagraphUp,
    ParagraphDown,
    PageUp,
    PageDown,
}

impl Motion {
    const ALL: [(Motion, &'static str); 14] = [
        (Motion::Left, "left"),
        (Motion::Right, "right"),
        (Motion::Up, "up"),
        (Motion::Down, "down"),
        (Motion::Home, "home"),
        (Motion::End, "end"),
        (Motion::BufferStart, "buffer-start"),
        (Motion::BufferEnd, "buffer-end"),
        (Motion::WordLeft, "word-left"),
        (Motion::WordRight, "word-right"),
        (Motion::ParagraphUp, "paragraph-up"),
        (Motion::ParagraphDown, "paragraph-down"),
        (Motion::PageUp, "page-up"),
        (Motion::PageDown, "page-down"),
    ];

    pub fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(m, _)| *m == self)
            .map_or("", |(_, name)| name)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().find(|(_, n)| *n == name).map(|(m, _)| *m)
    }
}

/// Built-in editor commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Cursor movement
    /// Move the cursor; `extend` grows the selection instead of clearing it
    Move { motion: Motion, extend: bool },
    ScrollUp,
    ScrollDown,

    // Edit commands
    Newline,
    Tab,
    Dedent,
    Backspace,
    Delete,
    Cut,
    Uncut,
    Undo,
    Redo,

    // Prompts
    Search,
    Replace,
    GotoLine,
    CommandPrompt,
    Open,
    SaveAs,

    // File and buffer commands
    Save,
    Close,
    NextBuffer,
    PrevBuffer,
    Position,
    Suspend,
}

impl Command {
    const SIMPLE: [(Command, &'static str); 23] = [
        (Command::ScrollUp, "scroll-up"),
        (Command::ScrollDown, "scroll-down"),
        (Command::Newline, "newline"),
        (Command::Tab, "tab"),
        (Command::Dedent, "dedent"),
        (Command::Backspace, "backspace"),
        (Command::Delete, "delete"),
        (Command::Cut, "cut"),
        (Command::Uncut, "uncut"),
        (Command::Undo, "undo"),
        (Command::Redo, "redo"),
        (Command::Search, "search"),
        (Command::Replace, "replace"),
        (Command::GotoLine, "goto-line"),
        (Command::CommandPrompt, "command"),
        (Command::Open, "open"),
        (Command::SaveAs, "save-as"),
        (Command::Save, "save"),
        (Command::Close, "close"),
        (Command::NextBuffer, "next-buffer"),
        (Command::PrevBuffer, "prev-buffer"),
        (Command::Position, "position"),
        (Command::Suspend, "suspend"),
    ];

    /// Shorthand for a movement command.
    pub const fn go(motion: Motion) -> Self {
        Command::Move {
            motion,
            extend: false,
        }
    }

    /// Shorthand for a selecting movement command.
    pub const fn select(motion: Motion) -> Self {
        Command::Move {
            motion,
            extend: true,
        }
    }

    /// Returns true if the command changes the text.
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Command::Newline
                | Command::Tab
                | Command::Dedent
                | Command::Backspace
                | Command::Delete
                | Command::Cut
                | Command::Uncut
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { motion, extend } => {
                if *extend {
                    write!(f, "select-{}", motion.name())
                } else {
                    write!(f, "{}", motion.name())
                }
            }
            other => {
                let name = Self::SIMPLE
                    .iter()
                    .find(|(c, _)| c == other)
                    .map_or("?", |(_, name)| name);
                write!(f, "{name}")
            }
        }
    }
}

/// Error for an unknown command name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if let Some((command, _)) = Self::SIMPLE.iter().find(|(_, n)| *n == name) {
            return Ok(*command);
        }
        let (motion, extend) = match name.strip_prefix("select-") {
            Some(rest) => (rest, true),
            None => (name.as_str(), false),
        };
        Motion::from_name(motion)
            .map(|motion| Command::Move { motion, extend })
            .ok_or(UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Command::Save.to_string(), "save");
        assert_eq!(Command::go(Motion::WordLeft).to_string(), "word-left");
        assert_eq!(
            Command::select(Motion::BufferEnd).to_string(),
            "select-buffer-end"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("save".parse::<Command>(), Ok(Command::Save));
        assert_eq!(" Undo ".parse::<Command>(), Ok(Command::Undo));
        assert_eq!(
            "select-page-down".parse::<Command>(),
            Ok(Command::select(Motion::PageDown))
        );
        assert_eq!("up".parse::<Command>(), Ok(Command::go(Motion::Up)));
        assert_eq!(
            "frobnicate".parse::<Command>(),
            Err(UnknownCommand("frobnicate".into()))
        );
        assert!("select-save".parse::<Command>().is_err());
    }

    #[test]
    fn test_every_name_parses_back() {
        for (command, name) in Command::SIMPLE {
            assert_eq!(name.parse::<Command>(), Ok(command));
        }
        for (motion, _) in Motion::ALL {
            for command in [Command::go(motion), Command::select(motion)] {
                assert_eq!(command.to_string().parse::<Command>(), Ok(command));
            }
        }
    }

    #[test]
    fn test_is_edit() {
        assert!(Command::Cut.is_edit());
        assert!(!Command::Save.is_edit());
        assert!(!Command::go(Motion::Left).is_edit());
    }
}
