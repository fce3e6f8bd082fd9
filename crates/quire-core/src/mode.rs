//! The input state machine.
//!
//! ## Learning: State Machines as Functions
//!
//! [`transition`] is a pure function from the current [`Mode`] and an
//! [`Event`] to the next mode and an [`Effect`]. It looks keys up in the
//! [`Keymap`] and never touches editor state, so every transition can be
//! tested without a document or a terminal.

use crate::command::Command;
use crate::keymap::{KeyPress, Keymap, PromptAction};
use crate::prompt::{PromptEdit, PromptKind};

/// Editor input modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Keys edit the document
    #[default]
    Normal,
    /// Keys edit the prompt line
    Prompt(PromptKind),
    /// Reverse history search inside a prompt
    ReverseSearch(PromptKind),
    /// The process is stopped; waiting for [`Event::Resume`]
    Suspended,
}

/// Input delivered to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyPress),
    Paste(String),
    /// The text area is now `height` rows by `width` columns
    Resize { width: usize, height: usize },
    /// The process was continued after a suspend
    Resume,
}

/// What the editor should do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Run(Command),
    Type(char),
    Paste(String),
    Resize { width: usize, height: usize },
    OpenPrompt(PromptKind),
    PromptEdit(PromptEdit),
    PromptType(char),
    PromptPaste(String),
    Submit(PromptKind),
    Cancel(PromptKind),
    /// A key answering a confirmation prompt, lowercased
    Answer(PromptKind, char),
    ReverseStart,
    ReverseType(char),
    ReverseBackspace,
    ReverseNext,
    /// Take the match, then apply the edit to the prompt
    ReverseAccept(PromptEdit),
    ReverseCancel,
    Suspend,
    Resume,
    /// A key with no binding in this mode
    Unbound(KeyPress),
}

/// Computes the next mode and the effect of `event`.
pub fn transition(mode: Mode, event: &Event, keymap: &Keymap) -> (Mode, Effect) {
    if let Event::Resize { width, height } = *event {
        return (mode, Effect::Resize { width, height });
    }

    match mode {
        Mode::Normal => normal(event, keymap),
        Mode::Prompt(kind) if kind.is_confirm() => confirm(kind, event, keymap),
        Mode::Prompt(kind) => prompt(kind, event, keymap),
        Mode::ReverseSearch(kind) => reverse(kind, event, keymap),
        Mode::Suspended => match event {
            Event::Resume => (Mode::Normal, Effect::Resume),
            _ => (Mode::Suspended, Effect::None),
        },
    }
}

fn normal(event: &Event, keymap: &Keymap) -> (Mode, Effect) {
    let key = match event {
        Event::Key(key) => key,
        Event::Paste(text) => return (Mode::Normal, Effect::Paste(text.clone())),
        _ => return (Mode::Normal, Effect::None),
    };

    let Some(command) = keymap.command(key) else {
        return match key.typed_char() {
            Some(c) => (Mode::Normal, Effect::Type(c)),
            None => (Mode::Normal, Effect::Unbound(*key)),
        };
    };

    let opens = match command {
        Command::Search => Some(PromptKind::Search),
        Command::Replace => Some(PromptKind::ReplacePattern),
        Command::GotoLine => Some(PromptKind::GotoLine),
        Command::CommandPrompt => Some(PromptKind::Command),
        Command::Open => Some(PromptKind::Open),
        Command::SaveAs => Some(PromptKind::SaveAs),
        _ => None,
    };
    match (opens, command) {
        (Some(kind), _) => (Mode::Prompt(kind), Effect::OpenPrompt(kind)),
        (None, Command::Suspend) => (Mode::Suspended, Effect::Suspend),
        (None, command) => (Mode::Normal, Effect::Run(command)),
    }
}

fn prompt(kind: PromptKind, event: &Event, keymap: &Keymap) -> (Mode, Effect) {
    let stay = Mode::Prompt(kind);
    let key = match event {
        Event::Key(key) => key,
        Event::Paste(text) => return (stay, Effect::PromptPaste(text.clone())),
        _ => return (stay, Effect::None),
    };

    match keymap.prompt_action(key) {
        Some(PromptAction::Edit(edit)) => (stay, Effect::PromptEdit(edit)),
        Some(PromptAction::Submit) => (Mode::Normal, Effect::Submit(kind)),
        Some(PromptAction::Cancel) => (Mode::Normal, Effect::Cancel(kind)),
        Some(PromptAction::ReverseSearch) if kind.history_name().is_some() => {
            (Mode::ReverseSearch(kind), Effect::ReverseStart)
        }
        Some(PromptAction::ReverseSearch) => (stay, Effect::None),
        None => match key.typed_char() {
            Some(c) => (stay, Effect::PromptType(c)),
            None => (stay, Effect::Unbound(*key)),
        },
    }
}

fn confirm(kind: PromptKind, event: &Event, keymap: &Keymap) -> (Mode, Effect) {
    let stay = Mode::Prompt(kind);
    let Event::Key(key) = event else {
        return (stay, Effect::None);
    };

    if keymap.prompt_action(key) == Some(PromptAction::Cancel) {
        return (Mode::Normal, Effect::Cancel(kind));
    }
    match key.typed_char().map(|c| c.to_ascii_lowercase()) {
        Some(c) if kind.answers().contains(&c) => (Mode::Normal, Effect::Answer(kind, c)),
        _ => (stay, Effect::None),
    }
}

fn reverse(kind: PromptKind, event: &Event, keymap: &Keymap) -> (Mode, Effect) {
    let stay = Mode::ReverseSearch(kind);
    let key = match event {
        Event::Key(key) => key,
        _ => return (stay, Effect::None),
    };

    match keymap.prompt_action(key) {
        Some(PromptAction::ReverseSearch) => (stay, Effect::ReverseNext),
        Some(PromptAction::Edit(PromptEdit::Backspace)) => (stay, Effect::ReverseBackspace),
        Some(PromptAction::Edit(edit)) => (Mode::Prompt(kind), Effect::ReverseAccept(edit)),
        Some(PromptAction::Submit) => (Mode::Normal, Effect::Submit(kind)),
        Some(PromptAction::Cancel) => (Mode::Prompt(kind), Effect::ReverseCancel),
        None => match key.typed_char() {
            Some(c) => (stay, Effect::ReverseType(c)),
            None => (stay, Effect::Unbound(*key)),
        },
    }
}
