//! Translation from crossterm events to editor events.

use crossterm::event::{
    Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers as TermModifiers,
};
use quire_core::{Event, Key, KeyPress, Modifiers};

use crate::render;

/// Converts a terminal event. Events the editor has no use for give `None`.
pub fn translate(event: TermEvent) -> Option<Event> {
    match event {
        TermEvent::Key(key) => translate_key(key).map(Event::Key),
        TermEvent::Paste(text) => Some(Event::Paste(text)),
        TermEvent::Resize(columns, rows) => {
            let (height, width) = render::text_area(columns, rows);
            Some(Event::Resize { width, height })
        }
        TermEvent::FocusGained | TermEvent::FocusLost | TermEvent::Mouse(_) => None,
    }
}

/// Converts a key event, ignoring releases and repeats reported as such.
pub fn translate_key(event: KeyEvent) -> Option<KeyPress> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let mut modifiers = Modifiers {
        ctrl: event.modifiers.contains(TermModifiers::CONTROL),
        alt: event.modifiers.contains(TermModifiers::ALT),
        shift: event.modifiers.contains(TermModifiers::SHIFT),
    };

    let key = match event.code {
        KeyCode::Char(c) => {
            modifiers.shift = false;
            Key::Char(control_char(c, modifiers.ctrl))
        }
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => {
            modifiers.shift = true;
            Key::Tab
        }
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Esc => Key::Escape,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Insert => Key::Insert,
        KeyCode::F(n) => Key::F(n),
        other => {
            tracing::trace!(?other, "ignored key");
            return None;
        }
    };
    Some(KeyPress::new(key, modifiers))
}

/// Control characters without a letter arrive as the digit that shares
/// their code: ^\ as Ctrl+4 and ^_ as Ctrl+7.
fn control_char(c: char, ctrl: bool) -> char {
    if !ctrl {
        return c;
    }
    match c {
        '4' => '\\',
        '7' => '_',
        c => c.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: TermModifiers) -> Option<KeyPress> {
        translate_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_plain_and_shifted_chars() {
        assert_eq!(
            key(KeyCode::Char('a'), TermModifiers::NONE),
            Some(KeyPress::plain(Key::Char('a')))
        );
        assert_eq!(
            key(KeyCode::Char('A'), TermModifiers::SHIFT),
            Some(KeyPress::plain(Key::Char('A')))
        );
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(
            key(KeyCode::Char('s'), TermModifiers::CONTROL),
            Some(KeyPress::ctrl('s'))
        );
        assert_eq!(
            key(KeyCode::Char('7'), TermModifiers::CONTROL),
            Some(KeyPress::ctrl('_'))
        );
        assert_eq!(
            key(KeyCode::Char('4'), TermModifiers::CONTROL),
            Some(KeyPress::ctrl('\\'))
        );
    }

    #[test]
    fn test_alt_keeps_case() {
        assert_eq!(
            key(KeyCode::Char('U'), TermModifiers::ALT | TermModifiers::SHIFT),
            Some(KeyPress::alt('U'))
        );
    }

    #[test]
    fn test_back_tab() {
        assert_eq!(
            key(KeyCode::BackTab, TermModifiers::SHIFT),
            Some(KeyPress::new(Key::Tab, Modifiers::SHIFT))
        );
        assert_eq!(
            key(KeyCode::Up, TermModifiers::SHIFT),
            Some(KeyPress::new(Key::Up, Modifiers::SHIFT))
        );
    }

    #[test]
    fn test_release_ignored() {
        let mut event = KeyEvent::new(KeyCode::Char('a'), TermModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(translate_key(event), None);
    }

    #[test]
    fn test_resize_uses_text_area() {
        assert_eq!(
            translate(TermEvent::Resize(80, 24)),
            Some(Event::Resize {
                width: 80,
                height: 22
            })
        );
        assert_eq!(
            translate(TermEvent::Paste("hi".into())),
            Some(Event::Paste("hi".into()))
        );
    }
}
