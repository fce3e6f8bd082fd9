//! End-to-end editing sessions driven through key events.

use std::path::Path;

use quire_core::{Config, Editor, EditorContext, Event, Flow, Key, KeyPress, Mode, PromptKind};

fn load_config(dir: &Path, extra: &str) -> Config {
    let path = dir.join("config.toml");
    let toml = format!(
        "[history]\nenabled = false\n\n[syntax]\nenabled = false\n\n{extra}"
    );
    std::fs::write(&path, toml).unwrap();
    Config::load(Some(path.as_path())).unwrap()
}

fn press(editor: &mut Editor, key: KeyPress) -> Flow {
    editor.handle_event(Event::Key(key))
}

fn type_text(editor: &mut Editor, text: &str) {
    for c in text.chars() {
        press(editor, KeyPress::plain(Key::Char(c)));
    }
}

fn command(editor: &mut Editor, line: &str) -> Flow {
    press(editor, KeyPress::plain(Key::Escape));
    type_text(editor, line);
    press(editor, KeyPress::plain(Key::Enter))
}

fn text(editor: &Editor) -> String {
    editor.active_document().unwrap().buffer().text()
}

#[test]
fn test_crlf_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("dos.txt");
    std::fs::write(&file, "one\r\ntwo\r\n").unwrap();

    let config = load_config(dir.path(), "");
    let mut editor = Editor::new(EditorContext::load(config), 20, 80);
    editor.open(&file).unwrap();
    assert_eq!(text(&editor), "one\ntwo\n");

    press(&mut editor, KeyPress::plain(Key::End));
    type_text(&mut editor, "!");
    assert_eq!(command(&mut editor, ":wq"), Flow::Quit);
    assert_eq!(std::fs::read(&file).unwrap(), b"one!\r\ntwo\r\n");
}

#[test]
fn test_user_bindings_and_tab_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(
        dir.path(),
        "[editor]\ntab_size = 2\nexpand_tabs = true\n\n[keyboard.bindings]\n\"ctrl+t\" = \"undo\"\n",
    );
    let mut editor = Editor::new(EditorContext::load(config), 20, 80);
    editor.new_document();

    press(&mut editor, KeyPress::plain(Key::Tab));
    type_text(&mut editor, "x");
    assert_eq!(text(&editor), "  x");

    press(&mut editor, KeyPress::ctrl('t'));
    assert_eq!(editor.status(), Some("undo: text"));
}

#[test]
fn test_refuses_to_overwrite_changed_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shared.txt");
    std::fs::write(&file, "mine\n").unwrap();

    let config = load_config(dir.path(), "");
    let mut editor = Editor::new(EditorContext::load(config), 20, 80);
    editor.open(&file).unwrap();
    type_text(&mut editor, "x");

    std::fs::write(&file, "theirs\n").unwrap();
    press(&mut editor, KeyPress::ctrl('s'));
    assert_eq!(
        editor.status(),
        Some("cannot save file: file changed on disk")
    );
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "theirs\n");
    assert!(editor.active_document().unwrap().is_modified());

    command(&mut editor, ":reload");
    assert_eq!(editor.mode(), Mode::Prompt(PromptKind::ConfirmReload));
    type_text(&mut editor, "y");
    assert_eq!(text(&editor), "theirs\n");

    press(&mut editor, KeyPress::alt('u'));
    assert_eq!(text(&editor), "xmine\n");
    assert_eq!(editor.status(), Some("undo: reload"));
}

#[test]
fn test_cut_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "moved\nkept\n").unwrap();
    std::fs::write(&b, "other\n").unwrap();

    let config = load_config(dir.path(), "");
    let mut editor = Editor::new(EditorContext::load(config), 20, 80);
    editor.open(&a).unwrap();
    press(&mut editor, KeyPress::ctrl('k'));
    editor.open(&b).unwrap();
    press(&mut editor, KeyPress::ctrl('u'));
    assert_eq!(text(&editor), "moved\nother\n");

    assert_eq!(command(&mut editor, ":qall!"), Flow::Quit);
}

#[test]
fn test_malformed_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[editor\ntab_size = ").unwrap();
    assert!(Config::load(Some(path.as_path())).is_err());
}
