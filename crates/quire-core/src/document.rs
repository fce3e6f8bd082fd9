//! Document management.
//!
//! ## Learning: Composition over Inheritance
//!
//! Rust doesn't have inheritance. A `Document` composes a `TextBuffer`
//! (text, undo log, cursor), a `HighlightCache` and a `Viewport`, and adds
//! the file identity: path, line ending and the fingerprint of what is on
//! disk.
//!
//! `DocumentId` is a newtype wrapper around `Uuid`, so a document can be
//! referred to in events without borrowing it.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use similar::{Algorithm, DiffOp, DiffTag};
use uuid::Uuid;

use quire_buffer::{BufferConfig, BufferError, LineEnding, LineStore, Position, TextBuffer};
use quire_syntax::HighlightCache;

use crate::context::EditorContext;
use crate::viewport::Viewport;
use crate::{CoreError, CoreResult};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Fingerprint = [u8; 32];

fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Sha256::digest(bytes).into()
}

const RELOAD: &str = "reload";

/// A single file or scratch buffer being edited.
#[derive(Debug)]
pub struct Document {
    /// Unique identifier
    id: DocumentId,

    /// Text, undo log and cursor
    buffer: TextBuffer,

    /// Per-line tokens
    highlight: HighlightCache,

    /// Visible window
    viewport: Viewport,

    /// File path (None for unnamed buffers)
    path: Option<PathBuf>,

    /// Ending written on save
    line_ending: LineEnding,

    /// The file mixed `\n` and `\r\n` when it was read
    mixed: bool,

    /// SHA-256 of the bytes last read or written
    fingerprint: Option<Fingerprint>,

    /// Language key for per-language settings
    language: String,
}

impl Document {
    /// Creates a new empty, unnamed document.
    pub fn new(ctx: &EditorContext) -> Self {
        Self::with_store(LineStore::new(), None, ctx)
    }

    /// Creates an unnamed document holding `text`.
    pub fn from_text(text: &str, ctx: &EditorContext) -> Self {
        Self::with_store(LineStore::from_text(text), None, ctx)
    }

    fn with_store(store: LineStore, path: Option<PathBuf>, ctx: &EditorContext) -> Self {
        let editor = &ctx.config.editor;
        let config = BufferConfig {
            max_history: editor.undo_limit,
            tab_width: editor.tab_size,
            use_spaces: editor.expand_tabs,
        };
        let line_count = store.len_lines();
        let mut doc = Self {
            id: DocumentId::new(),
            buffer: TextBuffer::from_store(store, config),
            highlight: HighlightCache::plain(line_count),
            viewport: Viewport::default(),
            path,
            line_ending: ctx.config.files.line_ending.default_ending(),
            mixed: false,
            fingerprint: None,
            language: String::new(),
        };
        doc.apply_language(ctx);
        doc
    }

    /// Opens a file.
    ///
    /// A file that does not exist yet gives an empty buffer that will be
    /// created on save. Files that are not UTF-8 or contain NUL bytes are
    /// refused.
    pub fn open(path: impl AsRef<Path>, ctx: &EditorContext) -> CoreResult<Self> {
        let path = path.as_ref();
        let open_error = |source: BufferError| CoreError::Open {
            path: path.display().to_string(),
            source,
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "new file");
                return Ok(Self::with_store(LineStore::new(), Some(path.to_path_buf()), ctx));
            }
            Err(e) => return Err(open_error(e.into())),
        };
        let decoded = LineStore::decode(&bytes).map_err(open_error)?;

        let policy = ctx.config.files.line_ending;
        let mut doc = Self::with_store(decoded.store, Some(path.to_path_buf()), ctx);
        doc.line_ending = policy
            .forced()
            .or(decoded.line_ending)
            .unwrap_or_else(|| policy.default_ending());
        doc.mixed = decoded.mixed;
        doc.fingerprint = Some(fingerprint(&bytes));
        if decoded.line_ending.is_some_and(|ending| ending != doc.line_ending) {
            doc.buffer.mark_modified();
        }

        tracing::info!(
            path = %path.display(),
            lines = doc.buffer.len_lines(),
            mixed = doc.mixed,
            "opened file"
        );
        Ok(doc)
    }

    /// Picks the tokenizer and tab settings for the current path and text.
    pub fn apply_language(&mut self, ctx: &EditorContext) {
        let first_line = self.buffer.line(0).unwrap_or_default().into_owned();
        let tokenizer = ctx.tokenizer_for(self.path.as_deref(), &first_line);
        self.language = EditorContext::language_of(tokenizer.scope_name()).to_string();

        let language = ctx.config.language(&self.language);
        let editor = &ctx.config.editor;
        self.buffer.set_tabs(
            language.tab_size.unwrap_or(editor.tab_size),
            language.expand_tabs.unwrap_or(editor.expand_tabs),
        );

        self.buffer.take_splices();
        self.highlight = HighlightCache::new(tokenizer, self.buffer.len_lines());
        self.sync();
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the file path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the display name.
    pub fn name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => String::new(),
        }
    }

    /// Returns true if the document has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    /// Returns the text buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Returns a mutable reference to the buffer.
    ///
    /// Call [`Document::sync`] after editing.
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn highlight(&self) -> &HighlightCache {
        &self.highlight
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// True if the file had mixed line endings that will be converted.
    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    /// Language key (`python` for `source.python`).
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn line_count(&self) -> usize {
        self.buffer.len_lines()
    }

    // ==================== View ====================

    /// Feeds edits to the highlight cache, scrolls the cursor into view and
    /// tokenizes what is visible.
    pub fn sync(&mut self) {
        for splice in self.buffer.take_splices() {
            self.highlight.splice(splice);
        }
        self.viewport
            .ensure_visible(self.buffer.position(), self.buffer.len_lines());
        let last = self.viewport.bottom().saturating_sub(1);
        self.highlight.refresh_until(self.buffer.lines(), last);
    }

    pub fn resize(&mut self, height: usize, width: usize) {
        self.viewport.resize(height, width);
        self.sync();
    }

    /// Scrolls by `delta` lines, pulling the cursor along if it would
    /// leave the screen.
    pub fn scroll(&mut self, delta: isize) {
        let line_count = self.buffer.len_lines();
        self.viewport.scroll(delta, line_count);
        let line = self.buffer.position().line;
        if !self.viewport.contains_line(line) {
            let target = self.viewport.nearest_visible(line);
            self.buffer.move_lines(target as isize - line as isize, false);
        }
        self.sync();
    }

    /// Moves a page up (`-1`) or down (`1`).
    pub fn page(&mut self, direction: isize, extend: bool) {
        let page = self.viewport.page_size() as isize * direction.signum();
        self.viewport.scroll(page, self.buffer.len_lines());
        self.buffer.move_lines(page, extend);
        self.sync();
    }

    // ==================== File Operations ====================

    /// The bytes `save` would write.
    pub fn serialize(&self) -> Vec<u8> {
        self.buffer.lines().encode(self.line_ending)
    }

    /// Saves to the current path. Returns the number of lines written.
    ///
    /// Refuses to overwrite a file that changed on disk since it was read,
    /// unless it already holds exactly what would be written.
    pub fn save(&mut self) -> CoreResult<usize> {
        let path = self.path.clone().ok_or(CoreError::Unnamed)?;
        let bytes = self.serialize();

        if let Some(expected) = self.fingerprint {
            match std::fs::read(&path) {
                Ok(on_disk) => {
                    let actual = fingerprint(&on_disk);
                    if actual != expected && actual != fingerprint(&bytes) {
                        tracing::warn!(path = %path.display(), "file changed on disk");
                        return Err(CoreError::ChangedOnDisk);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        write_in_place(&path, &bytes)?;
        self.fingerprint = Some(fingerprint(&bytes));
        self.mixed = false;
        self.buffer.mark_saved();

        let written = self.lines_written();
        tracing::info!(path = %path.display(), lines = written, "saved file");
        Ok(written)
    }

    /// Saves to a new path, which becomes the document's path.
    pub fn save_as(&mut self, path: impl AsRef<Path>, ctx: &EditorContext) -> CoreResult<usize> {
        let path = path.as_ref().to_path_buf();
        let previous = self.path.replace(path);
        let previous_fingerprint = self.fingerprint.take();
        match self.save() {
            Ok(written) => {
                self.apply_language(ctx);
                Ok(written)
            }
            Err(e) => {
                self.path = previous;
                self.fingerprint = previous_fingerprint;
                Err(e)
            }
        }
    }

    fn lines_written(&self) -> usize {
        let lines = self.buffer.lines();
        let trailing_empty = lines.line_len(lines.last_line()).unwrap_or(0) == 0;
        lines.len_lines() - usize::from(trailing_empty)
    }

    /// Re-reads the file, applying the difference as one undo step.
    ///
    /// The cursor stays where it was as far as the text allows.
    pub fn reload(&mut self, ctx: &EditorContext) -> CoreResult<()> {
        let path = self.path.clone().ok_or(CoreError::Unnamed)?;
        let bytes = std::fs::read(&path)?;
        let decoded = LineStore::decode(&bytes).map_err(|source| CoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let old = self.buffer.lines_vec();
        let new: Vec<String> = decoded.store.lines().map(|l| l.into_owned()).collect();
        let ops = similar::capture_diff_slices(Algorithm::Myers, &old, &new);

        self.apply_diff(&ops, &new)?;

        let policy = ctx.config.files.line_ending;
        self.line_ending = policy
            .forced()
            .or(decoded.line_ending)
            .unwrap_or(self.line_ending);
        self.mixed = decoded.mixed;
        self.fingerprint = Some(fingerprint(&bytes));
        if self.mixed {
            self.buffer.mark_modified();
        } else {
            self.buffer.mark_saved();
        }
        self.sync();

        tracing::info!(path = %path.display(), "reloaded file");
        Ok(())
    }

    /// Applies diff `ops` from the current lines to `new` as one "reload"
    /// group. On failure the group is reverted and the text is unchanged.
    fn apply_diff(&mut self, ops: &[DiffOp], new: &[String]) -> CoreResult<()> {
        self.buffer.begin_group(RELOAD);
        let result = ops.iter().rev().try_for_each(|op| {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            if tag == DiffTag::Equal {
                return Ok(());
            }
            self.replace_lines(old_range.start, old_range.end, &new[new_range])
        });
        match result {
            Ok(()) => {
                self.buffer.end_group();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("reload failed, reverting: {e}");
                self.buffer.abort_group()?;
                Err(e)
            }
        }
    }

    /// Replaces lines `first..end` with `lines`.
    fn replace_lines(&mut self, first: usize, end: usize, lines: &[String]) -> CoreResult<()> {
        let count = self.buffer.len_lines();
        let (start, stop, text) = if end < count {
            let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
            (Position::new(first, 0), Position::new(end, 0), text)
        } else if first > 0 {
            // Through the last line: take the newline before `first` instead.
            let start = Position::new(first - 1, self.buffer.line_len(first - 1)?);
            let text: String = lines.iter().map(|l| format!("\n{l}")).collect();
            (start, self.buffer.lines().end_position(), text)
        } else {
            (Position::ZERO, self.buffer.lines().end_position(), lines.join("\n"))
        };

        self.buffer.delete_with(start, stop, RELOAD)?;
        self.buffer.insert_with(start, &text, RELOAD)?;
        Ok(())
    }
}

/// Writes `bytes` into `path` in place.
///
/// Truncating the existing file keeps its inode, so permissions, symlinks
/// and hard links survive the save.
fn write_in_place(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LineEndingPolicy};
    use std::fs;

    fn ctx() -> EditorContext {
        EditorContext::default()
    }

    #[test]
    fn test_document_id_unique() {
        assert_ne!(DocumentId::new(), DocumentId::new());
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let mut doc = Document::open(&path, &ctx()).unwrap();
        assert_eq!(doc.buffer().text(), "");
        assert!(!doc.is_modified());

        doc.buffer_mut().insert(Position::ZERO, "hi\n").unwrap();
        assert_eq!(doc.save().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hi\n");
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_round_trip_lf_and_crlf() {
        let dir = tempfile::tempdir().unwrap();
        for content in ["a\nb\n", "a\r\nb\r\n", "no newline", ""] {
            let path = dir.path().join("f.txt");
            fs::write(&path, content).unwrap();
            let doc = Document::open(&path, &ctx()).unwrap();
            assert_eq!(doc.serialize(), content.as_bytes());
        }
    }

    #[test]
    fn test_crlf_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("win.txt");
        fs::write(&path, "a\r\nb\r\n").unwrap();
        let doc = Document::open(&path, &ctx()).unwrap();
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        assert_eq!(doc.buffer().lines_vec(), vec!["a", "b", ""]);
    }

    #[test]
    fn test_mixed_endings_convert_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        fs::write(&path, "a\r\nb\nc\r\n").unwrap();
        let mut doc = Document::open(&path, &ctx()).unwrap();
        assert!(doc.is_mixed());
        assert_eq!(doc.line_ending(), LineEnding::CrLf);

        doc.save().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"a\r\nb\r\nc\r\n");
        assert!(!doc.is_mixed());
    }

    #[test]
    fn test_forced_line_ending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "a\r\n").unwrap();
        let mut config = Config::default();
        config.files.line_ending = LineEndingPolicy::Lf;
        let ctx = EditorContext::with_config(config);

        let mut doc = Document::open(&path, &ctx).unwrap();
        assert!(doc.is_modified());
        doc.save().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"a\n");
    }

    #[test]
    fn test_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let nul = dir.path().join("nul.bin");
        fs::write(&nul, b"ab\0cd").unwrap();
        let err = Document::open(&nul, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Open {
                source: BufferError::NulByte { offset: 2 },
                ..
            }
        ));

        let latin1 = dir.path().join("latin1.txt");
        fs::write(&latin1, b"caf\xe9").unwrap();
        assert!(matches!(
            Document::open(&latin1, &ctx()).unwrap_err(),
            CoreError::Open {
                source: BufferError::InvalidUtf8 { offset: 3 },
                ..
            }
        ));
    }

    #[test]
    fn test_save_refuses_when_changed_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "one\n").unwrap();
        let mut doc = Document::open(&path, &ctx()).unwrap();
        doc.buffer_mut().insert(Position::ZERO, "zero\n").unwrap();

        fs::write(&path, "someone else\n").unwrap();
        assert!(matches!(doc.save(), Err(CoreError::ChangedOnDisk)));
        assert!(doc.is_modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "someone else\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_permissions_and_links() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, "echo hi\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let link = dir.path().join("link.sh");
        std::os::unix::fs::symlink(&script, &link).unwrap();

        let mut doc = Document::open(&link, &ctx()).unwrap();
        doc.buffer_mut().insert(Position::ZERO, "#!/bin/sh\n").unwrap();
        doc.save().unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&script).unwrap(), "#!/bin/sh\necho hi\n");
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_save_unnamed() {
        let mut doc = Document::new(&ctx());
        assert!(matches!(doc.save(), Err(CoreError::Unnamed)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("out.txt");
        doc.buffer_mut().insert(Position::ZERO, "x").unwrap();
        assert_eq!(doc.save_as(&path, &ctx()).unwrap(), 1);
        assert_eq!(doc.path(), Some(path.as_path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x");
    }

    #[test]
    fn test_reload_is_one_undo_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "a\nb\nc\n").unwrap();
        let mut doc = Document::open(&path, &ctx()).unwrap();

        fs::write(&path, "a\nB\nc\nd").unwrap();
        doc.reload(&ctx()).unwrap();
        assert_eq!(doc.buffer().text(), "a\nB\nc\nd");
        assert!(!doc.is_modified());

        assert_eq!(doc.buffer_mut().undo().unwrap(), "reload");
        assert_eq!(doc.buffer().text(), "a\nb\nc\n");
        assert!(doc.is_modified());
    }

    #[test]
    fn test_reload_edge_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        for (before, after) in [
            ("x", "y"),
            ("a\nb", "a"),
            ("a", "a\nb"),
            ("a\nb\n", "z\na\nb\n"),
            ("one\ntwo\n", ""),
            ("", "new\n"),
        ] {
            fs::write(&path, before).unwrap();
            let mut doc = Document::open(&path, &ctx()).unwrap();
            fs::write(&path, after).unwrap();
            doc.reload(&ctx()).unwrap();
            assert_eq!(doc.buffer().text(), after, "{before:?} -> {after:?}");
        }
    }

    #[test]
    fn test_failed_diff_leaves_text_untouched() {
        let mut doc = Document::from_text("a\nb\nc\n", &ctx());
        let new = vec!["a".to_string(), "B".to_string()];
        // Applied back to front: the replace lands, then the delete fails.
        let ops = [
            DiffOp::Delete {
                old_index: 40,
                old_len: 2,
                new_index: 2,
            },
            DiffOp::Replace {
                old_index: 1,
                old_len: 1,
                new_index: 1,
                new_len: 1,
            },
        ];

        assert!(doc.apply_diff(&ops, &new).is_err());
        assert_eq!(doc.buffer().text(), "a\nb\nc\n");
        assert!(!doc.buffer().can_undo());
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_reload_unnamed() {
        let mut doc = Document::new(&ctx());
        let err = doc.reload(&ctx()).unwrap_err();
        assert_eq!(err.to_string(), "file has not been saved yet!");
    }

    #[test]
    fn test_scroll_pulls_cursor() {
        let text = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut doc = Document::from_text(&text, &ctx());
        doc.resize(10, 20);
        doc.scroll(3);
        assert_eq!(doc.viewport().top, 3);
        assert_eq!(doc.buffer().position().line, 3);

        doc.buffer_mut().goto_line(20);
        doc.sync();
        doc.scroll(-15);
        assert_eq!(doc.viewport().top, 0);
        assert_eq!(doc.buffer().position().line, 9);
    }

    #[test]
    fn test_page_down() {
        let text = "x\n".repeat(40);
        let mut doc = Document::from_text(&text, &ctx());
        doc.resize(10, 20);
        doc.page(1, false);
        assert_eq!(doc.buffer().position().line, 8);
        assert!(doc.viewport().contains_line(8));
        doc.page(-1, false);
        assert_eq!(doc.buffer().position().line, 0);
        assert_eq!(doc.viewport().top, 0);
    }
}
