//! The set of open documents.

use std::path::Path;

use crate::document::{Document, DocumentId};

/// Open documents in order, one of them active, plus the cut register
/// shared between them.
#[derive(Debug, Default)]
pub struct Session {
    /// Open documents, in the order they were opened
    documents: Vec<Document>,

    /// Index of the active document
    active: usize,

    /// Text area size every document's viewport is fitted to
    screen: (usize, usize),

    /// Last cut text
    clipboard: Option<String>,
}

impl Session {
    /// Creates an empty session for a text area of `height` x `width`.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            screen: (height, width),
            ..Self::default()
        }
    }

    /// Adds a document and makes it active.
    pub fn add(&mut self, mut doc: Document) -> DocumentId {
        let id = doc.id();
        doc.resize(self.screen.0, self.screen.1);
        self.documents.push(doc);
        self.active = self.documents.len() - 1;
        id
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Index of the active document.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Returns the active document.
    pub fn active(&self) -> Option<&Document> {
        self.documents.get(self.active)
    }

    /// Returns a mutable reference to the active document.
    pub fn active_mut(&mut self) -> Option<&mut Document> {
        self.documents.get_mut(self.active)
    }

    /// Returns an iterator over all documents.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Finds a document by path.
    pub fn find_by_path(&self, path: &Path) -> Option<usize> {
        self.documents.iter().position(|doc| doc.path() == Some(path))
    }

    // ==================== Switching ====================

    /// Makes document `index` active, fitting it to the current screen.
    pub fn switch_to(&mut self, index: usize) -> bool {
        if index >= self.documents.len() {
            return false;
        }
        self.active = index;
        let (height, width) = self.screen;
        self.documents[index].resize(height, width);
        true
    }

    /// Switches to the next document, wrapping around.
    pub fn next(&mut self) {
        if !self.documents.is_empty() {
            self.switch_to((self.active + 1) % self.documents.len());
        }
    }

    /// Switches to the previous document, wrapping around.
    pub fn prev(&mut self) {
        if !self.documents.is_empty() {
            let len = self.documents.len();
            self.switch_to((self.active + len - 1) % len);
        }
    }

    // ==================== Closing ====================

    /// Closes the active document. Returns it, or `None` if there was none.
    ///
    /// The previous document becomes active. Check [`Session::is_empty`]
    /// afterwards: no documents left means the editor should exit.
    pub fn close_active(&mut self) -> Option<Document> {
        if self.documents.is_empty() {
            return None;
        }
        let doc = self.documents.remove(self.active);
        if !self.documents.is_empty() {
            self.switch_to(self.active.saturating_sub(1));
        } else {
            self.active = 0;
        }
        Some(doc)
    }

    /// Closes every document.
    pub fn close_all(&mut self) -> Vec<Document> {
        self.active = 0;
        std::mem::take(&mut self.documents)
    }

    /// Index of the first document with unsaved changes.
    pub fn first_modified(&self) -> Option<usize> {
        self.documents.iter().position(Document::is_modified)
    }

    // ==================== Screen ====================

    /// Records a new text area size and refits the active document.
    ///
    /// Other documents are refitted when they become active.
    pub fn resize(&mut self, height: usize, width: usize) {
        self.screen = (height, width);
        if let Some(doc) = self.active_mut() {
            doc.resize(height, width);
        }
    }

    pub fn screen(&self) -> (usize, usize) {
        self.screen
    }

    // ==================== Clipboard ====================

    /// Stores cut text, appending when the cut continued the previous one.
    pub fn store_cut(&mut self, text: String, continued: bool) {
        match (&mut self.clipboard, continued) {
            (Some(existing), true) => existing.push_str(&text),
            _ => self.clipboard = Some(text),
        }
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EditorContext;

    fn session_of(count: usize) -> (Session, Vec<DocumentId>) {
        let ctx = EditorContext::default();
        let mut session = Session::new(10, 40);
        let ids = (0..count)
            .map(|i| session.add(Document::from_text(&format!("doc {i}"), &ctx)))
            .collect();
        (session, ids)
    }

    #[test]
    fn test_add_makes_active() {
        let (session, ids) = session_of(3);
        assert_eq!(session.len(), 3);
        assert_eq!(session.active().unwrap().id(), ids[2]);
    }

    #[test]
    fn test_next_prev_wrap() {
        let (mut session, ids) = session_of(3);
        session.next();
        assert_eq!(session.active().unwrap().id(), ids[0]);
        session.prev();
        assert_eq!(session.active().unwrap().id(), ids[2]);
        session.prev();
        assert_eq!(session.active().unwrap().id(), ids[1]);
    }

    #[test]
    fn test_switch_refits_viewport() {
        let (mut session, _) = session_of(2);
        session.resize(5, 20);
        assert!(session.switch_to(0));
        assert_eq!(session.active().unwrap().viewport().height, 5);
        assert!(!session.switch_to(7));
    }

    #[test]
    fn test_close_until_empty() {
        let (mut session, ids) = session_of(2);
        session.switch_to(1);
        assert_eq!(session.close_active().unwrap().id(), ids[1]);
        assert_eq!(session.active().unwrap().id(), ids[0]);
        assert_eq!(session.close_active().unwrap().id(), ids[0]);
        assert!(session.is_empty());
        assert!(session.active().is_none());
        assert!(session.close_active().is_none());
    }

    #[test]
    fn test_close_all() {
        let (mut session, _) = session_of(3);
        assert_eq!(session.close_all().len(), 3);
        assert!(session.is_empty());
    }

    #[test]
    fn test_clipboard_appends_continued_cuts() {
        let mut session = Session::new(10, 10);
        session.store_cut("a\n".into(), false);
        session.store_cut("b\n".into(), true);
        assert_eq!(session.clipboard(), Some("a\nb\n"));
        session.store_cut("c".into(), false);
        assert_eq!(session.clipboard(), Some("c"));
    }
}
