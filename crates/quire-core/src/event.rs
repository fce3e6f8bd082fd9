//! Notifications about what the editor did.
//!
//! ## Learning: Broadcast instead of callbacks
//!
//! Listeners hold a `tokio::sync::broadcast` receiver and get their own copy
//! of every [`EditorEvent`]. The editor never waits on them: a listener that
//! falls behind loses the oldest events and is told how many.
//!
//! The bus only reports. Nothing here owns or changes editor state.

use tokio::sync::broadcast;

use crate::document::DocumentId;
use crate::mode::Mode;

/// Events published by the [`Editor`](crate::Editor).
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    DocumentOpened(DocumentId),
    DocumentClosed(DocumentId),
    DocumentSaved(DocumentId),
    /// Re-read from disk, replacing the text.
    DocumentReloaded(DocumentId),
    /// An edit, undo or redo changed the text.
    DocumentChanged(DocumentId),
    ActiveChanged(DocumentId),

    ModeChanged(Mode),
    ThemeChanged,
    /// The session ran out of documents.
    Quit,
}

/// Sending side of the editor's notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Publishes `event` to current subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side that skips over lag instead of surfacing it as an error.
///
/// ```ignore
/// let mut saves = EventHandler::new(editor.subscribe());
/// while let Some(event) = saves.next().await {
///     if let EditorEvent::DocumentSaved(id) = event {
///         tracing::info!(%id, "written");
///     }
/// }
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("event handler lagged, missed {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Takes every event already queued, without waiting.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("event handler lagged, missed {n} events");
                }
                Err(_) => return events,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_listener_gets_a_copy() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        bus.emit(EditorEvent::ThemeChanged);
        let mut late = bus.subscribe();

        let id = DocumentId::new();
        bus.emit(EditorEvent::DocumentSaved(id));

        assert_eq!(first.recv().await.unwrap(), EditorEvent::ThemeChanged);
        assert_eq!(first.recv().await.unwrap(), EditorEvent::DocumentSaved(id));
        assert_eq!(late.recv().await.unwrap(), EditorEvent::DocumentSaved(id));
    }

    #[test]
    fn test_emit_without_listeners() {
        EventBus::new().emit(EditorEvent::Quit);
    }

    #[tokio::test]
    async fn test_handler_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());
        bus.emit(EditorEvent::Quit);
        drop(bus);

        assert_eq!(handler.next().await, Some(EditorEvent::Quit));
        assert_eq!(handler.next().await, None);
    }

    #[test]
    fn test_drain() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());
        bus.emit(EditorEvent::ThemeChanged);
        bus.emit(EditorEvent::Quit);
        assert_eq!(
            handler.drain(),
            vec![EditorEvent::ThemeChanged, EditorEvent::Quit]
        );
        assert!(handler.drain().is_empty());
    }
}
