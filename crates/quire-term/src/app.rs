//! The event loop.
//!
//! One terminal event is read, translated and fully applied before the
//! next one. Resize events that have piled up are collapsed to the last.

use std::io::{BufWriter, Write, stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent};
use quire_core::{Editor, Event, Flow};

use crate::backend::{CrosstermBackend, TerminalBackend};
use crate::input;
use crate::render;

/// Runs the editor until the last document is closed.
pub fn run(mut editor: Editor) -> Result<()> {
    let mut backend = CrosstermBackend::new();
    let mut guard = backend.enter_guard()?;
    let mut out = BufWriter::new(stdout());
    let mut reader = Reader::default();
    let mut title = None;

    let (mut columns, mut rows) = guard.backend().size()?;
    let (height, width) = render::text_area(columns, rows);
    editor.handle_event(Event::Resize { width, height });

    loop {
        update_title(guard.backend(), &editor, &mut title)?;
        render::draw(&mut out, &editor, columns, rows).context("cannot draw")?;

        let Some(event) = reader.next()? else {
            continue;
        };
        if let Event::Resize { .. } = event {
            (columns, rows) = guard.backend().size()?;
        }

        match editor.handle_event(event) {
            Flow::Continue => {}
            Flow::Quit => break,
            Flow::Suspend => {
                out.flush()?;
                guard.suspend()?;
                (columns, rows) = guard.backend().size()?;
                let (height, width) = render::text_area(columns, rows);
                editor.handle_event(Event::Resume);
                editor.handle_event(Event::Resize { width, height });
                title = None;
            }
        }
    }

    tracing::info!("event loop finished");
    Ok(())
}

/// Reads terminal events, holding back one event read past a resize burst.
#[derive(Default)]
struct Reader {
    pending: Option<TermEvent>,
}

impl Reader {
    /// Blocks for the next event. Events the editor ignores give `None`.
    fn next(&mut self) -> Result<Option<Event>> {
        let mut event = match self.pending.take() {
            Some(event) => event,
            None => event::read().context("cannot read terminal input")?,
        };
        while matches!(event, TermEvent::Resize(..)) && event::poll(Duration::ZERO)? {
            let next = event::read()?;
            if !matches!(next, TermEvent::Resize(..)) {
                self.pending = Some(next);
                break;
            }
            event = next;
        }
        Ok(input::translate(event))
    }
}

fn update_title(
    backend: &mut CrosstermBackend,
    editor: &Editor,
    title: &mut Option<String>,
) -> Result<()> {
    let name = editor
        .active_document()
        .map(|doc| doc.name())
        .unwrap_or_default();
    if title.as_deref() != Some(name.as_str()) {
        let text = if name.is_empty() {
            "quire".to_string()
        } else {
            format!("{name} - quire")
        };
        backend.set_title(&text)?;
        *title = Some(name);
    }
    Ok(())
}
