//! Terminal setup and teardown.
//!
//! ## Learning: RAII
//!
//! Raw mode and the alternate screen must be undone however the program
//! leaves the event loop: a normal return, an `?` on an I/O error, or a
//! panic unwinding through `run`. [`TerminalGuard`] ties that cleanup to
//! `Drop`, so no exit path can skip it.

use std::io::{Write, stdout};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};

/// Terminal state the editor needs.
pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;

    /// Returns `(columns, rows)`.
    fn size(&self) -> Result<(u16, u16)>;
}

/// The real terminal, driven through crossterm.
pub struct CrosstermBackend {
    entered: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enters the editor screen and returns a guard that leaves it on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode().context("cannot enable raw mode")?;
            execute!(stdout(), EnterAlternateScreen, EnableBracketedPaste, Hide)?;
            self.entered = true;
            tracing::debug!("terminal entered");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), DisableBracketedPaste, LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
            tracing::debug!("terminal left");
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        crossterm::terminal::size().context("cannot read terminal size")
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// Keeps the terminal in editor mode while alive.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl TerminalGuard<'_> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        self.backend
    }

    /// Hands the terminal back to the shell and stops the process until it
    /// is continued, then takes the terminal again.
    pub fn suspend(&mut self) -> Result<()> {
        self.backend.leave()?;
        stdout().flush()?;
        stop_process()?;
        self.backend.enter()
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}

#[cfg(unix)]
fn stop_process() -> Result<()> {
    use nix::sys::signal::{Signal, raise};

    tracing::info!("suspending");
    raise(Signal::SIGTSTP).context("cannot suspend")?;
    tracing::info!("resumed");
    Ok(())
}

#[cfg(not(unix))]
fn stop_process() -> Result<()> {
    tracing::warn!("suspend is not supported on this platform");
    Ok(())
}
