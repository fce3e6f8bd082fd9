//! # Quire Term
//!
//! The terminal front end: puts the terminal into raw mode, turns crossterm
//! events into [`quire_core::Event`]s, feeds them to the [`quire_core::Editor`] and
//! draws the result.
//!
//! ```text
//! crossterm event ──▶ input::translate ──▶ Editor::handle_event
//!                                                │
//!        terminal ◀── render::draw ◀─────────────┘
//! ```
//!
//! The editor core knows nothing about terminals; everything crossterm
//! specific lives in this crate.

pub mod app;
pub mod backend;
pub mod input;
pub mod render;

pub use app::run;
pub use backend::{CrosstermBackend, TerminalBackend, TerminalGuard};
