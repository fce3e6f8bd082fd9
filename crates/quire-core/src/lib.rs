//! # Quire Core
//!
//! Editor state and the input state machine.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Editor                           │
//! │  ┌──────────┐ ┌──────────────┐ ┌──────────┐ ┌─────────┐ │
//! │  │   Mode   │ │    Keymap    │ │  Prompt  │ │ Status  │ │
//! │  └──────────┘ └──────────────┘ └──────────┘ └─────────┘ │
//! │         │                                                │
//! │  ┌──────┴──────────────────────────────────┐             │
//! │  │                 Session                  │             │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐    │             │
//! │  │  │  Doc 1  │ │  Doc 2  │ │  Doc 3  │    │  clipboard  │
//! │  │  └─────────┘ └─────────┘ └─────────┘    │             │
//! │  └─────────────────────────────────────────┘             │
//! │  EditorContext: config, theme, grammars                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every input goes through [`mode::transition`], which looks the key up
//! in the [`Keymap`] for the current [`Mode`] and returns the next mode plus
//! an [`Effect`]. The [`Editor`] applies the effect to the active
//! [`Document`], refreshes its highlighting and viewport, and tells the
//! caller whether to keep running.
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod command;
pub mod command_line;
pub mod config;
pub mod context;
pub mod document;
pub mod editor;
pub mod event;
pub mod keymap;
pub mod mode;
pub mod prompt;
pub mod search;
pub mod session;
pub mod status;
pub mod viewport;

pub use command::{Command, Motion, UnknownCommand};
pub use command_line::{CommandError, LineCommand};
pub use config::{Config, ConfigError, LineEndingPolicy};
pub use context::EditorContext;
pub use document::{Document, DocumentId};
pub use editor::{Editor, Flow, PromptView};
pub use event::{EditorEvent, EventBus, EventHandler};
pub use keymap::{Key, KeyPress, Keymap, Modifiers, PromptAction};
pub use mode::{Effect, Event, Mode, transition};
pub use prompt::{Prompt, PromptEdit, PromptHistory, PromptKind};
pub use search::{Hit, Match, ReplaceSession, Search, SearchOptions};
pub use session::Session;
pub use status::Status;
pub use viewport::Viewport;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: quire_buffer::BufferError,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Buffer(#[from] quire_buffer::BufferError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("file changed on disk")]
    ChangedOnDisk,

    #[error("file has not been saved yet!")]
    Unnamed,

    #[error("invalid regex: '{0}'")]
    InvalidRegex(String),

    #[error("No active document")]
    NoActiveDocument,
}
