//! # Quill Core
//!
//! Session state for a multi-tab editing session.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Session                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐  │
//! │  │  Tab Store  │  │ Token Meter │  │   Event Bus      │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────┘  │
//! │         │                │                                │
//! │  ┌──────┴────────────────┴──────────────────┐            │
//! │  │        SessionStore (get / set / remove)  │            │
//! │  └──────────────────────────────────────────┘            │
//! └──────────────────────────────────────────────────────────┘
//!
//!   EditingSurface ── ContentChanged ──► Session::on_surface_edit
//!   transform::find_replace ──► TextEdit ──► EditingSurface::apply_edit
//! ```
//!
//! The editing surface is an external capability. [`BufferSurface`] is a
//! headless implementation used by the CLI and by tests.

pub mod config;
pub mod event;
pub mod keymap;
pub mod meter;
pub mod session;
pub mod store;
pub mod surface;
pub mod tab;
pub mod transform;

pub use config::{Config, TabNaming};
pub use event::{EventBus, SessionEvent, SurfaceEvent};
pub use keymap::{Key, KeyChord, Modifiers};
pub use meter::{ChargeOutcome, TokenMeter, token_cost};
pub use session::{Session, SessionState};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};
pub use surface::{BufferSurface, CommandHandler, EditingSurface, TextEdit};
pub use tab::{Tab, TabStore};
pub use transform::{find_replace, replace_edit};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No such {kind}: {name}")]
    InvalidReference { kind: &'static str, name: String },

    #[error("Edit quota exhausted")]
    QuotaExhausted,

    #[error("Tab already exists: {0}")]
    DuplicateTab(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Malformed persisted state in `{key}`: {reason}")]
    MalformedState { key: String, reason: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a missing tab.
    pub fn no_tab(name: impl Into<String>) -> Self {
        Self::InvalidReference {
            kind: "tab",
            name: name.into(),
        }
    }
}
