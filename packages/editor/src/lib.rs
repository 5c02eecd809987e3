//! # Folio Editor
//!
//! Core editing engine for Folio documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: markup → typed tree, selectors         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - Identity tagging + structural watch      │
//! │  - Hover / selection / inline editing       │
//! │  - Commands, lists, pages, templates        │
//! │  - Snapshot history + reconciliation        │
//! │  - AI replacement, clean export, storage    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host: rendering surface, toolbars, dialogs  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Every element is addressable**: each element carries a unique
//!    `data-editor-id`, assigned on load and on every insertion
//! 2. **Snapshots, not deltas**: history stores full copies of the body
//! 3. **Patch, don't replace**: undo and redo reconcile the live tree so
//!    focused input survives
//! 4. **Soft misses**: a stale identity makes an operation a no-op, never an
//!    error
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{Command, EditorConfig, EditorSession, MemoryStorage};
//!
//! let config = EditorConfig::load("report.json")?;
//! let mut session = EditorSession::open(config, Box::new(MemoryStorage::new()))?;
//!
//! session.select(&heading_id);
//! session.execute(Command::Bold);
//! session.add_new_page();
//! session.undo();
//!
//! std::fs::write("report.html", session.export_html())?;
//! ```

pub mod ai;
pub mod calibration;
pub mod commands;
pub mod config;
pub mod derive;
pub mod errors;
pub mod export;
pub mod history;
pub mod identity;
pub mod interaction;
pub mod lists;
pub mod pages;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod templates;
pub mod watch;

pub use ai::{AiError, AiProposal, AiRequest, CompletionService};
pub use calibration::{Calibration, CalibrationStage, CalibrationStep};
pub use commands::{Command, DetachedSurface, RichTextSurface};
pub use config::{EditorConfig, NumberSystem, PageNumberPattern};
pub use derive::derive_selector;
pub use errors::{CalibrationError, ConfigError, EditorError, NativeCommandError, StorageError};
pub use export::export_html;
pub use history::{CaptureOutcome, History, Snapshot};
pub use identity::IdentityTagger;
pub use interaction::{EditorEvent, RoutedAction, SelectionState};
pub use lists::ListKind;
pub use pages::{MoveDirection, PageDirection};
pub use reconcile::{reconcile, ReconcileStats};
pub use session::{EditorSession, ReplacementScope};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use templates::{TemplateCatalog, TemplateRecord};
pub use watch::{InsertionEvent, StructuralWatch};
