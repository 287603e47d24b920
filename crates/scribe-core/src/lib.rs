#![warn(missing_docs)]
//! Scribe Core - Editing Kernel of a Distraction-Free Writing Appliance
//!
//! # Overview
//!
//! `scribe-core` holds the document being typed. It does no I/O and never blocks:
//! every call mutates state in place and returns with all derived values (cursor
//! line/column, word and line counts) already consistent. Persistence lives in the
//! `scribe-store` crate, which consumes the [`EditorSnapshot`]s and change feed
//! produced here.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorCore (editing API, search, snapshots)│  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  Cursor & Selection  │  UndoLog (Commands)  │
//! ├──────────────────────┴──────────────────────┤
//! │  Piece Table Storage (copy-on-write)        │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use scribe_core::{Direction, EditorCore};
//!
//! let mut editor = EditorCore::new("Hello World");
//! editor.move_cursor_document(Direction::Forward);
//! editor.insert("!");
//! assert_eq!(editor.text(), "Hello World!");
//!
//! // Snapshots share the piece table's buffers; later edits don't leak into them.
//! let snapshot = editor.create_snapshot("novel");
//! editor.delete_char(Direction::Backward);
//! assert_eq!(snapshot.text(), "Hello World!");
//! assert_eq!(editor.text(), "Hello World");
//! ```
//!
//! # Module Description
//!
//! - [`storage`] - Piece Table text storage layer
//! - [`selection`] - Cursor, selection and word-boundary scanning
//! - [`undo`] - Command log for undo/redo
//! - [`editor`] - Editor Core orchestration
//! - [`search`] - Literal find helpers
//! - [`text`] - Word/line statistics
//! - [`snapshot`] - Persistence hand-off value
//!
//! # Offsets
//!
//! All offsets are character offsets into UTF-8 text.

pub mod editor;
pub mod search;
pub mod selection;
pub mod snapshot;
pub mod storage;
pub mod text;
pub mod undo;

pub use editor::{EditorConfig, EditorCore, EditorMode};
pub use search::{SearchMatch, SearchOptions};
pub use selection::{Cursor, Direction, Selection};
pub use snapshot::EditorSnapshot;
pub use storage::{BufferType, Piece, PieceTable, PieceTableSnapshot};
pub use text::TextStats;
pub use undo::{Command, UndoLog};
