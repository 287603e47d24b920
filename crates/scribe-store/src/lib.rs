#![warn(missing_docs)]
//! Scribe Store - Durability Layer for the Scribe Editing Core
//!
//! # Overview
//!
//! `scribe-store` persists [`scribe_core::EditorCore`] documents so that a power cut
//! at any instant loses at most the edits since the last journal checkpoint, and
//! never corrupts the saved manuscript.
//!
//! # Guarantees
//!
//! - **Atomic saves**: temp file, fsync, rename; the manuscript is always the old or
//!   the new complete version
//! - **Snapshot rotation**: manual saves keep `manuscript.md.~1..~3`
//! - **Write-ahead journal**: every edit is appended as a binary record; replay
//!   stops at the last checkpoint Marker and ignores torn tails
//! - **Explicit recovery**: interrupted work is offered, never applied silently
//! - **Non-blocking editing**: a bounded queue feeds a background worker; a full
//!   queue is reported, not waited on
//!
//! # Architecture
//!
//! ```text
//!  editing context                      │  scribe-persist thread
//! ──────────────────────────────────────┼──────────────────────────────
//!  EditorCore ──take_changes──┐         │
//!  EditorCore ──snapshot──────┤         │
//!                             ▼         │
//!            PersistenceService ──try_send──▶ PersistWorker
//!               (IdleTimer)             │      ├─ atomic_save / rotate
//!                   ▲                   │      └─ JournalWriter
//!                   └──poll_events──────┼──── PersistEvent
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//! use scribe_core::EditorCore;
//! use scribe_store::{DurabilityConfig, PersistenceService, RecoveryManager};
//!
//! let config = DurabilityConfig::with_root("/media/sd/documents");
//! let recovery = RecoveryManager::new(&config, "novel");
//! if let Some(candidate) = recovery.inspect()? {
//!     // Ask the user; here we keep the recovered text.
//!     recovery.restore(&candidate)?;
//! }
//!
//! let text = scribe_store::read_manuscript(recovery.paths())?.unwrap_or_default();
//! let mut editor = EditorCore::new(&text);
//! let mut service = PersistenceService::spawn(config)?;
//! service.begin_session(&mut editor, "novel")?;
//!
//! editor.insert("Once upon a time");
//! service.tick(&mut editor, "novel", Instant::now())?;
//! # Ok::<(), scribe_store::StoreError>(())
//! ```

mod atomic;
mod config;
mod error;
mod journal;
mod layout;
mod recovery;
mod schedule;
mod service;
mod worker;

pub use atomic::{atomic_save, commit_temp, read_manuscript, rotate_snapshots, write_temp};
pub use config::DurabilityConfig;
pub use error::{Result, SaveStage, StoreError};
pub use journal::{
    JournalEntry, JournalOp, JournalReader, JournalScan, JournalWriter, RECORD_HEADER_LEN,
    RecordError, replay, unix_millis,
};
pub use layout::{JOURNAL_PREFIX, MANUSCRIPT_FILE, ProjectPaths, TEMP_FILE};
pub use recovery::{RecoveryCandidate, RecoveryManager, RecoverySource};
pub use schedule::IdleTimer;
pub use service::PersistenceService;
pub use worker::{PersistEvent, PersistRequest, SaveKind};
