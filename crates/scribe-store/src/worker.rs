//! Background persistence worker.
//!
//! Runs on its own thread and drains the bounded request queue in order. Journal
//! records for edits always arrive before the save that includes them, so after a
//! save the journal can be rebased onto the saved text without losing anything.

use std::collections::HashMap;

use scribe_core::EditorSnapshot;
use tokio::sync::mpsc;

use crate::atomic::atomic_save;
use crate::config::DurabilityConfig;
use crate::error::StoreError;
use crate::journal::{JournalEntry, JournalWriter};

/// Why a save was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// Idle timer fired; no backup rotation
    Autosave,
    /// User asked to save; rotates numbered backups
    Manual,
}

/// Work item on the persistence queue.
#[derive(Debug)]
pub enum PersistRequest {
    /// Reset the journal onto freshly loaded content
    Begin {
        /// Loaded document
        snapshot: EditorSnapshot,
    },
    /// Write the document atomically
    Save {
        /// Document to persist
        snapshot: EditorSnapshot,
        /// Autosave or manual save
        kind: SaveKind,
    },
    /// Append one record to a project's journal
    Journal {
        /// Owning project
        project_id: String,
        /// Record to append
        entry: JournalEntry,
    },
    /// Append a Marker to a project's journal
    Checkpoint {
        /// Owning project
        project_id: String,
    },
}

/// Outcome reported back to the editing context.
#[derive(Debug)]
pub enum PersistEvent {
    /// A save reached storage
    Saved {
        /// Saved project
        project_id: String,
        /// Autosave or manual save
        kind: SaveKind,
        /// Editor revision the saved snapshot was taken at
        revision: u64,
        /// Bytes written
        bytes: usize,
    },
    /// A save failed; the previous manuscript is intact
    SaveFailed {
        /// Affected project
        project_id: String,
        /// Autosave or manual save
        kind: SaveKind,
        /// Editor revision of the lost save
        revision: u64,
        /// Failure cause
        error: StoreError,
    },
    /// Journaling stopped for a project until its next save
    JournalFailed {
        /// Affected project
        project_id: String,
        /// Failure cause
        error: StoreError,
    },
}

pub(crate) struct PersistWorker {
    config: DurabilityConfig,
    /// `None` marks a journal that lost a record; it stays off until rebased.
    journals: HashMap<String, Option<JournalWriter>>,
    events: mpsc::UnboundedSender<PersistEvent>,
}

impl PersistWorker {
    pub(crate) fn new(
        config: DurabilityConfig,
        events: mpsc::UnboundedSender<PersistEvent>,
    ) -> Self {
        Self {
            config,
            journals: HashMap::new(),
            events,
        }
    }

    pub(crate) fn run(mut self, mut requests: mpsc::Receiver<PersistRequest>) {
        log::debug!("persistence worker started");
        while let Some(request) = requests.blocking_recv() {
            self.handle(request);
        }

        for (project_id, slot) in &mut self.journals {
            if let Some(writer) = slot
                && let Err(error) = writer.checkpoint()
            {
                log::warn!("final journal checkpoint for {project_id} failed: {error}");
            }
        }
        log::debug!("persistence worker stopped");
    }

    fn handle(&mut self, request: PersistRequest) {
        match request {
            PersistRequest::Begin { snapshot } => {
                let text = snapshot.text();
                self.rebase(&snapshot.project_id, &text);
            }
            PersistRequest::Save { snapshot, kind } => self.save(snapshot, kind),
            PersistRequest::Journal { project_id, entry } => self.append(&project_id, &entry),
            PersistRequest::Checkpoint { project_id } => {
                if let Some(Some(writer)) = self.journals.get_mut(&project_id)
                    && let Err(error) = writer.checkpoint()
                {
                    self.journal_failed(&project_id, error);
                }
            }
        }
    }

    fn save(&mut self, snapshot: EditorSnapshot, kind: SaveKind) {
        let project_id = snapshot.project_id.clone();

        // The journal's last Marker must match what is about to be committed.
        if let Some(Some(writer)) = self.journals.get_mut(&project_id)
            && let Err(error) = writer.checkpoint()
        {
            self.journal_failed(&project_id, error);
        }

        let paths = self.config.project(&project_id);
        let rotate = (kind == SaveKind::Manual).then_some(self.config.snapshot_keep);
        let event = match atomic_save(&paths, &snapshot.content, rotate) {
            Ok(()) => PersistEvent::Saved {
                project_id: project_id.clone(),
                kind,
                revision: snapshot.revision,
                bytes: snapshot.content.byte_len(),
            },
            Err(error) => {
                log::warn!("{kind:?} save of {project_id} failed: {error}");
                PersistEvent::SaveFailed {
                    project_id: project_id.clone(),
                    kind,
                    revision: snapshot.revision,
                    error,
                }
            }
        };
        self.emit(event);

        // Rebase even after a failed save: the journal then holds the unsaved text.
        let text = snapshot.text();
        self.rebase(&project_id, &text);
    }

    fn rebase(&mut self, project_id: &str, text: &str) {
        let writer = match self.journals.remove(project_id).flatten() {
            Some(writer) => Ok(writer),
            None => JournalWriter::open(self.config.project(project_id), &self.config),
        };
        let result = writer.and_then(|mut writer| writer.rebase(text).map(|()| writer));
        match result {
            Ok(writer) => {
                self.journals.insert(project_id.to_string(), Some(writer));
            }
            Err(error) => self.journal_failed(project_id, error),
        }
    }

    fn append(&mut self, project_id: &str, entry: &JournalEntry) {
        match self.journals.get_mut(project_id) {
            Some(Some(writer)) => {
                if let Err(error) = writer.append(entry) {
                    self.journal_failed(project_id, error);
                }
            }
            Some(None) => {}
            None => {
                log::warn!("journal record for {project_id} before its session began, journaling off");
                self.journals.insert(project_id.to_string(), None);
            }
        }
    }

    fn journal_failed(&mut self, project_id: &str, error: StoreError) {
        log::warn!("journal for {project_id} disabled until next save: {error}");
        self.journals.insert(project_id.to_string(), None);
        self.emit(PersistEvent::JournalFailed {
            project_id: project_id.to_string(),
            error,
        });
    }

    fn emit(&self, event: PersistEvent) {
        if self.events.send(event).is_err() {
            log::debug!("persistence event dropped, no listener");
        }
    }
}
