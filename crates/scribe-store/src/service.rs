//! Editing-context side of persistence.
//!
//! [`PersistenceService`] owns the sending half of the bounded queue and the
//! worker thread. Every call is non-blocking: requests go through `try_send`, and a
//! full queue is reported as [`StoreError::QueueFull`] while the edit stays in
//! memory. Losing a journal record would make later records replay against the
//! wrong text, so after one is dropped no further records are sent for that project
//! until a save has been queued.

use std::collections::{HashMap, HashSet};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use scribe_core::{EditorCore, EditorSnapshot};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::DurabilityConfig;
use crate::error::{Result, StoreError};
use crate::journal::{JournalEntry, unix_millis};
use crate::schedule::IdleTimer;
use crate::worker::{PersistEvent, PersistRequest, PersistWorker, SaveKind};

/// Handle to the persistence worker.
pub struct PersistenceService {
    config: DurabilityConfig,
    requests: Option<mpsc::Sender<PersistRequest>>,
    events: mpsc::UnboundedReceiver<PersistEvent>,
    worker: Option<JoinHandle<()>>,
    idle: IdleTimer,
    journal_gaps: HashSet<String>,
    /// Editor load epoch each project's journal baseline was taken at
    sessions: HashMap<String, u64>,
    queued_revision: HashMap<String, u64>,
}

impl PersistenceService {
    /// Start the worker thread.
    pub fn spawn(config: DurabilityConfig) -> Result<Self> {
        let (requests, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (event_sender, events) = mpsc::unbounded_channel();
        let worker = PersistWorker::new(config.clone(), event_sender);
        let handle = thread::Builder::new()
            .name("scribe-persist".into())
            .spawn(move || worker.run(receiver))
            .map_err(StoreError::Spawn)?;

        Ok(Self {
            idle: IdleTimer::new(config.idle_timeout()),
            config,
            requests: Some(requests),
            events,
            worker: Some(handle),
            journal_gaps: HashSet::new(),
            sessions: HashMap::new(),
            queued_revision: HashMap::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &DurabilityConfig {
        &self.config
    }

    /// The idle autosave timer
    pub fn idle_timer(&self) -> &IdleTimer {
        &self.idle
    }

    /// Start journaling `project_id` from the editor's current content.
    ///
    /// Pending change records are discarded; they are part of the loaded text.
    /// [`Self::record_changes`] calls this on its own when the project was never
    /// begun or the editor has loaded another document since.
    pub fn begin_session(&mut self, editor: &mut EditorCore, project_id: &str) -> Result<()> {
        self.begin(editor, project_id)?;
        self.queued_revision
            .insert(project_id.to_string(), editor.revision());
        Ok(())
    }

    fn begin(&mut self, editor: &mut EditorCore, project_id: &str) -> Result<()> {
        editor.take_changes();
        let snapshot = editor.create_snapshot(project_id);
        self.send(PersistRequest::Begin { snapshot })?;
        self.journal_gaps.remove(project_id);
        self.sessions
            .insert(project_id.to_string(), editor.load_epoch());
        Ok(())
    }

    /// Journal the edits made since the last call and restart the idle window.
    ///
    /// If the editor was reloaded since the journal baseline was taken, the journal
    /// is rebased onto the current text instead.
    pub fn record_changes(
        &mut self,
        editor: &mut EditorCore,
        project_id: &str,
        now: Instant,
    ) -> Result<()> {
        if self.sessions.get(project_id) != Some(&editor.load_epoch()) {
            log::debug!("new journal baseline for {project_id}");
            self.idle.touch(now);
            return self.begin(editor, project_id).inspect_err(|error| {
                log::warn!("could not rebase journal for {project_id}: {error}");
            });
        }

        let changes = editor.take_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.idle.touch(now);
        if self.journal_gaps.contains(project_id) {
            return Ok(());
        }

        let timestamp = unix_millis();
        for change in &changes {
            let sent = JournalEntry::from_command(change, timestamp).and_then(|entry| {
                self.send(PersistRequest::Journal {
                    project_id: project_id.to_string(),
                    entry,
                })
            });
            if let Err(error) = sent {
                log::warn!("journaling for {project_id} paused until next save: {error}");
                self.journal_gaps.insert(project_id.to_string());
                return Err(error);
            }
        }
        Ok(())
    }

    /// Journal pending edits, then queue an autosave if the idle window elapsed.
    ///
    /// Returns whether an autosave was queued. Nothing is queued when the editor
    /// revision matches the last queued save.
    pub fn tick(&mut self, editor: &mut EditorCore, project_id: &str, now: Instant) -> Result<bool> {
        self.record_changes(editor, project_id, now)?;
        if !self.idle.fire(now) {
            return Ok(false);
        }
        if self.queued_revision.get(project_id) == Some(&editor.revision()) {
            return Ok(false);
        }
        self.enqueue_save(editor.create_snapshot(project_id), SaveKind::Autosave)?;
        Ok(true)
    }

    /// Journal pending edits and queue a manual save.
    pub fn save_now(&mut self, editor: &mut EditorCore, project_id: &str, now: Instant) -> Result<()> {
        self.idle.reset();
        self.request_save(editor, project_id, SaveKind::Manual, now)
    }

    /// Journal pending edits, then queue a save of the editor's content.
    ///
    /// Changes are drained before the snapshot is taken, so no edit reaches the
    /// journal after the save that already contains it. A journal failure does not
    /// stop the save; the worker rebases the journal once the save is processed.
    pub fn request_save(
        &mut self,
        editor: &mut EditorCore,
        project_id: &str,
        kind: SaveKind,
        now: Instant,
    ) -> Result<()> {
        if let Err(error) = self.record_changes(editor, project_id, now) {
            log::debug!("{kind:?} save of {project_id} proceeding without journal: {error}");
        }
        self.enqueue_save(editor.create_snapshot(project_id), kind)
    }

    fn enqueue_save(&mut self, snapshot: EditorSnapshot, kind: SaveKind) -> Result<()> {
        let project_id = snapshot.project_id.clone();
        let revision = snapshot.revision;
        self.send(PersistRequest::Save { snapshot, kind })?;
        self.journal_gaps.remove(&project_id);
        self.queued_revision.insert(project_id, revision);
        Ok(())
    }

    /// Queue a journal Marker for `project_id`.
    pub fn checkpoint(&mut self, project_id: &str) -> Result<()> {
        if self.journal_gaps.contains(project_id) {
            return Ok(());
        }
        self.send(PersistRequest::Checkpoint {
            project_id: project_id.to_string(),
        })
    }

    /// Whether journaling for `project_id` is paused after a dropped record
    pub fn journal_paused(&self, project_id: &str) -> bool {
        self.journal_gaps.contains(project_id)
    }

    /// Drain outcomes reported by the worker so far
    pub fn poll_events(&mut self) -> Vec<PersistEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Close the queue, wait for the worker to finish it, and return the last events.
    pub fn shutdown(mut self) -> Vec<PersistEvent> {
        self.stop();
        self.poll_events()
    }

    fn send(&self, request: PersistRequest) -> Result<()> {
        let Some(requests) = &self.requests else {
            return Err(StoreError::WorkerStopped);
        };
        requests.try_send(request).map_err(|error| match error {
            TrySendError::Full(_) => StoreError::QueueFull,
            TrySendError::Closed(_) => StoreError::WorkerStopped,
        })
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("persistence worker panicked");
        }
    }
}

impl Drop for PersistenceService {
    fn drop(&mut self) {
        self.stop();
    }
}
