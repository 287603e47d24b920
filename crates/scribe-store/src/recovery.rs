//! Startup recovery.
//!
//! Before a project is opened, [`RecoveryManager::inspect`] looks for evidence of an
//! unclean shutdown: a journal whose replay differs from the manuscript, or a left
//! over `autosave.tmp`. Nothing is overwritten until the user picks
//! [`RecoveryManager::restore`] or [`RecoveryManager::discard`].

use scribe_core::PieceTable;

use crate::atomic::{atomic_save, read_manuscript, read_optional};
use crate::config::DurabilityConfig;
use crate::error::Result;
use crate::journal::{JournalReader, JournalWriter};
use crate::layout::{ProjectPaths, remove_if_exists};

/// Where recoverable content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    /// Replay of the write-ahead journal
    Journal,
    /// An interrupted save's temp file
    TempFile,
}

/// Content that may be newer than the manuscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryCandidate {
    /// Origin of [`Self::content`]
    pub source: RecoverySource,
    /// Recoverable document text
    pub content: String,
    /// Current manuscript, `None` if it was never saved
    pub committed: Option<String>,
}

/// Detects and resolves interrupted sessions for one project.
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    paths: ProjectPaths,
    config: DurabilityConfig,
}

impl RecoveryManager {
    /// Manager for `project_id` under `config.root_dir`
    pub fn new(config: &DurabilityConfig, project_id: &str) -> Self {
        Self {
            paths: config.project(project_id),
            config: config.clone(),
        }
    }

    /// Layout of the inspected project
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Look for recoverable content.
    ///
    /// The journal is preferred since it is at least as recent as any temp file.
    /// A temp file identical to the manuscript is removed without asking.
    pub fn inspect(&self) -> Result<Option<RecoveryCandidate>> {
        let committed = read_manuscript(&self.paths)?;
        let baseline = committed.as_deref().unwrap_or_default();

        let scan = JournalReader::new(self.paths.clone()).read()?;
        if scan.torn {
            log::warn!("journal for {} has a torn tail", self.paths.dir().display());
        }
        if let Some(content) = crate::journal::replay(&scan.entries)
            && content != baseline
        {
            log::info!(
                "journal for {} differs from manuscript",
                self.paths.dir().display()
            );
            return Ok(Some(RecoveryCandidate {
                source: RecoverySource::Journal,
                content,
                committed,
            }));
        }

        match read_optional(&self.paths.temp())? {
            Some(content) if content != baseline => {
                log::info!(
                    "interrupted save found in {}",
                    self.paths.dir().display()
                );
                Ok(Some(RecoveryCandidate {
                    source: RecoverySource::TempFile,
                    content,
                    committed,
                }))
            }
            Some(_) => {
                remove_if_exists(&self.paths.temp())?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Make `candidate` the manuscript and reset the journal onto it.
    ///
    /// Restoring the same candidate twice leaves the same state.
    pub fn restore(&self, candidate: &RecoveryCandidate) -> Result<()> {
        let table = PieceTable::new(&candidate.content);
        atomic_save(&self.paths, &table.snapshot(), None)?;
        self.reset_journal(&candidate.content)?;
        log::info!(
            "restored {} from {:?}",
            self.paths.manuscript().display(),
            candidate.source
        );
        Ok(())
    }

    /// Drop recoverable content and keep the manuscript as is.
    pub fn discard(&self) -> Result<()> {
        remove_if_exists(&self.paths.temp())?;
        let committed = read_manuscript(&self.paths)?.unwrap_or_default();
        self.reset_journal(&committed)?;
        log::info!("discarded recovery data in {}", self.paths.dir().display());
        Ok(())
    }

    fn reset_journal(&self, text: &str) -> Result<()> {
        JournalWriter::open(self.paths.clone(), &self.config)?.rebase(text)
    }
}
