use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Step of the atomic save protocol a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    /// Writing the full document into the temp file
    WritingTemp,
    /// Forcing the temp file to physical storage
    Syncing,
    /// Shifting numbered backups before a manual save
    Rotating,
    /// Renaming the temp file over the manuscript
    Renaming,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            SaveStage::WritingTemp => "writing temp file",
            SaveStage::Syncing => "syncing temp file",
            SaveStage::Rotating => "rotating snapshots",
            SaveStage::Renaming => "renaming temp file",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
/// Errors produced by the persistence layer.
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    /// A filesystem operation outside the save protocol failed.
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    #[error("save failed while {stage} ({}): {source}", path.display())]
    /// The atomic save protocol failed; the manuscript is unchanged.
    Save {
        /// Step that failed.
        stage: SaveStage,
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    #[error("persistence queue is full")]
    /// The bounded request queue had no room; the edit is still in memory.
    QueueFull,

    #[error("persistence worker has stopped")]
    /// The background worker is gone.
    WorkerStopped,

    #[error("could not start persistence worker: {0}")]
    /// Spawning the worker thread failed.
    Spawn(#[source] io::Error),

    #[error("document too large for the journal ({0} bytes)")]
    /// A record field would not fit in 32 bits.
    TooLarge(usize),

    #[error("invalid configuration: {0}")]
    /// The TOML configuration could not be parsed.
    Config(#[from] toml::de::Error),
}

/// Result alias for the persistence layer.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Attach a path to an [`io::Error`].
pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Attach a save stage and path to an [`io::Error`].
pub(crate) fn save_at(stage: SaveStage, path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Save {
        stage,
        path: path.to_path_buf(),
        source,
    }
}
