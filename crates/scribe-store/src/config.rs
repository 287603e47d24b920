//! Persistence configuration.
//!
//! Every field has a default, so an empty TOML document is a valid configuration:
//!
//! ```toml
//! root_dir = "/media/sd/documents"
//! idle_timeout_ms = 2000
//! queue_capacity = 32
//! snapshot_keep = 3
//! journal_max_bytes = 65536
//! checkpoint_every = 32
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, io_at};
use crate::layout::ProjectPaths;

/// Tunables for autosave, rotation and journaling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DurabilityConfig {
    /// Directory holding one sub-directory per project
    pub root_dir: PathBuf,
    /// Quiescence window after the last edit before an autosave fires
    pub idle_timeout_ms: u64,
    /// Capacity of the bounded request queue
    pub queue_capacity: usize,
    /// Number of numbered backups kept by manual saves
    pub snapshot_keep: usize,
    /// Size at which the journal rolls over to the next file
    pub journal_max_bytes: u64,
    /// Journal entries between automatic checkpoint markers
    pub checkpoint_every: usize,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("documents"),
            idle_timeout_ms: 2000,
            queue_capacity: 32,
            snapshot_keep: 3,
            journal_max_bytes: 64 * 1024,
            checkpoint_every: 32,
        }
    }
}

impl DurabilityConfig {
    /// Defaults rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(io_at(path))?;
        Self::from_toml_str(&source)
    }

    /// [`Self::idle_timeout_ms`] as a [`Duration`]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// On-disk layout of `project_id`
    pub fn project(&self, project_id: &str) -> ProjectPaths {
        ProjectPaths::for_project(&self.root_dir, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = DurabilityConfig::from_toml_str("").unwrap();
        assert_eq!(config, DurabilityConfig::default());
        assert_eq!(config.idle_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = DurabilityConfig::from_toml_str(
            "root_dir = \"/tmp/docs\"\nidle_timeout_ms = 500\nsnapshot_keep = 5\n",
        )
        .unwrap();
        assert_eq!(config.root_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(config.idle_timeout_ms, 500);
        assert_eq!(config.snapshot_keep, 5);
        assert_eq!(config.queue_capacity, 32);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = DurabilityConfig::from_toml_str("idle_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::StoreError::Config(_)));
    }
}
