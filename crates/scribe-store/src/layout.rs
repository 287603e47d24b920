//! On-disk layout of a project directory.
//!
//! ```text
//! <root>/<project_id>/
//!   manuscript.md        canonical document
//!   manuscript.md.~1     newest backup (manual saves only)
//!   manuscript.md.~2
//!   manuscript.md.~3     oldest backup
//!   manuscript.md.~tmp   backup being staged during rotation
//!   autosave.tmp         in-flight save; present only if a save was interrupted
//!   journal.1            write-ahead journal, rolled over by size
//!   journal.2
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, io_at};

/// Canonical document file name
pub const MANUSCRIPT_FILE: &str = "manuscript.md";
/// Temp file written before the atomic rename
pub const TEMP_FILE: &str = "autosave.tmp";
/// Prefix of journal segment files
pub const JOURNAL_PREFIX: &str = "journal.";

/// Paths of every artifact belonging to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    dir: PathBuf,
}

impl ProjectPaths {
    /// Layout rooted directly at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Layout for `project_id` below `root`.
    ///
    /// The id is used as a single path component; separators and other characters
    /// outside `[A-Za-z0-9._-]` are replaced with `_`.
    pub fn for_project(root: &Path, project_id: &str) -> Self {
        Self::new(root.join(sanitize_component(project_id)))
    }

    /// The project directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The canonical document
    pub fn manuscript(&self) -> PathBuf {
        self.dir.join(MANUSCRIPT_FILE)
    }

    /// The in-flight save file
    pub fn temp(&self) -> PathBuf {
        self.dir.join(TEMP_FILE)
    }

    /// Numbered backup `~n`; `1` is the newest
    pub fn backup(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{MANUSCRIPT_FILE}.~{n}"))
    }

    /// Staging name for the copy that becomes `~1`
    pub fn backup_temp(&self) -> PathBuf {
        self.dir.join(format!("{MANUSCRIPT_FILE}.~tmp"))
    }

    /// Journal segment `index`
    pub fn journal(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{JOURNAL_PREFIX}{index}"))
    }

    /// Create the project directory if needed
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(io_at(&self.dir))
    }

    /// Existing journal segments, oldest first.
    ///
    /// A missing project directory yields an empty list.
    pub fn journal_segments(&self) -> Result<Vec<(u64, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_at(&self.dir)(err)),
        };

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_at(&self.dir))?;
            let name = entry.file_name();
            let Some(index) = name
                .to_str()
                .and_then(|name| name.strip_prefix(JOURNAL_PREFIX))
                .and_then(|suffix| suffix.parse::<u64>().ok())
            else {
                continue;
            };
            segments.push((index, entry.path()));
        }
        segments.sort_by_key(|(index, _)| *index);
        Ok(segments)
    }
}

fn sanitize_component(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

/// Remove a file, treating "already gone" as success.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_at(path)(err)),
    }
}

/// Flush directory metadata so a completed rename survives power loss.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_inside_project_dir() {
        let paths = ProjectPaths::for_project(Path::new("/docs"), "novel");
        assert_eq!(paths.dir(), Path::new("/docs/novel"));
        assert_eq!(paths.manuscript(), Path::new("/docs/novel/manuscript.md"));
        assert_eq!(paths.temp(), Path::new("/docs/novel/autosave.tmp"));
        assert_eq!(paths.backup(2), Path::new("/docs/novel/manuscript.md.~2"));
        assert_eq!(
            paths.backup_temp(),
            Path::new("/docs/novel/manuscript.md.~tmp")
        );
        assert_eq!(paths.journal(7), Path::new("/docs/novel/journal.7"));
    }

    #[test]
    fn test_project_id_cannot_escape_root() {
        let root = Path::new("/docs");
        assert_eq!(
            ProjectPaths::for_project(root, "../etc").dir(),
            Path::new("/docs/.._etc")
        );
        assert_eq!(ProjectPaths::for_project(root, "..").dir(), Path::new("/docs/_.."));
        assert_eq!(ProjectPaths::for_project(root, "").dir(), Path::new("/docs/_"));
        assert_eq!(
            ProjectPaths::for_project(root, "a/b c").dir(),
            Path::new("/docs/a_b_c")
        );
    }

    #[test]
    fn test_journal_segments_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        for index in [10, 2, 1] {
            fs::write(paths.journal(index), b"").unwrap();
        }
        fs::write(dir.path().join("journal.bak"), b"").unwrap();
        fs::write(paths.manuscript(), b"text").unwrap();

        let indices: Vec<u64> = paths
            .journal_segments()
            .unwrap()
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(indices, vec![1, 2, 10]);
    }

    #[test]
    fn test_missing_dir_has_no_segments() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path().join("absent"));
        assert!(paths.journal_segments().unwrap().is_empty());
    }
}
