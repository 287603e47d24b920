//! Atomic saves and snapshot rotation.
//!
//! A save never writes the manuscript in place. The full document goes to
//! `autosave.tmp`, is forced to storage, and then replaces the manuscript with a
//! single rename. After any crash the manuscript is either the old complete file or
//! the new complete file; the only possible leftover is the temp file, which
//! recovery picks up.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use scribe_core::PieceTableSnapshot;

use crate::error::{Result, SaveStage, io_at, save_at};
use crate::layout::{ProjectPaths, remove_if_exists, sync_dir};

/// Write the document to the temp file and sync it.
///
/// On failure the partial temp file is removed so it is never mistaken for an
/// interrupted save.
pub fn write_temp(paths: &ProjectPaths, content: &PieceTableSnapshot) -> Result<PathBuf> {
    paths.ensure_dir()?;
    let temp = paths.temp();

    let result = (|| {
        let file = File::create(&temp).map_err(save_at(SaveStage::WritingTemp, &temp))?;
        let mut writer = BufWriter::new(file);
        content
            .write_to(&mut writer)
            .and_then(|()| writer.flush())
            .map_err(save_at(SaveStage::WritingTemp, &temp))?;
        let file = writer
            .into_inner()
            .map_err(|err| save_at(SaveStage::WritingTemp, &temp)(err.into_error()))?;
        file.sync_all().map_err(save_at(SaveStage::Syncing, &temp))
    })();

    if let Err(err) = result {
        if let Err(cleanup) = remove_if_exists(&temp) {
            log::warn!("could not remove partial temp file: {cleanup}");
        }
        return Err(err);
    }
    Ok(temp)
}

/// Rename the synced temp file over the manuscript and sync the directory.
pub fn commit_temp(paths: &ProjectPaths) -> Result<()> {
    let temp = paths.temp();
    let manuscript = paths.manuscript();
    fs::rename(&temp, &manuscript).map_err(save_at(SaveStage::Renaming, &manuscript))?;
    sync_dir(paths.dir()).map_err(save_at(SaveStage::Renaming, paths.dir()))
}

/// Full save protocol.
///
/// With `rotate = Some(keep)` the numbered backups are shifted before the rename,
/// as a manual save does. Autosaves pass `None`.
pub fn atomic_save(
    paths: &ProjectPaths,
    content: &PieceTableSnapshot,
    rotate: Option<usize>,
) -> Result<()> {
    write_temp(paths, content)?;
    if let Some(keep) = rotate {
        rotate_snapshots(paths, keep)?;
    }
    commit_temp(paths)?;
    log::debug!(
        "saved {} ({} bytes)",
        paths.manuscript().display(),
        content.byte_len()
    );
    Ok(())
}

/// Shift `~1..~keep` down by one and copy the current manuscript to `~1`.
///
/// The oldest backup is dropped. The manuscript itself is copied, not moved, so
/// the canonical file exists at every instant. The copy is synced under a temp
/// name before any backup is shifted, so a crash never leaves a torn `~1`.
pub fn rotate_snapshots(paths: &ProjectPaths, keep: usize) -> Result<()> {
    let manuscript = paths.manuscript();
    if keep == 0 || !manuscript.exists() {
        return Ok(());
    }

    let rotating = |err: io::Error| save_at(SaveStage::Rotating, paths.dir())(err);
    let staged = paths.backup_temp();
    fs::copy(&manuscript, &staged).map_err(rotating)?;
    File::open(&staged)
        .and_then(|file| file.sync_all())
        .map_err(rotating)?;

    match fs::remove_file(paths.backup(keep)) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(rotating(err)),
        _ => {}
    }
    for n in (1..keep).rev() {
        let from = paths.backup(n);
        if from.exists() {
            fs::rename(&from, paths.backup(n + 1)).map_err(rotating)?;
        }
    }

    fs::rename(&staged, paths.backup(1)).map_err(rotating)?;
    sync_dir(paths.dir()).map_err(rotating)
}

/// Read the manuscript, `None` if it does not exist yet.
pub fn read_manuscript(paths: &ProjectPaths) -> Result<Option<String>> {
    read_optional(&paths.manuscript())
}

pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("{} is not valid UTF-8, decoding lossily", path.display());
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_at(path)(err)),
    }
}
