//! Write-ahead journal.
//!
//! Every edit is appended as a fixed-header binary record:
//!
//! ```text
//! tag: u8 | position: u32 LE | length: u32 LE | timestamp_ms: u64 LE | payload
//! ```
//!
//! | tag | op     | position    | length               | payload        |
//! |-----|--------|-------------|----------------------|----------------|
//! | 1   | Insert | char offset | payload size (bytes) | UTF-8 text     |
//! | 2   | Delete | char offset | removed chars        | none           |
//! | 3   | Marker | 0           | 0                    | none           |
//!
//! A Marker is a consistent checkpoint; replay reconstructs the document as of the
//! last Marker and ignores everything after it. Records are never rewritten.
//!
//! The journal is split into numbered segments. Segments are rolled over by size,
//! giving consecutive indices. A rebase starts a fresh baseline (`Insert(0, text)`
//! plus a Marker) two indices above the newest segment, and only the last run of
//! consecutive indices is read back. A crash at any point of a rebase therefore
//! leaves either the old run or the complete new one as the live journal.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use scribe_core::{Command, PieceTable, PieceTableSnapshot};
use thiserror::Error;

use crate::config::DurabilityConfig;
use crate::error::{Result, StoreError, io_at};
use crate::layout::{ProjectPaths, remove_if_exists, sync_dir};

/// Size of the fixed record header
pub const RECORD_HEADER_LEN: usize = 1 + 4 + 4 + 8;

const BASELINE_TEMP: &str = "journal.tmp";

/// Journal record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JournalOp {
    /// Text inserted at a position
    Insert = 1,
    /// Characters removed at a position
    Delete = 2,
    /// Consistent checkpoint
    Marker = 3,
}

impl JournalOp {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(JournalOp::Insert),
            2 => Some(JournalOp::Delete),
            3 => Some(JournalOp::Marker),
            _ => None,
        }
    }
}

/// Why a record could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The buffer ends inside the record.
    #[error("truncated record")]
    Truncated,
    /// The tag byte is not a known [`JournalOp`].
    #[error("unknown record tag {0}")]
    UnknownTag(u8),
}

/// One journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Record kind
    pub op: JournalOp,
    /// Char offset the edit applies at
    pub position: u32,
    /// Payload bytes for inserts, removed chars for deletes
    pub length: u32,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Inserted UTF-8 text; empty for other ops
    pub payload: Vec<u8>,
}

impl JournalEntry {
    /// Insert record for `text` at char offset `position`
    pub fn insert(position: u32, text: &str, timestamp: u64) -> Result<Self> {
        let length = u32::try_from(text.len()).map_err(|_| StoreError::TooLarge(text.len()))?;
        Ok(Self {
            op: JournalOp::Insert,
            position,
            length,
            timestamp,
            payload: text.as_bytes().to_vec(),
        })
    }

    /// Delete record for `chars` characters at `position`
    pub fn delete(position: u32, chars: u32, timestamp: u64) -> Self {
        Self {
            op: JournalOp::Delete,
            position,
            length: chars,
            timestamp,
            payload: Vec::new(),
        }
    }

    /// Checkpoint record
    pub fn marker(timestamp: u64) -> Self {
        Self {
            op: JournalOp::Marker,
            position: 0,
            length: 0,
            timestamp,
            payload: Vec::new(),
        }
    }

    /// Record equivalent to an applied editor command
    pub fn from_command(command: &Command, timestamp: u64) -> Result<Self> {
        let position = u32::try_from(command.position())
            .map_err(|_| StoreError::TooLarge(command.position()))?;
        match command {
            Command::Insert { text, .. } => Self::insert(position, text, timestamp),
            Command::Delete { .. } => {
                let chars = u32::try_from(command.len())
                    .map_err(|_| StoreError::TooLarge(command.len()))?;
                Ok(Self::delete(position, chars, timestamp))
            }
        }
    }

    /// Size of the encoded record
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_LEN + self.payload.len()
    }

    /// Append the encoded record to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        out.push(self.op as u8);
        out.extend_from_slice(&self.position.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.payload);
    }

    /// Decode one record from the front of `buf`, returning it and its size
    pub fn decode(buf: &[u8]) -> std::result::Result<(Self, usize), RecordError> {
        let Some(header) = buf.get(..RECORD_HEADER_LEN) else {
            return Err(RecordError::Truncated);
        };
        let op = JournalOp::from_tag(header[0]).ok_or(RecordError::UnknownTag(header[0]))?;
        let position = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
        let length = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&header[9..17]);
        let timestamp = u64::from_le_bytes(timestamp);

        let payload_len = if op == JournalOp::Insert {
            length as usize
        } else {
            0
        };
        let end = RECORD_HEADER_LEN + payload_len;
        let payload = buf
            .get(RECORD_HEADER_LEN..end)
            .ok_or(RecordError::Truncated)?
            .to_vec();

        Ok((
            Self {
                op,
                position,
                length,
                timestamp,
                payload,
            },
            end,
        ))
    }
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Appends records to the live journal of one project.
#[derive(Debug)]
pub struct JournalWriter {
    paths: ProjectPaths,
    segment: u64,
    file: File,
    segment_len: u64,
    max_bytes: u64,
    checkpoint_every: usize,
    since_marker: usize,
    scratch: Vec<u8>,
}

impl JournalWriter {
    /// Open the newest segment for appending, creating `journal.1` if none exists.
    pub fn open(paths: ProjectPaths, config: &DurabilityConfig) -> Result<Self> {
        paths.ensure_dir()?;
        let segment = paths
            .journal_segments()?
            .last()
            .map(|(index, _)| *index)
            .unwrap_or(1);
        let path = paths.journal(segment);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_at(&path))?;
        let segment_len = file.metadata().map_err(io_at(&path))?.len();

        Ok(Self {
            paths,
            segment,
            file,
            segment_len,
            max_bytes: config.journal_max_bytes,
            checkpoint_every: config.checkpoint_every,
            since_marker: 0,
            scratch: Vec::new(),
        })
    }

    /// Index of the segment being appended to
    pub fn segment(&self) -> u64 {
        self.segment
    }

    /// Records appended since the last Marker
    pub fn pending(&self) -> usize {
        self.since_marker
    }

    /// Append a record.
    ///
    /// Markers are synced to storage. An automatic Marker follows every
    /// `checkpoint_every` edit records.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        self.write_record(entry)?;
        if entry.op == JournalOp::Marker {
            self.sync()?;
            self.since_marker = 0;
        } else {
            self.since_marker += 1;
            if self.checkpoint_every > 0 && self.since_marker >= self.checkpoint_every {
                self.checkpoint()?;
            }
        }
        Ok(())
    }

    /// Append a Marker unless the journal already ends with one
    pub fn checkpoint(&mut self) -> Result<()> {
        if self.since_marker == 0 {
            return Ok(());
        }
        self.append(&JournalEntry::marker(unix_millis()))
    }

    /// Replace the journal with a baseline of `text`.
    ///
    /// The baseline is written and synced under a temp name, renamed into place
    /// past an index gap, and only then are the old segments deleted.
    pub fn rebase(&mut self, text: &str) -> Result<()> {
        let old = self.paths.journal_segments()?;
        let segment = old.last().map(|(index, _)| index + 2).unwrap_or(1);

        let now = unix_millis();
        self.scratch.clear();
        if !text.is_empty() {
            JournalEntry::insert(0, text, now)?.encode(&mut self.scratch);
        }
        JournalEntry::marker(now).encode(&mut self.scratch);

        let temp = self.paths.dir().join(BASELINE_TEMP);
        let mut file = File::create(&temp).map_err(io_at(&temp))?;
        file.write_all(&self.scratch)
            .and_then(|()| file.sync_all())
            .map_err(io_at(&temp))?;
        drop(file);

        let path = self.paths.journal(segment);
        fs::rename(&temp, &path).map_err(io_at(&path))?;
        sync_dir(self.paths.dir()).map_err(io_at(self.paths.dir()))?;

        for (_, stale) in &old {
            remove_if_exists(stale)?;
        }

        self.file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(io_at(&path))?;
        self.segment = segment;
        self.segment_len = self.scratch.len() as u64;
        self.since_marker = 0;
        log::debug!(
            "journal rebased onto {} bytes at segment {segment}",
            text.len()
        );
        Ok(())
    }

    fn write_record(&mut self, entry: &JournalEntry) -> Result<()> {
        self.scratch.clear();
        entry.encode(&mut self.scratch);
        let record_len = self.scratch.len() as u64;
        if self.segment_len > 0 && self.segment_len + record_len > self.max_bytes {
            self.roll_over()?;
        }

        let path = self.paths.journal(self.segment);
        self.file.write_all(&self.scratch).map_err(io_at(&path))?;
        self.segment_len += record_len;
        Ok(())
    }

    fn roll_over(&mut self) -> Result<()> {
        self.sync()?;
        let next = self.segment + 1;
        let path = self.paths.journal(next);
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(io_at(&path))?;
        sync_dir(self.paths.dir()).map_err(io_at(self.paths.dir()))?;
        self.segment = next;
        self.segment_len = 0;
        log::debug!("journal rolled over to segment {next}");
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let path = self.paths.journal(self.segment);
        self.file.sync_data().map_err(io_at(&path))
    }
}

/// Result of reading the live journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalScan {
    /// Records in append order, up to the first unreadable one
    pub entries: Vec<JournalEntry>,
    /// Whether reading stopped early at a torn or corrupt record
    pub torn: bool,
}

/// Reads the live journal of one project.
#[derive(Debug, Clone)]
pub struct JournalReader {
    paths: ProjectPaths,
}

impl JournalReader {
    /// Reader for `paths`
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    /// Read every record of the live segment run.
    ///
    /// Reading stops at the first truncated or unknown record.
    pub fn read(&self) -> Result<JournalScan> {
        let segments = self.paths.journal_segments()?;
        let live_from = segments
            .windows(2)
            .rposition(|pair| pair[1].0 != pair[0].0 + 1)
            .map(|gap| gap + 1)
            .unwrap_or(0);

        let mut scan = JournalScan::default();
        for (index, path) in &segments[live_from..] {
            let bytes = fs::read(path).map_err(io_at(path))?;
            let mut offset = 0;
            while offset < bytes.len() {
                match JournalEntry::decode(&bytes[offset..]) {
                    Ok((entry, used)) => {
                        scan.entries.push(entry);
                        offset += used;
                    }
                    Err(err) => {
                        log::warn!(
                            "journal segment {index}: {err} at byte {offset}, ignoring the rest"
                        );
                        scan.torn = true;
                        return Ok(scan);
                    }
                }
            }
        }
        Ok(scan)
    }

    /// Read and replay; see [`replay`]
    pub fn recover(&self) -> Result<Option<String>> {
        Ok(replay(&self.read()?.entries))
    }
}

/// Apply `entries` to an empty document and return it as of the last Marker.
///
/// `None` when no Marker was reached. An insert whose payload is not UTF-8 ends
/// replay like a torn record.
pub fn replay(entries: &[JournalEntry]) -> Option<String> {
    let mut table = PieceTable::empty();
    let mut checkpoint: Option<PieceTableSnapshot> = None;

    for entry in entries {
        let position = entry.position as usize;
        match entry.op {
            JournalOp::Insert => {
                let Ok(text) = std::str::from_utf8(&entry.payload) else {
                    log::warn!("journal insert at {position} is not valid UTF-8");
                    break;
                };
                table.insert(position, text);
            }
            JournalOp::Delete => table.remove(position, position + entry.length as usize),
            JournalOp::Marker => checkpoint = Some(table.snapshot()),
        }
    }

    checkpoint.map(|snapshot| snapshot.text())
}
