//! Piece Table storage layer
//!
//! The document is an immutable original buffer plus an append-only add buffer,
//! stitched together by an ordered list of pieces. Both buffers are reference
//! counted, so a [`PieceTableSnapshot`] only copies the piece list.
//!
//! All public offsets are **character** offsets; byte offsets stay internal.

use std::io::{self, Write};
use std::sync::Arc;

/// Default number of pieces after which the table folds itself back into a
/// single original buffer.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 512;

/// Buffer type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferType {
    /// Read-only buffer captured at load time
    Original,
    /// Append-only buffer holding all inserted text
    Added,
}

/// Piece structure: references a fragment in one of the two buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// Buffer the fragment lives in
    pub buffer_type: BufferType,
    /// Start position in the buffer (byte offset)
    pub start: usize,
    /// Byte length of the fragment
    pub byte_length: usize,
    /// Character count of the fragment
    pub char_count: usize,
}

impl Piece {
    /// Create a new Piece
    pub fn new(
        buffer_type: BufferType,
        start: usize,
        byte_length: usize,
        char_count: usize,
    ) -> Self {
        Self {
            buffer_type,
            start,
            byte_length,
            char_count,
        }
    }

    fn empty() -> Self {
        Self::new(BufferType::Original, 0, 0, 0)
    }
}

#[derive(Debug, Clone)]
struct Buffers {
    original: Arc<str>,
    added: Arc<String>,
}

impl Buffers {
    fn new(original: &str) -> Self {
        Self {
            original: Arc::from(original),
            added: Arc::new(String::new()),
        }
    }

    fn slice(&self, piece: &Piece) -> &str {
        let buffer: &str = match piece.buffer_type {
            BufferType::Original => &self.original,
            BufferType::Added => &self.added,
        };
        &buffer[piece.start..piece.start + piece.byte_length]
    }
}

/// Byte offset of the `char_offset`-th character of a piece's text.
fn byte_offset(piece: &Piece, text: &str, char_offset: usize) -> usize {
    if piece.byte_length == piece.char_count {
        // ASCII-only fragment.
        return char_offset.min(piece.byte_length);
    }
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(piece.byte_length)
}

fn collect_range(buffers: &Buffers, pieces: &[Piece], start: usize, end: usize) -> String {
    let mut result = String::new();
    let mut current_offset = 0;

    for piece in pieces {
        if current_offset >= end {
            break;
        }
        let piece_end = current_offset + piece.char_count;

        if piece_end > start {
            let text = buffers.slice(piece);
            let skip = start.saturating_sub(current_offset);
            let take = end.min(piece_end) - current_offset;
            let from = byte_offset(piece, text, skip);
            let to = byte_offset(piece, text, take);
            result.push_str(&text[from..to]);
        }

        current_offset = piece_end;
    }

    result
}

/// Piece Table - main storage structure
///
/// # Example
///
/// ```rust
/// use scribe_core::PieceTable;
///
/// let mut table = PieceTable::new("Hello World");
/// table.insert(5, ",");
/// table.remove(0, 7);
/// assert_eq!(table.text(), "World");
/// ```
#[derive(Debug, Clone)]
pub struct PieceTable {
    buffers: Buffers,
    /// Never empty; a single zero-length piece represents the empty document.
    pieces: Vec<Piece>,
    total_chars: usize,
    compact_threshold: usize,
}

impl PieceTable {
    /// Create a new Piece Table from original text
    pub fn new(text: &str) -> Self {
        let mut table = Self {
            buffers: Buffers::new(""),
            pieces: vec![Piece::empty()],
            total_chars: 0,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        };
        table.load(text);
        table
    }

    /// Create an empty Piece Table
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Replace the whole document with `text`, dropping all pieces and the add buffer.
    pub fn load(&mut self, text: &str) {
        self.buffers = Buffers::new(text);
        self.pieces = vec![Piece::new(
            BufferType::Original,
            0,
            text.len(),
            text.chars().count(),
        )];
        self.total_chars = self.pieces[0].char_count;
    }

    /// Insert text at the specified character offset (clamped to the document length)
    pub fn insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }

        let offset = offset.min(self.total_chars);
        let char_count = text.chars().count();

        // Clones the add buffer only while a snapshot still shares it.
        let added = Arc::make_mut(&mut self.buffers.added);
        let add_start = added.len();
        added.push_str(text);

        let index = self.split_at(offset);
        self.pieces.insert(
            index,
            Piece::new(BufferType::Added, add_start, text.len(), char_count),
        );
        self.total_chars += char_count;

        self.drop_empty_pieces();
        self.try_merge_adjacent_pieces();
        self.check_compact();
    }

    /// Remove the characters in `[start, end)` (both ends clamped)
    pub fn remove(&mut self, start: usize, end: usize) {
        let end = end.min(self.total_chars);
        let start = start.min(end);
        if start == end {
            return;
        }

        let first = self.split_at(start);
        let last = self.split_at(end);
        self.pieces.drain(first..last);

        self.total_chars = self.pieces.iter().map(|p| p.char_count).sum();
        if self.pieces.is_empty() {
            self.pieces.push(Piece::empty());
        }
        self.check_compact();
    }

    /// Get the entire document content
    pub fn text(&self) -> String {
        let mut result = String::with_capacity(self.byte_len());
        for piece in &self.pieces {
            result.push_str(self.buffers.slice(piece));
        }
        result
    }

    /// Get the text in `[start, end)`, touching only the pieces that overlap the range
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.total_chars);
        let start = start.min(end);
        collect_range(&self.buffers, &self.pieces, start, end)
    }

    /// Iterate the characters starting at `offset`
    pub fn chars_from(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        let mut remaining = offset.min(self.total_chars);
        self.pieces.iter().flat_map(move |piece| {
            let text = self.buffers.slice(piece);
            let skip = remaining.min(piece.char_count);
            remaining -= skip;
            text[byte_offset(piece, text, skip)..].chars()
        })
    }

    /// Iterate the characters before `offset`, nearest first
    pub fn chars_before(&self, offset: usize) -> impl Iterator<Item = char> + '_ {
        let mut tail = self.total_chars - offset.min(self.total_chars);
        self.pieces.iter().rev().flat_map(move |piece| {
            let text = self.buffers.slice(piece);
            let dropped = tail.min(piece.char_count);
            tail -= dropped;
            text[..byte_offset(piece, text, piece.char_count - dropped)]
                .chars()
                .rev()
        })
    }

    /// Character at `offset`, if any
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset >= self.total_chars {
            return None;
        }
        self.chars_from(offset).next()
    }

    /// Total character count of the document
    pub fn len(&self) -> usize {
        self.total_chars
    }

    /// Returns `true` if the document holds no text.
    pub fn is_empty(&self) -> bool {
        self.total_chars == 0
    }

    /// Total byte count of the document
    pub fn byte_len(&self) -> usize {
        self.pieces.iter().map(|p| p.byte_length).sum()
    }

    /// Current piece list
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Number of pieces in the table
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Size of the add buffer in bytes
    pub fn add_buffer_size(&self) -> usize {
        self.buffers.added.len()
    }

    /// Produce a point-in-time view sharing both buffers; only the piece list is copied.
    pub fn snapshot(&self) -> PieceTableSnapshot {
        PieceTableSnapshot {
            buffers: self.buffers.clone(),
            pieces: self.pieces.clone(),
            total_chars: self.total_chars,
        }
    }

    /// Fold the whole document into a fresh original buffer with a single piece.
    ///
    /// Outstanding snapshots keep the old buffers alive and are unaffected.
    pub fn compact(&mut self) {
        let text = self.text();
        log::debug!(
            "compacting piece table: {} pieces, {} add-buffer bytes",
            self.pieces.len(),
            self.buffers.added.len()
        );
        self.load(&text);
    }

    /// Set the piece count that triggers automatic compaction
    pub fn set_compact_threshold(&mut self, threshold: usize) {
        self.compact_threshold = threshold.max(1);
    }

    /// Ensure a piece boundary exists at `offset`; returns the index of the first
    /// piece starting at or after it.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut current_offset = 0;

        for idx in 0..self.pieces.len() {
            let piece = self.pieces[idx];
            if offset == current_offset {
                return idx;
            }
            let piece_end = current_offset + piece.char_count;
            if offset < piece_end {
                let (left, right) = self.split_piece(&piece, offset - current_offset);
                self.pieces.splice(idx..=idx, [left, right]);
                return idx + 1;
            }
            current_offset = piece_end;
        }

        self.pieces.len()
    }

    /// Split a piece at the specified character position
    fn split_piece(&self, piece: &Piece, char_offset: usize) -> (Piece, Piece) {
        let text = self.buffers.slice(piece);
        let byte = byte_offset(piece, text, char_offset);

        let left = Piece::new(piece.buffer_type, piece.start, byte, char_offset);
        let right = Piece::new(
            piece.buffer_type,
            piece.start + byte,
            piece.byte_length - byte,
            piece.char_count - char_offset,
        );
        (left, right)
    }

    fn drop_empty_pieces(&mut self) {
        if self.pieces.len() > 1 {
            self.pieces.retain(|p| p.char_count > 0);
        }
        if self.pieces.is_empty() {
            self.pieces.push(Piece::empty());
        }
    }

    /// Two pieces merge when both point into the add buffer back to back
    fn can_merge(p1: &Piece, p2: &Piece) -> bool {
        p1.buffer_type == BufferType::Added
            && p2.buffer_type == BufferType::Added
            && p1.start + p1.byte_length == p2.start
    }

    fn try_merge_adjacent_pieces(&mut self) {
        let mut i = 0;
        while i + 1 < self.pieces.len() {
            let (p1, p2) = (self.pieces[i], self.pieces[i + 1]);
            if Self::can_merge(&p1, &p2) {
                self.pieces[i] = Piece::new(
                    BufferType::Added,
                    p1.start,
                    p1.byte_length + p2.byte_length,
                    p1.char_count + p2.char_count,
                );
                self.pieces.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    fn check_compact(&mut self) {
        if self.pieces.len() > self.compact_threshold {
            self.compact();
        }
    }
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Immutable point-in-time view of a [`PieceTable`].
///
/// Shares the table's buffers; later edits to the table never show up here.
#[derive(Debug, Clone)]
pub struct PieceTableSnapshot {
    buffers: Buffers,
    pieces: Vec<Piece>,
    total_chars: usize,
}

impl PieceTableSnapshot {
    /// Character count of the captured document
    pub fn len(&self) -> usize {
        self.total_chars
    }

    /// Returns `true` if the captured document is empty.
    pub fn is_empty(&self) -> bool {
        self.total_chars == 0
    }

    /// Byte count of the captured document
    pub fn byte_len(&self) -> usize {
        self.pieces.iter().map(|p| p.byte_length).sum()
    }

    /// Iterate the document as borrowed string fragments, in order
    pub fn chunks(&self) -> impl Iterator<Item = &str> + '_ {
        self.pieces
            .iter()
            .map(|piece| self.buffers.slice(piece))
            .filter(|chunk| !chunk.is_empty())
    }

    /// Materialize the captured document
    pub fn text(&self) -> String {
        let mut result = String::with_capacity(self.byte_len());
        for chunk in self.chunks() {
            result.push_str(chunk);
        }
        result
    }

    /// Text in `[start, end)` of the captured document
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.total_chars);
        let start = start.min(end);
        collect_range(&self.buffers, &self.pieces, start, end)
    }

    /// Stream the document into `writer` piece by piece
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for chunk in self.chunks() {
            writer.write_all(chunk.as_bytes())?;
        }
        Ok(())
    }
}
