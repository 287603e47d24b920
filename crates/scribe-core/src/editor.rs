//! Editor Core
//!
//! [`EditorCore`] ties the [`PieceTable`], the cursor/selection model and the
//! [`UndoLog`] together into the public editing API.
//!
//! # Overview
//!
//! - **Text mutation**: insert, delete selection, delete character, delete word
//! - **Navigation**: character, word, line and document granularity, each with an
//!   extend-selection variant
//! - **History**: every mutation records exactly one [`Command`]; undo/redo replay
//!   the inverse and restore the cursor
//! - **Search**: literal find, find next, find previous
//! - **Persistence hand-off**: zero-copy [`EditorSnapshot`]s and a drainable feed of
//!   applied changes for write-ahead journaling
//!
//! Every call is synchronous and leaves cursor line/column, word count and line
//! count up to date before returning. Out-of-range offsets are clamped; nothing in
//! this API fails.
//!
//! # Example
//!
//! ```rust
//! use scribe_core::{Direction, EditorCore};
//!
//! let mut editor = EditorCore::new("Hello World\n\nFoo");
//! assert_eq!(editor.word_count(), 3);
//! assert_eq!(editor.line_count(), 3);
//!
//! editor.move_cursor(11);
//! editor.insert("!");
//! assert_eq!(editor.text(), "Hello World!\n\nFoo");
//! assert_eq!(editor.cursor().offset, 12);
//!
//! editor.delete_char(Direction::Backward);
//! editor.undo();
//! assert_eq!(editor.text(), "Hello World!\n\nFoo");
//! ```

use crate::search::{self, SearchMatch, SearchOptions};
use crate::selection::{Cursor, Direction, Selection, word_boundary, word_range};
use crate::snapshot::EditorSnapshot;
use crate::storage::{DEFAULT_COMPACT_THRESHOLD, PieceTable};
use crate::text::{self, TextStats};
use crate::undo::{Command, DEFAULT_UNDO_LIMIT, UndoLog};

/// Tunables for an [`EditorCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    /// Maximum number of undoable commands
    pub undo_limit: usize,
    /// Piece count that triggers automatic compaction
    pub compact_threshold: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

/// What the user is currently doing, as far as the core can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Plain caret, no selection
    Normal,
    /// A selection is active
    Selecting,
    /// The last action was a search and nothing has moved or changed since
    Finding,
}

/// Editor Core state
///
/// # Example
///
/// ```rust
/// use scribe_core::EditorCore;
///
/// let mut editor = EditorCore::new("foo_bar  baz");
/// editor.move_cursor_word(scribe_core::Direction::Forward);
/// assert_eq!(editor.cursor().offset, 9);
/// ```
#[derive(Debug, Clone)]
pub struct EditorCore {
    table: PieceTable,
    cursor: Cursor,
    /// `selection.active` always equals `cursor.offset`.
    selection: Selection,
    undo_log: UndoLog,
    stats: TextStats,
    finding: bool,
    revision: u64,
    /// Bumped by every `load`; edits from different epochs share no baseline.
    load_epoch: u64,
    changes: Vec<Command>,
    change_feed: bool,
}

impl EditorCore {
    /// Create an editor holding `text`
    pub fn new(text: &str) -> Self {
        Self::with_config(text, EditorConfig::default())
    }

    /// Create an empty editor
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Create an editor with explicit tunables
    pub fn with_config(text: &str, config: EditorConfig) -> Self {
        let mut table = PieceTable::new(text);
        table.set_compact_threshold(config.compact_threshold);

        let mut editor = Self {
            table,
            cursor: Cursor::default(),
            selection: Selection::default(),
            undo_log: UndoLog::new(config.undo_limit),
            stats: TextStats::EMPTY,
            finding: false,
            revision: 0,
            load_epoch: 0,
            changes: Vec::new(),
            change_feed: true,
        };
        editor.refresh_derived();
        editor
    }

    /// Replace the document, resetting cursor, selection and history.
    ///
    /// Pending changes are dropped and [`Self::load_epoch`] advances, so a consumer
    /// of [`Self::take_changes`] can tell that later changes apply to the new text.
    pub fn load(&mut self, text: &str) {
        self.table.load(text);
        self.load_epoch += 1;
        self.cursor = Cursor::default();
        self.selection = Selection::default();
        self.undo_log.clear();
        self.changes.clear();
        self.finding = false;
        self.revision += 1;
        self.refresh_derived();
        log::debug!(
            "loaded document: {} chars, {} words",
            self.stats.chars,
            self.stats.words
        );
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Full document text
    pub fn text(&self) -> String {
        self.table.text()
    }

    /// Text in `[start, end)` (clamped)
    pub fn text_range(&self, start: usize, end: usize) -> String {
        self.table.text_range(start, end)
    }

    /// Currently selected text (empty without a selection)
    pub fn selected_text(&self) -> String {
        self.table
            .text_range(self.selection.min(), self.selection.max())
    }

    /// Document length in characters
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the document is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.stats.lines
    }

    /// Number of whitespace-separated words
    pub fn word_count(&self) -> usize {
        self.stats.words
    }

    /// Caret position
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Current selection (anchor == active when nothing is selected)
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Returns `true` if a non-empty selection is active
    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    /// Current interaction mode
    pub fn mode(&self) -> EditorMode {
        if self.finding {
            EditorMode::Finding
        } else if self.selection.has_selection() {
            EditorMode::Selecting
        } else {
            EditorMode::Normal
        }
    }

    /// Underlying storage
    pub fn piece_table(&self) -> &PieceTable {
        &self.table
    }

    /// Counter bumped by every text change (edits, undo, redo, load)
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.undo_log.can_undo()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.undo_log.can_redo()
    }

    /// Number of undoable commands
    pub fn undo_depth(&self) -> usize {
        self.undo_log.undo_depth()
    }

    /// Number of redoable commands
    pub fn redo_depth(&self) -> usize {
        self.undo_log.redo_depth()
    }

    /// Whether the document differs from the last saved state
    pub fn is_modified(&self) -> bool {
        !self.undo_log.is_clean()
    }

    /// Mark current state as saved (call after the document reached disk)
    pub fn mark_saved(&mut self) {
        self.undo_log.mark_clean();
    }

    // ---------------------------------------------------------------------
    // Persistence hand-off
    // ---------------------------------------------------------------------

    /// Capture the document for persistence without copying buffer contents.
    pub fn create_snapshot(&self, project_id: impl Into<String>) -> EditorSnapshot {
        EditorSnapshot {
            project_id: project_id.into(),
            content: self.table.snapshot(),
            word_count: self.stats.words,
            cursor_pos: self.cursor.offset,
            revision: self.revision,
        }
    }

    /// Drain the changes applied since the last call, in order.
    ///
    /// Undo shows up as the inverse command, redo as the original one, so replaying
    /// the drained commands reproduces the document.
    ///
    /// The feed grows until drained. An editor nobody persists should turn it off
    /// with [`Self::set_change_feed`].
    pub fn take_changes(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.changes)
    }

    /// Enable or disable recording of applied changes; disabling drops pending ones
    pub fn set_change_feed(&mut self, enabled: bool) {
        self.change_feed = enabled;
        if !enabled {
            self.changes.clear();
        }
    }

    /// Whether applied changes are being recorded
    pub fn change_feed(&self) -> bool {
        self.change_feed
    }

    /// Number of times [`Self::load`] has replaced the document
    pub fn load_epoch(&self) -> u64 {
        self.load_epoch
    }

    /// Fold the piece table into a single buffer
    pub fn compact(&mut self) {
        self.table.compact();
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// Move the caret to `offset` (clamped), clearing any selection
    pub fn move_cursor(&mut self, offset: usize) {
        self.place(offset, false);
    }

    /// Move the active end of the selection to `offset`
    pub fn move_cursor_select(&mut self, offset: usize) {
        self.place(offset, true);
    }

    /// Move the caret by `delta` characters
    pub fn move_cursor_relative(&mut self, delta: isize) {
        self.place(self.relative_target(delta), false);
    }

    /// Extend the selection by `delta` characters
    pub fn move_cursor_relative_select(&mut self, delta: isize) {
        self.place(self.relative_target(delta), true);
    }

    /// Jump one word in `direction`
    pub fn move_cursor_word(&mut self, direction: Direction) {
        let target = word_boundary(&self.table, self.cursor.offset, direction);
        self.place(target, false);
    }

    /// Extend the selection by one word in `direction`
    pub fn move_cursor_word_select(&mut self, direction: Direction) {
        let target = word_boundary(&self.table, self.cursor.offset, direction);
        self.place(target, true);
    }

    /// Move `delta` lines up (negative) or down, keeping the column where possible
    pub fn move_cursor_line(&mut self, delta: isize) {
        self.place(self.line_target(delta), false);
    }

    /// Extend the selection `delta` lines up or down
    pub fn move_cursor_line_select(&mut self, delta: isize) {
        self.place(self.line_target(delta), true);
    }

    /// Move to the start (`Backward`) or end (`Forward`) of the current line
    pub fn move_cursor_line_boundary(&mut self, direction: Direction) {
        self.place(self.line_boundary(direction), false);
    }

    /// Extend the selection to the start or end of the current line
    pub fn move_cursor_line_boundary_select(&mut self, direction: Direction) {
        self.place(self.line_boundary(direction), true);
    }

    /// Move to the start or end of the document
    pub fn move_cursor_document(&mut self, direction: Direction) {
        self.place(self.document_boundary(direction), false);
    }

    /// Extend the selection to the start or end of the document
    pub fn move_cursor_document_select(&mut self, direction: Direction) {
        self.place(self.document_boundary(direction), true);
    }

    /// Select the word touching the caret, if any
    pub fn select_word(&mut self) {
        if let Some((start, end)) = word_range(&self.table, self.cursor.offset) {
            self.set_selection(start, end);
        }
    }

    /// Select the whole document
    pub fn select_all(&mut self) {
        self.set_selection(0, self.table.len());
    }

    /// Set the selection explicitly; the caret goes to `active`
    pub fn set_selection(&mut self, anchor: usize, active: usize) {
        let len = self.table.len();
        self.selection = Selection::new(anchor.min(len), active.min(len));
        self.cursor.offset = self.selection.active;
        self.finding = false;
        self.update_cursor_line_col();
    }

    /// Collapse the selection onto the caret
    pub fn clear_selection(&mut self) {
        self.selection = Selection::caret(self.cursor.offset);
    }

    // ---------------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------------

    /// Type `text` at the caret.
    ///
    /// An active selection is deleted first, as its own undo step.
    pub fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.delete_selection();

        let position = self.cursor.offset;
        self.execute(Command::Insert {
            position,
            text: text.to_string(),
            caret: position,
        });
    }

    /// Delete the selected text; returns `false` when nothing was selected
    pub fn delete_selection(&mut self) -> bool {
        if !self.selection.has_selection() {
            return false;
        }
        self.delete_range(self.selection.min(), self.selection.max());
        true
    }

    /// Delete one character (or the selection) in `direction`
    pub fn delete_char(&mut self, direction: Direction) {
        if self.delete_selection() {
            return;
        }
        let offset = self.cursor.offset;
        match direction {
            Direction::Backward if offset > 0 => self.delete_range(offset - 1, offset),
            Direction::Backward => {}
            Direction::Forward => self.delete_range(offset, offset + 1),
        }
    }

    /// Delete up to the next word boundary (or the selection) in `direction`
    pub fn delete_word(&mut self, direction: Direction) {
        if self.delete_selection() {
            return;
        }
        let offset = self.cursor.offset;
        let target = word_boundary(&self.table, offset, direction);
        self.delete_range(offset.min(target), offset.max(target));
    }

    /// Revert the last command; returns `false` if there was nothing to undo
    pub fn undo(&mut self) -> bool {
        let Some(command) = self.undo_log.undo().cloned() else {
            return false;
        };
        let caret = command.revert(&mut self.table);
        self.record(command.inverse());
        self.after_change(caret);
        true
    }

    /// Re-apply the last undone command; returns `false` if there was nothing to redo
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.undo_log.redo().cloned() else {
            return false;
        };
        let caret = command.apply(&mut self.table);
        self.record(command);
        self.after_change(caret);
        true
    }

    // ---------------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------------

    /// All non-overlapping matches of `query`
    pub fn find(&mut self, query: &str) -> Vec<SearchMatch> {
        self.find_with(query, SearchOptions::default())
    }

    /// All non-overlapping matches of `query` under `options`
    pub fn find_with(&mut self, query: &str, options: SearchOptions) -> Vec<SearchMatch> {
        if query.is_empty() {
            return Vec::new();
        }
        self.finding = true;
        search::find_all(&self.table.text(), query, options)
    }

    /// Select the next match after the selection; returns its start, or the
    /// unchanged caret offset when there is none
    pub fn find_next(&mut self, query: &str) -> usize {
        self.find_next_with(query, SearchOptions::default())
    }

    /// [`find_next`](Self::find_next) with explicit options
    pub fn find_next_with(&mut self, query: &str, options: SearchOptions) -> usize {
        let found = search::find_next(&self.table.text(), query, options, self.selection.max());
        self.select_match(found)
    }

    /// Select the previous match before the selection; returns its start, or the
    /// unchanged caret offset when there is none
    pub fn find_prev(&mut self, query: &str) -> usize {
        self.find_prev_with(query, SearchOptions::default())
    }

    /// [`find_prev`](Self::find_prev) with explicit options
    pub fn find_prev_with(&mut self, query: &str, options: SearchOptions) -> usize {
        let found = search::find_prev(&self.table.text(), query, options, self.selection.min());
        self.select_match(found)
    }

    /// Leave find mode
    pub fn clear_find(&mut self) {
        self.finding = false;
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn place(&mut self, target: usize, extend: bool) {
        let target = target.min(self.table.len());
        if extend {
            self.selection.active = target;
        } else {
            self.selection = Selection::caret(target);
        }
        self.cursor.offset = target;
        self.finding = false;
        self.update_cursor_line_col();
    }

    fn select_match(&mut self, found: Option<SearchMatch>) -> usize {
        let Some(m) = found else {
            return self.cursor.offset;
        };
        self.set_selection(m.start, m.end);
        self.finding = true;
        m.start
    }

    fn relative_target(&self, delta: isize) -> usize {
        if delta < 0 {
            self.cursor.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.offset.saturating_add(delta.unsigned_abs())
        }
    }

    fn line_target(&self, delta: isize) -> usize {
        let last_line = self.stats.lines.saturating_sub(1);
        let line = if delta < 0 {
            self.cursor.line.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor
                .line
                .saturating_add(delta.unsigned_abs())
                .min(last_line)
        };
        if line == self.cursor.line {
            return self.cursor.offset;
        }

        match text::line_span(self.table.chars_from(0), line) {
            Some((start, len)) => start + self.cursor.column.min(len),
            None => self.table.len(),
        }
    }

    fn line_boundary(&self, direction: Direction) -> usize {
        let line_start = self.cursor.offset - self.cursor.column;
        match direction {
            Direction::Backward => line_start,
            Direction::Forward => {
                line_start
                    + self
                        .table
                        .chars_from(line_start)
                        .take_while(|ch| *ch != '\n')
                        .count()
            }
        }
    }

    fn document_boundary(&self, direction: Direction) -> usize {
        match direction {
            Direction::Backward => 0,
            Direction::Forward => self.table.len(),
        }
    }

    fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.table.len());
        if start >= end {
            return;
        }
        let text = self.table.text_range(start, end);
        self.execute(Command::Delete {
            position: start,
            text,
            caret: self.cursor.offset,
        });
    }

    fn execute(&mut self, command: Command) {
        let caret = command.apply(&mut self.table);
        self.record(command.clone());
        self.undo_log.push(command);
        self.after_change(caret);
    }

    fn record(&mut self, command: Command) {
        if self.change_feed {
            self.changes.push(command);
        }
    }

    fn after_change(&mut self, caret: usize) {
        self.revision += 1;
        self.finding = false;
        self.cursor.offset = caret.min(self.table.len());
        self.selection = Selection::caret(self.cursor.offset);
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.stats = TextStats::from_chars(self.table.chars_from(0));
        self.update_cursor_line_col();
    }

    fn update_cursor_line_col(&mut self) {
        let (line, column) = text::line_column(self.table.chars_from(0), self.cursor.offset);
        self.cursor.line = line;
        self.cursor.column = column;
    }
}

impl Default for EditorCore {
    fn default() -> Self {
        Self::empty()
    }
}
