//! Command-log undo/redo.
//!
//! The log is a linear history plus a cursor index: entries before the index can be
//! undone, entries at or after it can be redone. Pushing a new command discards the
//! redo zone. The log never touches the document; [`Command::apply`] and
//! [`Command::revert`] do.

use crate::storage::PieceTable;

/// Default maximum number of commands kept in the log.
pub const DEFAULT_UNDO_LIMIT: usize = 1000;

/// A recorded text mutation.
///
/// Positions are character offsets. `caret` is the cursor offset right before the
/// edit, restored on undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `text` was inserted at `position`
    Insert {
        /// Insertion offset
        position: usize,
        /// Inserted text
        text: String,
        /// Cursor offset before the edit
        caret: usize,
    },
    /// `text` was removed from `position`
    Delete {
        /// Start of the removed range
        position: usize,
        /// Removed text
        text: String,
        /// Cursor offset before the edit
        caret: usize,
    },
}

impl Command {
    /// Start offset of the affected range
    pub fn position(&self) -> usize {
        match self {
            Command::Insert { position, .. } | Command::Delete { position, .. } => *position,
        }
    }

    /// Inserted or removed text
    pub fn text(&self) -> &str {
        match self {
            Command::Insert { text, .. } | Command::Delete { text, .. } => text,
        }
    }

    /// Length of the affected range in characters
    pub fn len(&self) -> usize {
        self.text().chars().count()
    }

    /// Returns `true` for a command that changes nothing
    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Cursor offset before the edit
    pub fn caret(&self) -> usize {
        match self {
            Command::Insert { caret, .. } | Command::Delete { caret, .. } => *caret,
        }
    }

    /// Cursor offset right after the edit
    pub fn caret_after(&self) -> usize {
        match self {
            Command::Insert { position, .. } => position + self.len(),
            Command::Delete { position, .. } => *position,
        }
    }

    /// The command that undoes this one.
    pub fn inverse(&self) -> Command {
        let caret = self.caret_after();
        match self {
            Command::Insert { position, text, .. } => Command::Delete {
                position: *position,
                text: text.clone(),
                caret,
            },
            Command::Delete { position, text, .. } => Command::Insert {
                position: *position,
                text: text.clone(),
                caret,
            },
        }
    }

    /// Apply the edit to `table`; returns the resulting cursor offset.
    pub fn apply(&self, table: &mut PieceTable) -> usize {
        match self {
            Command::Insert { position, text, .. } => table.insert(*position, text),
            Command::Delete { position, .. } => table.remove(*position, position + self.len()),
        }
        self.caret_after()
    }

    /// Undo the edit on `table`; returns the cursor offset from before the edit.
    pub fn revert(&self, table: &mut PieceTable) -> usize {
        self.inverse().apply(table);
        self.caret()
    }
}

/// Linear undo/redo history.
#[derive(Debug, Clone)]
pub struct UndoLog {
    commands: Vec<Command>,
    /// Entries `< index` are undoable, entries `>= index` redoable.
    index: usize,
    limit: usize,
    /// Index matching the last saved state, if still reachable.
    clean_index: Option<usize>,
}

impl UndoLog {
    /// Create an empty log keeping at most `limit` commands
    pub fn new(limit: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            limit: limit.max(1),
            clean_index: Some(0),
        }
    }

    /// Record a new command, discarding the redo zone.
    pub fn push(&mut self, command: Command) {
        if let Some(clean_index) = self.clean_index
            && clean_index > self.index
        {
            self.clean_index = None;
        }
        self.commands.truncate(self.index);

        if self.commands.len() >= self.limit {
            self.commands.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean_index) => Some(clean_index - 1),
            };
        }

        self.commands.push(command);
        self.index = self.commands.len();
    }

    /// Step back; returns the command to revert.
    pub fn undo(&mut self) -> Option<&Command> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.commands.get(self.index)
    }

    /// Step forward; returns the command to re-apply.
    pub fn redo(&mut self) -> Option<&Command> {
        let command = self.commands.get(self.index)?;
        self.index += 1;
        Some(command)
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    /// Number of undoable commands
    pub fn undo_depth(&self) -> usize {
        self.index
    }

    /// Number of redoable commands
    pub fn redo_depth(&self) -> usize {
        self.commands.len() - self.index
    }

    /// Total number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
        self.clean_index = Some(0);
    }

    /// Whether the current position matches the last saved state
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.index)
    }

    /// Mark the current position as saved
    pub fn mark_clean(&mut self) {
        self.clean_index = Some(self.index);
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(position: usize, text: &str) -> Command {
        Command::Insert {
            position,
            text: text.to_string(),
            caret: position,
        }
    }

    #[test]
    fn test_undo_redo_walks_history() {
        let mut log = UndoLog::default();
        log.push(insert(0, "a"));
        log.push(insert(1, "b"));

        assert_eq!(log.undo(), Some(&insert(1, "b")));
        assert_eq!(log.undo(), Some(&insert(0, "a")));
        assert_eq!(log.undo(), None);
        assert!(!log.can_undo());

        assert_eq!(log.redo(), Some(&insert(0, "a")));
        assert_eq!((log.undo_depth(), log.redo_depth()), (1, 1));
    }

    #[test]
    fn test_push_truncates_redo_zone() {
        let mut log = UndoLog::default();
        log.push(insert(0, "a"));
        log.push(insert(1, "b"));
        log.undo();
        assert!(log.can_redo());

        log.push(insert(1, "c"));
        assert!(!log.can_redo());
        assert_eq!(log.len(), 2);
        assert_eq!(log.undo(), Some(&insert(1, "c")));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut log = UndoLog::new(2);
        log.push(insert(0, "a"));
        log.push(insert(1, "b"));
        log.push(insert(2, "c"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.undo(), Some(&insert(2, "c")));
        assert_eq!(log.undo(), Some(&insert(1, "b")));
        assert_eq!(log.undo(), None);
    }

    #[test]
    fn test_clean_point_tracking() {
        let mut log = UndoLog::default();
        assert!(log.is_clean());
        log.push(insert(0, "a"));
        assert!(!log.is_clean());
        log.mark_clean();
        log.push(insert(1, "b"));
        log.undo();
        assert!(log.is_clean());

        log.undo();
        log.push(insert(0, "z"));
        assert!(!log.is_clean());
    }

    #[test]
    fn test_command_apply_and_revert() {
        let mut table = PieceTable::new("Hello World");
        let delete = Command::Delete {
            position: 5,
            text: " World".to_string(),
            caret: 11,
        };
        assert_eq!(delete.apply(&mut table), 5);
        assert_eq!(table.text(), "Hello");
        assert_eq!(delete.revert(&mut table), 11);
        assert_eq!(table.text(), "Hello World");

        let inverse = delete.inverse();
        assert_eq!(inverse.caret(), 5);
        assert!(matches!(inverse, Command::Insert { position: 5, .. }));
    }
}
