//! Hand-off unit between the editing context and persistence.

use crate::storage::PieceTableSnapshot;

/// Immutable capture of an editor's document.
///
/// Produced by [`EditorCore::create_snapshot`](crate::EditorCore::create_snapshot)
/// without copying buffer contents. The value is `Send` and is meant to be moved to
/// whoever persists it.
#[derive(Debug, Clone)]
pub struct EditorSnapshot {
    /// Project the document belongs to
    pub project_id: String,
    /// Document content at capture time
    pub content: PieceTableSnapshot,
    /// Word count at capture time
    pub word_count: usize,
    /// Cursor offset at capture time
    pub cursor_pos: usize,
    /// Editor revision the snapshot was taken at
    pub revision: u64,
}

impl EditorSnapshot {
    /// Materialize the captured text
    pub fn text(&self) -> String {
        self.content.text()
    }
}
