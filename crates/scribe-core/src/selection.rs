//! Cursor and selection model.
//!
//! A [`Selection`] is an anchor plus an active end; the caret always sits on the
//! active end. Word-wise scanning helpers work directly on the [`PieceTable`].

use crate::storage::PieceTable;
use crate::text::CharClass;

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the start of the document
    Backward,
    /// Towards the end of the document
    Forward,
}

/// Caret position with derived line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Character offset, always `<= len`
    pub offset: usize,
    /// Zero-based line of `offset`
    pub line: usize,
    /// Zero-based column of `offset`, in characters
    pub column: usize,
}

/// Anchor-based selection range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Fixed end of the selection
    pub anchor: usize,
    /// Moving end of the selection (where the caret is)
    pub active: usize,
}

impl Selection {
    /// An empty selection (a plain caret) at `offset`
    pub fn caret(offset: usize) -> Self {
        Self {
            anchor: offset,
            active: offset,
        }
    }

    /// Create a selection from `anchor` to `active`
    pub fn new(anchor: usize, active: usize) -> Self {
        Self { anchor, active }
    }

    /// Returns `true` if the selection covers at least one character
    pub fn has_selection(&self) -> bool {
        self.anchor != self.active
    }

    /// Lower bound of the selection
    pub fn min(&self) -> usize {
        self.anchor.min(self.active)
    }

    /// Upper bound of the selection
    pub fn max(&self) -> usize {
        self.anchor.max(self.active)
    }

    /// Selected character count
    pub fn len(&self) -> usize {
        self.max() - self.min()
    }

    /// Returns `true` if nothing is selected
    pub fn is_empty(&self) -> bool {
        !self.has_selection()
    }

    /// `true` when the active end precedes the anchor
    pub fn is_backward(&self) -> bool {
        self.active < self.anchor
    }
}

/// Offset reached by a word jump from `offset` in `direction`.
///
/// Forward: skip a run of word characters (or else a run of punctuation), then any
/// whitespace. Backward: skip whitespace, then one run of word characters or
/// punctuation.
pub(crate) fn word_boundary(table: &PieceTable, offset: usize, direction: Direction) -> usize {
    let offset = offset.min(table.len());
    match direction {
        Direction::Forward => {
            let mut chars = table.chars_from(offset).map(CharClass::of).peekable();
            let mut pos = offset;
            if let Some(&(class @ (CharClass::Word | CharClass::Punctuation))) = chars.peek() {
                while chars.next_if_eq(&class).is_some() {
                    pos += 1;
                }
            }
            while chars.next_if_eq(&CharClass::Whitespace).is_some() {
                pos += 1;
            }
            pos
        }
        Direction::Backward => {
            let mut chars = table.chars_before(offset).map(CharClass::of).peekable();
            let mut pos = offset;
            while chars.next_if_eq(&CharClass::Whitespace).is_some() {
                pos -= 1;
            }
            if let Some(&class) = chars.peek() {
                while chars.next_if_eq(&class).is_some() {
                    pos -= 1;
                }
            }
            pos
        }
    }
}

/// Range of word characters around `offset`, if the caret touches a word.
pub(crate) fn word_range(table: &PieceTable, offset: usize) -> Option<(usize, usize)> {
    let offset = offset.min(table.len());
    let left = table
        .chars_before(offset)
        .take_while(|ch| CharClass::of(*ch) == CharClass::Word)
        .count();
    let right = table
        .chars_from(offset)
        .take_while(|ch| CharClass::of(*ch) == CharClass::Word)
        .count();

    (left + right > 0).then(|| (offset - left, offset + right))
}
