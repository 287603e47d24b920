//! Word, line and character statistics.
//!
//! All helpers take a character iterator so they can run directly over a
//! [`PieceTable`](crate::PieceTable) without materializing the document.

/// Character classes used for word-wise navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    /// Alphanumeric or `_`
    Word,
    /// Anything that is neither a word character nor whitespace
    Punctuation,
    Whitespace,
}

impl CharClass {
    pub(crate) fn of(ch: char) -> Self {
        if is_word_char(ch) {
            CharClass::Word
        } else if ch.is_whitespace() {
            CharClass::Whitespace
        } else {
            CharClass::Punctuation
        }
    }
}

pub(crate) fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Counts derived from a full scan of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    /// Number of characters
    pub chars: usize,
    /// Number of whitespace-separated words
    pub words: usize,
    /// Number of lines; `N` newlines make `N + 1` lines
    pub lines: usize,
}

impl TextStats {
    /// Statistics of an empty document.
    pub const EMPTY: TextStats = TextStats {
        chars: 0,
        words: 0,
        lines: 1,
    };

    /// Scan `chars` once and count characters, words and lines.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut stats = Self::EMPTY;
        let mut in_word = false;

        for ch in chars {
            stats.chars += 1;
            if ch == '\n' {
                stats.lines += 1;
            }
            if ch.is_whitespace() {
                in_word = false;
            } else if !in_word {
                in_word = true;
                stats.words += 1;
            }
        }

        stats
    }

    /// Statistics of `text`.
    pub fn of(text: &str) -> Self {
        Self::from_chars(text.chars())
    }
}

impl Default for TextStats {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Number of whitespace-separated words in `text`.
pub fn count_words(text: &str) -> usize {
    TextStats::of(text).words
}

/// Number of lines in `text`.
pub fn count_lines(text: &str) -> usize {
    TextStats::of(text).lines
}

/// Zero-based `(line, column)` of character `offset`, column counted in characters.
///
/// Offsets past the end resolve to the end of the text.
pub fn line_column(chars: impl IntoIterator<Item = char>, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut column = 0;
    for ch in chars.into_iter().take(offset) {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// `(start_offset, length)` of zero-based `line`, excluding its newline.
///
/// Returns `None` when the text has fewer lines.
pub fn line_span(chars: impl IntoIterator<Item = char>, line: usize) -> Option<(usize, usize)> {
    let mut current = 0;
    let mut start = 0;
    let mut offset = 0;

    for ch in chars {
        if ch == '\n' {
            if current == line {
                return Some((start, offset - start));
            }
            current += 1;
            start = offset + 1;
        }
        offset += 1;
    }

    (current == line).then_some((start, offset - start))
}
