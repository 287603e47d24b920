//! Text search helpers.
//!
//! Literal substring search over a UTF-8 `&str`, using **character offsets** for all
//! public inputs/outputs. Queries are escaped and compiled into a regex so that
//! case-insensitive matching follows Unicode case folding.
//!
//! Searching never fails: an empty query or a query that cannot be compiled simply
//! yields no matches.

use regex::{Regex, RegexBuilder};

use crate::text::is_word_char;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_`).
    pub whole_word: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
        }
    }
}

/// A match returned by the search APIs, expressed as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug)]
struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .copied()
            .unwrap_or(self.text_len)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(!options.case_sensitive)
        .build()
    {
        Ok(re) => Some(re),
        Err(err) => {
            log::warn!("search query could not be compiled: {err}");
            None
        }
    }
}

fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    let before = if m.start == 0 {
        None
    } else {
        index.char_at(text, m.start - 1)
    };
    let after = index.char_at(text, m.end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Matches in scan order, already filtered by the whole-word rule.
fn matches<'t>(
    text: &'t str,
    re: &'t Regex,
    index: &'t CharIndex,
    options: SearchOptions,
) -> impl Iterator<Item = SearchMatch> + 't {
    re.find_iter(text)
        .map(move |m| SearchMatch {
            start: index.byte_to_char(m.start()),
            end: index.byte_to_char(m.end()),
        })
        .filter(move |m| !m.is_empty() && (!options.whole_word || is_whole_word(text, index, *m)))
}

/// Find all non-overlapping occurrences of `query` in `text`.
///
/// Returns an empty list if `query` is empty.
pub fn find_all(text: &str, query: &str, options: SearchOptions) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }
    let Some(re) = compile_search_regex(query, options) else {
        return Vec::new();
    };
    let index = CharIndex::new(text);
    matches(text, &re, &index, options).collect()
}

/// Find the first occurrence of `query` starting at or after `from_char`.
pub fn find_next(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Option<SearchMatch> {
    if query.is_empty() {
        return None;
    }

    let re = compile_search_regex(query, options)?;
    let index = CharIndex::new(text);

    let mut start_char = from_char.min(index.char_count());
    loop {
        let m = re.find_at(text, index.char_to_byte(start_char))?;
        let candidate = SearchMatch {
            start: index.byte_to_char(m.start()),
            end: index.byte_to_char(m.end()),
        };

        if options.whole_word && !is_whole_word(text, &index, candidate) {
            start_char = candidate.start + 1;
            continue;
        }

        return Some(candidate);
    }
}

/// Find the last occurrence of `query` that starts strictly before `before_char`.
pub fn find_prev(
    text: &str,
    query: &str,
    options: SearchOptions,
    before_char: usize,
) -> Option<SearchMatch> {
    if query.is_empty() {
        return None;
    }

    let re = compile_search_regex(query, options)?;
    let index = CharIndex::new(text);

    // Overlapping candidates matter here: in "aaa", the match before 2 is [1, 3).
    let mut last = None;
    let mut start_char = 0;
    while start_char < before_char.min(index.char_count()) {
        let Some(m) = re.find_at(text, index.char_to_byte(start_char)) else {
            break;
        };
        let candidate = SearchMatch {
            start: index.byte_to_char(m.start()),
            end: index.byte_to_char(m.end()),
        };
        if candidate.start >= before_char {
            break;
        }
        if !options.whole_word || is_whole_word(text, &index, candidate) {
            last = Some(candidate);
        }
        start_char = candidate.start + 1;
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_all_non_overlapping() {
        let matches = find_all("aaaa", "aa", SearchOptions::default());
        assert_eq!(
            matches,
            vec![
                SearchMatch { start: 0, end: 2 },
                SearchMatch { start: 2, end: 4 }
            ]
        );
    }

    #[test]
    fn test_find_all_uses_char_offsets() {
        let matches = find_all("héllo héllo", "llo", SearchOptions::default());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1], SearchMatch { start: 8, end: 11 });
    }

    #[test]
    fn test_query_is_literal() {
        let matches = find_all("a.b axb", "a.b", SearchOptions::default());
        assert_eq!(matches, vec![SearchMatch { start: 0, end: 3 }]);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(find_all("abc", "", SearchOptions::default()).is_empty());
        assert_eq!(find_next("abc", "", SearchOptions::default(), 0), None);
        assert_eq!(find_prev("abc", "", SearchOptions::default(), 3), None);
    }

    #[test]
    fn test_case_insensitive_and_whole_word() {
        let options = SearchOptions {
            case_sensitive: false,
            whole_word: true,
        };
        let matches = find_all("Cat catalog CAT", "cat", options);
        assert_eq!(
            matches,
            vec![
                SearchMatch { start: 0, end: 3 },
                SearchMatch { start: 12, end: 15 }
            ]
        );
    }

    #[test]
    fn test_find_next_and_prev() {
        let text = "one two one two";
        let options = SearchOptions::default();
        assert_eq!(
            find_next(text, "two", options, 5),
            Some(SearchMatch { start: 12, end: 15 })
        );
        assert_eq!(find_next(text, "two", options, 13), None);
        assert_eq!(
            find_prev(text, "one", options, 8),
            Some(SearchMatch { start: 0, end: 3 })
        );
        assert_eq!(
            find_prev(text, "one", options, 9),
            Some(SearchMatch { start: 8, end: 11 })
        );
        assert_eq!(find_prev(text, "one", options, 0), None);
    }
}
