//! Find and replace.
//!
//! The text-level helpers ([`find_next`], [`find_prev`], [`find_all`]) work on a single
//! `&str` with **character offsets**. The document-level functions search every
//! top-level text block; matches never span blocks and table cell text is not searched.
//!
//! [`SearchState`] keeps the cursor across calls: [`SearchState::find_next`] resumes
//! after the current match and wraps around the end of the document, so with N matches
//! N calls starting from the first match come back to it.

use crate::document::{Block, BlockKey, Document};
use crate::edit::{Edit, strip_cut_entities};
use crate::selection::{Point, Selection};
use crate::text::{CharIndex, char_len};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words.
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match within one text, expressed as a half-open character range.
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

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid regex: {0}")]
    /// The provided regex pattern failed to compile.
    InvalidRegex(#[from] regex::Error),
}

/// A compiled query. An empty query matches nothing.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Option<Regex>,
    options: SearchOptions,
}

impl Matcher {
    /// Compile `query`; the query is escaped unless `options.regex` is set.
    pub fn new(query: &str, options: SearchOptions) -> Result<Self, SearchError> {
        if query.is_empty() {
            return Ok(Self {
                regex: None,
                options,
            });
        }
        let pattern = if options.regex {
            query.to_string()
        } else {
            regex::escape(query)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .multi_line(true)
            .build()?;
        Ok(Self {
            regex: Some(regex),
            options,
        })
    }

    /// All non-empty, non-overlapping matches in `text`, left to right.
    pub fn find_all(&self, text: &str) -> Vec<SearchMatch> {
        let index = CharIndex::new(text);
        let mut matches = Vec::new();
        let mut from = 0;
        while let Some(m) = self.find_indexed(text, &index, from) {
            from = m.end;
            matches.push(m);
        }
        matches
    }

    /// First match starting at or after `from_char`.
    pub fn find_from(&self, text: &str, from_char: usize) -> Option<SearchMatch> {
        self.find_indexed(text, &CharIndex::new(text), from_char)
    }

    fn find_indexed(&self, text: &str, index: &CharIndex, from_char: usize) -> Option<SearchMatch> {
        let re = self.regex.as_ref()?;

        let mut start_char = from_char.min(index.char_count());
        loop {
            let m = re.find_at(text, index.char_to_byte(start_char))?;
            let candidate = SearchMatch {
                start: index.byte_to_char(m.start()),
                end: index.byte_to_char(m.end()),
            };

            if candidate.is_empty() {
                if candidate.end >= index.char_count() {
                    return None;
                }
                start_char = candidate.end + 1;
                continue;
            }
            // A rejected candidate may overlap a whole word that starts inside it.
            if self.options.whole_word && !is_whole_word(text, index, candidate) {
                start_char = candidate.start + 1;
                continue;
            }
            return Some(candidate);
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    if m.is_empty() {
        return false;
    }

    let before = if m.start == 0 {
        None
    } else {
        index.char_at(text, m.start.saturating_sub(1))
    };
    let after = index.char_at(text, m.end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Find the next occurrence of `query` in `text`, searching forward from `from_char`.
///
/// - Returns `Ok(None)` if no match is found (or if `query` is empty).
/// - Match ranges are character offsets and are half-open (`[start, end)`).
pub fn find_next(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    Ok(Matcher::new(query, options)?.find_from(text, from_char))
}

/// Find the previous occurrence of `query` in `text` that ends at or before `from_char`.
pub fn find_prev(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    let matcher = Matcher::new(query, options)?;
    Ok(matcher
        .find_all(text)
        .into_iter()
        .take_while(|m| m.end <= from_char)
        .last())
}

/// Find all occurrences of `query` in `text`.
pub fn find_all(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, SearchError> {
    Ok(Matcher::new(query, options)?.find_all(text))
}

/// Returns `true` if `range` exactly matches an occurrence of `query` in `text`.
pub fn is_match_exact(
    text: &str,
    query: &str,
    options: SearchOptions,
    range: SearchMatch,
) -> Result<bool, SearchError> {
    if range.is_empty() {
        return Ok(false);
    }
    let Some(next) = find_next(text, query, options, range.start)? else {
        return Ok(false);
    };
    Ok(next == range)
}

/// Active search text and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Search text (or regex, with `options.regex`).
    pub pattern: String,
    /// Matching options.
    #[serde(flatten)]
    pub options: SearchOptions,
}

impl SearchCriteria {
    /// Criteria with default options.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            options: SearchOptions::default(),
        }
    }

    /// Builder: set the options.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    fn matcher(&self) -> Result<Matcher, SearchError> {
        Matcher::new(&self.pattern, self.options)
    }
}

/// A match inside a document block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMatch {
    /// Block holding the match.
    pub block: BlockKey,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl DocumentMatch {
    /// The match as a forward selection.
    pub fn to_selection(&self) -> Selection {
        Selection::within(self.block.clone(), self.start, self.end)
    }
}

fn searchable(block: &Block) -> bool {
    block.table().is_none()
}

fn collect_matches(doc: &Document, matcher: &Matcher) -> Vec<(usize, DocumentMatch)> {
    doc.blocks()
        .enumerate()
        .filter(|(_, block)| searchable(block))
        .flat_map(|(index, block)| {
            matcher.find_all(block.text()).into_iter().map(move |m| {
                (
                    index,
                    DocumentMatch {
                        block: block.key().clone(),
                        start: m.start,
                        end: m.end,
                    },
                )
            })
        })
        .collect()
}

/// Every match in the document, top to bottom, left to right.
pub fn find_matches(doc: &Document, criteria: &SearchCriteria) -> Result<Vec<DocumentMatch>, SearchError> {
    let matcher = criteria.matcher()?;
    Ok(collect_matches(doc, &matcher)
        .into_iter()
        .map(|(_, m)| m)
        .collect())
}

/// Find/replace session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Active criteria; `None` when no search is running.
    pub criteria: Option<SearchCriteria>,
    /// The highlighted match.
    pub current: Option<DocumentMatch>,
    /// Where the next forward search resumes.
    pub cursor: Option<Point>,
}

fn position(doc: &Document, point: &Point) -> Option<(usize, usize)> {
    doc.block_index(&point.block).map(|index| (index, point.offset))
}

impl SearchState {
    /// Start a new search. The cursor starts at `from` (usually the caret).
    pub fn new(criteria: SearchCriteria, from: Option<Point>) -> Self {
        Self {
            criteria: Some(criteria),
            current: None,
            cursor: from,
        }
    }

    /// Move to the next match after the cursor, wrapping past the end of the document.
    pub fn find_next(&self, doc: &Document) -> Result<SearchState, SearchError> {
        let Some(criteria) = &self.criteria else {
            return Ok(self.clone());
        };
        let matches = collect_matches(doc, &criteria.matcher()?);
        let from = self
            .cursor
            .as_ref()
            .and_then(|cursor| position(doc, cursor))
            .unwrap_or((0, 0));

        let next = matches
            .iter()
            .find(|(index, m)| (*index, m.start) >= from)
            .or_else(|| matches.first())
            .map(|(_, m)| m.clone());
        tracing::debug!(pattern = %criteria.pattern, found = next.is_some(), "find next");
        Ok(self.moved_to(next))
    }

    /// Move to the previous match before the current one, wrapping past the start.
    pub fn find_prev(&self, doc: &Document) -> Result<SearchState, SearchError> {
        let Some(criteria) = &self.criteria else {
            return Ok(self.clone());
        };
        let matches = collect_matches(doc, &criteria.matcher()?);
        let before = match &self.current {
            Some(current) => position(doc, &Point::new(current.block.clone(), current.start)),
            None => self.cursor.as_ref().and_then(|cursor| position(doc, cursor)),
        };

        let prev = before
            .and_then(|before| {
                matches
                    .iter()
                    .rev()
                    .find(|(index, m)| (*index, m.end) <= before)
            })
            .or_else(|| matches.last())
            .map(|(_, m)| m.clone());
        tracing::debug!(pattern = %criteria.pattern, found = prev.is_some(), "find prev");
        Ok(self.moved_to(prev))
    }

    fn moved_to(&self, found: Option<DocumentMatch>) -> SearchState {
        let cursor = found
            .as_ref()
            .map(|m| Point::new(m.block.clone(), m.end))
            .or_else(|| self.cursor.clone());
        SearchState {
            criteria: self.criteria.clone(),
            current: found,
            cursor,
        }
    }

    /// Returns `true` if the current match still holds at its recorded range.
    pub fn current_is_valid(&self, doc: &Document) -> Result<bool, SearchError> {
        let (Some(criteria), Some(current)) = (&self.criteria, &self.current) else {
            return Ok(false);
        };
        let Some(block) = doc.block(&current.block) else {
            return Ok(false);
        };
        if current.end > block.len() {
            return Ok(false);
        }
        is_match_exact(
            block.text(),
            &criteria.pattern,
            criteria.options,
            SearchMatch {
                start: current.start,
                end: current.end,
            },
        )
    }

    /// Replace the current match with `text` and advance to the next match.
    ///
    /// Returns `None` when there is no current match or it no longer holds.
    pub fn replace(&self, doc: &Document, text: &str) -> Result<Option<(Edit, SearchState)>, SearchError> {
        if !self.current_is_valid(doc)? {
            return Ok(None);
        }
        let Some(current) = &self.current else {
            return Ok(None);
        };
        let Some(index) = doc.block_index(&current.block) else {
            return Ok(None);
        };
        let Some(block) = doc.block_at(index) else {
            return Ok(None);
        };

        let replaced = replace_span(doc, block, current.start, current.end, text);
        let document = doc.replace_block(index, replaced);
        let resume = Point::new(current.block.clone(), current.start + char_len(text));
        let advanced = SearchState {
            criteria: self.criteria.clone(),
            current: None,
            cursor: Some(resume.clone()),
        }
        .find_next(&document)?;

        Ok(Some((
            Edit {
                document,
                selection: Selection::new(resume.clone(), resume),
            },
            advanced,
        )))
    }
}

/// Replace `[start, end)` with `text`, keeping the styles and the entity (a link, say)
/// present at `start`.
fn replace_span(doc: &Document, block: &Block, start: usize, end: usize, text: &str) -> Block {
    let styles = block.styles_at(start);
    let kept = strip_cut_entities(doc, block, start, end);
    let entity = kept
        .entity_at(start)
        .filter(|id| doc.entity(*id).is_some());
    let mut replaced = kept.splice(start, end, text, &styles);

    let inserted_end = start + char_len(text);
    if let Some(entity) = entity
        && inserted_end > start
    {
        replaced.entities.clear_range(start, inserted_end);
        replaced.entities.insert(start, inserted_end, entity);
    }
    replaced
}

/// Replace every match with `text` in one pass. Returns the new document and the number
/// of replacements.
pub fn replace_all(
    doc: &Document,
    criteria: &SearchCriteria,
    text: &str,
) -> Result<(Document, usize), SearchError> {
    let matcher = criteria.matcher()?;
    let mut count = 0;
    let document = doc.map_blocks(|block| {
        if !searchable(block) {
            return None;
        }
        let matches = matcher.find_all(block.text());
        if matches.is_empty() {
            return None;
        }
        count += matches.len();
        let mut updated = block.clone();
        for m in matches.iter().rev() {
            updated = replace_span(doc, &updated, m.start, m.end, text);
        }
        Some(updated)
    });
    tracing::debug!(pattern = %criteria.pattern, count, "replace all");
    Ok((document, count))
}

/// Apply each `old -> new` pair with [`replace_all`], in the given order. Returns the
/// new document and the total number of replacements.
pub fn replace_multiple(
    doc: &Document,
    diff: &[(String, String)],
    options: SearchOptions,
) -> Result<(Document, usize), SearchError> {
    let mut document = doc.clone();
    let mut total = 0;
    for (old, new) in diff {
        let criteria = SearchCriteria::new(old.clone()).with_options(options);
        let (next, count) = replace_all(&document, &criteria, new)?;
        document = next;
        total += count;
    }
    Ok((document, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockType, InlineStyle};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_next_whole_word() {
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        let m = find_next("cat concat cat", "cat", options, 1).unwrap();
        assert_eq!(m, Some(SearchMatch { start: 11, end: 14 }));
    }

    #[test]
    fn test_whole_word_match_inside_rejected_candidate() {
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        // "a a" at 1..4 follows 'x'; the whole word "a a" at 3..6 overlaps it.
        assert_eq!(
            find_all("xa a a", "a a", options).unwrap(),
            vec![SearchMatch { start: 3, end: 6 }]
        );
        assert_eq!(
            find_next("xa a a", "a a", options, 0).unwrap(),
            Some(SearchMatch { start: 3, end: 6 })
        );
        assert_eq!(find_all("xa a a", "a a", SearchOptions::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_find_prev_and_unicode_offsets() {
        let text = "héllo héllo";
        let m = find_prev(text, "héllo", SearchOptions::default(), 11).unwrap();
        assert_eq!(m, Some(SearchMatch { start: 6, end: 11 }));
        let m = find_prev(text, "héllo", SearchOptions::default(), 10).unwrap();
        assert_eq!(m, Some(SearchMatch { start: 0, end: 5 }));
    }

    #[test]
    fn test_case_insensitive_and_invalid_regex() {
        let options = SearchOptions {
            case_sensitive: false,
            ..SearchOptions::default()
        };
        assert_eq!(find_all("Cat cAT", "cat", options).unwrap().len(), 2);

        let regex = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert!(matches!(
            find_all("x", "(", regex),
            Err(SearchError::InvalidRegex(_))
        ));
    }

    #[test]
    fn test_find_next_wraps() {
        let doc = Document::from_text("one cat\ntwo cat\ncat");
        let state = SearchState::new(SearchCriteria::new("cat"), None);
        let first = state.find_next(&doc).unwrap();
        assert_eq!(first.current, Some(DocumentMatch { block: "b0".into(), start: 4, end: 7 }));

        let mut state = first.clone();
        for _ in 0..3 {
            state = state.find_next(&doc).unwrap();
        }
        assert_eq!(state.current, first.current);
    }

    #[test]
    fn test_find_prev_wraps() {
        let doc = Document::from_text("cat\ncat");
        let state = SearchState::new(SearchCriteria::new("cat"), None)
            .find_next(&doc)
            .unwrap();
        let prev = state.find_prev(&doc).unwrap();
        assert_eq!(prev.current, Some(DocumentMatch { block: "b1".into(), start: 0, end: 3 }));
        let prev = prev.find_prev(&doc).unwrap();
        assert_eq!(prev.current, Some(DocumentMatch { block: "b0".into(), start: 0, end: 3 }));
    }

    #[test]
    fn test_replace_advances_and_keeps_styles() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "cat and cat").with_style(0, 3, InlineStyle::Bold),
        ])
        .unwrap();
        let state = SearchState::new(SearchCriteria::new("cat"), None)
            .find_next(&doc)
            .unwrap();
        let (edit, next) = state.replace(&doc, "tiger").unwrap().unwrap();
        let block = edit.document.first_block().unwrap();
        assert_eq!(block.text(), "tiger and cat");
        assert!(block.styles().covers(0, 5, &InlineStyle::Bold));
        assert_eq!(next.current, Some(DocumentMatch { block: "a".into(), start: 10, end: 13 }));
    }

    #[test]
    fn test_replace_without_current_match_is_noop() {
        let doc = Document::from_text("cat");
        let state = SearchState::new(SearchCriteria::new("cat"), None);
        assert!(state.replace(&doc, "dog").unwrap().is_none());
    }

    #[test]
    fn test_replace_all_and_multiple() {
        let doc = Document::from_text("cat cat cat");
        let (replaced, count) = replace_all(&doc, &SearchCriteria::new("cat"), "dog").unwrap();
        assert_eq!(replaced.plain_text(), "dog dog dog");
        assert_eq!(count, 3);

        let diff = vec![
            ("dog".to_string(), "wolf".to_string()),
            ("wolf wolf".to_string(), "pack".to_string()),
        ];
        let (replaced, count) = replace_multiple(&replaced, &diff, SearchOptions::default()).unwrap();
        assert_eq!(replaced.plain_text(), "pack wolf");
        assert_eq!(count, 4);
    }
}
