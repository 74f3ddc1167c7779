//! Spellcheck state and word targeting.
//!
//! The engine never talks to a dictionary itself. It finds words (Unicode word
//! segmentation), tracks which lookup is the latest, and validates completions: a
//! suggestion list is applied only if its ticket is the latest issued and the target
//! range still holds the same word. The asynchronous side lives in the
//! `authoring-core-spellcheck` crate.

use crate::document::{BlockKey, Document};
use crate::edit::{self, Edit};
use crate::error::ModelError;
use crate::highlights::{HighlightSet, HighlightType};
use crate::selection::{Point, Selection};
use crate::text::CharIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use unicode_segmentation::UnicodeSegmentation;

/// A word in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordTarget {
    /// Block holding the word.
    pub block: BlockKey,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
    /// The word as it was when targeted.
    pub word: String,
}

impl WordTarget {
    /// The word as a forward selection.
    pub fn to_selection(&self) -> Selection {
        Selection::within(self.block.clone(), self.start, self.end)
    }

    /// Returns `true` if `doc` still holds `word` at this range.
    pub fn is_current(&self, doc: &Document) -> bool {
        doc.block(&self.block)
            .is_some_and(|block| self.end <= block.len() && block.slice_text(self.start, self.end) == self.word)
    }
}

fn checkable(word: &str) -> bool {
    word.chars().any(char::is_alphabetic)
}

fn block_words(key: &BlockKey, text: &str) -> impl Iterator<Item = WordTarget> {
    let index = CharIndex::new(text);
    text.split_word_bound_indices()
        .filter(|(_, word)| checkable(word))
        .map(move |(byte, word)| {
            let start = index.byte_to_char(byte);
            WordTarget {
                block: key.clone(),
                start,
                end: index.byte_to_char(byte + word.len()),
                word: word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
}

/// The word under (or directly before) `point`.
pub fn word_at(doc: &Document, point: &Point) -> Option<WordTarget> {
    let block = doc.block(&point.block)?;
    block_words(block.key(), block.text()).find(|w| w.start <= point.offset && point.offset <= w.end)
}

/// Words that need checking, in document order.
///
/// Words the session ignores or added, and words struck by a pending deletion
/// suggestion, are skipped. Table cell text is not checked.
pub fn words(doc: &Document, highlights: &HighlightSet, state: &SpellcheckState) -> Vec<WordTarget> {
    doc.blocks()
        .filter(|block| block.table().is_none())
        .flat_map(|block| {
            block_words(block.key(), block.text())
                .filter(|w| !state.is_known(&w.word))
                .filter(|w| {
                    !block
                        .marks()
                        .query_range(w.start, w.end)
                        .any(|span| highlights.has_kind(span.value, HighlightType::DeleteSuggestion))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A lookup waiting for its completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    /// Request ticket.
    pub ticket: u64,
    /// Word the lookup is for.
    pub target: WordTarget,
}

/// Candidates loaded for a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSuggestions {
    /// Word the candidates apply to.
    pub target: WordTarget,
    /// Candidates, best first.
    pub suggestions: Vec<String>,
}

/// Session spellcheck state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpellcheckState {
    /// Last ticket issued.
    pub latest_ticket: u64,
    /// The lookup in flight, if any.
    pub pending: Option<PendingLookup>,
    /// Candidates for the context menu.
    pub loaded: Option<LoadedSuggestions>,
    /// Words ignored for this session.
    pub ignored: BTreeSet<String>,
    /// Words added to the dictionary during this session.
    pub added: BTreeSet<String>,
}

impl SpellcheckState {
    /// Returns `true` if `word` was ignored or added this session.
    pub fn is_known(&self, word: &str) -> bool {
        self.ignored.contains(word) || self.added.contains(word)
    }

    /// Issue a new ticket for `target`; earlier lookups become stale.
    pub fn request(&self, target: WordTarget) -> (SpellcheckState, u64) {
        let ticket = self.latest_ticket + 1;
        let next = SpellcheckState {
            latest_ticket: ticket,
            pending: Some(PendingLookup { ticket, target }),
            loaded: None,
            ..self.clone()
        };
        (next, ticket)
    }

    /// Apply a completion. Returns `None` when it is stale: not the latest ticket, or
    /// the target text changed since the request.
    pub fn complete(&self, doc: &Document, ticket: u64, suggestions: Vec<String>) -> Option<SpellcheckState> {
        let pending = self.pending.as_ref().filter(|p| p.ticket == ticket && ticket == self.latest_ticket);
        let Some(pending) = pending else {
            tracing::warn!(ticket, latest = self.latest_ticket, "ignoring superseded spellcheck completion");
            return None;
        };
        if !pending.target.is_current(doc) {
            tracing::warn!(ticket, block = %pending.target.block, "ignoring spellcheck completion for edited word");
            return None;
        }
        Some(SpellcheckState {
            pending: None,
            loaded: Some(LoadedSuggestions {
                target: pending.target.clone(),
                suggestions,
            }),
            ..self.clone()
        })
    }

    /// Ignore `word` for the rest of the session.
    pub fn ignore(&self, word: &str) -> SpellcheckState {
        let mut next = self.clone();
        next.ignored.insert(word.to_string());
        next.loaded = None;
        next
    }

    /// Record `word` as added to the dictionary.
    pub fn add(&self, word: &str) -> SpellcheckState {
        let mut next = self.clone();
        next.added.insert(word.to_string());
        next.loaded = None;
        next
    }

    /// Drop loaded candidates (after a replacement).
    pub fn cleared(&self) -> SpellcheckState {
        SpellcheckState {
            pending: None,
            loaded: None,
            ..self.clone()
        }
    }
}

/// Replace the targeted word with `replacement`, keeping its styles. Returns `None` when
/// the text at the target no longer is the word.
pub fn replace_word(doc: &Document, target: &WordTarget, replacement: &str) -> Result<Option<Edit>, ModelError> {
    if !target.is_current(doc) {
        tracing::warn!(block = %target.block, word = %target.word, "spellcheck target changed, skipping replace");
        return Ok(None);
    }
    let selection = target.to_selection();
    let range = selection.resolve(doc)?;
    let styles = edit::insertion_styles(doc, &range);
    edit::insert_text_with_styles(doc, &selection, replacement, &styles).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockType, InlineStyle};
    use crate::highlights::HighlightData;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_word_boundaries() {
        let doc = Document::from_text("Teh café's 42 dogz.");
        let found: Vec<String> = words(&doc, &HighlightSet::new(), &SpellcheckState::default())
            .into_iter()
            .map(|w| w.word)
            .collect();
        assert_eq!(found, vec!["Teh", "café's", "dogz"]);

        let word = word_at(&doc, &Point::new("b0", 6)).unwrap();
        assert_eq!((word.start, word.end), (4, 10));
    }

    #[test]
    fn test_words_skip_known_and_struck() {
        let doc = Document::from_text("alpha beta gamma");
        let (set, id) = HighlightSet::new().allocate(HighlightType::DeleteSuggestion, HighlightData::new("a", 0));
        let doc = crate::highlights::add_marks(&doc, &Selection::within("b0", 6, 10), id).unwrap();
        let state = SpellcheckState::default().ignore("gamma");
        let found: Vec<String> = words(&doc, &set, &state).into_iter().map(|w| w.word).collect();
        assert_eq!(found, vec!["alpha"]);
    }

    #[test]
    fn test_stale_completions_are_ignored() {
        let doc = Document::from_text("speling");
        let target = word_at(&doc, &Point::new("b0", 0)).unwrap();
        let (state, first) = SpellcheckState::default().request(target.clone());
        let (state, second) = state.request(target);
        assert!(state.complete(&doc, first, vec!["spelling".into()]).is_none());

        let edited = edit::insert_text(&doc, &Selection::caret("b0", 3), "x").unwrap().document;
        assert!(state.complete(&edited, second, vec!["spelling".into()]).is_none());

        let done = state.complete(&doc, second, vec!["spelling".into()]).unwrap();
        assert_eq!(done.loaded.unwrap().suggestions, vec!["spelling".to_string()]);
    }

    #[test]
    fn test_replace_word_keeps_styles() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "a speling error").with_style(2, 9, InlineStyle::Italic),
        ])
        .unwrap();
        let target = word_at(&doc, &Point::new("a", 3)).unwrap();
        let out = replace_word(&doc, &target, "spelling").unwrap().unwrap();
        let block = out.document.first_block().unwrap();
        assert_eq!(block.text(), "a spelling error");
        assert!(block.styles().covers(2, 10, &InlineStyle::Italic));

        let stale = WordTarget {
            word: "other".into(),
            ..target
        };
        assert!(replace_word(&doc, &stale, "x").unwrap().is_none());
    }
}
