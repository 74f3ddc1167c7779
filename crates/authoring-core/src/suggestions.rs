//! Track changes
//!
//! # Overview
//!
//! In suggesting mode, edits are recorded instead of applied:
//!
//! - inserted text is spliced in and marked with an `ADD_SUGGESTION`
//! - removed text stays in place and is marked with a `DELETE_SUGGESTION`
//! - a style toggle marks the range with a `TOGGLE_<STYLE>_SUGGESTION`
//!
//! Accepting or rejecting a suggestion turns the record into a real edit (or discards
//! it). Suggestions of different authors may overlap; each is keyed by its own id and
//! resolving one never touches another.
//!
//! Merge rules for a single author: typing next to your own pending insertion extends
//! it, deleting next to your own pending deletion extends it, deleting your own pending
//! insertion removes the text for real, and text that is already struck is skipped.
//!
//! # Example
//!
//! ```rust
//! use authoring_core::suggestions::{self, Actor};
//! use authoring_core::{Document, HighlightSet, Selection};
//!
//! let doc = Document::from_text("The quick fox");
//! let actor = Actor::new("editor", 0);
//! let tracked = suggestions::suggest_remove(
//!     &doc,
//!     &HighlightSet::new(),
//!     &Selection::within("b0", 4, 10),
//!     &actor,
//! )
//! .unwrap();
//! assert_eq!(tracked.document.plain_text(), "The quick fox");
//!
//! let id = tracked.highlights.iter().next().unwrap().id;
//! let (doc, _) = suggestions::accept_suggestion(&tracked.document, &tracked.highlights, id).unwrap();
//! assert_eq!(doc.plain_text(), "The fox");
//! ```

use crate::document::{Block, Document, InlineStyle, StyleSet};
use crate::edit::{self, strip_cut_entities, text_block};
use crate::error::ModelError;
use crate::highlights::{
    HighlightData, HighlightId, HighlightSet, HighlightType, add_marks, clear_marks,
    highlight_range, highlight_text, suggestion_type_for_style,
};
use crate::selection::{Point, Selection, SelectionRange, range_slices};
use crate::text::char_len;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the suggestion engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestionError {
    #[error(transparent)]
    /// The underlying document operation failed.
    Model(#[from] ModelError),

    #[error("style {0} has no suggestion type")]
    /// Only styles with a registry entry can be suggested.
    NotSuggestible(InlineStyle),

    #[error("unknown highlight {0}")]
    /// No highlight with this id.
    UnknownHighlight(HighlightId),

    #[error("highlight {0} is not a suggestion")]
    /// The id names a comment or annotation.
    NotASuggestion(HighlightId),
}

/// The acting identity and the wall-clock time of the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Author name.
    pub author: String,
    /// Milliseconds since the Unix epoch.
    pub date: u64,
}

impl Actor {
    /// Create an actor.
    pub fn new(author: impl Into<String>, date: u64) -> Self {
        Self {
            author: author.into(),
            date,
        }
    }

    fn data(&self) -> HighlightData {
        HighlightData::new(self.author.clone(), self.date)
    }
}

/// Document, highlights and selection after a suggestion operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    /// New document.
    pub document: Document,
    /// New highlight set.
    pub highlights: HighlightSet,
    /// Selection after the operation.
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharFate {
    /// Pending insertion by the same author: delete for real.
    Remove,
    /// Already struck: leave alone.
    Skip,
    /// Strike.
    Mark,
}

fn own_delete_at(block: &Block, pos: usize, highlights: &HighlightSet, author: &str) -> Option<HighlightId> {
    block
        .marks_at(pos)
        .into_iter()
        .find(|id| highlights.is_owned(*id, HighlightType::DeleteSuggestion, author))
}

fn own_add_at(block: &Block, pos: usize, highlights: &HighlightSet, author: &str) -> Option<HighlightId> {
    block
        .marks_at(pos)
        .into_iter()
        .find(|id| highlights.is_owned(*id, HighlightType::AddSuggestion, author))
}

/// Strike `range`. Returns the new document/highlights and the range end mapped
/// through any characters that were removed for real.
fn mark_deleted(
    doc: &Document,
    highlights: &HighlightSet,
    range: &SelectionRange,
    actor: &Actor,
) -> (Document, HighlightSet, Point) {
    let author = actor.author.as_str();
    let mut plans: Vec<(usize, Vec<(usize, usize, CharFate)>)> = Vec::new();
    let mut reuse: Option<HighlightId> = None;

    let slices: Vec<_> = range_slices(doc, range)
        .into_iter()
        .filter(|slice| !slice.is_empty() && slice.block.table().is_none())
        .collect();

    if let Some(first) = slices.first()
        && first.start > 0
    {
        reuse = own_delete_at(first.block, first.start - 1, highlights, author);
    }
    if reuse.is_none()
        && let Some(last) = slices.last()
        && last.end < last.block.len()
    {
        reuse = own_delete_at(last.block, last.end, highlights, author);
    }

    for slice in &slices {
        let mut runs: Vec<(usize, usize, CharFate)> = Vec::new();
        for pos in slice.start..slice.end {
            let marks = slice.block.marks_at(pos);
            let fate = if own_add_at(slice.block, pos, highlights, author).is_some() {
                CharFate::Remove
            } else if marks
                .iter()
                .any(|id| highlights.has_kind(*id, HighlightType::DeleteSuggestion))
            {
                if reuse.is_none() {
                    reuse = own_delete_at(slice.block, pos, highlights, author);
                }
                CharFate::Skip
            } else {
                CharFate::Mark
            };
            match runs.last_mut() {
                Some(run) if run.2 == fate && run.1 == pos => run.1 = pos + 1,
                _ => runs.push((pos, pos + 1, fate)),
            }
        }
        plans.push((slice.index, runs));
    }

    let needs_mark = plans
        .iter()
        .any(|(_, runs)| runs.iter().any(|run| run.2 == CharFate::Mark));
    let (highlights, id) = match reuse {
        Some(id) => (highlights.clone(), Some(id)),
        None if needs_mark => {
            let (set, id) = highlights.allocate(HighlightType::DeleteSuggestion, actor.data());
            (set, Some(id))
        }
        None => (highlights.clone(), None),
    };

    let mut document = doc.clone();
    let mut end = range.end.clone();
    for (index, runs) in plans {
        let Some(block) = document.block_at(index) else {
            continue;
        };
        let mut block = block.clone();
        if let Some(id) = id {
            for run in runs.iter().filter(|run| run.2 == CharFate::Mark) {
                block.marks.insert(run.0, run.1, id);
            }
        }
        let mut removed = 0;
        for run in runs.iter().rev().filter(|run| run.2 == CharFate::Remove) {
            block = block.splice(run.0, run.1, "", &StyleSet::new());
            removed += run.1 - run.0;
        }
        if index == range.end_index() {
            end.offset -= removed;
        }
        document = document.replace_block(index, block);
    }

    let highlights = highlights.prune(&document);
    (document, highlights, end)
}

/// Record the removal of the selected text. The caret moves to the selection start.
pub fn suggest_remove(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let range = selection.resolve(doc)?;
    if range.is_collapsed() {
        return Ok(Tracked {
            document: doc.clone(),
            highlights: highlights.clone(),
            selection: selection.clone(),
        });
    }
    let (document, highlights, _) = mark_deleted(doc, highlights, &range, actor);
    Ok(Tracked {
        document,
        highlights,
        selection: Selection::new(range.start.clone(), range.start),
    })
}

/// Backspace in suggesting mode: strike the grapheme before the caret.
///
/// At the start of a block nothing happens; block merges are not tracked.
pub fn suggest_delete_backward(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let range = selection.resolve(doc)?;
    if !range.is_collapsed() {
        return suggest_remove(doc, highlights, selection, actor);
    }
    match edit::backward_range(doc, &range).filter(|target| target.anchor.block == target.focus.block) {
        Some(target) => suggest_remove(doc, highlights, &target, actor),
        None => Ok(Tracked {
            document: doc.clone(),
            highlights: highlights.clone(),
            selection: selection.clone(),
        }),
    }
}

/// Forward delete in suggesting mode: strike the grapheme after the caret and step
/// over it.
pub fn suggest_delete_forward(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let range = selection.resolve(doc)?;
    if !range.is_collapsed() {
        return suggest_remove(doc, highlights, selection, actor);
    }
    let Some(target) = edit::forward_range(doc, &range).filter(|t| t.anchor.block == t.focus.block) else {
        return Ok(Tracked {
            document: doc.clone(),
            highlights: highlights.clone(),
            selection: selection.clone(),
        });
    };
    let target_range = target.resolve(doc)?;
    let (document, highlights, end) = mark_deleted(doc, highlights, &target_range, actor);
    Ok(Tracked {
        document,
        highlights,
        selection: Selection::new(end.clone(), end),
    })
}

/// Record the insertion of `text` at the selection.
///
/// A non-collapsed selection is struck first and the text goes after it. The inserted
/// characters carry `styles` exactly as a direct insertion would.
pub fn suggest_insert(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    text: &str,
    styles: &StyleSet,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let range = selection.resolve(doc)?;
    let (doc, highlights, at) = if range.is_collapsed() {
        (doc.clone(), highlights.clone(), range.start.clone())
    } else {
        mark_deleted(doc, highlights, &range, actor)
    };

    let inserted = char_len(text);
    if inserted == 0 {
        return Ok(Tracked {
            document: doc,
            highlights,
            selection: Selection::new(at.clone(), at),
        });
    }

    let index = doc
        .block_index(&at.block)
        .ok_or_else(|| ModelError::StaleSelection {
            key: at.block.clone(),
        })?;
    let block = text_block(&doc, index, &at.block)?;
    let block = strip_cut_entities(&doc, block, at.offset, at.offset);
    let mut block = block.splice(at.offset, at.offset, text, styles);
    let (start, end) = (at.offset, at.offset + inserted);

    // New text never inherits another suggestion's marks.
    let inherited: Vec<HighlightId> = block
        .marks
        .query_range(start, end)
        .map(|span| span.value)
        .filter(|id| highlights.get(*id).is_some_and(|h| h.kind.is_suggestion()))
        .collect();
    for id in inherited {
        block.marks.remove(start, end, &id);
    }

    let before = (start > 0)
        .then(|| own_add_at(&block, start - 1, &highlights, &actor.author))
        .flatten();
    let after = (end < block.len())
        .then(|| own_add_at(&block, end, &highlights, &actor.author))
        .flatten();
    let (highlights, id) = match before.or(after) {
        Some(id) => (highlights, id),
        None => highlights.allocate(HighlightType::AddSuggestion, actor.data()),
    };
    block.marks.insert(start, end, id);

    let document = doc.replace_block(index, block);
    let highlights = highlights.prune(&document);
    Ok(Tracked {
        document,
        highlights,
        selection: Selection::caret(at.block, end),
    })
}

/// Record a paste: the fragment is inserted (after striking any selected text) and
/// marked as one new insertion.
pub fn suggest_fragment(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    fragment: &Document,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let range = selection.resolve(doc)?;
    let (doc, highlights, at) = if range.is_collapsed() {
        (doc.clone(), highlights.clone(), range.start.clone())
    } else {
        mark_deleted(doc, highlights, &range, actor)
    };

    let pasted = edit::insert_fragment(&doc, &Selection::new(at.clone(), at.clone()), fragment)?;
    let covered = Selection::new(at, pasted.selection.focus.clone());
    let (highlights, id) = highlights.allocate(HighlightType::AddSuggestion, actor.data());
    let document = add_marks(&pasted.document, &covered, id)?;
    let highlights = highlights.prune(&document);
    Ok(Tracked {
        document,
        highlights,
        selection: pasted.selection,
    })
}

/// Record a style toggle over the selection. Repeating the toggle over exactly the
/// same range withdraws the pending one.
pub fn suggest_style_toggle(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
    style: InlineStyle,
    actor: &Actor,
) -> Result<Tracked, SuggestionError> {
    let kind = suggestion_type_for_style(style).ok_or(SuggestionError::NotSuggestible(style))?;
    let range = selection.resolve(doc)?;
    if range.is_collapsed() {
        return Err(ModelError::EmptySelection.into());
    }
    let normalized = range.to_selection();

    let pending = range_slices(doc, &range)
        .into_iter()
        .flat_map(|slice| slice.block.marks_at(slice.start))
        .filter(|id| highlights.has_kind(*id, kind))
        .find(|id| highlight_range(doc, *id).as_ref() == Some(&normalized));

    let (document, highlights) = match pending {
        Some(id) => (clear_marks(doc, id), highlights.remove(id)),
        None => {
            let (set, id) = highlights.allocate(kind, actor.data());
            (add_marks(doc, &normalized, id)?, set)
        }
    };
    Ok(Tracked {
        document,
        highlights,
        selection: selection.clone(),
    })
}

fn lookup(highlights: &HighlightSet, id: HighlightId) -> Result<HighlightType, SuggestionError> {
    let highlight = highlights
        .get(id)
        .ok_or(SuggestionError::UnknownHighlight(id))?;
    if !highlight.kind.is_suggestion() {
        return Err(SuggestionError::NotASuggestion(id));
    }
    Ok(highlight.kind)
}

/// Delete every character marked with `id`, block by block.
fn delete_marked_chars(doc: &Document, id: HighlightId) -> Document {
    doc.map_blocks(|block| {
        let spans: Vec<(usize, usize)> = block.marks().spans_of(&id).map(|s| (s.start, s.end)).collect();
        if spans.is_empty() {
            return None;
        }
        let mut block = block.clone();
        for (start, end) in spans.into_iter().rev() {
            block = block.splice(start, end, "", &StyleSet::new());
        }
        Some(block)
    })
}

/// Remove the text of an accepted deletion. A deletion spanning blocks without gaps
/// is removed as one range, merging the blocks.
fn remove_struck(doc: &Document, id: HighlightId) -> Result<Document, ModelError> {
    let Some(range) = highlight_range(doc, id) else {
        return Ok(doc.clone());
    };
    let resolved = range.resolve(doc)?;
    let contiguous = range_slices(doc, &resolved)
        .iter()
        .all(|slice| slice.is_empty() || slice.block.marks().covers(slice.start, slice.end, &id));
    if contiguous && !resolved.is_single_block() {
        Ok(edit::remove_range(doc, &range)?.document)
    } else {
        Ok(delete_marked_chars(doc, id))
    }
}

/// Apply a style toggle over the characters marked with `id`.
fn apply_marked_style(doc: &Document, id: HighlightId, style: InlineStyle) -> Document {
    let uniform = doc.blocks().all(|block| {
        block
            .marks()
            .spans_of(&id)
            .all(|span| block.styles().covers(span.start, span.end, &style))
    });
    doc.map_blocks(|block| {
        let spans: Vec<(usize, usize)> = block.marks().spans_of(&id).map(|s| (s.start, s.end)).collect();
        if spans.is_empty() {
            return None;
        }
        let mut block = block.clone();
        for (start, end) in spans {
            block = block.set_style(start, end, style, !uniform);
        }
        Some(block)
    })
}

/// Accept a suggestion: insertions become ordinary text, deletions are carried out and
/// style toggles are applied.
pub fn accept_suggestion(
    doc: &Document,
    highlights: &HighlightSet,
    id: HighlightId,
) -> Result<(Document, HighlightSet), SuggestionError> {
    let kind = lookup(highlights, id)?;
    let document = match kind {
        HighlightType::DeleteSuggestion => remove_struck(doc, id)?,
        other => match other.style() {
            Some(style) => apply_marked_style(doc, id, style),
            None => doc.clone(),
        },
    };
    let document = clear_marks(&document, id);
    let highlights = highlights.remove(id).prune(&document);
    tracing::debug!(id = %id, kind = ?kind, "accepted suggestion");
    Ok((document, highlights))
}

/// Reject a suggestion: insertions are removed, deletions and style toggles dropped.
pub fn reject_suggestion(
    doc: &Document,
    highlights: &HighlightSet,
    id: HighlightId,
) -> Result<(Document, HighlightSet), SuggestionError> {
    let kind = lookup(highlights, id)?;
    let document = match kind {
        HighlightType::AddSuggestion => delete_marked_chars(doc, id),
        _ => clear_marks(doc, id),
    };
    let highlights = highlights.remove(id).prune(&document);
    tracing::debug!(id = %id, kind = ?kind, "rejected suggestion");
    Ok((document, highlights))
}

/// What a pending suggestion proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionAction {
    /// Insert text.
    Add,
    /// Delete text.
    Delete,
    /// Delete text and insert a replacement right after it.
    Replace,
    /// Toggle an inline style.
    ToggleStyle(InlineStyle),
}

/// A pending suggestion, as listed for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEntry {
    /// Suggestion id (the deletion, for a replacement).
    pub id: HighlightId,
    /// The insertion paired with a deletion into a replacement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<HighlightId>,
    /// Proposed action.
    pub action: SuggestionAction,
    /// Author.
    pub author: String,
    /// Creation time.
    pub date: u64,
    /// Proposed text (inserted, deleted or restyled).
    pub suggestion_text: String,
    /// Replaced text, for replacements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_text: Option<String>,
    /// Covered range.
    pub range: Selection,
}

/// Describe one pending suggestion without pairing.
pub fn describe_suggestion(
    doc: &Document,
    highlights: &HighlightSet,
    id: HighlightId,
) -> Option<SuggestionEntry> {
    let highlight = highlights.get(id)?;
    let action = match highlight.kind {
        HighlightType::AddSuggestion => SuggestionAction::Add,
        HighlightType::DeleteSuggestion => SuggestionAction::Delete,
        other => SuggestionAction::ToggleStyle(other.style()?),
    };
    Some(SuggestionEntry {
        id,
        peer: None,
        action,
        author: highlight.data.author.clone(),
        date: highlight.data.date,
        suggestion_text: highlight_text(doc, id),
        old_text: None,
        range: highlight_range(doc, id)?,
    })
}

/// Pending suggestions in document order. A deletion immediately followed by an
/// insertion of the same author is listed once, as a replacement.
pub fn pending_suggestions(doc: &Document, highlights: &HighlightSet) -> Vec<SuggestionEntry> {
    let position = |point: &Point| (doc.block_index(&point.block).unwrap_or(usize::MAX), point.offset);

    let mut entries: Vec<SuggestionEntry> = highlights
        .suggestions()
        .filter_map(|h| describe_suggestion(doc, highlights, h.id))
        .collect();
    entries.sort_by_key(|entry| (position(&entry.range.anchor), entry.id));

    let mut paired: Vec<HighlightId> = Vec::new();
    for entry in entries.iter_mut() {
        if entry.action != SuggestionAction::Delete {
            continue;
        }
        let end = &entry.range.focus;
        let Some(block) = doc.block(&end.block) else {
            continue;
        };
        let peer = own_add_at(block, end.offset, highlights, &entry.author).filter(|peer| {
            highlight_range(doc, *peer).is_some_and(|range| &range.anchor == end)
        });
        if let Some(peer) = peer {
            entry.action = SuggestionAction::Replace;
            entry.old_text = Some(std::mem::take(&mut entry.suggestion_text));
            entry.suggestion_text = highlight_text(doc, peer);
            entry.peer = Some(peer);
            paired.push(peer);
        }
    }
    entries.retain(|entry| !paired.contains(&entry.id));
    entries
}

/// Returns `true` if any suggestion is pending.
pub fn has_pending(highlights: &HighlightSet) -> bool {
    highlights.suggestions().next().is_some()
}

/// Suggestion ids touching the selection, for accept/reject-by-selection flows.
pub fn suggestions_in(
    doc: &Document,
    highlights: &HighlightSet,
    selection: &Selection,
) -> Result<Vec<HighlightId>, ModelError> {
    let range = selection.resolve(doc)?;
    let mut ids: Vec<HighlightId> = if range.is_collapsed() {
        doc.block_at(range.start_index())
            .map(|block| block.marks_at(range.start.offset))
            .unwrap_or_default()
    } else {
        range_slices(doc, &range)
            .into_iter()
            .flat_map(|slice| {
                slice
                    .block
                    .marks()
                    .query_range(slice.start, slice.end)
                    .map(|span| span.value)
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    ids.retain(|id| highlights.get(*id).is_some_and(|h| h.kind.is_suggestion()));
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// A suggestion that was accepted or rejected during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSuggestion {
    /// The suggestion as it was listed before resolution.
    pub suggestion: SuggestionEntry,
    /// `true` if accepted, `false` if rejected.
    pub accepted: bool,
    /// Who resolved it.
    pub resolver: String,
    /// When it was resolved.
    pub date: u64,
}
