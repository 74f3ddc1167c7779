//! Selections and range algebra
//!
//! A [`Selection`] is an anchor/focus pair of [`Point`]s exactly as produced by the UI
//! gesture. Before any edit it is resolved against the current document generation
//! into a [`SelectionRange`], whose `start` precedes `end` in document order. Resolving
//! fails with [`ModelError::StaleSelection`] when a key is no longer present.
//!
//! [`slices`] turns a selection into the ordered per-block [`CharacterSlice`]s it
//! covers; style queries, the suggestion engine and export are all built on it.

use crate::document::{Block, BlockKey, Document, EntityId, InlineStyle};
use crate::error::ModelError;
use crate::highlights::HighlightId;
use crate::ranges::RangeSet;
use serde::{Deserialize, Serialize};

/// A caret position: a block and a char offset inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Block key.
    pub block: BlockKey,
    /// Char offset within the block.
    pub offset: usize,
}

impl Point {
    /// Create a point.
    pub fn new(block: impl Into<BlockKey>, offset: usize) -> Self {
        Self {
            block: block.into(),
            offset,
        }
    }
}

/// Anchor/focus selection as issued by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    /// Where the gesture started.
    pub anchor: Point,
    /// Where the gesture ended.
    pub focus: Point,
}

impl Selection {
    /// Create a selection from anchor and focus.
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Collapsed selection at `block:offset`.
    pub fn caret(block: impl Into<BlockKey>, offset: usize) -> Self {
        let point = Point::new(block, offset);
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Selection of `[start, end)` within one block.
    pub fn within(block: impl Into<BlockKey>, start: usize, end: usize) -> Self {
        let block = block.into();
        Self {
            anchor: Point::new(block.clone(), start),
            focus: Point::new(block, end),
        }
    }

    /// Returns `true` if anchor and focus coincide.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Resolve against `doc`, ordering the endpoints.
    pub fn resolve(&self, doc: &Document) -> Result<SelectionRange, ModelError> {
        let anchor_index = locate(doc, &self.anchor)?;
        let focus_index = locate(doc, &self.focus)?;

        let anchor_first = (anchor_index, self.anchor.offset) <= (focus_index, self.focus.offset);
        let range = if anchor_first {
            SelectionRange {
                start: self.anchor.clone(),
                end: self.focus.clone(),
                start_index: anchor_index,
                end_index: focus_index,
            }
        } else {
            SelectionRange {
                start: self.focus.clone(),
                end: self.anchor.clone(),
                start_index: focus_index,
                end_index: anchor_index,
            }
        };
        Ok(range)
    }
}

fn locate(doc: &Document, point: &Point) -> Result<usize, ModelError> {
    let index = doc
        .block_index(&point.block)
        .ok_or_else(|| ModelError::StaleSelection {
            key: point.block.clone(),
        })?;
    let len = doc.block_at(index).map_or(0, Block::len);
    if point.offset > len {
        return Err(ModelError::OffsetOutOfRange {
            key: point.block.clone(),
            offset: point.offset,
            len,
        });
    }
    Ok(index)
}

/// A selection resolved against one document generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRange {
    /// Earlier endpoint in document order.
    pub start: Point,
    /// Later endpoint in document order.
    pub end: Point,
    pub(crate) start_index: usize,
    pub(crate) end_index: usize,
}

impl SelectionRange {
    /// Returns `true` if the range covers nothing.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if both endpoints are in the same block.
    pub fn is_single_block(&self) -> bool {
        self.start_index == self.end_index
    }

    /// Index of the block holding `start`.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Index of the block holding `end`.
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Back to an anchor/focus selection (forward direction).
    pub fn to_selection(&self) -> Selection {
        Selection::new(self.start.clone(), self.end.clone())
    }
}

/// A per-block sub-range covered by a selection.
#[derive(Debug, Clone, Copy)]
pub struct CharacterSlice<'a> {
    /// The block the slice belongs to.
    pub block: &'a Block,
    /// Index of the block in the document.
    pub index: usize,
    /// Inclusive start char offset.
    pub start: usize,
    /// Exclusive end char offset.
    pub end: usize,
}

impl<'a> CharacterSlice<'a> {
    /// Key of the sliced block.
    pub fn key(&self) -> &'a BlockKey {
        self.block.key()
    }

    /// Text covered by the slice.
    pub fn text(&self) -> &'a str {
        self.block.slice_text(self.start, self.end)
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the slice covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Style ranges within the slice, rebased to the slice start.
    pub fn styles(&self) -> RangeSet<InlineStyle> {
        self.block.styles().slice(self.start, self.end)
    }

    /// Entity ranges within the slice, rebased to the slice start.
    pub fn entities(&self) -> RangeSet<EntityId> {
        self.block.entities().slice(self.start, self.end)
    }

    /// Highlight marks within the slice, rebased to the slice start.
    pub fn marks(&self) -> RangeSet<HighlightId> {
        self.block.marks().slice(self.start, self.end)
    }
}

/// Ordered character slices covered by `selection`.
///
/// A single-block selection yields `[start, end)`. Across blocks the first block yields
/// `[start, len)`, the last `[0, end)` and every block in between its full content. A
/// collapsed selection yields nothing.
pub fn slices<'a>(
    doc: &'a Document,
    selection: &Selection,
) -> Result<Vec<CharacterSlice<'a>>, ModelError> {
    let range = selection.resolve(doc)?;
    Ok(range_slices(doc, &range))
}

pub(crate) fn range_slices<'a>(doc: &'a Document, range: &SelectionRange) -> Vec<CharacterSlice<'a>> {
    if range.is_collapsed() {
        return Vec::new();
    }

    (range.start_index..=range.end_index)
        .filter_map(|index| {
            let block = doc.block_at(index)?;
            let start = if index == range.start_index {
                range.start.offset
            } else {
                0
            };
            let end = if index == range.end_index {
                range.end.offset
            } else {
                block.len()
            };
            Some(CharacterSlice {
                block,
                index,
                start,
                end,
            })
        })
        .collect()
}

/// Selection covering the whole document.
pub fn select_all(doc: &Document) -> Selection {
    let first = doc.first_block().map(|b| b.key().clone()).unwrap_or_else(|| "b0".into());
    let last = doc.last_block();
    let (last_key, last_len) = last.map_or((first.clone(), 0), |b| (b.key().clone(), b.len()));
    Selection::new(Point::new(first, 0), Point::new(last_key, last_len))
}
