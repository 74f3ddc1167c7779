//! Pure document edits
//!
//! Every function here takes the current [`Document`] and a [`Selection`] and returns a
//! new document plus the mapped selection. Nothing is mutated in place. A selection
//! naming a block that is no longer present fails with
//! [`ModelError::StaleSelection`].
//!
//! # Example
//!
//! ```rust
//! use authoring_core::edit;
//! use authoring_core::{Document, Point, Selection};
//!
//! let doc = Document::from_text("Hello\nWorld");
//! let selection = Selection::new(Point::new("b0", 3), Point::new("b1", 2));
//! let out = edit::remove_range(&doc, &selection).unwrap();
//!
//! assert_eq!(out.document.plain_text(), "Helrld");
//! assert_eq!(out.document.first_block().unwrap().key().as_str(), "b0");
//! ```

use crate::document::{Block, BlockKey, BlockType, Document, Entity, EntityId, InlineStyle, StyleSet};
use crate::error::ModelError;
use crate::selection::{Point, Selection, SelectionRange, range_slices};
use crate::text::{char_len, next_grapheme_boundary, prev_grapheme_boundary};
use std::collections::BTreeMap;

/// Result of an edit: the next document generation and the mapped selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// New document.
    pub document: Document,
    /// Selection after the edit.
    pub selection: Selection,
}

impl Edit {
    fn unchanged(doc: &Document, selection: &Selection) -> Self {
        Self {
            document: doc.clone(),
            selection: selection.clone(),
        }
    }
}

/// Styles that newly inserted text picks up.
///
/// A caret takes the styles of the character before it (or of the first character at
/// offset 0); a range takes the styles of its first character.
pub fn insertion_styles(doc: &Document, range: &SelectionRange) -> StyleSet {
    let Some(block) = doc.block_at(range.start_index()) else {
        return StyleSet::new();
    };
    let offset = range.start.offset;
    if offset > 0 && (range.is_collapsed() || offset >= block.len()) {
        block.styles_at(offset - 1)
    } else {
        block.styles_at(offset)
    }
}

/// Styles active at a caret.
pub fn styles_at_caret(doc: &Document, selection: &Selection) -> Result<StyleSet, ModelError> {
    let range = selection.resolve(doc)?;
    Ok(insertion_styles(doc, &range))
}

pub(crate) fn text_block<'a>(doc: &'a Document, index: usize, key: &BlockKey) -> Result<&'a Block, ModelError> {
    let block = doc
        .block_at(index)
        .ok_or_else(|| ModelError::StaleSelection { key: key.clone() })?;
    if block.table().is_some() {
        return Err(ModelError::AtomicBlock { key: key.clone() });
    }
    Ok(block)
}

/// Drop immutable entities that an edit of `[start, end)` would cut through.
pub(crate) fn strip_cut_entities(doc: &Document, block: &Block, start: usize, end: usize) -> Block {
    let cut: Vec<EntityId> = block
        .entities()
        .iter()
        .filter(|span| {
            let cuts_start = span.start < start && start < span.end;
            let cuts_end = span.start < end && end < span.end;
            (cuts_start || cuts_end)
                && doc
                    .entity(span.value)
                    .is_some_and(|entity| entity.kind.is_immutable())
        })
        .map(|span| span.value)
        .collect();
    if cut.is_empty() {
        return block.clone();
    }
    let mut block = block.clone();
    for entity in cut {
        block.entities.remove_value(&entity);
    }
    block
}

/// Replace the selection with `text`, styled per [`insertion_styles`].
pub fn insert_text(doc: &Document, selection: &Selection, text: &str) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    let styles = insertion_styles(doc, &range);
    insert_text_with_styles(doc, selection, text, &styles)
}

/// Replace the selection with `text` carrying exactly `styles`.
pub fn insert_text_with_styles(
    doc: &Document,
    selection: &Selection,
    text: &str,
    styles: &StyleSet,
) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    let (doc, caret) = if range.is_collapsed() {
        (doc.clone(), range.start.clone())
    } else {
        let removed = remove_range(doc, selection)?;
        (removed.document, removed.selection.focus)
    };

    let index = doc
        .block_index(&caret.block)
        .ok_or_else(|| ModelError::StaleSelection {
            key: caret.block.clone(),
        })?;
    let block = text_block(&doc, index, &caret.block)?;
    let block = strip_cut_entities(&doc, block, caret.offset, caret.offset);
    let block = block.splice(caret.offset, caret.offset, text, styles);
    let doc = doc.replace_block(index, block);
    Ok(Edit {
        document: doc,
        selection: Selection::caret(caret.block, caret.offset + char_len(text)),
    })
}

/// Delete the selected span, merging blocks when the selection crosses them.
///
/// The merged block keeps the key and type of the earlier block.
pub fn remove_range(doc: &Document, selection: &Selection) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    if range.is_collapsed() {
        return Ok(Edit::unchanged(doc, selection));
    }
    let (start, end) = (range.start_index(), range.end_index());

    if range.is_single_block() {
        let block = text_block(doc, start, &range.start.block)?;
        let block = strip_cut_entities(doc, block, range.start.offset, range.end.offset);
        let block = block.splice(range.start.offset, range.end.offset, "", &StyleSet::new());
        return Ok(Edit {
            document: doc.replace_block(start, block),
            selection: Selection::caret(range.start.block.clone(), range.start.offset),
        });
    }

    let (Some(first), Some(last)) = (doc.block_at(start), doc.block_at(end)) else {
        return Err(ModelError::StaleSelection {
            key: range.start.block.clone(),
        });
    };

    let head = if first.table().is_some() {
        None
    } else {
        let first = strip_cut_entities(doc, first, range.start.offset, range.start.offset);
        Some(first.splice(range.start.offset, first.len(), "", &StyleSet::new()))
    };
    let tail = if last.table().is_some() {
        None
    } else {
        let last = strip_cut_entities(doc, last, range.end.offset, range.end.offset);
        Some(last.splice(0, range.end.offset, "", &StyleSet::new()))
    };

    let (merged, caret) = match (head, tail) {
        (Some(head), Some(tail)) => {
            let caret = Point::new(head.key().clone(), range.start.offset);
            (head.join(&tail), caret)
        }
        (Some(head), None) => {
            let caret = Point::new(head.key().clone(), range.start.offset);
            (head, caret)
        }
        (None, Some(tail)) => {
            let caret = Point::new(tail.key().clone(), 0);
            (tail, caret)
        }
        (None, None) => {
            let block = Block::new(first.key().clone(), BlockType::Unstyled, "");
            (block, Point::new(first.key().clone(), 0))
        }
    };

    Ok(Edit {
        document: doc.splice_blocks(start..end + 1, vec![merged]),
        selection: Selection::new(caret.clone(), caret),
    })
}

/// Remove one grapheme before the caret, or merge with the previous block at offset 0.
pub fn delete_backward(doc: &Document, selection: &Selection) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    if !range.is_collapsed() {
        return remove_range(doc, selection);
    }
    match backward_range(doc, &range) {
        Some(target) => remove_range(doc, &target),
        None => Ok(Edit::unchanged(doc, selection)),
    }
}

/// Remove one grapheme after the caret, or merge the next block at the block end.
pub fn delete_forward(doc: &Document, selection: &Selection) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    if !range.is_collapsed() {
        return remove_range(doc, selection);
    }
    match forward_range(doc, &range) {
        Some(target) => remove_range(doc, &target),
        None => Ok(Edit::unchanged(doc, selection)),
    }
}

/// Range a backspace at a caret would remove.
pub(crate) fn backward_range(doc: &Document, caret: &SelectionRange) -> Option<Selection> {
    let index = caret.start_index();
    let block = doc.block_at(index)?;
    if caret.start.offset > 0 {
        let from = prev_grapheme_boundary(block.text(), caret.start.offset);
        return Some(Selection::within(block.key().clone(), from, caret.start.offset));
    }
    let previous = doc.block_at(index.checked_sub(1)?)?;
    if previous.table().is_some() || block.table().is_some() {
        return None;
    }
    Some(Selection::new(
        Point::new(previous.key().clone(), previous.len()),
        Point::new(block.key().clone(), 0),
    ))
}

/// Range a forward delete at a caret would remove.
pub(crate) fn forward_range(doc: &Document, caret: &SelectionRange) -> Option<Selection> {
    let index = caret.start_index();
    let block = doc.block_at(index)?;
    if caret.start.offset < block.len() {
        let to = next_grapheme_boundary(block.text(), caret.start.offset);
        return Some(Selection::within(block.key().clone(), caret.start.offset, to));
    }
    let next = doc.block_at(index + 1)?;
    if next.table().is_some() || block.table().is_some() {
        return None;
    }
    Some(Selection::new(
        Point::new(block.key().clone(), block.len()),
        Point::new(next.key().clone(), 0),
    ))
}

/// Returns `true` if every selected character carries `style`.
pub fn is_uniformly_styled(
    doc: &Document,
    selection: &Selection,
    style: InlineStyle,
) -> Result<bool, ModelError> {
    let range = selection.resolve(doc)?;
    let slices: Vec<_> = range_slices(doc, &range)
        .into_iter()
        .filter(|slice| !slice.is_empty())
        .collect();
    Ok(!slices.is_empty()
        && slices
            .iter()
            .all(|slice| slice.block.styles().covers(slice.start, slice.end, &style)))
}

/// Toggle `style` across the selection: on, unless the selection is already uniformly
/// styled, in which case off.
pub fn toggle_inline_style(
    doc: &Document,
    selection: &Selection,
    style: InlineStyle,
) -> Result<Edit, ModelError> {
    let on = !is_uniformly_styled(doc, selection, style)?;
    set_inline_style(doc, selection, style, on)
}

/// Force `style` on across the selection.
pub fn apply_inline_style(
    doc: &Document,
    selection: &Selection,
    style: InlineStyle,
) -> Result<Edit, ModelError> {
    set_inline_style(doc, selection, style, true)
}

/// Force `style` off across the selection.
pub fn remove_inline_style(
    doc: &Document,
    selection: &Selection,
    style: InlineStyle,
) -> Result<Edit, ModelError> {
    set_inline_style(doc, selection, style, false)
}

fn set_inline_style(
    doc: &Document,
    selection: &Selection,
    style: InlineStyle,
    on: bool,
) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    let updates: Vec<(usize, Block)> = range_slices(doc, &range)
        .into_iter()
        .filter(|slice| !slice.is_empty())
        .map(|slice| (slice.index, slice.block.set_style(slice.start, slice.end, style, on)))
        .collect();

    let mut document = doc.clone();
    for (index, block) in updates {
        document = document.replace_block(index, block);
    }
    Ok(Edit {
        document,
        selection: selection.clone(),
    })
}

/// Split the block at a collapsed caret. The new block follows the current one and the
/// caret moves to its start.
pub fn split_block(doc: &Document, selection: &Selection) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    if !range.is_collapsed() {
        return Err(ModelError::NotCollapsed);
    }
    let index = range.start_index();
    let block = text_block(doc, index, &range.start.block)?;
    let tail_key = doc.fresh_key();
    let (head, tail) = block.split_at(range.start.offset, tail_key.clone());
    Ok(Edit {
        document: doc.splice_blocks(index..index + 1, vec![head, tail]),
        selection: Selection::caret(tail_key, 0),
    })
}

/// Toggle the block type of every text block touched by the selection. When all of
/// them already have `kind` they revert to unstyled.
pub fn set_block_type(
    doc: &Document,
    selection: &Selection,
    kind: BlockType,
) -> Result<Edit, ModelError> {
    if matches!(kind, BlockType::Table | BlockType::Atomic) {
        return Err(ModelError::InvalidBlockType(kind));
    }
    let range = selection.resolve(doc)?;
    let touched = range.start_index()..=range.end_index();
    let all_same = touched
        .clone()
        .filter_map(|i| doc.block_at(i))
        .filter(|block| block.table().is_none())
        .all(|block| block.kind() == kind);
    let target = if all_same { BlockType::Unstyled } else { kind };

    let mut index = 0;
    let document = doc.map_blocks(|block| {
        let current = index;
        index += 1;
        (touched.contains(&current) && block.table().is_none() && block.kind() != target)
            .then(|| block.clone().with_kind(target))
    });
    Ok(Edit {
        document,
        selection: selection.clone(),
    })
}

/// Attach a new LINK entity pointing at `url` to the selection.
pub fn apply_link(doc: &Document, selection: &Selection, url: &str) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    if range.is_collapsed() {
        return Err(ModelError::EmptySelection);
    }
    let (mut document, id) = doc.add_entity(Entity::link(url));
    let updates: Vec<(usize, Block)> = range_slices(doc, &range)
        .into_iter()
        .filter(|slice| !slice.is_empty() && slice.block.table().is_none())
        .map(|slice| (slice.index, slice.block.set_entity(slice.start, slice.end, Some(id))))
        .collect();
    for (index, block) in updates {
        document = document.replace_block(index, block);
    }
    Ok(Edit {
        document,
        selection: selection.clone(),
    })
}

/// Strip link entities from the selection. On a caret, the whole link under the caret
/// is removed.
pub fn remove_link(doc: &Document, selection: &Selection) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    let is_link = |id: EntityId| {
        doc.entity(id)
            .is_some_and(|entity| entity.kind == crate::document::EntityKind::Link)
    };

    let targets: Vec<(usize, usize, usize)> = if range.is_collapsed() {
        let index = range.start_index();
        let offset = range.start.offset;
        doc.block_at(index)
            .into_iter()
            .flat_map(|block| block.entities().iter())
            .filter(|span| is_link(span.value))
            .filter(|span| span.contains(offset) || (offset > 0 && span.contains(offset - 1)))
            .map(|span| (index, span.start, span.end))
            .collect()
    } else {
        range_slices(doc, &range)
            .into_iter()
            .filter(|slice| !slice.is_empty())
            .flat_map(|slice| {
                slice
                    .block
                    .entities()
                    .query_range(slice.start, slice.end)
                    .filter(|span| is_link(span.value))
                    .map(move |span| {
                        (slice.index, span.start.max(slice.start), span.end.min(slice.end))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let mut document = doc.clone();
    for (index, start, end) in targets {
        if let Some(block) = document.block_at(index) {
            let mut block = block.clone();
            block.entities.clear_range(start, end);
            document = document.replace_block(index, block);
        }
    }
    Ok(Edit {
        document,
        selection: selection.clone(),
    })
}

/// Insert a (sanitized) fragment at the selection.
///
/// Pasted blocks always get fresh keys and pasted entities fresh ids. A single text
/// block is spliced inline; several blocks split the target block, with the first and
/// last fragment blocks joining the halves.
pub fn insert_fragment(
    doc: &Document,
    selection: &Selection,
    fragment: &Document,
) -> Result<Edit, ModelError> {
    let range = selection.resolve(doc)?;
    let (mut doc, caret) = if range.is_collapsed() {
        (doc.clone(), range.start.clone())
    } else {
        let removed = remove_range(doc, selection)?;
        (removed.document, removed.selection.focus)
    };

    let mut entity_map: BTreeMap<EntityId, EntityId> = BTreeMap::new();
    for (old, entity) in fragment.entities() {
        let (next, new) = doc.add_entity(entity.clone());
        doc = next;
        entity_map.insert(*old, new);
    }

    let nested = fragment.all_blocks().count();
    let mut keys = doc.fresh_keys(nested).into_iter();
    let mut rekey = |block: &Block| -> Block {
        let mut block = block.clone();
        if let Some(key) = keys.next() {
            block.key = key;
        }
        block.entities = crate::ranges::RangeSet::from_spans(block.entities.iter().filter_map(|span| {
            entity_map
                .get(&span.value)
                .map(|id| crate::ranges::Span::new(span.start, span.end, *id))
        }));
        block
    };
    let pasted: Vec<Block> = fragment
        .blocks()
        .map(|block| {
            let mut top = rekey(block);
            if let Some(table) = block.table() {
                top = top.with_table(table.map_cell_blocks(&mut rekey));
            }
            top
        })
        .collect();

    let index = doc
        .block_index(&caret.block)
        .ok_or_else(|| ModelError::StaleSelection {
            key: caret.block.clone(),
        })?;
    let target = text_block(&doc, index, &caret.block)?;

    if let [single] = pasted.as_slice()
        && single.table().is_none()
    {
        let (head, tail) = target.split_at(caret.offset, target.key().clone());
        let offset = caret.offset + single.len();
        let merged = head.join(single).join(&tail);
        return Ok(Edit {
            document: doc.replace_block(index, merged),
            selection: Selection::caret(caret.block, offset),
        });
    }

    let tail_key = doc
        .fresh_keys(nested + 1)
        .pop()
        .unwrap_or_else(|| BlockKey::new(format!("{}-tail", caret.block)));
    let (head, tail) = target.split_at(caret.offset, tail_key);
    let has_table = pasted.iter().any(|block| block.table().is_some());

    let (blocks, caret) = match pasted.as_slice() {
        [first, middle @ .., last] if !has_table => {
            let caret = Point::new(last.key().clone(), last.len());
            let mut blocks = vec![head.join(first)];
            blocks.extend(middle.iter().cloned());
            blocks.push(last.join(&tail));
            (blocks, caret)
        }
        _ => {
            let caret = Point::new(tail.key().clone(), 0);
            let mut blocks = vec![head];
            blocks.extend(pasted.iter().cloned());
            blocks.push(tail);
            (blocks, caret)
        }
    };

    Ok(Edit {
        document: doc.splice_blocks(index..index + 1, blocks),
        selection: Selection::new(caret.clone(), caret),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_inherits_previous_char_style() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "Hello").with_style(0, 5, InlineStyle::Bold),
        ])
        .unwrap();
        let out = insert_text(&doc, &Selection::caret("a", 5), "!").unwrap();
        let block = out.document.block(&"a".into()).unwrap();
        assert_eq!(block.text(), "Hello!");
        assert!(block.styles().covers(0, 6, &InlineStyle::Bold));
        assert_eq!(out.selection, Selection::caret("a", 6));
    }

    #[test]
    fn test_insert_replaces_selection() {
        let doc = Document::from_text("The quick fox");
        let out = insert_text(&doc, &Selection::within("b0", 4, 9), "slow").unwrap();
        assert_eq!(out.document.plain_text(), "The slow fox");
        assert_eq!(out.selection, Selection::caret("b0", 8));
    }

    #[test]
    fn test_insert_strips_cut_image() {
        let mut entities = BTreeMap::new();
        entities.insert(
            EntityId(0),
            Entity {
                kind: crate::document::EntityKind::Image,
                data: serde_json::json!({"src": "a.png"}),
            },
        );
        let doc = Document::new(
            vec![Block::new("a", BlockType::Unstyled, "[img]").with_entity(0, 5, EntityId(0))],
            entities,
        )
        .unwrap();
        let out = insert_text(&doc, &Selection::caret("a", 2), "x").unwrap();
        assert!(out.document.block(&"a".into()).unwrap().entities().is_empty());
    }

    #[test]
    fn test_remove_range_merges_blocks() {
        let doc = Document::from_blocks(vec![
            Block::new("first", BlockType::HeaderOne, "Hello"),
            Block::new("second", BlockType::Unstyled, "World"),
        ])
        .unwrap();
        let selection = Selection::new(Point::new("first", 3), Point::new("second", 2));
        let out = remove_range(&doc, &selection).unwrap();
        assert_eq!(out.document.block_count(), 1);
        let block = out.document.first_block().unwrap();
        assert_eq!(block.text(), "Helrld");
        assert_eq!(block.key().as_str(), "first");
        assert_eq!(block.kind(), BlockType::HeaderOne);
        assert_eq!(out.selection, Selection::caret("first", 3));
    }

    #[test]
    fn test_stale_selection() {
        let doc = Document::from_text("abc");
        let err = insert_text(&doc, &Selection::caret("gone", 0), "x").unwrap_err();
        assert_eq!(err, ModelError::StaleSelection { key: "gone".into() });
    }

    #[test]
    fn test_toggle_twice_restores_uniform_selection() {
        let doc = Document::from_text("plain text");
        let selection = Selection::within("b0", 0, 5);
        let once = toggle_inline_style(&doc, &selection, InlineStyle::Italic).unwrap();
        assert!(is_uniformly_styled(&once.document, &selection, InlineStyle::Italic).unwrap());
        let twice = toggle_inline_style(&once.document, &selection, InlineStyle::Italic).unwrap();
        assert_eq!(twice.document, doc);
    }

    #[test]
    fn test_partially_styled_selection_turns_on() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "abcdef").with_style(0, 2, InlineStyle::Bold),
        ])
        .unwrap();
        let out = toggle_inline_style(&doc, &Selection::within("a", 0, 4), InlineStyle::Bold).unwrap();
        assert!(out.document.block(&"a".into()).unwrap().styles().covers(0, 4, &InlineStyle::Bold));
    }

    #[test]
    fn test_split_block() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::OrderedListItem, "onetwo").with_style(0, 6, InlineStyle::Bold),
        ])
        .unwrap();
        let out = split_block(&doc, &Selection::caret("a", 3)).unwrap();
        assert_eq!(out.document.plain_text(), "one\ntwo");
        let tail = out.document.block_at(1).unwrap();
        assert_eq!(tail.kind(), BlockType::OrderedListItem);
        assert!(tail.styles().covers(0, 3, &InlineStyle::Bold));
        assert_eq!(out.selection, Selection::caret(tail.key().clone(), 0));

        let err = split_block(&doc, &Selection::within("a", 0, 2)).unwrap_err();
        assert_eq!(err, ModelError::NotCollapsed);
    }

    #[test]
    fn test_set_block_type_toggles() {
        let doc = Document::from_text("a\nb");
        let all = Selection::new(Point::new("b0", 0), Point::new("b1", 1));
        let out = set_block_type(&doc, &all, BlockType::Blockquote).unwrap();
        assert!(out.document.blocks().all(|b| b.kind() == BlockType::Blockquote));
        let out = set_block_type(&out.document, &all, BlockType::Blockquote).unwrap();
        assert_eq!(out.document, doc);
    }

    #[test]
    fn test_links() {
        let doc = Document::from_text("see docs here");
        let out = apply_link(&doc, &Selection::within("b0", 4, 8), "https://example.com").unwrap();
        let block = out.document.first_block().unwrap();
        let id = block.entity_at(4).unwrap();
        assert_eq!(out.document.entity(id), Some(&Entity::link("https://example.com")));

        let removed = remove_link(&out.document, &Selection::caret("b0", 6)).unwrap();
        assert!(removed.document.first_block().unwrap().entities().is_empty());
    }

    #[test]
    fn test_delete_backward_merges_at_block_start() {
        let doc = Document::from_text("ab\ncd");
        let out = delete_backward(&doc, &Selection::caret("b1", 0)).unwrap();
        assert_eq!(out.document.plain_text(), "abcd");
        assert_eq!(out.selection, Selection::caret("b0", 2));

        let out = delete_forward(&out.document, &out.selection).unwrap();
        assert_eq!(out.document.plain_text(), "abd");
    }

    #[test]
    fn test_insert_fragment_multi_block() {
        let doc = Document::from_text("Hello world");
        let fragment = Document::from_text("A\nB\nC");
        let out = insert_fragment(&doc, &Selection::caret("b0", 6), &fragment).unwrap();
        assert_eq!(out.document.plain_text(), "Hello A\nB\nCworld");
        assert_eq!(out.document.first_block().unwrap().key().as_str(), "b0");

        let keys: std::collections::HashSet<_> = out.document.blocks().map(|b| b.key().clone()).collect();
        assert_eq!(keys.len(), 3);
        let last = out.document.block_at(2).unwrap();
        assert_eq!(out.selection, Selection::caret(last.key().clone(), 1));
    }

    #[test]
    fn test_insert_fragment_single_block_inline() {
        let doc = Document::from_text("ac");
        let fragment = Document::from_blocks(vec![
            Block::new("b0", BlockType::Unstyled, "b").with_style(0, 1, InlineStyle::Underline),
        ])
        .unwrap();
        let out = insert_fragment(&doc, &Selection::caret("b0", 1), &fragment).unwrap();
        let block = out.document.first_block().unwrap();
        assert_eq!(block.text(), "abc");
        assert_eq!(block.styles_at(1), StyleSet::from([InlineStyle::Underline]));
        assert_eq!(out.selection, Selection::caret("b0", 2));
    }
}
