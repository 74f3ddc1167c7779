//! Immutable block document model
//!
//! # Overview
//!
//! A [`Document`] is an ordered sequence of [`Block`]s plus an entity table. Blocks are
//! immutable: every edit produces new blocks, and the document shares untouched blocks
//! with its previous generation through `Arc`. Comparing two generations is therefore
//! mostly pointer comparisons, and [`Document::changed_blocks`] only inspects blocks
//! that were actually replaced.
//!
//! Each block carries three annotation layers, all stored as [`RangeSet`]s over char
//! offsets:
//!
//! - inline styles (bold, italic, ...)
//! - entity references (links, images, embeds)
//! - highlight marks (comments, annotations, suggestions), see [`crate::highlights`]
//!
//! # Example
//!
//! ```rust
//! use authoring_core::{Block, BlockType, Document, InlineStyle};
//!
//! let doc = Document::from_blocks(vec![
//!     Block::new("intro", BlockType::HeaderOne, "Title"),
//!     Block::new("body", BlockType::Unstyled, "Hello world").with_style(0, 5, InlineStyle::Bold),
//! ])
//! .unwrap();
//!
//! assert_eq!(doc.plain_text(), "Title\nHello world");
//! assert!(doc.block(&"body".into()).unwrap().styles_at(0).contains(&InlineStyle::Bold));
//! ```

use crate::error::ModelError;
use crate::highlights::HighlightId;
use crate::ranges::RangeSet;
use crate::table::Table;
use crate::text::{char_len, char_slice, splice};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Stable block identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    /// Create a key from any string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for BlockKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Accepted inline styles. No other style may persist in stored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    /// Bold text.
    Bold,
    /// Italic text.
    Italic,
    /// Underlined text.
    Underline,
    /// Struck-through text.
    Strikethrough,
    /// Subscript.
    Subscript,
    /// Superscript.
    Superscript,
}

impl InlineStyle {
    /// Every accepted style, in canonical order.
    pub const ALL: [InlineStyle; 6] = [
        InlineStyle::Bold,
        InlineStyle::Italic,
        InlineStyle::Underline,
        InlineStyle::Strikethrough,
        InlineStyle::Subscript,
        InlineStyle::Superscript,
    ];

    /// Interchange name (`"BOLD"`, `"ITALIC"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
            InlineStyle::Underline => "UNDERLINE",
            InlineStyle::Strikethrough => "STRIKETHROUGH",
            InlineStyle::Subscript => "SUBSCRIPT",
            InlineStyle::Superscript => "SUPERSCRIPT",
        }
    }

    /// Parse an interchange name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == name)
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of inline styles active at a position.
pub type StyleSet = BTreeSet<InlineStyle>;

/// Block-level semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Plain paragraph.
    Unstyled,
    /// Heading level 1.
    HeaderOne,
    /// Heading level 2.
    HeaderTwo,
    /// Heading level 3.
    HeaderThree,
    /// Heading level 4.
    HeaderFour,
    /// Heading level 5.
    HeaderFive,
    /// Heading level 6.
    HeaderSix,
    /// Bulleted list item.
    UnorderedListItem,
    /// Numbered list item.
    OrderedListItem,
    /// Quotation.
    Blockquote,
    /// Preformatted code.
    CodeBlock,
    /// Atomic block holding a single entity (image, embed, media).
    Atomic,
    /// Table block; the grid lives in [`Block::table`].
    Table,
}

impl BlockType {
    const ALL: [BlockType; 13] = [
        BlockType::Unstyled,
        BlockType::HeaderOne,
        BlockType::HeaderTwo,
        BlockType::HeaderThree,
        BlockType::HeaderFour,
        BlockType::HeaderFive,
        BlockType::HeaderSix,
        BlockType::UnorderedListItem,
        BlockType::OrderedListItem,
        BlockType::Blockquote,
        BlockType::CodeBlock,
        BlockType::Atomic,
        BlockType::Table,
    ];

    /// Interchange name (`"unstyled"`, `"header-one"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::HeaderOne => "header-one",
            BlockType::HeaderTwo => "header-two",
            BlockType::HeaderThree => "header-three",
            BlockType::HeaderFour => "header-four",
            BlockType::HeaderFive => "header-five",
            BlockType::HeaderSix => "header-six",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::Blockquote => "blockquote",
            BlockType::CodeBlock => "code-block",
            BlockType::Atomic => "atomic",
            BlockType::Table => "table",
        }
    }

    /// Parse an interchange name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Heading level (1-6) for header blocks.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            BlockType::HeaderOne => Some(1),
            BlockType::HeaderTwo => Some(2),
            BlockType::HeaderThree => Some(3),
            BlockType::HeaderFour => Some(4),
            BlockType::HeaderFive => Some(5),
            BlockType::HeaderSix => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a non-text inline object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Hyperlink; `data.url` holds the target.
    Link,
    /// Image reference.
    Image,
    /// Embed code.
    Embed,
    /// Media item (video, audio, picture package).
    Media,
    /// Any other kind, kept verbatim for interchange.
    Other(String),
}

impl EntityKind {
    /// Interchange name.
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Link => "LINK",
            EntityKind::Image => "IMAGE",
            EntityKind::Embed => "EMBED",
            EntityKind::Media => "MEDIA",
            EntityKind::Other(name) => name,
        }
    }

    /// Parse an interchange name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "LINK" => EntityKind::Link,
            "IMAGE" => EntityKind::Image,
            "EMBED" => EntityKind::Embed,
            "MEDIA" => EntityKind::Media,
            other => EntityKind::Other(other.to_string()),
        }
    }

    /// Immutable entities are removed whole when an edit cuts through them.
    pub fn is_immutable(&self) -> bool {
        matches!(self, EntityKind::Image | EntityKind::Embed | EntityKind::Media)
    }
}

/// Entity table record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity kind.
    pub kind: EntityKind,
    /// Kind-specific payload (link target, image reference, embed code).
    pub data: serde_json::Value,
}

impl Entity {
    /// Create a link entity pointing at `url`.
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Link,
            data: serde_json::json!({ "url": url.into() }),
        }
    }
}

/// A paragraph-level unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub(crate) key: BlockKey,
    pub(crate) kind: BlockType,
    pub(crate) text: String,
    pub(crate) styles: RangeSet<InlineStyle>,
    pub(crate) entities: RangeSet<EntityId>,
    pub(crate) marks: RangeSet<HighlightId>,
    pub(crate) table: Option<Arc<Table>>,
}

impl Block {
    /// Create an unannotated block.
    pub fn new(key: impl Into<BlockKey>, kind: BlockType, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            text: text.into(),
            styles: RangeSet::new(),
            entities: RangeSet::new(),
            marks: RangeSet::new(),
            table: None,
        }
    }

    /// Builder: tag `[start, end)` with `style`.
    pub fn with_style(mut self, start: usize, end: usize, style: InlineStyle) -> Self {
        self.styles.insert(start, end, style);
        self
    }

    /// Builder: reference `entity` over `[start, end)`.
    pub fn with_entity(mut self, start: usize, end: usize, entity: EntityId) -> Self {
        self.entities.clear_range(start, end);
        self.entities.insert(start, end, entity);
        self
    }

    /// Block key.
    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    /// Block type.
    pub fn kind(&self) -> BlockType {
        self.kind
    }

    /// Block text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    /// Returns `true` if the block has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Inline style ranges.
    pub fn styles(&self) -> &RangeSet<InlineStyle> {
        &self.styles
    }

    /// Entity ranges.
    pub fn entities(&self) -> &RangeSet<EntityId> {
        &self.entities
    }

    /// Highlight marks.
    pub fn marks(&self) -> &RangeSet<HighlightId> {
        &self.marks
    }

    /// Table grid, for table blocks.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_deref()
    }

    /// Styles applied to the character at `offset`.
    pub fn styles_at(&self, offset: usize) -> StyleSet {
        self.styles.values_at(offset).into_iter().collect()
    }

    /// Entity referenced by the character at `offset`.
    pub fn entity_at(&self, offset: usize) -> Option<EntityId> {
        self.entities.values_at(offset).into_iter().next()
    }

    /// Highlights marking the character at `offset`.
    pub fn marks_at(&self, offset: usize) -> Vec<HighlightId> {
        self.marks.values_at(offset)
    }

    /// Text of `[start, end)`.
    pub fn slice_text(&self, start: usize, end: usize) -> &str {
        char_slice(&self.text, start, end)
    }

    pub(crate) fn with_key(mut self, key: BlockKey) -> Self {
        self.key = key;
        self
    }

    pub(crate) fn with_kind(mut self, kind: BlockType) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn with_table(mut self, table: Table) -> Self {
        self.table = Some(Arc::new(table));
        self
    }

    /// Replace `[start, end)` with `text`, styling the inserted characters with
    /// `styles`. Entities and marks that strictly contain the insertion point grow
    /// over the new text.
    pub(crate) fn splice(&self, start: usize, end: usize, text: &str, styles: &StyleSet) -> Block {
        let mut block = self.clone();
        block.text = splice(&self.text, start, end, text);
        block.styles.update_for_deletion(start, end);
        block.entities.update_for_deletion(start, end);
        block.marks.update_for_deletion(start, end);

        let inserted = char_len(text);
        if inserted > 0 {
            block.styles.update_for_insertion(start, inserted);
            block.styles.clear_range(start, start + inserted);
            for style in styles {
                block.styles.insert(start, start + inserted, *style);
            }
            block.entities.update_for_insertion(start, inserted);
            block.marks.update_for_insertion(start, inserted);
        }
        block.drop_fragmented_entities();
        block
    }

    /// Split at `offset`; the tail gets `tail_key` and keeps the block type.
    pub(crate) fn split_at(&self, offset: usize, tail_key: BlockKey) -> (Block, Block) {
        let len = self.len();
        let mut head = self.clone();
        head.text = char_slice(&self.text, 0, offset).to_string();
        head.styles = self.styles.slice(0, offset);
        head.entities = self.entities.slice(0, offset);
        head.marks = self.marks.slice(0, offset);

        let tail = Block {
            key: tail_key,
            kind: self.kind,
            text: char_slice(&self.text, offset, len).to_string(),
            styles: self.styles.slice(offset, len),
            entities: self.entities.slice(offset, len),
            marks: self.marks.slice(offset, len),
            table: None,
        };
        (head, tail)
    }

    /// Append `tail`'s content; key and type of `self` win.
    pub(crate) fn join(&self, tail: &Block) -> Block {
        let offset = self.len();
        let mut block = self.clone();
        block.text.push_str(&tail.text);
        block.styles.append(&tail.styles, offset);
        block.entities.append(&tail.entities, offset);
        block.marks.append(&tail.marks, offset);
        block.drop_fragmented_entities();
        block
    }

    pub(crate) fn set_style(&self, start: usize, end: usize, style: InlineStyle, on: bool) -> Block {
        let mut block = self.clone();
        if on {
            block.styles.insert(start, end, style);
        } else {
            block.styles.remove(start, end, &style);
        }
        block
    }

    pub(crate) fn set_entity(&self, start: usize, end: usize, entity: Option<EntityId>) -> Block {
        let mut block = self.clone();
        block.entities.clear_range(start, end);
        if let Some(entity) = entity {
            block.entities.insert(start, end, entity);
        }
        block.drop_fragmented_entities();
        block
    }

    /// An entity must stay contiguous within a block; scattered references are stripped.
    fn drop_fragmented_entities(&mut self) {
        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut fragmented: Vec<EntityId> = Vec::new();
        for span in &self.entities {
            if !seen.insert(span.value) {
                fragmented.push(span.value);
            }
        }
        for entity in fragmented {
            tracing::debug!(block = %self.key, entity = %entity, "dropping fragmented entity");
            self.entities.remove_value(&entity);
        }
    }
}

/// Immutable document: ordered blocks plus the entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Arc<Vec<Arc<Block>>>,
    entities: Arc<BTreeMap<EntityId, Entity>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// A document with a single empty paragraph.
    pub fn empty() -> Self {
        Self {
            blocks: Arc::new(vec![Arc::new(Block::new("b0", BlockType::Unstyled, ""))]),
            entities: Arc::new(BTreeMap::new()),
        }
    }

    /// One unstyled block per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let blocks = text
            .split('\n')
            .enumerate()
            .map(|(i, line)| Arc::new(Block::new(format!("b{i}"), BlockType::Unstyled, line)))
            .collect();
        Self {
            blocks: Arc::new(blocks),
            entities: Arc::new(BTreeMap::new()),
        }
    }

    /// Build a document without entities.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ModelError> {
        Self::new(blocks, BTreeMap::new())
    }

    /// Build a document, validating key uniqueness and entity references.
    pub fn new(blocks: Vec<Block>, entities: BTreeMap<EntityId, Entity>) -> Result<Self, ModelError> {
        let blocks = if blocks.is_empty() {
            vec![Block::new("b0", BlockType::Unstyled, "")]
        } else {
            blocks
        };
        let doc = Self {
            blocks: Arc::new(blocks.into_iter().map(Arc::new).collect()),
            entities: Arc::new(entities),
        };

        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let mut keys: HashSet<&BlockKey> = HashSet::new();
        for block in self.all_blocks() {
            if !keys.insert(&block.key) {
                return Err(ModelError::DuplicateKey(block.key.clone()));
            }
            if let Some(span) = block
                .entities
                .iter()
                .find(|span| !self.entities.contains_key(&span.value))
            {
                return Err(ModelError::MissingEntity(span.value));
            }
        }
        Ok(())
    }

    /// Top-level blocks in rendering order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().map(|block| block.as_ref())
    }

    /// Top-level blocks and every block nested in table cells.
    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().flat_map(|block| {
            let nested: Vec<&Block> = block
                .table()
                .map(|table| table.cell_blocks().collect())
                .unwrap_or_default();
            std::iter::once(block.as_ref()).chain(nested)
        })
    }

    /// Number of top-level blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Block by index.
    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(|block| block.as_ref())
    }

    /// Block by key.
    pub fn block(&self, key: &BlockKey) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|block| &block.key == key)
            .map(|block| block.as_ref())
    }

    /// Index of the block with `key`.
    pub fn block_index(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|block| &block.key == key)
    }

    /// First block.
    pub fn first_block(&self) -> Option<&Block> {
        self.block_at(0)
    }

    /// Last block.
    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last().map(|block| block.as_ref())
    }

    /// Entity table.
    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    /// Entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Blocks joined by newlines.
    pub fn plain_text(&self) -> String {
        let texts: Vec<&str> = self.blocks().map(Block::text).collect();
        texts.join("\n")
    }

    /// Returns `true` if both documents share the same block storage.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks) && Arc::ptr_eq(&self.entities, &other.entities)
    }

    /// Keys of blocks in `self` that are new or replaced relative to `previous`.
    ///
    /// Untouched blocks are shared between generations, so only replaced blocks are
    /// compared by value.
    pub fn changed_blocks(&self, previous: &Document) -> Vec<BlockKey> {
        if Arc::ptr_eq(&self.blocks, &previous.blocks) {
            return Vec::new();
        }
        self.blocks
            .iter()
            .filter(|block| {
                match previous.blocks.iter().find(|old| old.key == block.key) {
                    Some(old) => !Arc::ptr_eq(old, block) && old != *block,
                    None => true,
                }
            })
            .map(|block| block.key.clone())
            .collect()
    }

    pub(crate) fn block_arc(&self, index: usize) -> Option<&Arc<Block>> {
        self.blocks.get(index)
    }

    /// Replace the blocks in `range` with `replacement`, sharing everything else.
    pub(crate) fn splice_blocks(
        &self,
        range: std::ops::Range<usize>,
        replacement: Vec<Block>,
    ) -> Document {
        let mut blocks: Vec<Arc<Block>> = self.blocks.as_ref().clone();
        let _removed: Vec<Arc<Block>> = blocks
            .splice(range, replacement.into_iter().map(Arc::new))
            .collect();
        if blocks.is_empty() {
            blocks.push(Arc::new(Block::new("b0", BlockType::Unstyled, "")));
        }
        Document {
            blocks: Arc::new(blocks),
            entities: Arc::clone(&self.entities),
        }
    }

    pub(crate) fn replace_block(&self, index: usize, block: Block) -> Document {
        self.splice_blocks(index..index + 1, vec![block])
    }

    /// Rebuild every top-level block through `f`; untouched blocks keep their `Arc`.
    pub(crate) fn map_blocks(&self, mut f: impl FnMut(&Block) -> Option<Block>) -> Document {
        let mut changed = false;
        let blocks: Vec<Arc<Block>> = self
            .blocks
            .iter()
            .map(|block| match f(block) {
                Some(updated) => {
                    changed = true;
                    Arc::new(updated)
                }
                None => Arc::clone(block),
            })
            .collect();
        if !changed {
            return self.clone();
        }
        Document {
            blocks: Arc::new(blocks),
            entities: Arc::clone(&self.entities),
        }
    }

    /// Add an entity and return its fresh id.
    pub(crate) fn add_entity(&self, entity: Entity) -> (Document, EntityId) {
        let id = EntityId(self.entities.keys().next_back().map_or(0, |last| last.0 + 1));
        let mut entities = self.entities.as_ref().clone();
        entities.insert(id, entity);
        (
            Document {
                blocks: Arc::clone(&self.blocks),
                entities: Arc::new(entities),
            },
            id,
        )
    }

    /// Generate `count` keys that are unused anywhere in the document.
    pub(crate) fn fresh_keys(&self, count: usize) -> Vec<BlockKey> {
        let used: HashSet<&str> = self.all_blocks().map(|block| block.key.as_str()).collect();
        let mut keys = Vec::with_capacity(count);
        let mut n = self.blocks.len();
        while keys.len() < count {
            let candidate = format!("b{n}");
            if !used.contains(candidate.as_str()) {
                keys.push(BlockKey(candidate));
            }
            n += 1;
        }
        keys
    }

    pub(crate) fn fresh_key(&self) -> BlockKey {
        self.fresh_keys(1)
            .pop()
            .unwrap_or_else(|| BlockKey(format!("b{}", self.blocks.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_inherits_explicit_styles() {
        let block = Block::new("a", BlockType::Unstyled, "Hello").with_style(0, 5, InlineStyle::Bold);
        let plain = StyleSet::new();
        let edited = block.splice(2, 2, "XY", &plain);
        assert_eq!(edited.text(), "HeXYllo");
        assert!(edited.styles_at(1).contains(&InlineStyle::Bold));
        assert!(edited.styles_at(2).is_empty());
        assert!(edited.styles_at(4).contains(&InlineStyle::Bold));
    }

    #[test]
    fn test_split_and_join_round_trip() {
        let block = Block::new("a", BlockType::HeaderTwo, "Hello world")
            .with_style(3, 8, InlineStyle::Italic)
            .with_entity(6, 11, EntityId(0));
        let (head, tail) = block.split_at(5, BlockKey::new("b"));
        assert_eq!(head.text(), "Hello");
        assert_eq!(tail.text(), " world");
        assert_eq!(tail.kind(), BlockType::HeaderTwo);
        assert_eq!(head.join(&tail), block);
    }

    #[test]
    fn test_fragmented_entity_is_stripped() {
        let head = Block::new("a", BlockType::Unstyled, "ab").with_entity(0, 1, EntityId(3));
        let tail = Block::new("b", BlockType::Unstyled, "cd").with_entity(1, 2, EntityId(3));
        let joined = head.join(&tail);
        assert!(joined.entities().is_empty());
    }

    #[test]
    fn test_document_rejects_missing_entity() {
        let result = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "link").with_entity(0, 4, EntityId(9)),
        ]);
        assert_eq!(result, Err(ModelError::MissingEntity(EntityId(9))));
    }

    #[test]
    fn test_changed_blocks_uses_sharing() {
        let doc = Document::from_text("one\ntwo\nthree");
        let edited = doc.replace_block(1, Block::new("b1", BlockType::Unstyled, "TWO"));
        assert_eq!(edited.changed_blocks(&doc), vec![BlockKey::new("b1")]);
        assert!(doc.changed_blocks(&doc).is_empty());
    }

    #[test]
    fn test_fresh_keys_skip_existing() {
        let doc = Document::from_text("a\nb");
        let keys = doc.fresh_keys(2);
        assert_eq!(keys, vec![BlockKey::new("b2"), BlockKey::new("b3")]);
    }
}
