//! Serialized document interchange format
//!
//! # Overview
//!
//! The persisted/transmitted shape of a [`Document`]: an ordered list of block records
//! plus an entity table.
//!
//! ```json
//! {
//!   "blocks": [
//!     {
//!       "key": "b0",
//!       "text": "Hello world",
//!       "type": "unstyled",
//!       "styleRanges": [{ "style": "BOLD", "start": 0, "end": 5 }],
//!       "entityRanges": [{ "entityId": 0, "start": 6, "end": 11 }]
//!     }
//!   ],
//!   "entityMap": { "0": { "type": "LINK", "data": { "url": "https://example.com" } } }
//! }
//! ```
//!
//! Decoding is strict: unknown block types, unknown styles, invalid ranges, duplicate
//! keys and dangling entity references are errors. Untrusted content goes through
//! [`crate::sanitize`] instead.
//!
//! Encoding is canonical (ranges sorted, entity table sorted by id), so
//! `serialize(deserialize(s)) == s` for any `s` produced by [`serialize`].
//!
//! Highlight marks are not part of this payload; they travel in the side channel
//! produced by [`crate::highlights::export_highlights`].

use crate::document::{Block, BlockType, Document, Entity, EntityId, EntityKind, InlineStyle};
use crate::error::InterchangeError;
use crate::table::{Table, TableCell};
use crate::text::char_len;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized inline style range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStyleRange {
    /// Style name (`"BOLD"`, ...).
    pub style: String,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

/// Serialized entity range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntityRange {
    /// Entity table key.
    pub entity_id: u32,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

/// Serialized table grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Whether the first row is a header.
    #[serde(default)]
    pub with_header: bool,
    /// Row-major cells; `null` for empty cells.
    pub cells: Vec<Vec<Option<Vec<RawBlock>>>>,
}

/// Serialized block record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Block key.
    pub key: String,
    /// Block text.
    pub text: String,
    /// Block type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Inline style ranges.
    #[serde(default)]
    pub style_ranges: Vec<RawStyleRange>,
    /// Entity ranges.
    #[serde(default)]
    pub entity_ranges: Vec<RawEntityRange>,
    /// Table grid, for table blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<RawTable>,
}

/// Serialized entity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntity {
    /// Entity kind name (`"LINK"`, `"IMAGE"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    /// Blocks in rendering order.
    pub blocks: Vec<RawBlock>,
    /// Entity table.
    #[serde(default)]
    pub entity_map: BTreeMap<u32, RawEntity>,
}

impl RawDocument {
    /// Parse a payload without validating it against the model.
    pub fn from_json(json: &str) -> Result<Self, InterchangeError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn block_to_raw(block: &Block) -> RawBlock {
    let mut style_ranges: Vec<RawStyleRange> = block
        .styles()
        .iter()
        .map(|span| RawStyleRange {
            style: span.value.as_str().to_string(),
            start: span.start,
            end: span.end,
        })
        .collect();
    style_ranges.sort_by(|a, b| (a.start, a.end, &a.style).cmp(&(b.start, b.end, &b.style)));

    let mut entity_ranges: Vec<RawEntityRange> = block
        .entities()
        .iter()
        .map(|span| RawEntityRange {
            entity_id: span.value.0,
            start: span.start,
            end: span.end,
        })
        .collect();
    entity_ranges.sort_by_key(|range| (range.start, range.end, range.entity_id));

    RawBlock {
        key: block.key().to_string(),
        text: block.text().to_string(),
        kind: block.kind().as_str().to_string(),
        style_ranges,
        entity_ranges,
        table: block.table().map(table_to_raw),
    }
}

fn table_to_raw(table: &Table) -> RawTable {
    let cells = (0..table.rows())
        .map(|row| {
            (0..table.cols())
                .map(|col| {
                    table
                        .cell(row, col)
                        .map(|cell| cell.blocks().iter().map(block_to_raw).collect())
                })
                .collect()
        })
        .collect();
    RawTable {
        rows: table.rows(),
        cols: table.cols(),
        with_header: table.with_header(),
        cells,
    }
}

impl From<&Document> for RawDocument {
    fn from(doc: &Document) -> Self {
        RawDocument {
            blocks: doc.blocks().map(block_to_raw).collect(),
            entity_map: doc
                .entities()
                .iter()
                .map(|(id, entity)| {
                    (
                        id.0,
                        RawEntity {
                            kind: entity.kind.as_str().to_string(),
                            data: entity.data.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

fn block_from_raw(raw: &RawBlock) -> Result<Block, InterchangeError> {
    let kind = BlockType::from_name(&raw.kind).ok_or_else(|| InterchangeError::UnknownBlockType {
        key: raw.key.clone(),
        kind: raw.kind.clone(),
    })?;
    let len = char_len(&raw.text);
    let check = |start: usize, end: usize| {
        if start > end || end > len {
            return Err(InterchangeError::InvalidRange {
                key: raw.key.clone(),
                start,
                end,
            });
        }
        Ok(())
    };

    let mut block = Block::new(raw.key.as_str(), kind, raw.text.as_str());
    for range in &raw.style_ranges {
        check(range.start, range.end)?;
        let style = InlineStyle::from_name(&range.style).ok_or_else(|| InterchangeError::UnknownStyle {
            key: raw.key.clone(),
            style: range.style.clone(),
        })?;
        block = block.with_style(range.start, range.end, style);
    }
    for range in &raw.entity_ranges {
        check(range.start, range.end)?;
        block = block.with_entity(range.start, range.end, EntityId(range.entity_id));
    }
    if let Some(table) = &raw.table {
        block = block.with_table(table_from_raw(table)?);
    }
    Ok(block)
}

fn table_from_raw(raw: &RawTable) -> Result<Table, InterchangeError> {
    let mut cells: Vec<Vec<Option<TableCell>>> = Vec::with_capacity(raw.rows);
    for row in &raw.cells {
        let mut cols: Vec<Option<TableCell>> = Vec::with_capacity(raw.cols);
        for cell in row {
            let cell = match cell {
                Some(blocks) => Some(TableCell::new(
                    blocks.iter().map(block_from_raw).collect::<Result<_, _>>()?,
                )),
                None => None,
            };
            cols.push(cell);
        }
        cells.push(cols);
    }
    if raw.rows == 0 || raw.cols == 0 {
        return Err(crate::error::ModelError::InvalidTableSize.into());
    }
    Ok(Table::from_cells(raw.rows, raw.cols, raw.with_header, cells))
}

impl TryFrom<&RawDocument> for Document {
    type Error = InterchangeError;

    fn try_from(raw: &RawDocument) -> Result<Self, Self::Error> {
        let blocks = raw
            .blocks
            .iter()
            .map(block_from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let entities: BTreeMap<EntityId, Entity> = raw
            .entity_map
            .iter()
            .map(|(id, entity)| {
                (
                    EntityId(*id),
                    Entity {
                        kind: EntityKind::from_name(&entity.kind),
                        data: entity.data.clone(),
                    },
                )
            })
            .collect();
        Ok(Document::new(blocks, entities)?)
    }
}

impl TryFrom<RawDocument> for Document {
    type Error = InterchangeError;

    fn try_from(raw: RawDocument) -> Result<Self, Self::Error> {
        Document::try_from(&raw)
    }
}

/// Encode `doc` as interchange JSON.
pub fn serialize(doc: &Document) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string(&RawDocument::from(doc))?)
}

/// Decode interchange JSON into a validated document.
pub fn deserialize(json: &str) -> Result<Document, InterchangeError> {
    let raw = RawDocument::from_json(json)?;
    Document::try_from(&raw)
}
