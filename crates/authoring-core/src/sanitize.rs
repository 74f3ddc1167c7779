//! Paste sanitizer
//!
//! # Overview
//!
//! Externally sourced content is filtered down to an allow-list before it reaches the
//! document:
//!
//! - style ranges survive only for allowed [`InlineStyle`]s; unknown names are dropped
//! - entity ranges are stripped unless an entity validator accepts the entity
//! - unknown block types become `unstyled`
//! - malformed ranges (inverted, past the end, overlapping an accepted range with the
//!   same key) are discarded
//! - empty or duplicate block keys are replaced
//!
//! Sanitizing never fails; every drop is logged with `tracing::warn!` and counted in
//! the [`SanitizeReport`].
//!
//! # Example
//!
//! ```rust
//! use authoring_core::interchange::RawDocument;
//! use authoring_core::sanitize::Sanitizer;
//! use authoring_core::InlineStyle;
//!
//! let raw = RawDocument::from_json(
//!     r#"{"blocks":[{"key":"x","text":"pasted","type":"unstyled",
//!        "styleRanges":[{"style":"BOLD","start":0,"end":6},{"style":"CODE","start":0,"end":6}]}]}"#,
//! )
//! .unwrap();
//! let (doc, report) = Sanitizer::default().sanitize(&raw);
//!
//! assert_eq!(doc.first_block().unwrap().styles_at(0).into_iter().collect::<Vec<_>>(), vec![InlineStyle::Bold]);
//! assert_eq!(report.dropped_styles, 1);
//! ```

use crate::document::{Block, BlockKey, BlockType, Document, Entity, EntityId, EntityKind, InlineStyle, StyleSet};
use crate::interchange::{RawBlock, RawDocument, RawTable};
use crate::ranges::Span;
use crate::table::{Table, TableCell};
use crate::text::char_len;
use std::collections::{BTreeMap, HashSet};

/// Decides whether a pasted entity may be kept.
pub type EntityValidator = Box<dyn Fn(&Entity) -> bool + Send + Sync>;

/// What the sanitizer dropped or rewrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Style ranges with a disallowed or unknown style.
    pub dropped_styles: usize,
    /// Entity ranges that were stripped.
    pub dropped_entities: usize,
    /// Inverted, out-of-range or overlapping ranges.
    pub malformed_ranges: usize,
    /// Blocks whose type was unknown and became `unstyled`.
    pub unknown_block_types: usize,
    /// Blocks that received a new key.
    pub rekeyed_blocks: usize,
    /// The payload was not valid JSON; the result is an empty document.
    pub malformed_payload: bool,
}

impl SanitizeReport {
    /// Returns `true` if nothing was dropped or rewritten.
    pub fn is_clean(&self) -> bool {
        self == &SanitizeReport::default()
    }
}

/// Allow-list filter for pasted content.
pub struct Sanitizer {
    allowed_styles: StyleSet,
    entity_validator: Option<EntityValidator>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(InlineStyle::ALL.into_iter().collect())
    }
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("allowed_styles", &self.allowed_styles)
            .field("entity_validator", &self.entity_validator.is_some())
            .finish()
    }
}

struct Pass<'a> {
    sanitizer: &'a Sanitizer,
    raw: &'a RawDocument,
    keys: HashSet<String>,
    next_key: usize,
    entities: BTreeMap<EntityId, Entity>,
    report: SanitizeReport,
}

impl Sanitizer {
    /// Sanitizer accepting `allowed_styles` and stripping every entity.
    pub fn new(allowed_styles: StyleSet) -> Self {
        Self {
            allowed_styles,
            entity_validator: None,
        }
    }

    /// Builder: keep entities accepted by `validator`.
    pub fn with_entity_validator(mut self, validator: impl Fn(&Entity) -> bool + Send + Sync + 'static) -> Self {
        self.entity_validator = Some(Box::new(validator));
        self
    }

    /// Styles that survive sanitizing.
    pub fn allowed_styles(&self) -> &StyleSet {
        &self.allowed_styles
    }

    /// Filter `raw` into a document.
    pub fn sanitize(&self, raw: &RawDocument) -> (Document, SanitizeReport) {
        let mut pass = Pass {
            sanitizer: self,
            raw,
            keys: HashSet::new(),
            next_key: 0,
            entities: BTreeMap::new(),
            report: SanitizeReport::default(),
        };
        let blocks: Vec<Block> = raw.blocks.iter().map(|block| pass.block(block)).collect();

        let report = pass.report;
        let doc = match Document::new(blocks, pass.entities) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::error!(error = %err, "sanitized document is inconsistent");
                Document::empty()
            }
        };
        if !report.is_clean() {
            tracing::debug!(report = ?report, "sanitized pasted content");
        }
        (doc, report)
    }

    /// Parse and filter a JSON payload. Invalid JSON yields an empty document.
    pub fn sanitize_json(&self, json: &str) -> (Document, SanitizeReport) {
        match RawDocument::from_json(json) {
            Ok(raw) => self.sanitize(&raw),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed paste payload");
                let report = SanitizeReport {
                    malformed_payload: true,
                    ..SanitizeReport::default()
                };
                (Document::empty(), report)
            }
        }
    }
}

impl Pass<'_> {
    fn key(&mut self, raw: &str) -> BlockKey {
        if !raw.is_empty() && self.keys.insert(raw.to_string()) {
            return BlockKey::new(raw);
        }
        self.report.rekeyed_blocks += 1;
        loop {
            let candidate = format!("p{}", self.next_key);
            self.next_key += 1;
            if !self.raw_has_key(&candidate) && self.keys.insert(candidate.clone()) {
                tracing::warn!(key = %raw, replacement = %candidate, "rekeying pasted block");
                return BlockKey::new(candidate);
            }
        }
    }

    fn raw_has_key(&self, key: &str) -> bool {
        fn walk(blocks: &[RawBlock], key: &str) -> bool {
            blocks.iter().any(|block| {
                block.key == key
                    || block.table.as_ref().is_some_and(|table| {
                        table.cells.iter().flatten().flatten().any(|cell| walk(cell, key))
                    })
            })
        }
        walk(&self.raw.blocks, key)
    }

    fn block(&mut self, raw: &RawBlock) -> Block {
        let key = self.key(&raw.key);
        let len = char_len(&raw.text);
        let kind = match BlockType::from_name(&raw.kind) {
            Some(BlockType::Table) if raw.table.is_none() => None,
            Some(kind) => Some(kind),
            None => None,
        };
        let kind = kind.unwrap_or_else(|| {
            tracing::warn!(block = %key, kind = %raw.kind, "unknown block type, using unstyled");
            self.report.unknown_block_types += 1;
            BlockType::Unstyled
        });

        let mut block = Block::new(key.clone(), kind, raw.text.as_str());
        let mut accepted: Vec<Span<InlineStyle>> = Vec::new();
        for range in &raw.style_ranges {
            if range.start >= range.end || range.end > len {
                tracing::warn!(block = %key, start = range.start, end = range.end, "dropping malformed style range");
                self.report.malformed_ranges += 1;
                continue;
            }
            let Some(style) = InlineStyle::from_name(&range.style).filter(|s| self.sanitizer.allowed_styles.contains(s))
            else {
                tracing::warn!(block = %key, style = %range.style, "dropping disallowed style");
                self.report.dropped_styles += 1;
                continue;
            };
            if accepted
                .iter()
                .any(|span| span.value == style && span.overlaps(range.start, range.end))
            {
                tracing::warn!(block = %key, style = %range.style, "dropping overlapping style range");
                self.report.malformed_ranges += 1;
                continue;
            }
            accepted.push(Span::new(range.start, range.end, style));
        }
        for span in accepted {
            block = block.with_style(span.start, span.end, span.value);
        }

        let mut taken: Vec<(usize, usize)> = Vec::new();
        for range in &raw.entity_ranges {
            if range.start >= range.end || range.end > len || taken.iter().any(|(s, e)| *s < range.end && range.start < *e) {
                tracing::warn!(block = %key, start = range.start, end = range.end, "dropping malformed entity range");
                self.report.malformed_ranges += 1;
                continue;
            }
            let entity = self.raw.entity_map.get(&range.entity_id).map(|raw| Entity {
                kind: EntityKind::from_name(&raw.kind),
                data: raw.data.clone(),
            });
            let keep = match (&entity, &self.sanitizer.entity_validator) {
                (Some(entity), Some(validator)) => validator(entity),
                _ => false,
            };
            match entity {
                Some(entity) if keep => {
                    let id = EntityId(range.entity_id);
                    self.entities.insert(id, entity);
                    block = block.with_entity(range.start, range.end, id);
                    taken.push((range.start, range.end));
                }
                _ => {
                    tracing::warn!(block = %key, entity = range.entity_id, "stripping pasted entity");
                    self.report.dropped_entities += 1;
                }
            }
        }

        if kind == BlockType::Table
            && let Some(table) = &raw.table
        {
            block = block.with_table(self.table(table));
        }
        block
    }

    fn table(&mut self, raw: &RawTable) -> Table {
        let rows = raw.rows.max(1);
        let cols = raw.cols.max(1);
        let mut cells: Vec<Vec<Option<TableCell>>> = Vec::with_capacity(raw.cells.len());
        for row in &raw.cells {
            let mut sanitized = Vec::with_capacity(row.len());
            for cell in row {
                let cell = match cell {
                    Some(blocks) => {
                        let blocks = blocks.iter().map(|block| self.block(block)).collect();
                        Some(TableCell::new(blocks))
                    }
                    None => None,
                };
                sanitized.push(cell);
            }
            cells.push(sanitized);
        }
        Table::from_cells(rows, cols, raw.with_header, cells)
    }
}
