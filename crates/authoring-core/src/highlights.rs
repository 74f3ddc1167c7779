//! Highlight registry and highlight set
//!
//! # Overview
//!
//! Highlights are range-scoped overlays: comments, annotations and suggestions. Their
//! positions live in the document itself, as marks on each block (see
//! [`Block::marks`](crate::Block::marks)), so they move with every edit for free. The
//! [`HighlightSet`] holds the metadata (type, author, date, description) keyed by
//! [`HighlightId`].
//!
//! The registry ([`HighlightType::descriptor`]) is a static catalogue describing each
//! type: its semantic [`HighlightKind`], the inline style a style-toggle suggestion
//! targets and the appearance hints the rendering layer uses.
//!
//! # Export
//!
//! [`export_highlights`] emits the side-channel list `[{id, type, range, data}]`
//! independently of the document payload; [`import_highlights`] reads it back and
//! re-applies the marks, dropping records whose range no longer resolves.

use crate::document::{Block, Document, InlineStyle};
use crate::error::ModelError;
use crate::selection::{Point, Selection, range_slices};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Highlight identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightId(pub u64);

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overlay types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighlightType {
    /// Discussion comment.
    Comment,
    /// Editorial annotation.
    Annotation,
    /// Suggested insertion.
    AddSuggestion,
    /// Suggested deletion.
    DeleteSuggestion,
    /// Suggested bold toggle.
    ToggleBoldSuggestion,
    /// Suggested italic toggle.
    ToggleItalicSuggestion,
    /// Suggested underline toggle.
    ToggleUnderlineSuggestion,
}

/// Semantic category of a highlight type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighlightKind {
    /// Comment thread.
    Comment,
    /// Annotation.
    Annotation,
    /// Content change (insertion/deletion).
    Change,
    /// Style toggle.
    Style,
}

/// Appearance hints for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    /// CSS background colour.
    pub background: Option<&'static str>,
    /// CSS text colour.
    pub color: Option<&'static str>,
    /// CSS text decoration.
    pub text_decoration: Option<&'static str>,
}

/// Registry entry for a highlight type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightDescriptor {
    /// Semantic kind.
    pub kind: HighlightKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Style toggled by STYLE-kind suggestions.
    pub style: Option<InlineStyle>,
    /// Appearance hints.
    pub appearance: Appearance,
}

const COMMENT: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Comment,
    description: "Comment",
    style: None,
    appearance: Appearance {
        background: Some("rgba(255, 227, 128, 0.5)"),
        color: None,
        text_decoration: None,
    },
};

const ANNOTATION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Annotation,
    description: "Annotation",
    style: None,
    appearance: Appearance {
        background: Some("rgba(180, 220, 255, 0.5)"),
        color: None,
        text_decoration: None,
    },
};

const ADD_SUGGESTION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Change,
    description: "Add",
    style: None,
    appearance: Appearance {
        background: None,
        color: Some("#2e7d32"),
        text_decoration: Some("underline"),
    },
};

const DELETE_SUGGESTION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Change,
    description: "Delete",
    style: None,
    appearance: Appearance {
        background: None,
        color: Some("#c62828"),
        text_decoration: Some("line-through"),
    },
};

const TOGGLE_BOLD_SUGGESTION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Style,
    description: "Toggle bold",
    style: Some(InlineStyle::Bold),
    appearance: Appearance {
        background: Some("rgba(200, 200, 200, 0.4)"),
        color: None,
        text_decoration: None,
    },
};

const TOGGLE_ITALIC_SUGGESTION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Style,
    description: "Toggle italic",
    style: Some(InlineStyle::Italic),
    appearance: Appearance {
        background: Some("rgba(200, 200, 200, 0.4)"),
        color: None,
        text_decoration: None,
    },
};

const TOGGLE_UNDERLINE_SUGGESTION: HighlightDescriptor = HighlightDescriptor {
    kind: HighlightKind::Style,
    description: "Toggle underline",
    style: Some(InlineStyle::Underline),
    appearance: Appearance {
        background: Some("rgba(200, 200, 200, 0.4)"),
        color: None,
        text_decoration: None,
    },
};

impl HighlightType {
    /// Every registered type.
    pub const ALL: [HighlightType; 7] = [
        HighlightType::Comment,
        HighlightType::Annotation,
        HighlightType::AddSuggestion,
        HighlightType::DeleteSuggestion,
        HighlightType::ToggleBoldSuggestion,
        HighlightType::ToggleItalicSuggestion,
        HighlightType::ToggleUnderlineSuggestion,
    ];

    /// Registry entry.
    pub fn descriptor(self) -> &'static HighlightDescriptor {
        match self {
            HighlightType::Comment => &COMMENT,
            HighlightType::Annotation => &ANNOTATION,
            HighlightType::AddSuggestion => &ADD_SUGGESTION,
            HighlightType::DeleteSuggestion => &DELETE_SUGGESTION,
            HighlightType::ToggleBoldSuggestion => &TOGGLE_BOLD_SUGGESTION,
            HighlightType::ToggleItalicSuggestion => &TOGGLE_ITALIC_SUGGESTION,
            HighlightType::ToggleUnderlineSuggestion => &TOGGLE_UNDERLINE_SUGGESTION,
        }
    }

    /// Semantic kind.
    pub fn kind(self) -> HighlightKind {
        self.descriptor().kind
    }

    /// Style targeted by a style-toggle suggestion.
    pub fn style(self) -> Option<InlineStyle> {
        self.descriptor().style
    }

    /// Returns `true` for change and style-toggle suggestions.
    pub fn is_suggestion(self) -> bool {
        matches!(self.kind(), HighlightKind::Change | HighlightKind::Style)
    }
}

/// Types whose acceptance changes content.
pub fn change_suggestion_types() -> &'static [HighlightType] {
    &[HighlightType::AddSuggestion, HighlightType::DeleteSuggestion]
}

/// Every registry entry of STYLE kind.
pub fn style_suggestion_types() -> Vec<HighlightType> {
    HighlightType::ALL
        .into_iter()
        .filter(|kind| kind.kind() == HighlightKind::Style)
        .collect()
}

/// The style-toggle suggestion type for `style`, if the registry has one.
pub fn suggestion_type_for_style(style: InlineStyle) -> Option<HighlightType> {
    style_suggestion_types()
        .into_iter()
        .find(|kind| kind.style() == Some(style))
}

/// Metadata captured when a highlight is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightData {
    /// Acting identity.
    pub author: String,
    /// Wall-clock creation time, milliseconds since the Unix epoch.
    pub date: u64,
    /// Comment/annotation body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HighlightData {
    /// Metadata without a description.
    pub fn new(author: impl Into<String>, date: u64) -> Self {
        Self {
            author: author.into(),
            date,
            description: None,
        }
    }

    /// Builder: attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A registered highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Identifier.
    pub id: HighlightId,
    /// Type.
    pub kind: HighlightType,
    /// Metadata.
    pub data: HighlightData,
}

/// Highlight metadata keyed by id. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
    entries: Arc<BTreeMap<HighlightId, Highlight>>,
    next_id: u64,
}

impl HighlightSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight by id.
    pub fn get(&self, id: HighlightId) -> Option<&Highlight> {
        self.entries.get(&id)
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: HighlightId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Highlights in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Highlight> {
        self.entries.values()
    }

    /// Number of highlights.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no highlights.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending suggestions in id order.
    pub fn suggestions(&self) -> impl Iterator<Item = &Highlight> {
        self.iter().filter(|h| h.kind.is_suggestion())
    }

    /// Returns `true` if `id` is an ADD/DELETE suggestion of `author`.
    pub(crate) fn is_owned(&self, id: HighlightId, kind: HighlightType, author: &str) -> bool {
        self.get(id)
            .is_some_and(|h| h.kind == kind && h.data.author == author)
    }

    pub(crate) fn has_kind(&self, id: HighlightId, kind: HighlightType) -> bool {
        self.get(id).is_some_and(|h| h.kind == kind)
    }

    /// Register a new highlight and return its id.
    pub(crate) fn allocate(&self, kind: HighlightType, data: HighlightData) -> (HighlightSet, HighlightId) {
        let id = HighlightId(self.next_id);
        let mut entries = self.entries.as_ref().clone();
        entries.insert(id, Highlight { id, kind, data });
        (
            HighlightSet {
                entries: Arc::new(entries),
                next_id: self.next_id + 1,
            },
            id,
        )
    }

    pub(crate) fn remove(&self, id: HighlightId) -> HighlightSet {
        if !self.contains(id) {
            return self.clone();
        }
        let mut entries = self.entries.as_ref().clone();
        entries.remove(&id);
        HighlightSet {
            entries: Arc::new(entries),
            next_id: self.next_id,
        }
    }

    fn retain(&self, mut keep: impl FnMut(&Highlight) -> bool) -> HighlightSet {
        let mut entries = self.entries.as_ref().clone();
        entries.retain(|_, highlight| keep(highlight));
        if entries.len() == self.entries.len() {
            return self.clone();
        }
        HighlightSet {
            entries: Arc::new(entries),
            next_id: self.next_id,
        }
    }

    /// Drop metadata whose marks are gone from `doc` (the text they covered was removed).
    pub fn prune(&self, doc: &Document) -> HighlightSet {
        let live = marked_ids(doc);
        self.retain(|highlight| {
            let keep = live.contains(&highlight.id);
            if !keep {
                tracing::debug!(id = %highlight.id, kind = ?highlight.kind, "dropping stale highlight");
            }
            keep
        })
    }

    /// Drop every suggestion entry.
    pub(crate) fn without_suggestions(&self) -> HighlightSet {
        self.retain(|highlight| !highlight.kind.is_suggestion())
    }
}

fn marked_ids(doc: &Document) -> std::collections::BTreeSet<HighlightId> {
    doc.all_blocks()
        .flat_map(|block| block.marks().iter().map(|span| span.value))
        .collect()
}

/// Document range covered by a highlight: from its first to its last marked char.
pub fn highlight_range(doc: &Document, id: HighlightId) -> Option<Selection> {
    let mut first: Option<Point> = None;
    let mut last: Option<Point> = None;
    for block in doc.blocks() {
        let mut spans = block.marks().spans_of(&id);
        if let Some(span) = spans.next() {
            if first.is_none() {
                first = Some(Point::new(block.key().clone(), span.start));
            }
            let end = spans.last().map_or(span.end, |s| s.end);
            last = Some(Point::new(block.key().clone(), end));
        }
    }
    Some(Selection::new(first?, last?))
}

/// Text covered by a highlight, blocks joined by newlines.
pub fn highlight_text(doc: &Document, id: HighlightId) -> String {
    let parts: Vec<String> = doc
        .blocks()
        .filter(|block| block.marks().contains_value(&id))
        .map(|block| {
            block
                .marks()
                .spans_of(&id)
                .map(|span| block.slice_text(span.start, span.end))
                .collect::<String>()
        })
        .collect();
    parts.join("\n")
}

/// Mark every character of `selection` with `id`.
pub(crate) fn add_marks(
    doc: &Document,
    selection: &Selection,
    id: HighlightId,
) -> Result<Document, ModelError> {
    let range = selection.resolve(doc)?;
    let updates: Vec<(usize, Block)> = range_slices(doc, &range)
        .into_iter()
        .filter(|slice| !slice.is_empty())
        .map(|slice| {
            let mut block = slice.block.clone();
            block.marks.insert(slice.start, slice.end, id);
            (slice.index, block)
        })
        .collect();
    let mut document = doc.clone();
    for (index, block) in updates {
        document = document.replace_block(index, block);
    }
    Ok(document)
}

/// Remove every mark of `id`.
pub(crate) fn clear_marks(doc: &Document, id: HighlightId) -> Document {
    doc.map_blocks(|block| {
        block.marks().contains_value(&id).then(|| {
            let mut block = block.clone();
            block.marks.remove_value(&id);
            block
        })
    })
}

/// Whether a highlight of `kind` may be added over `selection`: the selection must be
/// non-empty and no highlight of the same type may touch it (one extra character on
/// each side counts as touching).
pub fn can_add_highlight(
    doc: &Document,
    highlights: &HighlightSet,
    kind: HighlightType,
    selection: &Selection,
) -> Result<bool, ModelError> {
    let range = selection.resolve(doc)?;
    if range.is_collapsed() {
        return Ok(false);
    }

    let end_len = doc.block_at(range.end_index()).map_or(0, Block::len);
    let expanded = Selection::new(
        Point::new(range.start.block.clone(), range.start.offset.saturating_sub(1)),
        Point::new(range.end.block.clone(), (range.end.offset + 1).min(end_len)),
    );
    let expanded = expanded.resolve(doc)?;

    let conflict = range_slices(doc, &expanded).into_iter().any(|slice| {
        slice
            .block
            .marks()
            .query_range(slice.start, slice.end)
            .any(|span| highlights.has_kind(span.value, kind))
    });
    Ok(!conflict)
}

/// Side-channel highlight record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRecord {
    /// Identifier.
    pub id: HighlightId,
    /// Type.
    #[serde(rename = "type")]
    pub kind: HighlightType,
    /// Covered range.
    pub range: Selection,
    /// Metadata.
    pub data: HighlightData,
}

/// Emit every highlight that still has marks in `doc`, in id order.
pub fn export_highlights(doc: &Document, highlights: &HighlightSet) -> Vec<HighlightRecord> {
    highlights
        .iter()
        .filter_map(|highlight| {
            let range = highlight_range(doc, highlight.id)?;
            Some(HighlightRecord {
                id: highlight.id,
                kind: highlight.kind,
                range,
                data: highlight.data.clone(),
            })
        })
        .collect()
}

/// Re-apply exported records to `doc`. Records whose range no longer resolves are
/// dropped.
pub fn import_highlights(doc: &Document, records: &[HighlightRecord]) -> (Document, HighlightSet) {
    let mut document = doc.clone();
    let mut entries: BTreeMap<HighlightId, Highlight> = BTreeMap::new();
    for record in records {
        match add_marks(&document, &record.range, record.id) {
            Ok(next) => {
                document = next;
                entries.insert(
                    record.id,
                    Highlight {
                        id: record.id,
                        kind: record.kind,
                        data: record.data.clone(),
                    },
                );
            }
            Err(err) => {
                tracing::warn!(id = %record.id, error = %err, "dropping highlight record");
            }
        }
    }
    let next_id = entries.keys().next_back().map_or(0, |id| id.0 + 1);
    let set = HighlightSet {
        entries: Arc::new(entries),
        next_id,
    };
    let set = set.prune(&document);
    (document, set)
}
