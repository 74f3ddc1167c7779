//! Error types for the document model and the interchange format.

use crate::document::{BlockKey, BlockType, EntityId};
use thiserror::Error;

/// Errors raised by document model operations.
///
/// All of these are local and recoverable: the caller re-derives its selection (or
/// active table cell) from the current document and may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("selection references block {key} which is not in the document")]
    /// The selection (or cursor) names a block that no longer exists.
    StaleSelection {
        /// Missing block key.
        key: BlockKey,
    },

    #[error("offset {offset} is out of range for block {key} (length {len})")]
    /// An offset lies past the end of its block.
    OffsetOutOfRange {
        /// Block key.
        key: BlockKey,
        /// Offending offset.
        offset: usize,
        /// Block length in characters.
        len: usize,
    },

    #[error("operation requires a collapsed selection")]
    /// The operation is only defined on a caret.
    NotCollapsed,

    #[error("operation requires a non-empty selection")]
    /// The operation is only defined on a non-collapsed selection.
    EmptySelection,

    #[error("block {key} is not a table")]
    /// A table operation targeted a block without a table.
    NotATable {
        /// Block key.
        key: BlockKey,
    },

    #[error("table cell ({row}, {col}) is out of bounds")]
    /// A table cell index lies outside the grid.
    CellOutOfBounds {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    #[error("a table needs at least one row and one column")]
    /// Attempted to create a degenerate table.
    InvalidTableSize,

    #[error("block {key} does not hold editable text")]
    /// Text edits cannot target atomic blocks such as tables.
    AtomicBlock {
        /// Block key.
        key: BlockKey,
    },

    #[error("block type {0} cannot be applied to text blocks")]
    /// Attempted to turn a text block into a structural block type.
    InvalidBlockType(BlockType),

    #[error("duplicate block key {0}")]
    /// Two blocks share a key.
    DuplicateKey(BlockKey),

    #[error("entity {0} is not in the entity table")]
    /// An entity range references an entity that does not exist.
    MissingEntity(EntityId),
}

/// Errors raised when reading the serialized interchange format.
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("malformed document JSON: {0}")]
    /// The payload is not valid JSON for the interchange schema.
    Json(#[from] serde_json::Error),

    #[error("unknown block type {kind:?} in block {key}")]
    /// A block record carries a type outside the known set.
    UnknownBlockType {
        /// Block key.
        key: String,
        /// Raw type name.
        kind: String,
    },

    #[error("unknown inline style {style:?} in block {key}")]
    /// A style range names a style outside the accepted set.
    UnknownStyle {
        /// Block key.
        key: String,
        /// Raw style name.
        style: String,
    },

    #[error("range {start}..{end} is invalid for block {key}")]
    /// A style/entity range is inverted or exceeds the block length.
    InvalidRange {
        /// Block key.
        key: String,
        /// Start offset.
        start: usize,
        /// End offset.
        end: usize,
    },

    #[error(transparent)]
    /// The decoded document violates a model invariant.
    Model(#[from] ModelError),
}
