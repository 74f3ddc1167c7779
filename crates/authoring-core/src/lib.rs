#![warn(missing_docs)]
//! Authoring Core - Headless Rich-Text Authoring Engine
//!
//! # Overview
//!
//! `authoring-core` is the engine underneath a newsroom rich-text editor: an immutable
//! block document, track changes, comments and annotations, find/replace, paste
//! sanitization and spellcheck bookkeeping. It does not render anything; the UI issues
//! actions and paints the ranges this crate computes.
//!
//! # Core Features
//!
//! - **Immutable Documents**: blocks are shared between generations, so an edit copies
//!   only the blocks it touches
//! - **Track Changes**: insertions, deletions and style toggles recorded per author,
//!   accepted or rejected individually
//! - **Highlights**: comments, annotations and suggestions as marks over the text
//! - **Find/Replace**: plain, whole-word and regex search with wrap-around
//! - **Paste Sanitization**: allow-list filtering of external content
//! - **State Tracking**: single dispatch store with undo/redo, versions and change
//!   notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Store & Actions (EditorStore, reduce)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Suggestions · Search · Spellcheck state    │  ← Editing features
//! ├─────────────────────────────────────────────┤
//! │  Highlights · Sanitizer · Interchange       │  ← Overlays & I/O
//! ├─────────────────────────────────────────────┤
//! │  Edits · Tables · Selection algebra         │  ← Document operations
//! ├─────────────────────────────────────────────┤
//! │  Document · Blocks · Range sets             │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use authoring_core::{Action, Document, EditorConfig, EditorStore, Selection};
//!
//! let config = EditorConfig::default().with_author("desk");
//! let mut store = EditorStore::new(Document::from_text("The quick fox"), config);
//!
//! store.dispatch(Action::EditorToggleSuggestingMode).unwrap();
//! store.dispatch(Action::EditorSetSelection { selection: Selection::within("b0", 4, 10) }).unwrap();
//! store.dispatch(Action::EditorRemoveRange).unwrap();
//! assert_eq!(store.document().plain_text(), "The quick fox");
//!
//! let pending = store.pending_suggestions();
//! store.dispatch(Action::AcceptSuggestion { id: pending[0].id }).unwrap();
//! assert_eq!(store.document().plain_text(), "The fox");
//! ```
//!
//! # Module Description
//!
//! - [`document`] - blocks, entities and the document
//! - [`ranges`] - ordered range sets for styles, entities and marks
//! - [`selection`] - selections and character slices
//! - [`edit`] - pure document edits
//! - [`table`] - table blocks
//! - [`highlights`] - highlight registry and marks
//! - [`suggestions`] - track changes
//! - [`search`] - find/replace
//! - [`spellcheck`] - word targeting and lookup bookkeeping
//! - [`sanitize`] - paste sanitization
//! - [`interchange`] - serialized document format
//! - [`export`] - HTML and plain-text export
//! - [`history`] - undo/redo
//! - [`commands`] - actions and the reducer
//! - [`state`] - the store

pub mod commands;
pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod export;
pub mod highlights;
pub mod history;
pub mod interchange;
pub mod ranges;
pub mod sanitize;
pub mod search;
pub mod selection;
pub mod spellcheck;
pub mod state;
pub mod suggestions;
pub mod table;
mod text;

pub use commands::{Action, CommandError, CommandResult, Effect, ReduceContext, Reduced, reduce};
pub use config::EditorConfig;
pub use document::{Block, BlockKey, BlockType, Document, Entity, EntityId, EntityKind, InlineStyle, StyleSet};
pub use edit::Edit;
pub use error::{InterchangeError, ModelError};
pub use highlights::{HighlightData, HighlightId, HighlightRecord, HighlightSet, HighlightType};
pub use history::{History, Snapshot};
pub use interchange::RawDocument;
pub use ranges::{RangeSet, Span};
pub use sanitize::{SanitizeReport, Sanitizer};
pub use search::{SearchCriteria, SearchError, SearchOptions, SearchState};
pub use selection::{Point, Selection, SelectionRange};
pub use spellcheck::{SpellcheckState, WordTarget};
pub use state::{
    DispatchOutcome, EditorState, EditorStore, StateChange, StateChangeCallback, StateChangeType,
};
pub use suggestions::{SuggestionAction, SuggestionEntry, SuggestionError};
pub use table::{Table, TableCursor};
