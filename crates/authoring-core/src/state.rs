//! Editor State Interface
//!
//! Owns the session state and is the single entry point for edits.
//!
//! # Overview
//!
//! - **Dispatch**: actions go through the pure reducer; the previous state is never
//!   mutated
//! - **History**: document transactions are recorded for undo/redo
//! - **Version Tracking**: the version increments once per changed aspect
//! - **Change Notifications**: subscribers get one [`StateChange`] per changed aspect
//!
//! # Example
//!
//! ```rust
//! use authoring_core::{Action, Document, EditorConfig, EditorStore, StateChangeType};
//! use std::sync::{Arc, Mutex};
//!
//! let mut store = EditorStore::new(Document::from_text("Hello"), EditorConfig::default());
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! store.subscribe(move |change| sink.lock().unwrap().push(change.change_type));
//!
//! store.dispatch(Action::EditorInsertText { text: "Oh, ".to_string() }).unwrap();
//! assert_eq!(store.document().plain_text(), "Oh, Hello");
//! assert!(seen.lock().unwrap().contains(&StateChangeType::DocumentModified));
//!
//! store.dispatch(Action::EditorUndo).unwrap();
//! assert_eq!(store.document().plain_text(), "Hello");
//! ```

use crate::commands::{self, Action, CommandError, CommandResult, Effect, ReduceContext};
use crate::config::EditorConfig;
use crate::document::{BlockKey, Document, StyleSet};
use crate::error::InterchangeError;
use crate::highlights::{HighlightRecord, HighlightSet, export_highlights};
use crate::history::{History, Snapshot};
use crate::sanitize::Sanitizer;
use crate::search::SearchState;
use crate::selection::Selection;
use crate::spellcheck::SpellcheckState;
use crate::suggestions::{self, ResolvedSuggestion, SuggestionEntry};
use crate::table::TableCursor;
use crate::{export, interchange};
use std::time::{SystemTime, UNIX_EPOCH};

/// Complete session state. Cheap to clone: the document and highlight set share
/// their storage between generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    /// Current document generation.
    pub document: Document,
    /// Highlight metadata.
    pub highlights: HighlightSet,
    /// Selection.
    pub selection: Selection,
    /// Find/replace session.
    pub search: SearchState,
    /// Whether edits are recorded as suggestions.
    pub suggesting_mode: bool,
    /// Focused table cell.
    pub active_cell: Option<TableCursor>,
    /// Styles for the next insertion at the caret.
    pub style_override: Option<StyleSet>,
    /// Spellcheck session.
    pub spellcheck: SpellcheckState,
    /// Suggestions resolved during the session, oldest first.
    pub resolved: Vec<ResolvedSuggestion>,
}

impl EditorState {
    /// Fresh state with the caret at the start of the document.
    pub fn new(document: Document) -> Self {
        let selection = document
            .first_block()
            .map_or_else(|| Selection::caret("b0", 0), |block| Selection::caret(block.key().clone(), 0));
        Self {
            document,
            highlights: HighlightSet::new(),
            selection,
            search: SearchState::default(),
            suggesting_mode: false,
            active_cell: None,
            style_override: None,
            spellcheck: SpellcheckState::default(),
            resolved: Vec::new(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            document: self.document.clone(),
            highlights: self.highlights.clone(),
            selection: self.selection.clone(),
        }
    }

    fn restore(&self, snapshot: Snapshot) -> EditorState {
        EditorState {
            document: snapshot.document,
            highlights: snapshot.highlights,
            selection: snapshot.selection,
            search: SearchState {
                current: None,
                ..self.search.clone()
            },
            style_override: None,
            active_cell: None,
            ..self.clone()
        }
    }
}

/// State change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// Document content modified
    DocumentModified,
    /// Selection changed
    SelectionChanged,
    /// Highlights (comments, annotations, suggestions) changed
    HighlightsChanged,
    /// Search criteria or current match changed
    SearchChanged,
    /// Suggesting mode, active cell or pending caret styles changed
    ModeChanged,
    /// Spellcheck session changed
    SpellcheckChanged,
}

/// State change record
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Change type
    pub change_type: StateChangeType,
    /// Old version number
    pub old_version: u64,
    /// New version number
    pub new_version: u64,
    /// Blocks added or replaced (document changes only)
    pub affected_blocks: Vec<BlockKey>,
}

impl StateChange {
    /// Create a new state change record without affected blocks.
    pub fn new(change_type: StateChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            affected_blocks: Vec::new(),
        }
    }

    /// Attach the affected blocks to this change record.
    pub fn with_blocks(mut self, blocks: Vec<BlockKey>) -> Self {
        self.affected_blocks = blocks;
        self
    }
}

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Command result.
    pub result: CommandResult,
    /// Effects the host must run.
    pub effects: Vec<Effect>,
    /// Changed aspects, in notification order. Empty for a no-op.
    pub changes: Vec<StateChangeType>,
}

/// State change callback function type
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

/// Wall-clock provider, milliseconds since the Unix epoch.
pub type Clock = Box<dyn Fn() -> u64 + Send>;

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Editor store
///
/// `EditorStore` owns the [`EditorState`] of one editing session and provides:
///
/// - **Dispatch**: [`dispatch()`](EditorStore::dispatch) runs an action through the reducer
/// - **Undo/Redo**: document transactions are recorded; typing coalesces
/// - **Version Tracking**: the version increments per changed aspect, never for no-ops
/// - **Change Notifications**: subscribers are called synchronously after each change
/// - **Modification Tracking**: whether the document differs from the last saved point
///
/// # Architecture Notes
///
/// Data flows one way:
///
/// 1. The UI dispatches an [`Action`]
/// 2. The reducer validates it against the current document and computes the next state
/// 3. The store records history, bumps the version and notifies subscribers
/// 4. Effects (spellcheck lookups, dictionary updates) are returned to the host, whose
///    completions come back as new actions
pub struct EditorStore {
    state: EditorState,
    config: EditorConfig,
    sanitizer: Sanitizer,
    history: History,
    clock: Clock,
    state_version: u64,
    callbacks: Vec<StateChangeCallback>,
}

impl std::fmt::Debug for EditorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorStore")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("version", &self.state_version)
            .field("subscribers", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl EditorStore {
    /// Create a store for `document`.
    pub fn new(document: Document, config: EditorConfig) -> Self {
        Self {
            state: EditorState::new(document),
            sanitizer: Sanitizer::new(config.allowed_styles.clone()),
            history: History::new(config.max_undo),
            config,
            clock: Box::new(system_clock),
            state_version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Open a session from the serialized interchange format.
    pub fn from_json(json: &str, config: EditorConfig) -> Result<Self, InterchangeError> {
        Ok(Self::new(interchange::deserialize(json)?, config))
    }

    /// Builder: replace the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Builder: replace the paste sanitizer (for example to re-attach validated links).
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Current state.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Current document.
    pub fn document(&self) -> &Document {
        &self.state.document
    }

    /// Session configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Get current version number
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Whether the document differs from the last saved point.
    pub fn is_modified(&self) -> bool {
        !self.history.is_clean()
    }

    /// Mark the current document as saved.
    pub fn mark_saved(&mut self) {
        self.history.mark_clean();
    }

    /// Returns `true` if there is a transaction to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if there is a transaction to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of recorded undo steps.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Number of recorded redo steps.
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Pending suggestions in document order.
    pub fn pending_suggestions(&self) -> Vec<SuggestionEntry> {
        suggestions::pending_suggestions(&self.state.document, &self.state.highlights)
    }

    /// Highlight side channel for persistence.
    pub fn export_highlights(&self) -> Vec<HighlightRecord> {
        export_highlights(&self.state.document, &self.state.highlights)
    }

    /// Serialized document.
    pub fn to_json(&self) -> Result<String, InterchangeError> {
        interchange::serialize(&self.state.document)
    }

    /// HTML export of the document.
    pub fn to_html(&self) -> String {
        export::to_html(&self.state.document)
    }

    /// Subscribe to state change notifications
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Decode an action from JSON and dispatch it.
    pub fn dispatch_json(&mut self, json: &str) -> Result<DispatchOutcome, CommandError> {
        let action: Action = serde_json::from_str(json)?;
        self.dispatch(action)
    }

    /// Apply an action.
    ///
    /// Failed actions leave the state untouched. Actions that change nothing do not
    /// bump the version or notify.
    pub fn dispatch(&mut self, action: Action) -> Result<DispatchOutcome, CommandError> {
        tracing::debug!(?action, version = self.state_version, "dispatch");
        let (next, result, effects) = match action {
            Action::EditorUndo => (
                self.history.undo().map(|snapshot| self.state.restore(snapshot)),
                CommandResult::Success,
                Vec::new(),
            ),
            Action::EditorRedo => (
                self.history.redo().map(|snapshot| self.state.restore(snapshot)),
                CommandResult::Success,
                Vec::new(),
            ),
            action => {
                let coalescible = action.is_coalescible_insert();
                let ctx = ReduceContext {
                    config: &self.config,
                    sanitizer: &self.sanitizer,
                    now: (self.clock)(),
                };
                let reduced = commands::reduce(&self.state, action, &ctx)?;
                let transaction = !reduced.state.document.ptr_eq(&self.state.document)
                    || reduced.state.highlights != self.state.highlights;
                if transaction {
                    self.history
                        .record(self.state.snapshot(), reduced.state.snapshot(), coalescible);
                } else if !coalescible {
                    self.history.end_group();
                }
                (Some(reduced.state), reduced.result, reduced.effects)
            }
        };

        let changes = match next {
            Some(next) => {
                let previous = std::mem::replace(&mut self.state, next);
                self.notify(&previous)
            }
            None => Vec::new(),
        };
        Ok(DispatchOutcome {
            result,
            effects,
            changes,
        })
    }

    fn notify(&mut self, previous: &EditorState) -> Vec<StateChangeType> {
        let current = &self.state;
        let mut changes = Vec::new();
        if !current.document.ptr_eq(&previous.document) && current.document != previous.document {
            changes.push(StateChangeType::DocumentModified);
        }
        if current.selection != previous.selection {
            changes.push(StateChangeType::SelectionChanged);
        }
        if current.highlights != previous.highlights || current.resolved != previous.resolved {
            changes.push(StateChangeType::HighlightsChanged);
        }
        if current.search != previous.search {
            changes.push(StateChangeType::SearchChanged);
        }
        if current.suggesting_mode != previous.suggesting_mode
            || current.active_cell != previous.active_cell
            || current.style_override != previous.style_override
        {
            changes.push(StateChangeType::ModeChanged);
        }
        if current.spellcheck != previous.spellcheck {
            changes.push(StateChangeType::SpellcheckChanged);
        }

        for change_type in &changes {
            let old_version = self.state_version;
            self.state_version += 1;
            let mut change = StateChange::new(*change_type, old_version, self.state_version);
            if *change_type == StateChangeType::DocumentModified {
                change = change.with_blocks(self.state.document.changed_blocks(&previous.document));
            }
            self.notify_callbacks(&change);
        }
        changes
    }

    /// Notify all callbacks
    fn notify_callbacks(&mut self, change: &StateChange) {
        for callback in &mut self.callbacks {
            callback(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InlineStyle;
    use std::sync::{Arc, Mutex};

    fn store(text: &str) -> EditorStore {
        EditorStore::new(Document::from_text(text), EditorConfig::default().with_author("bob")).with_clock(|| 1_000)
    }

    #[test]
    fn test_noop_does_not_bump_version() {
        let mut store = store("abc");
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_| *counter.lock().unwrap() += 1);

        let outcome = store.dispatch(Action::Unknown).unwrap();
        assert!(outcome.changes.is_empty());
        let outcome = store.dispatch(Action::EditorUndo).unwrap();
        assert!(outcome.changes.is_empty());
        assert_eq!(store.version(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_change_carries_affected_blocks() {
        let mut store = store("one\ntwo");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        store
            .dispatch(Action::EditorSetSelection {
                selection: Selection::caret("b1", 3),
            })
            .unwrap();
        store.dispatch(Action::EditorInsertText { text: "!".into() }).unwrap();

        let seen = seen.lock().unwrap();
        let modified: Vec<&StateChange> = seen
            .iter()
            .filter(|c| c.change_type == StateChangeType::DocumentModified)
            .collect();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].affected_blocks, vec![BlockKey::new("b1")]);
        assert_eq!(store.version(), seen.len() as u64);
    }

    #[test]
    fn test_failed_dispatch_leaves_state() {
        let mut store = store("abc");
        let before = store.state().clone();
        let err = store
            .dispatch(Action::EditorSetSelection {
                selection: Selection::caret("gone", 0),
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::Model(_)));
        assert_eq!(store.state(), &before);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_disallowed_style_is_rejected() {
        let mut config = EditorConfig::default();
        config.allowed_styles.remove(&InlineStyle::Underline);
        let mut store = EditorStore::new(Document::from_text("abc"), config);
        store
            .dispatch(Action::EditorSetSelection {
                selection: Selection::within("b0", 0, 3),
            })
            .unwrap();
        let err = store
            .dispatch(Action::ToolbarToggleInlineStyle {
                style: InlineStyle::Underline,
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::StyleNotAllowed(InlineStyle::Underline)));
    }

    #[test]
    fn test_modified_tracking() {
        let mut store = store("abc");
        assert!(!store.is_modified());
        store.dispatch(Action::EditorInsertText { text: "x".into() }).unwrap();
        assert!(store.is_modified());
        store.mark_saved();
        assert!(!store.is_modified());
        store.dispatch(Action::EditorUndo).unwrap();
        assert!(store.is_modified());
    }
}
