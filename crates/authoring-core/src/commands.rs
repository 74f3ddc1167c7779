//! Command Interface Layer
//!
//! Every editing operation the UI can issue is an [`Action`] with a stable `type` tag.
//! [`reduce`] computes the next [`EditorState`] from the previous one and an action
//! without touching the previous state; the store owns history and notification.
//!
//! # Overview
//!
//! - **Editor**: typing, deletion, block split, paste, selection, suggesting mode
//! - **Toolbar**: inline styles, block types, links, table operations
//! - **Review**: accept/reject suggestions, comments, annotations
//! - **Find/replace**: criteria, next/previous, replace, replace all
//! - **Spellcheck**: lookups, completions, replace/ignore/add word
//!
//! Unknown action types deserialize to [`Action::Unknown`] and do nothing.
//!
//! # Example
//!
//! ```rust
//! use authoring_core::Action;
//!
//! let action: Action = serde_json::from_str(r#"{"type": "EDITOR_INSERT_TEXT", "text": "Hi"}"#).unwrap();
//! assert_eq!(action, Action::EditorInsertText { text: "Hi".to_string() });
//!
//! let future: Action = serde_json::from_str(r#"{"type": "SOMETHING_NEW", "x": 1}"#).unwrap();
//! assert_eq!(future, Action::Unknown);
//! ```

use crate::config::EditorConfig;
use crate::document::{BlockType, Document, InlineStyle, StyleSet};
use crate::edit::{self, Edit};
use crate::error::ModelError;
use crate::highlights::{
    HighlightData, HighlightId, HighlightType, add_marks, can_add_highlight, clear_marks,
};
use crate::interchange::RawDocument;
use crate::sanitize::Sanitizer;
use crate::search::{self, DocumentMatch, SearchCriteria, SearchError, SearchOptions, SearchState};
use crate::selection::{Point, Selection};
use crate::spellcheck::{self, WordTarget};
use crate::state::EditorState;
use crate::suggestions::{
    self, Actor, ResolvedSuggestion, SuggestionAction, SuggestionError, Tracked,
};
use crate::table::{self, TableCursor};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Editor actions.
///
/// Serialized as an internally tagged object: `{"type": "EDITOR_INSERT_TEXT", "text": "..."}`.
/// Fields are camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Replace the selection with `text` (newlines split blocks).
    EditorInsertText {
        /// Text to insert.
        text: String,
    },
    /// Remove the selected text.
    EditorRemoveRange,
    /// Backspace.
    EditorDeleteBackward,
    /// Forward delete.
    EditorDeleteForward,
    /// Split the block at the caret.
    EditorSplitBlock,
    /// Paste externally sourced content. It is sanitized before insertion.
    EditorPaste {
        /// Content in the interchange format.
        content: RawDocument,
    },
    /// Move the selection.
    EditorSetSelection {
        /// New selection.
        selection: Selection,
    },
    /// Undo the last transaction.
    EditorUndo,
    /// Redo the last undone transaction.
    EditorRedo,
    /// Switch suggesting mode on or off.
    EditorToggleSuggestingMode,
    /// Focus a table cell, or leave the table.
    EditorSetActiveCell {
        /// Cell to focus.
        #[serde(default)]
        cell: Option<TableCursor>,
    },
    /// Replace the text of the active cell.
    EditorSetCellText {
        /// New cell text.
        text: String,
    },

    /// Toggle an inline style over the selection.
    ToolbarToggleInlineStyle {
        /// Style to toggle.
        style: InlineStyle,
    },
    /// Toggle a block type on every selected block.
    ToolbarSetBlockType {
        /// Block type.
        block_type: BlockType,
    },
    /// Link the selection.
    ToolbarApplyLink {
        /// Link target.
        url: String,
    },
    /// Remove links from the selection.
    ToolbarRemoveLink,
    /// Insert a table after the selection.
    ToolbarAddTable {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },
    /// Insert a row below the active cell.
    ToolbarAddRowAfter,
    /// Insert a column right of the active cell.
    ToolbarAddColAfter,
    /// Remove the row of the active cell.
    ToolbarRemoveRow,
    /// Remove the column of the active cell.
    ToolbarRemoveCol,
    /// Toggle the header row of the active table.
    ToolbarToggleTableHeader,
    /// Toggle a style over the active cell.
    ToolbarToggleCellStyle {
        /// Style to toggle.
        style: InlineStyle,
    },

    /// Accept a suggestion. Accepting the deletion half of a replacement accepts both halves.
    AcceptSuggestion {
        /// Suggestion id.
        id: HighlightId,
    },
    /// Reject a suggestion. Rejecting the deletion half of a replacement rejects both halves.
    RejectSuggestion {
        /// Suggestion id.
        id: HighlightId,
    },
    /// Comment on a range (defaults to the selection).
    AddComment {
        /// Comment text.
        text: String,
        /// Range to comment on.
        #[serde(default)]
        selection: Option<Selection>,
    },
    /// Annotate a range (defaults to the selection).
    AddAnnotation {
        /// Annotation text.
        text: String,
        /// Range to annotate.
        #[serde(default)]
        selection: Option<Selection>,
    },
    /// Resolve (remove) a comment or annotation.
    ResolveHighlight {
        /// Highlight id.
        id: HighlightId,
    },

    /// Set the search criteria. An empty pattern ends the search.
    HighlightsCriteria {
        /// Search text or regular expression.
        #[serde(default)]
        pattern: String,
        /// Case sensitivity; the configured default when absent.
        #[serde(default)]
        case_sensitive: Option<bool>,
        /// Match whole words only.
        #[serde(default)]
        whole_word: bool,
        /// Treat the pattern as a regular expression.
        #[serde(default)]
        regex: bool,
    },
    /// Highlight the next match.
    HighlightsFindNext,
    /// Highlight the previous match.
    HighlightsFindPrev,
    /// Replace the highlighted match.
    HighlightsReplace {
        /// Replacement text.
        text: String,
    },
    /// Replace every match.
    HighlightsReplaceAll {
        /// Replacement text.
        text: String,
    },
    /// Apply several `old -> new` replacements as one step.
    HighlightsReplaceMultiple {
        /// Replacements, applied in order. Encoded as a JSON object whose key order is
        /// kept.
        #[serde(with = "ordered_pairs")]
        diff: Vec<(String, String)>,
    },

    /// Look up suggestions for the word at `point` (defaults to the caret).
    SpellcheckRequest {
        /// Position inside the word.
        #[serde(default)]
        point: Option<Point>,
    },
    /// Completion of a lookup.
    SpellcheckSuggestionsLoaded {
        /// Ticket of the request.
        ticket: u64,
        /// Candidates, best first.
        suggestions: Vec<String>,
    },
    /// Replace a misspelled word.
    SpellcheckReplace {
        /// The word and where it was.
        target: WordTarget,
        /// Replacement.
        replacement: String,
    },
    /// Ignore a word for this session.
    SpellcheckIgnore {
        /// Word.
        word: String,
    },
    /// Add a word to the dictionary.
    SpellcheckAdd {
        /// Word.
        word: String,
    },

    /// Any action type this version does not know. Ignored.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Returns `true` for plain typing, which coalesces into one undo step.
    pub fn is_coalescible_insert(&self) -> bool {
        matches!(self, Action::EditorInsertText { text } if !text.contains('\n'))
    }
}

/// Side effects the host must run after a dispatch. Completions come back as new actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Effect {
    /// Look up spelling candidates and dispatch [`Action::SpellcheckSuggestionsLoaded`].
    LookupSuggestions {
        /// Request ticket.
        ticket: u64,
        /// Word to look up.
        word: String,
    },
    /// Update the dictionary collaborator.
    UpdateDictionary {
        /// Word.
        word: String,
        /// `false` ignores for the session only.
        permanent: bool,
    },
}

/// Command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Success, no return value.
    Success,
    /// A highlight was created.
    Highlight(HighlightId),
    /// Find result.
    SearchMatch(DocumentMatch),
    /// Find result: no match.
    SearchNotFound,
    /// Replace result.
    ReplaceResult {
        /// Number of occurrences replaced.
        replaced: usize,
    },
    /// A spellcheck lookup was issued.
    Ticket(u64),
}

/// Command error type.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    /// Document model failure (stale selection, bad offsets, table errors).
    Model(#[from] ModelError),

    #[error(transparent)]
    /// Suggestion engine failure.
    Suggestion(#[from] SuggestionError),

    #[error(transparent)]
    /// Invalid search pattern.
    Search(#[from] SearchError),

    #[error("malformed action: {0}")]
    /// The action JSON could not be decoded.
    InvalidAction(#[from] serde_json::Error),

    #[error("unknown highlight {0}")]
    /// No highlight with this id.
    UnknownHighlight(HighlightId),

    #[error("highlight {0} is a suggestion and must be accepted or rejected")]
    /// Suggestions are resolved by accept/reject, not by resolve.
    ResolveSuggestion(HighlightId),

    #[error("a {0:?} highlight already touches the selection")]
    /// A highlight of the same type overlaps or abuts the selection.
    HighlightConflict(HighlightType),

    #[error("style {0} is not enabled in this editor")]
    /// The style is not in the configured allow-list.
    StyleNotAllowed(InlineStyle),

    #[error("no table cell is active")]
    /// A table operation was issued outside a table.
    NoActiveCell,
}

/// Everything a reducer run needs besides the state.
#[derive(Debug, Clone, Copy)]
pub struct ReduceContext<'a> {
    /// Session configuration.
    pub config: &'a EditorConfig,
    /// Paste sanitizer.
    pub sanitizer: &'a Sanitizer,
    /// Wall-clock time of the command, milliseconds since the Unix epoch.
    pub now: u64,
}

impl ReduceContext<'_> {
    fn actor(&self) -> Actor {
        Actor::new(self.config.author.clone(), self.now)
    }
}

/// Output of [`reduce`].
#[derive(Debug, Clone)]
pub struct Reduced {
    /// Next state.
    pub state: EditorState,
    /// Command result.
    pub result: CommandResult,
    /// Effects for the host.
    pub effects: Vec<Effect>,
}

impl Reduced {
    fn new(state: EditorState) -> Self {
        Self {
            state,
            result: CommandResult::Success,
            effects: Vec::new(),
        }
    }

    fn with_result(mut self, result: CommandResult) -> Self {
        self.result = result;
        self
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

fn apply_edit(state: &EditorState, edit: Edit) -> EditorState {
    EditorState {
        document: edit.document,
        selection: edit.selection,
        style_override: None,
        ..state.clone()
    }
}

fn apply_tracked(state: &EditorState, tracked: Tracked) -> EditorState {
    EditorState {
        document: tracked.document,
        highlights: tracked.highlights,
        selection: tracked.selection,
        style_override: None,
        ..state.clone()
    }
}

fn active_cell(state: &EditorState) -> Result<&TableCursor, CommandError> {
    state.active_cell.as_ref().ok_or(CommandError::NoActiveCell)
}

fn with_document(state: &EditorState, document: Document) -> EditorState {
    EditorState {
        document,
        ..state.clone()
    }
}

/// Clamp `selection` into `doc`: offsets past a block end move to the end, and a
/// point in a missing block moves to the start of the document.
pub(crate) fn clamp_selection(doc: &Document, selection: &Selection) -> Selection {
    if selection.resolve(doc).is_ok() {
        return selection.clone();
    }
    let clamp = |point: &Point| match doc.block(&point.block) {
        Some(block) => Point::new(point.block.clone(), point.offset.min(block.len())),
        None => doc
            .first_block()
            .map_or_else(|| point.clone(), |block| Point::new(block.key().clone(), 0)),
    };
    Selection::new(clamp(&selection.anchor), clamp(&selection.focus))
}

fn insert_text(state: &EditorState, text: &str, ctx: &ReduceContext<'_>) -> Result<EditorState, CommandError> {
    if text.is_empty() {
        return Ok(state.clone());
    }
    if text.contains('\n') {
        return insert_fragment(state, &Document::from_text(text), ctx);
    }
    let range = state.selection.resolve(&state.document)?;
    let styles = match &state.style_override {
        Some(styles) if range.is_collapsed() => styles.clone(),
        _ => edit::insertion_styles(&state.document, &range),
    };
    if state.suggesting_mode {
        let tracked = suggestions::suggest_insert(
            &state.document,
            &state.highlights,
            &state.selection,
            text,
            &styles,
            &ctx.actor(),
        )?;
        Ok(apply_tracked(state, tracked))
    } else {
        let edit = edit::insert_text_with_styles(&state.document, &state.selection, text, &styles)?;
        Ok(apply_edit(state, edit))
    }
}

fn insert_fragment(
    state: &EditorState,
    fragment: &Document,
    ctx: &ReduceContext<'_>,
) -> Result<EditorState, CommandError> {
    if state.suggesting_mode {
        let tracked = suggestions::suggest_fragment(
            &state.document,
            &state.highlights,
            &state.selection,
            fragment,
            &ctx.actor(),
        )?;
        Ok(apply_tracked(state, tracked))
    } else {
        let edit = edit::insert_fragment(&state.document, &state.selection, fragment)?;
        Ok(apply_edit(state, edit))
    }
}

fn toggle_style(
    state: &EditorState,
    style: InlineStyle,
    ctx: &ReduceContext<'_>,
) -> Result<EditorState, CommandError> {
    if !ctx.config.allowed_styles.contains(&style) {
        return Err(CommandError::StyleNotAllowed(style));
    }
    let range = state.selection.resolve(&state.document)?;
    if range.is_collapsed() {
        let mut styles: StyleSet = match &state.style_override {
            Some(styles) => styles.clone(),
            None => edit::styles_at_caret(&state.document, &state.selection)?,
        };
        if !styles.remove(&style) {
            styles.insert(style);
        }
        return Ok(EditorState {
            style_override: Some(styles),
            ..state.clone()
        });
    }
    if state.suggesting_mode {
        let tracked = suggestions::suggest_style_toggle(
            &state.document,
            &state.highlights,
            &state.selection,
            style,
            &ctx.actor(),
        )?;
        Ok(apply_tracked(state, tracked))
    } else {
        let edit = edit::toggle_inline_style(&state.document, &state.selection, style)?;
        Ok(apply_edit(state, edit))
    }
}

fn resolve_suggestion(
    state: &EditorState,
    id: HighlightId,
    accepted: bool,
    ctx: &ReduceContext<'_>,
) -> Result<EditorState, CommandError> {
    let listed = suggestions::pending_suggestions(&state.document, &state.highlights)
        .into_iter()
        .find(|entry| entry.id == id || entry.peer == Some(id));
    let entry = match listed {
        Some(entry) => entry,
        None => suggestions::describe_suggestion(&state.document, &state.highlights, id)
            .ok_or(SuggestionError::UnknownHighlight(id))?,
    };

    let mut ids = vec![entry.id];
    if entry.action == SuggestionAction::Replace {
        ids.extend(entry.peer);
    }
    let mut document = state.document.clone();
    let mut highlights = state.highlights.clone();
    for id in ids {
        let resolved = if accepted {
            suggestions::accept_suggestion(&document, &highlights, id)?
        } else {
            suggestions::reject_suggestion(&document, &highlights, id)?
        };
        (document, highlights) = resolved;
    }

    let mut resolved = state.resolved.clone();
    resolved.push(ResolvedSuggestion {
        suggestion: entry,
        accepted,
        resolver: ctx.config.author.clone(),
        date: ctx.now,
    });
    Ok(EditorState {
        selection: clamp_selection(&document, &state.selection),
        document,
        highlights,
        resolved,
        ..state.clone()
    })
}

fn add_highlight(
    state: &EditorState,
    kind: HighlightType,
    text: String,
    selection: Option<Selection>,
    ctx: &ReduceContext<'_>,
) -> Result<Reduced, CommandError> {
    let selection = selection.unwrap_or_else(|| state.selection.clone());
    if selection.resolve(&state.document)?.is_collapsed() {
        return Err(ModelError::EmptySelection.into());
    }
    if !can_add_highlight(&state.document, &state.highlights, kind, &selection)? {
        return Err(CommandError::HighlightConflict(kind));
    }
    let data = HighlightData::new(ctx.config.author.clone(), ctx.now).with_description(text);
    let (highlights, id) = state.highlights.allocate(kind, data);
    let document = add_marks(&state.document, &selection, id)?;
    tracing::debug!(id = %id, kind = ?kind, "added highlight");
    let state = EditorState {
        document,
        highlights,
        ..state.clone()
    };
    Ok(Reduced::new(state).with_result(CommandResult::Highlight(id)))
}

fn resolve_highlight(state: &EditorState, id: HighlightId) -> Result<EditorState, CommandError> {
    let highlight = state.highlights.get(id).ok_or(CommandError::UnknownHighlight(id))?;
    if highlight.kind.is_suggestion() {
        return Err(CommandError::ResolveSuggestion(id));
    }
    let document = clear_marks(&state.document, id);
    Ok(EditorState {
        highlights: state.highlights.remove(id),
        document,
        ..state.clone()
    })
}

fn search_result(search: &SearchState) -> CommandResult {
    match &search.current {
        Some(found) => CommandResult::SearchMatch(found.clone()),
        None => CommandResult::SearchNotFound,
    }
}

fn with_search(state: &EditorState, search: SearchState) -> Reduced {
    let result = search_result(&search);
    Reduced::new(EditorState {
        search,
        ..state.clone()
    })
    .with_result(result)
}

fn set_criteria(
    state: &EditorState,
    criteria: Option<SearchCriteria>,
) -> Result<Reduced, CommandError> {
    let Some(criteria) = criteria else {
        let state = EditorState {
            search: SearchState::default(),
            ..state.clone()
        };
        return Ok(Reduced::new(state).with_result(CommandResult::SearchNotFound));
    };
    let from = state
        .selection
        .resolve(&state.document)
        .map(|range| range.start)
        .ok();
    let search = SearchState::new(criteria, from).find_next(&state.document)?;
    Ok(with_search(state, search))
}

fn replace_all(
    state: &EditorState,
    document: Document,
    replaced: usize,
) -> Reduced {
    let search = match &state.search.criteria {
        Some(criteria) => SearchState::new(criteria.clone(), None),
        None => SearchState::default(),
    };
    let state = EditorState {
        selection: clamp_selection(&document, &state.selection),
        document,
        search,
        ..state.clone()
    };
    Reduced::new(state).with_result(CommandResult::ReplaceResult { replaced })
}

fn reduce_table(state: &EditorState, action: &Action) -> Result<EditorState, CommandError> {
    let doc = &state.document;
    let next = match action {
        Action::ToolbarAddTable { rows, cols } => {
            let (document, cursor) = table::add_table(doc, &state.selection, *rows, *cols)?;
            return Ok(EditorState {
                document,
                active_cell: Some(cursor),
                ..state.clone()
            });
        }
        Action::ToolbarRemoveRow | Action::ToolbarRemoveCol => {
            let cursor = active_cell(state)?;
            let (document, cursor) = if matches!(action, Action::ToolbarRemoveRow) {
                table::remove_row(doc, cursor)?
            } else {
                table::remove_col(doc, cursor)?
            };
            return Ok(EditorState {
                document,
                active_cell: Some(cursor),
                ..state.clone()
            });
        }
        Action::ToolbarAddRowAfter => table::add_row_after(doc, active_cell(state)?)?,
        Action::ToolbarAddColAfter => table::add_col_after(doc, active_cell(state)?)?,
        Action::ToolbarToggleTableHeader => table::toggle_table_header(doc, active_cell(state)?)?,
        Action::ToolbarToggleCellStyle { style } => {
            table::toggle_cell_style(doc, active_cell(state)?, *style)?
        }
        Action::EditorSetCellText { text } => table::set_cell_text(doc, active_cell(state)?, text)?,
        Action::EditorSetActiveCell { cell } => {
            if let Some(cell) = cell {
                let block = doc.block(&cell.block).ok_or_else(|| ModelError::StaleSelection {
                    key: cell.block.clone(),
                })?;
                let table = block.table().ok_or_else(|| ModelError::NotATable {
                    key: cell.block.clone(),
                })?;
                if table.cell(cell.row, cell.col).is_none() {
                    return Err(ModelError::CellOutOfBounds {
                        row: cell.row,
                        col: cell.col,
                    }
                    .into());
                }
            }
            return Ok(EditorState {
                active_cell: cell.clone(),
                ..state.clone()
            });
        }
        _ => return Ok(state.clone()),
    };
    Ok(with_document(state, next))
}

/// Compute the next state for `action`.
///
/// Undo and redo need the history, which the store owns; here they are no-ops.
pub fn reduce(
    state: &EditorState,
    action: Action,
    ctx: &ReduceContext<'_>,
) -> Result<Reduced, CommandError> {
    let doc = &state.document;
    let actor = ctx.actor();
    let reduced = match action {
        Action::EditorInsertText { text } => Reduced::new(insert_text(state, &text, ctx)?),
        Action::EditorRemoveRange => Reduced::new(if state.suggesting_mode {
            apply_tracked(
                state,
                suggestions::suggest_remove(doc, &state.highlights, &state.selection, &actor)?,
            )
        } else {
            apply_edit(state, edit::remove_range(doc, &state.selection)?)
        }),
        Action::EditorDeleteBackward => Reduced::new(if state.suggesting_mode {
            apply_tracked(
                state,
                suggestions::suggest_delete_backward(doc, &state.highlights, &state.selection, &actor)?,
            )
        } else {
            apply_edit(state, edit::delete_backward(doc, &state.selection)?)
        }),
        Action::EditorDeleteForward => Reduced::new(if state.suggesting_mode {
            apply_tracked(
                state,
                suggestions::suggest_delete_forward(doc, &state.highlights, &state.selection, &actor)?,
            )
        } else {
            apply_edit(state, edit::delete_forward(doc, &state.selection)?)
        }),
        Action::EditorSplitBlock => {
            let carried = match &state.style_override {
                Some(styles) => styles.clone(),
                None => edit::styles_at_caret(doc, &state.selection)?,
            };
            let edit = edit::split_block(doc, &state.selection)?;
            Reduced::new(EditorState {
                style_override: (!carried.is_empty()).then_some(carried),
                ..apply_edit(state, edit)
            })
        }
        Action::EditorPaste { content } => {
            let (fragment, report) = ctx.sanitizer.sanitize(&content);
            if !report.is_clean() {
                tracing::warn!(?report, "pasted content was sanitized");
            }
            Reduced::new(insert_fragment(state, &fragment, ctx)?)
        }
        Action::EditorSetSelection { selection } => {
            selection.resolve(doc)?;
            Reduced::new(EditorState {
                selection,
                style_override: None,
                ..state.clone()
            })
        }
        Action::EditorUndo | Action::EditorRedo => Reduced::new(state.clone()),
        Action::EditorToggleSuggestingMode => {
            let suggesting_mode = !state.suggesting_mode;
            let highlights = if !suggesting_mode && !suggestions::has_pending(&state.highlights) {
                state.highlights.without_suggestions()
            } else {
                state.highlights.clone()
            };
            tracing::debug!(suggesting_mode, "toggled suggesting mode");
            Reduced::new(EditorState {
                suggesting_mode,
                highlights,
                ..state.clone()
            })
        }
        action @ (Action::EditorSetActiveCell { .. }
        | Action::EditorSetCellText { .. }
        | Action::ToolbarAddTable { .. }
        | Action::ToolbarAddRowAfter
        | Action::ToolbarAddColAfter
        | Action::ToolbarRemoveRow
        | Action::ToolbarRemoveCol
        | Action::ToolbarToggleTableHeader
        | Action::ToolbarToggleCellStyle { .. }) => Reduced::new(reduce_table(state, &action)?),

        Action::ToolbarToggleInlineStyle { style } => Reduced::new(toggle_style(state, style, ctx)?),
        Action::ToolbarSetBlockType { block_type } => {
            Reduced::new(apply_edit(state, edit::set_block_type(doc, &state.selection, block_type)?))
        }
        Action::ToolbarApplyLink { url } => {
            Reduced::new(apply_edit(state, edit::apply_link(doc, &state.selection, &url)?))
        }
        Action::ToolbarRemoveLink => {
            Reduced::new(apply_edit(state, edit::remove_link(doc, &state.selection)?))
        }

        Action::AcceptSuggestion { id } => Reduced::new(resolve_suggestion(state, id, true, ctx)?),
        Action::RejectSuggestion { id } => Reduced::new(resolve_suggestion(state, id, false, ctx)?),
        Action::AddComment { text, selection } => {
            add_highlight(state, HighlightType::Comment, text, selection, ctx)?
        }
        Action::AddAnnotation { text, selection } => {
            add_highlight(state, HighlightType::Annotation, text, selection, ctx)?
        }
        Action::ResolveHighlight { id } => Reduced::new(resolve_highlight(state, id)?),

        Action::HighlightsCriteria {
            pattern,
            case_sensitive,
            whole_word,
            regex,
        } => {
            let criteria = (!pattern.is_empty()).then(|| {
                SearchCriteria::new(pattern).with_options(SearchOptions {
                    case_sensitive: case_sensitive.unwrap_or(ctx.config.search_case_sensitive),
                    whole_word,
                    regex,
                })
            });
            set_criteria(state, criteria)?
        }
        Action::HighlightsFindNext => with_search(state, state.search.find_next(doc)?),
        Action::HighlightsFindPrev => with_search(state, state.search.find_prev(doc)?),
        Action::HighlightsReplace { text } => match state.search.replace(doc, &text)? {
            Some((edit, search)) => Reduced::new(EditorState {
                search,
                ..apply_edit(state, edit)
            })
            .with_result(CommandResult::ReplaceResult { replaced: 1 }),
            None => Reduced::new(state.clone()).with_result(CommandResult::ReplaceResult { replaced: 0 }),
        },
        Action::HighlightsReplaceAll { text } => match &state.search.criteria {
            Some(criteria) => {
                let (document, replaced) = search::replace_all(doc, criteria, &text)?;
                replace_all(state, document, replaced)
            }
            None => Reduced::new(state.clone()).with_result(CommandResult::ReplaceResult { replaced: 0 }),
        },
        Action::HighlightsReplaceMultiple { diff } => {
            let options = SearchOptions {
                case_sensitive: ctx.config.search_case_sensitive,
                ..SearchOptions::default()
            };
            let (document, replaced) = search::replace_multiple(doc, &diff, options)?;
            replace_all(state, document, replaced)
        }

        Action::SpellcheckRequest { point } => {
            let point = match point {
                Some(point) => point,
                None => state.selection.focus.clone(),
            };
            match spellcheck::word_at(doc, &point) {
                Some(target) => {
                    let word = target.word.clone();
                    let (spellcheck, ticket) = state.spellcheck.request(target);
                    Reduced::new(EditorState {
                        spellcheck,
                        ..state.clone()
                    })
                    .with_result(CommandResult::Ticket(ticket))
                    .with_effect(Effect::LookupSuggestions { ticket, word })
                }
                None => Reduced::new(state.clone()),
            }
        }
        Action::SpellcheckSuggestionsLoaded { ticket, suggestions } => {
            match state.spellcheck.complete(doc, ticket, suggestions) {
                Some(spellcheck) => Reduced::new(EditorState {
                    spellcheck,
                    ..state.clone()
                }),
                None => Reduced::new(state.clone()),
            }
        }
        Action::SpellcheckReplace { target, replacement } => {
            match spellcheck::replace_word(doc, &target, &replacement)? {
                Some(edit) => Reduced::new(EditorState {
                    spellcheck: state.spellcheck.cleared(),
                    ..apply_edit(state, edit)
                }),
                None => Reduced::new(state.clone()),
            }
        }
        Action::SpellcheckIgnore { word } => Reduced::new(EditorState {
            spellcheck: state.spellcheck.ignore(&word),
            ..state.clone()
        })
        .with_effect(Effect::UpdateDictionary {
            word,
            permanent: false,
        }),
        Action::SpellcheckAdd { word } => Reduced::new(EditorState {
            spellcheck: state.spellcheck.add(&word),
            ..state.clone()
        })
        .with_effect(Effect::UpdateDictionary {
            word,
            permanent: true,
        }),

        Action::Unknown => {
            tracing::debug!("ignoring unknown action");
            Reduced::new(state.clone())
        }
    };
    Ok(Reduced {
        state: enforce_invariants(state, reduced.state),
        ..reduced
    })
}

/// Drop highlight marks without metadata and entity ranges without an entity.
///
/// Neither can happen under correct operation. Debug builds fail loudly; release builds
/// log and repair so the editor keeps running.
fn enforce_invariants(previous: &EditorState, next: EditorState) -> EditorState {
    if next.document.ptr_eq(&previous.document) && next.highlights == previous.highlights {
        return next;
    }
    let doc = &next.document;
    let highlights = &next.highlights;
    let mut violations = 0usize;
    let document = doc.map_blocks(|block| {
        let dangling_mark = block.marks().iter().any(|span| !highlights.contains(span.value));
        let dangling_entity = block.entities().iter().any(|span| doc.entity(span.value).is_none());
        if !dangling_mark && !dangling_entity {
            return None;
        }
        violations += 1;
        tracing::error!(block = %block.key(), "dropping dangling highlight marks or entity ranges");
        let mut repaired = block.clone();
        repaired.marks.retain(|span| highlights.contains(span.value));
        repaired.entities.retain(|span| doc.entity(span.value).is_some());
        Some(repaired)
    });
    debug_assert_eq!(violations, 0, "reducer left dangling references");
    let highlights = highlights.prune(&document);
    EditorState {
        document,
        highlights,
        ..next
    }
}

/// `Vec<(String, String)>` as a JSON object, keeping the key order of the input.
mod ordered_pairs {
    use super::fmt;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (old, new) in pairs {
            map.serialize_entry(old, new)?;
        }
        map.end()
    }

    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of string replacements")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(pair) = access.next_entry::<String, String>()? {
                pairs.push(pair);
            }
            Ok(pairs)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
        deserializer.deserialize_map(PairsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(state: &EditorState, action: Action) -> Reduced {
        let config = EditorConfig::default().with_author("alice");
        let sanitizer = Sanitizer::default();
        let ctx = ReduceContext {
            config: &config,
            sanitizer: &sanitizer,
            now: 42,
        };
        reduce(state, action, &ctx).unwrap()
    }

    #[test]
    fn test_action_tags_are_stable() {
        let action = Action::ToolbarToggleInlineStyle {
            style: InlineStyle::Bold,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({"type": "TOOLBAR_TOGGLE_INLINE_STYLE", "style": "BOLD"})
        );
        let parsed: Action =
            serde_json::from_str(r#"{"type": "HIGHLIGHTS_REPLACE_ALL", "text": "dog"}"#).unwrap();
        assert_eq!(parsed, Action::HighlightsReplaceAll { text: "dog".into() });
        let parsed: Action = serde_json::from_str(
            r#"{"type": "SPELLCHECK_SUGGESTIONS_LOADED", "ticket": 3, "suggestions": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            Action::SpellcheckSuggestionsLoaded {
                ticket: 3,
                suggestions: vec!["a".into()]
            }
        );
    }

    #[test]
    fn test_replace_multiple_keeps_pair_order() {
        let parsed: Action = serde_json::from_str(
            r#"{"type": "HIGHLIGHTS_REPLACE_MULTIPLE", "diff": {"dog": "cow", "cat": "dog"}}"#,
        )
        .unwrap();
        let diff = vec![
            ("dog".to_string(), "cow".to_string()),
            ("cat".to_string(), "dog".to_string()),
        ];
        assert_eq!(parsed, Action::HighlightsReplaceMultiple { diff: diff.clone() });

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"type":"HIGHLIGHTS_REPLACE_MULTIPLE","diff":{"dog":"cow","cat":"dog"}}"#);
        let reparsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed, Action::HighlightsReplaceMultiple { diff });
    }

    #[test]
    fn test_reduce_does_not_touch_previous_state() {
        let state = EditorState::new(Document::from_text("Hello"));
        let state = EditorState {
            selection: Selection::caret("b0", 5),
            ..state
        };
        let before = state.clone();
        let next = run(&state, Action::EditorInsertText { text: "!".into() });
        assert_eq!(state, before);
        assert_eq!(next.state.document.plain_text(), "Hello!");
        assert_eq!(next.state.selection, Selection::caret("b0", 6));
    }

    #[test]
    fn test_caret_style_toggle_applies_to_next_insert() {
        let state = EditorState {
            selection: Selection::caret("b0", 2),
            ..EditorState::new(Document::from_text("ab"))
        };
        let toggled = run(&state, Action::ToolbarToggleInlineStyle { style: InlineStyle::Bold }).state;
        assert_eq!(toggled.document, state.document);
        let typed = run(&toggled, Action::EditorInsertText { text: "c".into() }).state;
        let block = typed.document.first_block().unwrap();
        assert!(block.styles().covers(2, 3, &InlineStyle::Bold));
        assert!(!block.styles().covers(0, 2, &InlineStyle::Bold));
        assert_eq!(typed.style_override, None);
    }

    #[test]
    fn test_split_block_carries_styles() {
        let doc = Document::from_blocks(vec![
            crate::document::Block::new("a", BlockType::Unstyled, "bold").with_style(0, 4, InlineStyle::Bold),
        ])
        .unwrap();
        let state = EditorState {
            selection: Selection::caret("a", 4),
            ..EditorState::new(doc)
        };
        let split = run(&state, Action::EditorSplitBlock).state;
        let typed = run(&split, Action::EditorInsertText { text: "x".into() }).state;
        let second = typed.document.block_at(1).unwrap();
        assert_eq!(second.text(), "x");
        assert!(second.styles().covers(0, 1, &InlineStyle::Bold));
    }

    #[test]
    fn test_comment_conflicts() {
        let state = EditorState {
            selection: Selection::within("b0", 0, 3),
            ..EditorState::new(Document::from_text("one two"))
        };
        let commented = run(
            &state,
            Action::AddComment {
                text: "check".into(),
                selection: None,
            },
        );
        let CommandResult::Highlight(id) = commented.result else {
            panic!("expected a highlight");
        };
        assert_eq!(commented.state.highlights.get(id).unwrap().data.author, "alice");

        let config = EditorConfig::default();
        let sanitizer = Sanitizer::default();
        let ctx = ReduceContext {
            config: &config,
            sanitizer: &sanitizer,
            now: 0,
        };
        let again = reduce(
            &commented.state,
            Action::AddComment {
                text: "adjacent".into(),
                selection: Some(Selection::within("b0", 3, 5)),
            },
            &ctx,
        );
        assert!(matches!(again, Err(CommandError::HighlightConflict(HighlightType::Comment))));

        let resolved = run(&commented.state, Action::ResolveHighlight { id }).state;
        assert!(resolved.highlights.is_empty());
        assert!(resolved.document.first_block().unwrap().marks().is_empty());
    }

    #[test]
    fn test_replace_pair_resolves_together() {
        let state = EditorState {
            selection: Selection::within("b0", 4, 9),
            suggesting_mode: true,
            ..EditorState::new(Document::from_text("The quick fox"))
        };
        let typed = run(&state, Action::EditorInsertText { text: "slow".into() }).state;
        let entries = suggestions::pending_suggestions(&typed.document, &typed.highlights);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, SuggestionAction::Replace);

        let accepted = run(&typed, Action::AcceptSuggestion { id: entries[0].id }).state;
        assert_eq!(accepted.document.plain_text(), "The slow fox");
        assert!(accepted.highlights.is_empty());
        assert_eq!(accepted.resolved.len(), 1);
        assert!(accepted.resolved[0].accepted);
        assert_eq!(accepted.resolved[0].resolver, "alice");
    }

    #[test]
    fn test_suggesting_off_collects_metadata() {
        let state = EditorState {
            suggesting_mode: true,
            ..EditorState::new(Document::from_text("abc"))
        };
        let off = run(&state, Action::EditorToggleSuggestingMode).state;
        assert!(!off.suggesting_mode);
        assert!(off.highlights.is_empty());
    }

    #[test]
    fn test_unknown_action_is_noop() {
        let state = EditorState::new(Document::from_text("abc"));
        let next = run(&state, Action::Unknown);
        assert_eq!(next.state, state);
        assert!(next.effects.is_empty());
    }

    #[test]
    fn test_spellcheck_actions_emit_effects() {
        let state = EditorState {
            selection: Selection::caret("b0", 2),
            ..EditorState::new(Document::from_text("speling"))
        };
        let requested = run(&state, Action::SpellcheckRequest { point: None });
        assert_eq!(
            requested.effects,
            vec![Effect::LookupSuggestions {
                ticket: 1,
                word: "speling".into()
            }]
        );
        let ignored = run(&requested.state, Action::SpellcheckIgnore { word: "speling".into() });
        assert!(ignored.state.spellcheck.is_known("speling"));
        assert_eq!(
            ignored.effects,
            vec![Effect::UpdateDictionary {
                word: "speling".into(),
                permanent: false
            }]
        );
    }
}
