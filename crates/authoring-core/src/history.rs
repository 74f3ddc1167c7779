//! Undo/redo history
//!
//! # Overview
//!
//! Documents are immutable and cheap to clone, so a history step is just the state
//! before and after a transaction. Steps are grouped: consecutive insertions share a
//! group and undo together, any other step opens (and closes) a group of its own.
//!
//! A clean point remembers the position in the linear history that matches the
//! persisted content, so the store can report whether the document is modified.

use crate::document::Document;
use crate::highlights::HighlightSet;
use crate::selection::Selection;

/// The undoable part of the editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Document.
    pub document: Document,
    /// Highlight metadata.
    pub highlights: HighlightSet,
    /// Selection.
    pub selection: Selection,
}

#[derive(Debug, Clone)]
struct UndoStep {
    group_id: usize,
    before: Snapshot,
    after: Snapshot,
}

/// Linear undo/redo history with insert coalescing and a clean point.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    /// Uses `undo_stack.len()` as the saved position. When `redo_stack` is non-empty,
    /// `clean_index` may be greater than `undo_stack.len()`.
    clean_index: Option<usize>,
    next_group_id: usize,
    open_group_id: Option<usize>,
}

impl History {
    /// Empty history keeping at most `max_undo` steps.
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            clean_index: Some(0),
            next_group_id: 0,
            open_group_id: None,
        }
    }

    /// Returns `true` if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable steps.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable steps.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Group that the next insertion would join, if any.
    pub fn current_group_id(&self) -> Option<usize> {
        self.open_group_id
    }

    /// Returns `true` if the current state is the clean point.
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    /// Mark the current state as clean (after the content was persisted).
    pub fn mark_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
        self.end_group();
    }

    /// Close the open insertion group.
    pub fn end_group(&mut self) {
        self.open_group_id = None;
    }

    fn clear_redo_and_adjust_clean(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }

        // A clean point inside the redo area becomes unreachable.
        if let Some(clean_index) = self.clean_index
            && clean_index > self.undo_stack.len()
        {
            self.clean_index = None;
        }

        self.redo_stack.clear();
    }

    /// Record a transaction. `coalescible_insert` steps join the open insertion group.
    /// Returns the group id the step landed in.
    pub fn record(&mut self, before: Snapshot, after: Snapshot, coalescible_insert: bool) -> usize {
        self.clear_redo_and_adjust_clean();

        if self.max_undo == 0 {
            self.open_group_id = None;
            return self.next_group_id;
        }

        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean_index) => Some(clean_index - 1),
            };
        }

        let open_group = self
            .open_group_id
            .filter(|_| coalescible_insert && self.clean_index != Some(self.undo_stack.len()));
        let group_id = match open_group {
            Some(group_id) => group_id,
            None => {
                let group_id = self.next_group_id;
                self.next_group_id = self.next_group_id.wrapping_add(1);
                group_id
            }
        };

        self.open_group_id = coalescible_insert.then_some(group_id);
        self.undo_stack.push(UndoStep {
            group_id,
            before,
            after,
        });
        tracing::debug!(group_id, depth = self.undo_stack.len(), "recorded undo step");
        group_id
    }

    fn pop_group(stack: &mut Vec<UndoStep>) -> Vec<UndoStep> {
        let Some(last_group_id) = stack.last().map(|s| s.group_id) else {
            return Vec::new();
        };
        let mut steps = Vec::new();
        while let Some(step) = stack.pop_if(|step| step.group_id == last_group_id) {
            steps.push(step);
        }
        steps
    }

    /// Undo the newest group. Returns the state to restore.
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.end_group();
        let steps = Self::pop_group(&mut self.undo_stack);
        let restored = steps.last()?.before.clone();
        tracing::debug!(steps = steps.len(), "undo");
        self.redo_stack.extend(steps);
        Some(restored)
    }

    /// Redo the newest undone group. Returns the state to restore.
    pub fn redo(&mut self) -> Option<Snapshot> {
        self.end_group();
        let steps = Self::pop_group(&mut self.redo_stack);
        let restored = steps.last()?.after.clone();
        tracing::debug!(steps = steps.len(), "redo");
        self.undo_stack.extend(steps);
        Some(restored)
    }
}
