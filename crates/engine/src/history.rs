//! Snapshot-based undo/redo.
//!
//! The live workflow belongs to the caller; `History` only holds owned
//! copies of earlier and later states. Hosts call [`History::snapshot`]
//! right before every undoable gesture.

use std::collections::VecDeque;

use tracing::debug;

use crate::models::Workflow;

/// Undo and redo stacks of independent workflow copies.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<Workflow>,
    future: VecDeque<Workflow>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` as the state to return to, and drop the redo stack.
    pub fn snapshot(&mut self, current: &Workflow) {
        self.past.push(current.clone());
        self.future.clear();
    }

    /// Step back one snapshot. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, current: &mut Workflow) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        self.future.push_front(std::mem::replace(current, previous));
        debug!(past = self.past.len(), future = self.future.len(), "undo");
        true
    }

    /// Step forward one snapshot. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, current: &mut Workflow) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        self.past.push(std::mem::replace(current, next));
        debug!(past = self.past.len(), future = self.future.len(), "redo");
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Forget every snapshot.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
