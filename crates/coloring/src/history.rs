use std::collections::VecDeque;

use crate::{
    config::{DEMO_HISTORY_LIMIT, STUDIO_HISTORY_LIMIT},
    types::PixelBuffer,
};

/// Linear undo/redo over full-canvas snapshots.
///
/// `cursor` always indexes the snapshot currently on screen. Pushing after
/// an undo discards the redo branch; pushing past `limit` evicts the oldest
/// snapshot and shifts the cursor with it.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: VecDeque<PixelBuffer>,
    cursor: usize,
    limit: usize,
}

impl HistoryStack {
    /// A limit of zero is raised to one so the current state is always kept.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            snapshots: VecDeque::with_capacity(limit),
            cursor: 0,
            limit,
        }
    }

    pub fn studio() -> Self {
        Self::new(STUDIO_HISTORY_LIMIT)
    }

    pub fn demo() -> Self {
        Self::new(DEMO_HISTORY_LIMIT)
    }

    /// Start over with `initial` as the only snapshot.
    pub fn reset(&mut self, initial: PixelBuffer) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.cursor = 0;
    }

    pub fn push(&mut self, snapshot: PixelBuffer) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push_back(snapshot);
        if self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. `None` when already at the oldest.
    pub fn undo(&mut self) -> Option<&PixelBuffer> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward one snapshot. `None` when already at the newest.
    pub fn redo(&mut self) -> Option<&PixelBuffer> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    pub fn current(&self) -> Option<&PixelBuffer> {
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::studio()
    }
}
