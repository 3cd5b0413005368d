//! Snapshot-based undo/redo history.
//!
//! Each committed entry is a full deep copy of the frames and selection,
//! tagged with a label and a source. Entries form a single linear timeline
//! with a cursor pointing at the active snapshot; committing after an undo
//! discards everything beyond the cursor.
//!
//! Gestures that produce several internal writes use **batching**: commits
//! inside a batch are deferred, and closing the outermost batch records one
//! entry for the cumulative change.

use ab_core::model::{Document, Frame, Selection};
use serde::{Deserialize, Serialize};

/// Who caused a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    User,
    System,
}

/// Read access to the state captured by a snapshot.
pub trait SnapshotSource {
    fn frames(&self) -> &[Frame];
    fn selection(&self) -> &Selection;
}

impl SnapshotSource for Document {
    fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// An immutable copy of the document state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub label: String,
    pub source: HistorySource,
    pub frames: Vec<Frame>,
    pub selection: Selection,
}

impl Snapshot {
    pub fn capture<S: SnapshotSource>(state: &S, label: &str, source: HistorySource) -> Self {
        Self {
            label: label.to_string(),
            source,
            frames: state.frames().to_vec(),
            selection: state.selection().clone(),
        }
    }

    /// Copy this snapshot back into `doc`, replacing frames and selection.
    pub fn restore(&self, doc: &mut Document) {
        doc.frames = self.frames.clone();
        doc.selection = self.selection.clone();
    }

    fn matches<S: SnapshotSource>(&self, state: &S) -> bool {
        self.frames.as_slice() == state.frames() && self.selection == *state.selection()
    }
}

/// Result of an undo or redo step.
#[derive(Debug)]
pub struct Step<'a> {
    /// Label of the entry that was undone (or redone).
    pub label: &'a str,
    /// The snapshot that is now active.
    pub snapshot: &'a Snapshot,
}

/// Bounded linear history with a cursor.
pub struct History {
    entries: Vec<Snapshot>,
    /// Index of the active entry. Meaningless while `entries` is empty.
    cursor: usize,
    /// Maximum number of entries kept.
    capacity: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Whether a commit was requested during the current batch.
    batch_dirty: bool,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
            batch_depth: 0,
            batch_dirty: false,
        }
    }

    /// Record the current state. Returns whether an entry was pushed.
    ///
    /// Skipped when batching (the batch records it later) or when `state`
    /// equals the active snapshot.
    pub fn commit<S: SnapshotSource>(
        &mut self,
        state: &S,
        label: &str,
        source: HistorySource,
    ) -> bool {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
            return false;
        }
        if self.active().is_some_and(|active| active.matches(state)) {
            log::debug!("history: skipping '{label}', state unchanged");
            return false;
        }

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(Snapshot::capture(state, label, source));
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        log::debug!(
            "history: committed '{label}' ({source:?}), {} entries",
            self.entries.len()
        );
        true
    }

    /// Step back one entry. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Step<'_>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(Step {
            label: &self.entries[self.cursor + 1].label,
            snapshot: &self.entries[self.cursor],
        })
    }

    /// Step forward one entry. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Step<'_>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        let snapshot = &self.entries[self.cursor];
        Some(Step {
            label: &snapshot.label,
            snapshot,
        })
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// The snapshot the document currently corresponds to.
    pub fn active(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Labels from oldest to newest.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    // ─── Batching ────────────────────────────────────────────────────────

    /// Start a batch. Commits until the matching `end_batch` are deferred.
    pub fn begin_batch(&mut self) {
        if self.batch_depth == 0 {
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes after a deferred
    /// commit, one entry labelled `label` is recorded. Returns whether an
    /// entry was pushed.
    pub fn end_batch<S: SnapshotSource>(
        &mut self,
        state: &S,
        label: &str,
        source: HistorySource,
    ) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }
        let dirty = std::mem::take(&mut self.batch_dirty);
        dirty && self.commit(state, label, source)
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::NodeId;

    fn doc_named(name: &str) -> Document {
        let mut doc = Document::new("history");
        doc.frames
            .push(Frame::new(NodeId::intern("hist_frame"), name, 100.0, 100.0));
        doc
    }

    #[test]
    fn undo_redo_walk_the_timeline() {
        let mut history = History::new(10);
        history.commit(&doc_named("a"), "Open", HistorySource::System);
        history.commit(&doc_named("b"), "Rename to b", HistorySource::User);

        let step = history.undo().unwrap();
        assert_eq!(step.label, "Rename to b");
        assert_eq!(step.snapshot.frames[0].name, "a");
        assert!(history.undo().is_none());

        let step = history.redo().unwrap();
        assert_eq!(step.label, "Rename to b");
        assert_eq!(step.snapshot.frames[0].name, "b");
        assert!(history.redo().is_none());
    }

    #[test]
    fn commit_after_undo_drops_redo_entries() {
        let mut history = History::new(10);
        history.commit(&doc_named("a"), "Open", HistorySource::System);
        history.commit(&doc_named("b"), "b", HistorySource::User);
        history.undo();
        history.commit(&doc_named("c"), "c", HistorySource::User);

        assert!(!history.can_redo());
        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["Open", "c"]);
    }

    #[test]
    fn unchanged_state_is_not_committed() {
        let mut history = History::new(10);
        assert!(history.commit(&doc_named("a"), "Open", HistorySource::System));
        assert!(!history.commit(&doc_named("a"), "Noop", HistorySource::User));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn oldest_entries_are_dropped_at_capacity() {
        let mut history = History::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            history.commit(&doc_named(name), name, HistorySource::User);
        }
        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["c", "d", "e"]);
        assert!(history.undo().is_some());
        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
    }

    #[test]
    fn nested_batches_record_one_entry() {
        let mut history = History::new(10);
        history.commit(&doc_named("a"), "Open", HistorySource::System);

        history.begin_batch();
        history.begin_batch();
        assert!(!history.commit(&doc_named("b"), "step", HistorySource::User));
        assert!(!history.end_batch(&doc_named("b"), "inner", HistorySource::User));
        assert!(!history.commit(&doc_named("c"), "step", HistorySource::User));
        assert!(history.end_batch(&doc_named("c"), "Drag", HistorySource::User));

        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["Open", "Drag"]);
        assert!(!history.is_batching());
    }

    #[test]
    fn clean_batch_records_nothing() {
        let mut history = History::new(10);
        history.commit(&doc_named("a"), "Open", HistorySource::System);
        history.begin_batch();
        assert!(!history.end_batch(&doc_named("a"), "Drag", HistorySource::User));
        assert_eq!(history.len(), 1);
    }
}
