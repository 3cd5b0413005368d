//! The editing façade consumed by the rendering adapter and the UI shell.
//!
//! `Editor` owns the live `Document` and its `History`. Every public
//! mutation is routed through `store::apply`; when the document changed,
//! a labelled snapshot is committed.

use crate::config::EditorConfig;
use crate::history::{History, HistorySource};
use crate::reflow;
use crate::store::{self, Mutation, SelectMode};
use ab_core::model::{
    ContainerLayoutPatch, Document, Element, Frame, FramePatch, ItemLayoutPatch, PropsPatch,
};
use ab_core::{Error, NodeId, Rect, tree};

/// Label of the snapshot committed when a document is opened.
pub const OPEN_LABEL: &str = "Open document";

pub struct Editor {
    document: Document,
    history: History,
    config: EditorConfig,
    /// Bumped on every commit, undo and redo.
    revision: u64,
}

impl Editor {
    pub fn new(mut document: Document, config: EditorConfig) -> Self {
        tree::sanitize_document(&mut document);
        let mut history = History::new(config.history_limit);
        history.commit(&document, OPEN_LABEL, HistorySource::System);
        Self {
            document,
            history,
            config,
            revision: 0,
        }
    }

    pub fn from_json(json: &str, config: EditorConfig) -> Result<Self, Error> {
        Ok(Self::new(Document::from_json(json)?, config))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Monotonic change counter for observers such as autosave.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn to_json(&self) -> Result<String, Error> {
        self.document.to_json()
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Apply `mutation` and commit it under its default label.
    pub fn dispatch(&mut self, mutation: Mutation) -> bool {
        let label = mutation.label();
        self.dispatch_with(mutation, &label, HistorySource::User)
    }

    /// Apply `mutation` and commit it under `label`.
    pub fn dispatch_with(&mut self, mutation: Mutation, label: &str, source: HistorySource) -> bool {
        let changed = self.dispatch_folded(mutation);
        if changed {
            self.commit(label, source);
        }
        changed
    }

    /// Apply `mutation` without committing; the next commit captures it.
    pub fn dispatch_folded(&mut self, mutation: Mutation) -> bool {
        let document = std::mem::take(&mut self.document);
        let transition = store::apply(document, mutation, &self.config.layout);
        self.document = transition.document;
        transition.changed
    }

    /// Snapshot the current state. Skipped while batching or when nothing
    /// changed since the active snapshot.
    pub fn commit(&mut self, label: &str, source: HistorySource) -> bool {
        let committed = self.history.commit(&self.document, label, source);
        if committed {
            self.revision += 1;
        }
        committed
    }

    /// Start folding mutations into one history entry.
    pub fn begin_batch(&mut self) {
        self.history.begin_batch();
    }

    /// Close a batch opened with `begin_batch`.
    pub fn end_batch(&mut self, label: &str) -> bool {
        let committed = self
            .history
            .end_batch(&self.document, label, HistorySource::User);
        if committed {
            self.revision += 1;
        }
        committed
    }

    /// Restore the previous snapshot. Returns the label of the undone
    /// entry, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<String> {
        if self.history.is_batching() {
            log::warn!("undo ignored while a batch is open");
            return None;
        }
        let step = self.history.undo()?;
        step.snapshot.restore(&mut self.document);
        self.revision += 1;
        Some(step.label.to_string())
    }

    /// Re-apply the next snapshot. Returns its label, or `None` when there
    /// is nothing to redo.
    pub fn redo(&mut self) -> Option<String> {
        if self.history.is_batching() {
            log::warn!("redo ignored while a batch is open");
            return None;
        }
        let step = self.history.redo()?;
        step.snapshot.restore(&mut self.document);
        self.revision += 1;
        Some(step.label.to_string())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Elements ────────────────────────────────────────────────────────

    pub fn add_element_to_frame(
        &mut self,
        frame_id: NodeId,
        element: Element,
        parent_id: Option<NodeId>,
    ) -> bool {
        self.dispatch(Mutation::AddElement {
            frame_id,
            element,
            parent_id,
        })
    }

    pub fn update_element_props(
        &mut self,
        frame_id: NodeId,
        element_id: NodeId,
        patch: PropsPatch,
    ) -> bool {
        self.dispatch(Mutation::UpdateElementProps {
            frame_id,
            element_id,
            patch,
        })
    }

    pub fn remove_element(&mut self, frame_id: NodeId, element_id: NodeId) -> bool {
        self.dispatch(Mutation::RemoveElement {
            frame_id,
            element_id,
        })
    }

    pub fn duplicate_element(&mut self, frame_id: NodeId, element_id: NodeId) -> bool {
        self.dispatch(Mutation::DuplicateElement {
            frame_id,
            element_id,
            offset: self.config.duplicate_offset,
        })
    }

    pub fn reorder_element(
        &mut self,
        frame_id: NodeId,
        element_id: NodeId,
        target_index: usize,
    ) -> bool {
        self.dispatch(Mutation::ReorderElement {
            frame_id,
            element_id,
            target_index,
        })
    }

    pub fn group_elements(
        &mut self,
        frame_id: NodeId,
        element_ids: Vec<NodeId>,
        group_id: NodeId,
    ) -> bool {
        self.dispatch(Mutation::GroupElements {
            frame_id,
            element_ids,
            group_id,
        })
    }

    pub fn ungroup_element(&mut self, frame_id: NodeId, group_id: NodeId) -> bool {
        self.dispatch(Mutation::UngroupElement { frame_id, group_id })
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    pub fn set_frame_layout(&mut self, frame_id: NodeId, patch: ContainerLayoutPatch) -> bool {
        self.dispatch(Mutation::SetFrameLayout { frame_id, patch })
    }

    pub fn set_group_layout(
        &mut self,
        frame_id: NodeId,
        group_id: NodeId,
        patch: ContainerLayoutPatch,
    ) -> bool {
        self.dispatch(Mutation::SetGroupLayout {
            frame_id,
            group_id,
            patch,
        })
    }

    pub fn set_element_layout(
        &mut self,
        frame_id: NodeId,
        element_id: NodeId,
        patch: ItemLayoutPatch,
    ) -> bool {
        self.dispatch(Mutation::SetElementLayout {
            frame_id,
            element_id,
            patch,
        })
    }

    pub fn reflow_frame(&mut self, frame_id: NodeId) -> bool {
        self.dispatch(Mutation::ReflowFrame { frame_id })
    }

    pub fn reflow_group(&mut self, frame_id: NodeId, group_id: NodeId) -> bool {
        self.dispatch(Mutation::ReflowGroup { frame_id, group_id })
    }

    /// Solved rectangles for a container's children, without applying them.
    pub fn preview_container(
        &self,
        frame_id: NodeId,
        container: Option<NodeId>,
    ) -> Vec<(NodeId, Rect)> {
        match self.document.frame(frame_id) {
            Some(frame) => reflow::preview_container(frame, container, &self.config.layout),
            None => Vec::new(),
        }
    }

    // ─── Frames ──────────────────────────────────────────────────────────

    pub fn add_frame(&mut self, frame: Frame) -> bool {
        self.dispatch(Mutation::AddFrame { frame, index: None })
    }

    pub fn remove_frame(&mut self, frame_id: NodeId) -> bool {
        self.dispatch(Mutation::RemoveFrame { frame_id })
    }

    pub fn duplicate_frame(&mut self, frame_id: NodeId) -> bool {
        self.dispatch(Mutation::DuplicateFrame { frame_id })
    }

    pub fn reorder_frame(&mut self, frame_id: NodeId, target_index: usize) -> bool {
        self.dispatch(Mutation::ReorderFrame {
            frame_id,
            target_index,
        })
    }

    pub fn update_frame(&mut self, frame_id: NodeId, patch: FramePatch) -> bool {
        self.dispatch(Mutation::UpdateFrame { frame_id, patch })
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn set_active_frame(&mut self, frame_id: Option<NodeId>) -> bool {
        self.dispatch(Mutation::SetActiveFrame { frame_id })
    }

    pub fn select(&mut self, element_ids: Vec<NodeId>, mode: SelectMode) -> bool {
        self.dispatch(Mutation::Select { element_ids, mode })
    }

    pub fn clear_selection(&mut self) -> bool {
        self.dispatch(Mutation::ClearSelection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::model::{LayoutMode, ShapeKind};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn editor_with_frame(frame: &str) -> Editor {
        let mut doc = Document::new("editor");
        doc.frames.push(Frame::new(id(frame), "F", 400.0, 300.0));
        Editor::new(doc, EditorConfig::default())
    }

    #[test]
    fn baseline_is_committed_on_open() {
        let mut editor = editor_with_frame("ed_base");
        assert_eq!(editor.history().labels().collect::<Vec<_>>(), vec![OPEN_LABEL]);
        assert!(!editor.can_undo());
        assert_eq!(editor.undo(), None);
        assert_eq!(editor.revision(), 0);
    }

    #[test]
    fn each_change_commits_once() {
        let mut editor = editor_with_frame("ed_commit");
        let el = Element::shape(id("ed_commit_a"), ShapeKind::Rect, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(editor.add_element_to_frame(id("ed_commit"), el, None));
        assert!(!editor.update_element_props(
            id("ed_commit"),
            id("ed_commit_a"),
            PropsPatch::size(10.0, 10.0)
        ));
        assert_eq!(
            editor.history().labels().collect::<Vec<_>>(),
            vec![OPEN_LABEL, "Add rect"]
        );
        assert_eq!(editor.revision(), 1);
    }

    #[test]
    fn folded_mutation_lands_in_next_commit() {
        let mut editor = editor_with_frame("ed_fold");
        let el = Element::shape(id("ed_fold_a"), ShapeKind::Rect, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(editor.dispatch_folded(Mutation::AddElement {
            frame_id: id("ed_fold"),
            element: el,
            parent_id: None,
        }));
        assert_eq!(editor.history().len(), 1);
        assert!(editor.commit("Draw rect", HistorySource::User));

        assert_eq!(editor.undo().as_deref(), Some("Draw rect"));
        assert!(editor.document().frames[0].elements.is_empty());
    }

    #[test]
    fn batch_folds_a_gesture() {
        let mut editor = editor_with_frame("ed_batch");
        let el = Element::shape(id("ed_batch_a"), ShapeKind::Rect, Rect::new(0.0, 0.0, 10.0, 10.0));
        editor.add_element_to_frame(id("ed_batch"), el, None);

        editor.begin_batch();
        for x in [5.0, 10.0, 15.0] {
            editor.update_element_props(
                id("ed_batch"),
                id("ed_batch_a"),
                PropsPatch::position(x, 0.0),
            );
        }
        assert_eq!(editor.undo(), None);
        assert!(editor.end_batch("Drag"));

        assert_eq!(
            editor.history().labels().collect::<Vec<_>>(),
            vec![OPEN_LABEL, "Add rect", "Drag"]
        );
        assert_eq!(editor.undo().as_deref(), Some("Drag"));
        let x = editor.document().frames[0].elements[0].props.x;
        assert_eq!(x, 0.0);
    }

    #[test]
    fn preview_reports_solved_rects() {
        let mut editor = editor_with_frame("ed_preview");
        let el = Element::shape(id("ed_preview_a"), ShapeKind::Rect, Rect::new(40.0, 40.0, 10.0, 10.0));
        editor.add_element_to_frame(id("ed_preview"), el, None);
        editor.set_frame_layout(
            id("ed_preview"),
            ContainerLayoutPatch {
                mode: Some(LayoutMode::FlexRow),
                ..Default::default()
            },
        );
        assert_eq!(
            editor.preview_container(id("ed_preview"), None),
            vec![(id("ed_preview_a"), Rect::new(0.0, 0.0, 10.0, 10.0))]
        );
        assert!(editor.preview_container(id("ed_missing"), None).is_empty());
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "name": "doc",
            "frames": [{
                "id": "ed_json_f", "width": 200, "height": 100,
                "elements": [
                    {"id": "ed_json_a", "type": "shape", "shape": "ellipse",
                     "props": {"x": 1, "y": 2, "width": 3, "height": 4}}
                ]
            }]
        }"#;
        let editor = Editor::from_json(json, EditorConfig::default()).unwrap();
        let frame = &editor.document().frames[0];
        assert_eq!(frame.elements[0].rect(), Rect::new(1.0, 2.0, 3.0, 4.0));
        assert!(Editor::from_json("[", EditorConfig::default()).is_err());
    }
}
