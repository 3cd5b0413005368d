//! Document store: a pure reducer over a closed set of mutations.
//!
//! `apply` takes the current document by value and returns the next one
//! together with a flag telling whether anything changed. Every mutation
//! that can invalidate auto-layout geometry (resizing, adding, removing,
//! duplicating or reordering a child, changing container parameters)
//! reflows the affected container before returning.
//!
//! Referenced ids may be stale, e.g. after an undo removed them. Unknown
//! frames and elements make a mutation a logged no-op.

use crate::reflow;
use ab_core::model::*;
use ab_core::tree::{self, ContainmentIndex};
use ab_core::{LayoutConfig, NodeId, bounding_box};
use std::collections::HashMap;

/// How `Mutation::Select` combines ids with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    #[default]
    Replace,
    Add,
    Toggle,
}

/// Every state change the editor supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a frame at `index` (appended when `None`).
    AddFrame { frame: Frame, index: Option<usize> },
    RemoveFrame { frame_id: NodeId },
    /// Copy a frame with fresh ids for it and all its elements.
    DuplicateFrame { frame_id: NodeId },
    ReorderFrame { frame_id: NodeId, target_index: usize },
    UpdateFrame { frame_id: NodeId, patch: FramePatch },
    AddElement {
        frame_id: NodeId,
        element: Element,
        parent_id: Option<NodeId>,
    },
    UpdateElementProps {
        frame_id: NodeId,
        element_id: NodeId,
        patch: PropsPatch,
    },
    /// Remove an element; removing a group removes its descendants.
    RemoveElement { frame_id: NodeId, element_id: NodeId },
    /// Deep-copy an element next to the original. `offset` is applied when
    /// the parent container is absolute.
    DuplicateElement {
        frame_id: NodeId,
        element_id: NodeId,
        offset: f32,
    },
    /// Move an element to `target_index` among its siblings.
    ReorderElement {
        frame_id: NodeId,
        element_id: NodeId,
        target_index: usize,
    },
    SetFrameLayout {
        frame_id: NodeId,
        patch: ContainerLayoutPatch,
    },
    SetGroupLayout {
        frame_id: NodeId,
        group_id: NodeId,
        patch: ContainerLayoutPatch,
    },
    SetElementLayout {
        frame_id: NodeId,
        element_id: NodeId,
        patch: ItemLayoutPatch,
    },
    /// Wrap siblings in a new absolute group.
    GroupElements {
        frame_id: NodeId,
        element_ids: Vec<NodeId>,
        group_id: NodeId,
    },
    /// Dissolve a group, handing its children to the group's parent.
    UngroupElement { frame_id: NodeId, group_id: NodeId },
    SetActiveFrame { frame_id: Option<NodeId> },
    Select {
        element_ids: Vec<NodeId>,
        mode: SelectMode,
    },
    ClearSelection,
    ReflowFrame { frame_id: NodeId },
    ReflowGroup { frame_id: NodeId, group_id: NodeId },
}

impl Mutation {
    /// Human-readable history label.
    pub fn label(&self) -> String {
        match self {
            Mutation::AddFrame { .. } => "Add frame".into(),
            Mutation::RemoveFrame { .. } => "Remove frame".into(),
            Mutation::DuplicateFrame { .. } => "Duplicate frame".into(),
            Mutation::ReorderFrame { .. } => "Reorder frame".into(),
            Mutation::UpdateFrame { .. } => "Update frame".into(),
            Mutation::AddElement { element, .. } => format!("Add {}", element.kind.name()),
            Mutation::UpdateElementProps { .. } => "Update element".into(),
            Mutation::RemoveElement { .. } => "Remove element".into(),
            Mutation::DuplicateElement { .. } => "Duplicate element".into(),
            Mutation::ReorderElement { .. } => "Reorder element".into(),
            Mutation::SetFrameLayout { .. } => "Set frame layout".into(),
            Mutation::SetGroupLayout { .. } => "Set group layout".into(),
            Mutation::SetElementLayout { .. } => "Set element layout".into(),
            Mutation::GroupElements { .. } => "Group elements".into(),
            Mutation::UngroupElement { .. } => "Ungroup".into(),
            Mutation::SetActiveFrame { .. } => "Set active frame".into(),
            Mutation::Select { .. } => "Select".into(),
            Mutation::ClearSelection => "Clear selection".into(),
            Mutation::ReflowFrame { .. } => "Reflow frame".into(),
            Mutation::ReflowGroup { .. } => "Reflow group".into(),
        }
    }
}

/// Result of `apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub document: Document,
    /// Whether `document` differs from the input.
    pub changed: bool,
}

/// Apply `mutation` to `document`.
///
/// `changed` reports the net difference: a patch that reflow settles back
/// to the previous geometry is unchanged.
pub fn apply(mut document: Document, mutation: Mutation, config: &LayoutConfig) -> Transition {
    let original = document.clone();
    let touched = match mutation {
        Mutation::AddFrame { frame, index } => add_frame(&mut document, frame, index, config),
        Mutation::RemoveFrame { frame_id } => remove_frame(&mut document, frame_id),
        Mutation::DuplicateFrame { frame_id } => duplicate_frame(&mut document, frame_id),
        Mutation::ReorderFrame {
            frame_id,
            target_index,
        } => reorder_frame(&mut document, frame_id, target_index),
        Mutation::UpdateFrame { frame_id, patch } => {
            with_frame(&mut document, frame_id, |frame| {
                let (w, h) = (frame.width, frame.height);
                if !frame.apply(&patch) {
                    return false;
                }
                if frame.width != w || frame.height != h {
                    reflow::reflow_frame(frame, config);
                }
                true
            })
        }
        Mutation::AddElement {
            frame_id,
            element,
            parent_id,
        } => with_frame(&mut document, frame_id, |frame| {
            add_element(frame, element, parent_id, config)
        }),
        Mutation::UpdateElementProps {
            frame_id,
            element_id,
            patch,
        } => with_frame(&mut document, frame_id, |frame| {
            update_props(frame, element_id, &patch, config)
        }),
        Mutation::RemoveElement {
            frame_id,
            element_id,
        } => remove_element(&mut document, frame_id, element_id, config),
        Mutation::DuplicateElement {
            frame_id,
            element_id,
            offset,
        } => duplicate_element(&mut document, frame_id, element_id, offset, config),
        Mutation::ReorderElement {
            frame_id,
            element_id,
            target_index,
        } => with_frame(&mut document, frame_id, |frame| {
            reorder_element(frame, element_id, target_index, config)
        }),
        Mutation::SetFrameLayout { frame_id, patch } => {
            with_frame(&mut document, frame_id, |frame| {
                if !frame.auto_layout.apply(&patch) {
                    return false;
                }
                reflow::reflow_frame(frame, config);
                true
            })
        }
        Mutation::SetGroupLayout {
            frame_id,
            group_id,
            patch,
        } => with_frame(&mut document, frame_id, |frame| {
            let Some(layout) = frame.element_mut(group_id).and_then(Element::container_mut) else {
                log::warn!("set group layout: {group_id} is not a group");
                return false;
            };
            if !layout.apply(&patch) {
                return false;
            }
            reflow::reflow_group(frame, group_id, config);
            true
        }),
        Mutation::SetElementLayout {
            frame_id,
            element_id,
            patch,
        } => with_frame(&mut document, frame_id, |frame| {
            let Some(el) = frame.element_mut(element_id) else {
                log::warn!("set element layout: unknown element {element_id}");
                return false;
            };
            if !el.layout.apply(&patch) {
                return false;
            }
            let parent = el.parent_id;
            reflow_container(frame, parent, config);
            true
        }),
        Mutation::GroupElements {
            frame_id,
            element_ids,
            group_id,
        } => group_elements(&mut document, frame_id, &element_ids, group_id, config),
        Mutation::UngroupElement { frame_id, group_id } => {
            ungroup_element(&mut document, frame_id, group_id, config)
        }
        Mutation::SetActiveFrame { frame_id } => set_active_frame(&mut document, frame_id),
        Mutation::Select { element_ids, mode } => select(&mut document, &element_ids, mode),
        Mutation::ClearSelection => {
            let changed = !document.selection.is_empty();
            document.selection.element_ids.clear();
            changed
        }
        Mutation::ReflowFrame { frame_id } => with_frame(&mut document, frame_id, |frame| {
            reflow::reflow_frame(frame, config)
        }),
        Mutation::ReflowGroup { frame_id, group_id } => {
            with_frame(&mut document, frame_id, |frame| {
                reflow::reflow_group(frame, group_id, config)
            })
        }
    };

    let changed = touched && document != original;
    Transition { document, changed }
}

fn with_frame(doc: &mut Document, frame_id: NodeId, f: impl FnOnce(&mut Frame) -> bool) -> bool {
    match doc.frame_mut(frame_id) {
        Some(frame) => f(frame),
        None => {
            log::warn!("unknown frame {frame_id}");
            false
        }
    }
}

/// Reflow whatever owns children of `parent` (`None` = the frame).
/// Groups are refit even in absolute mode; an absolute frame has nothing
/// to solve.
fn reflow_container(frame: &mut Frame, parent: Option<NodeId>, config: &LayoutConfig) {
    match parent {
        Some(group) => {
            reflow::reflow_group(frame, group, config);
        }
        None if frame.auto_layout.is_auto() => {
            reflow::reflow_frame(frame, config);
        }
        None => {}
    }
}

/// Fresh ids for `ids`, keyed by the original.
fn fresh_ids(frame: &Frame, ids: &[NodeId]) -> HashMap<NodeId, NodeId> {
    ids.iter()
        .filter_map(|&id| frame.element(id))
        .map(|el| (el.id, NodeId::with_prefix(el.kind.name())))
        .collect()
}

// ─── Frames ──────────────────────────────────────────────────────────────

fn add_frame(
    doc: &mut Document,
    mut frame: Frame,
    index: Option<usize>,
    config: &LayoutConfig,
) -> bool {
    if doc.frame(frame.id).is_some() {
        let fresh = NodeId::with_prefix("frame");
        log::warn!("add frame: id {} taken, using {fresh}", frame.id);
        frame.id = fresh;
    }
    tree::sanitize_frame(&mut frame);
    reflow::reflow_frame(&mut frame, config);

    let at = index.unwrap_or(doc.frames.len()).min(doc.frames.len());
    doc.frames.insert(at, frame);
    true
}

fn remove_frame(doc: &mut Document, frame_id: NodeId) -> bool {
    let Some(pos) = doc.frame_position(frame_id) else {
        log::warn!("remove frame: unknown frame {frame_id}");
        return false;
    };
    doc.frames.remove(pos);
    if doc.selection.frame_id == Some(frame_id) {
        doc.selection.set_frame(None);
    }
    true
}

fn duplicate_frame(doc: &mut Document, frame_id: NodeId) -> bool {
    let Some(pos) = doc.frame_position(frame_id) else {
        log::warn!("duplicate frame: unknown frame {frame_id}");
        return false;
    };
    let source = &doc.frames[pos];
    let all: Vec<NodeId> = source.elements.iter().map(|e| e.id).collect();
    let ids = fresh_ids(source, &all);

    let mut copy = source.clone();
    copy.id = NodeId::with_prefix("frame");
    copy.name = format!("{} copy", source.name);
    for el in &mut copy.elements {
        if let Some(&id) = ids.get(&el.id) {
            el.id = id;
        }
        el.parent_id = el.parent_id.and_then(|p| ids.get(&p).copied());
    }
    doc.frames.insert(pos + 1, copy);
    true
}

fn reorder_frame(doc: &mut Document, frame_id: NodeId, target_index: usize) -> bool {
    let Some(pos) = doc.frame_position(frame_id) else {
        log::warn!("reorder frame: unknown frame {frame_id}");
        return false;
    };
    let target = target_index.min(doc.frames.len() - 1);
    if target == pos {
        return false;
    }
    let frame = doc.frames.remove(pos);
    doc.frames.insert(target, frame);
    true
}

// ─── Elements ────────────────────────────────────────────────────────────

fn add_element(
    frame: &mut Frame,
    mut element: Element,
    parent_id: Option<NodeId>,
    config: &LayoutConfig,
) -> bool {
    if element.id == frame.id || frame.element(element.id).is_some() {
        let fresh = NodeId::with_prefix(element.kind.name());
        log::warn!("add element: id {} taken, using {fresh}", element.id);
        element.id = fresh;
    }
    element.parent_id = match parent_id {
        Some(p) if frame.element(p).is_some_and(Element::is_group) => Some(p),
        Some(p) => {
            log::warn!("add element: parent {p} is not a group, adding to frame");
            None
        }
        None => None,
    };
    element.props.set_rect(element.rect().sanitized());
    if let Some(layout) = element.container_mut() {
        layout.padding = layout.padding.normalized();
    }

    let parent = element.parent_id;
    frame.elements.push(element);
    reflow_container(frame, parent, config);
    true
}

fn update_props(
    frame: &mut Frame,
    element_id: NodeId,
    patch: &PropsPatch,
    config: &LayoutConfig,
) -> bool {
    let Some(el) = frame.element_mut(element_id) else {
        log::warn!("update props: unknown element {element_id}");
        return false;
    };
    let before = el.rect();
    if !el.apply_props(patch) {
        return false;
    }
    let after = el.rect();
    let parent = el.parent_id;
    let is_group = el.is_group();

    let moved = after.x != before.x || after.y != before.y;
    let resized = after.width != before.width || after.height != before.height;

    if is_group && moved {
        reflow::translate_subtree(frame, element_id, after.x - before.x, after.y - before.y);
    }
    if is_group && resized {
        // Settles the group's children, then the ancestors if it resized.
        reflow::reflow_group(frame, element_id, config);
    }
    if resized || (moved && parent.is_some()) {
        reflow_container(frame, parent, config);
    }
    true
}

fn remove_element(
    doc: &mut Document,
    frame_id: NodeId,
    element_id: NodeId,
    config: &LayoutConfig,
) -> bool {
    let Some(frame) = doc.frame_mut(frame_id) else {
        log::warn!("remove element: unknown frame {frame_id}");
        return false;
    };
    let Some(parent) = frame.element(element_id).map(|e| e.parent_id) else {
        log::warn!("remove element: unknown element {element_id}");
        return false;
    };

    let mut doomed = frame.descendants(element_id);
    doomed.push(element_id);
    frame.elements.retain(|e| !doomed.contains(&e.id));
    reflow_container(frame, parent, config);

    if doc.selection.frame_id == Some(frame_id) {
        doc.selection.retain(|id| !doomed.contains(&id));
    }
    true
}

fn duplicate_element(
    doc: &mut Document,
    frame_id: NodeId,
    element_id: NodeId,
    offset: f32,
    config: &LayoutConfig,
) -> bool {
    let Some(frame) = doc.frame_mut(frame_id) else {
        log::warn!("duplicate element: unknown frame {frame_id}");
        return false;
    };
    let Some(pos) = frame.position(element_id) else {
        log::warn!("duplicate element: unknown element {element_id}");
        return false;
    };

    let mut subtree = vec![element_id];
    subtree.extend(frame.descendants(element_id));
    let ids = fresh_ids(frame, &subtree);

    let parent = frame.elements[pos].parent_id;
    let absolute = frame.container(parent).is_none_or(|c| !c.is_auto());
    let (dx, dy) = if absolute && offset.is_finite() {
        (offset, offset)
    } else {
        (0.0, 0.0)
    };

    let copies: Vec<Element> = subtree
        .iter()
        .filter_map(|&id| frame.element(id))
        .map(|el| {
            let mut copy = el.clone();
            copy.id = ids.get(&el.id).copied().unwrap_or(el.id);
            if el.id != element_id {
                copy.parent_id = el.parent_id.and_then(|p| ids.get(&p).copied());
            }
            copy.props.x += dx;
            copy.props.y += dy;
            copy
        })
        .collect();
    let root_copy = copies[0].id;
    frame.elements.splice(pos + 1..pos + 1, copies);
    reflow_container(frame, parent, config);

    doc.selection.set_frame(Some(frame_id));
    doc.selection.replace([root_copy]);
    true
}

fn reorder_element(
    frame: &mut Frame,
    element_id: NodeId,
    target_index: usize,
    config: &LayoutConfig,
) -> bool {
    let Some(parent) = frame.element(element_id).map(|e| e.parent_id) else {
        log::warn!("reorder element: unknown element {element_id}");
        return false;
    };
    let siblings = frame.children_of(parent);
    let Some(current) = siblings.iter().position(|&id| id == element_id) else {
        return false;
    };
    let target = target_index.min(siblings.len() - 1);
    if target == current {
        return false;
    }

    let Some(pos) = frame.position(element_id) else {
        return false;
    };
    let element = frame.elements.remove(pos);
    let others: Vec<NodeId> = siblings.into_iter().filter(|&id| id != element_id).collect();
    let insert_at = match others.get(target) {
        Some(&before) => frame.position(before),
        None => others
            .last()
            .and_then(|&last| frame.position(last))
            .map(|p| p + 1),
    }
    .unwrap_or(frame.elements.len());
    frame.elements.insert(insert_at, element);

    reflow_container(frame, parent, config);
    true
}

// ─── Grouping ────────────────────────────────────────────────────────────

fn group_elements(
    doc: &mut Document,
    frame_id: NodeId,
    element_ids: &[NodeId],
    group_id: NodeId,
    config: &LayoutConfig,
) -> bool {
    let Some(frame) = doc.frame_mut(frame_id) else {
        log::warn!("group: unknown frame {frame_id}");
        return false;
    };
    let Some(parent) = element_ids
        .iter()
        .find_map(|&id| frame.element(id))
        .map(|e| e.parent_id)
    else {
        log::warn!("group: no known elements to group");
        return false;
    };

    let mut members: Vec<NodeId> = Vec::new();
    for &id in element_ids {
        match frame.element(id) {
            Some(el) if el.parent_id == parent && !members.contains(&id) => members.push(id),
            Some(_) => log::warn!("group: {id} has a different parent, skipping"),
            None => log::warn!("group: unknown element {id}"),
        }
    }
    let Some(bounds) = bounding_box(
        members
            .iter()
            .filter_map(|&id| frame.element(id))
            .map(Element::rect),
    ) else {
        return false;
    };

    let group_id = if frame.element(group_id).is_some() || group_id == frame.id {
        NodeId::with_prefix("group")
    } else {
        group_id
    };
    let at = members
        .iter()
        .filter_map(|&id| frame.position(id))
        .min()
        .unwrap_or(frame.elements.len());
    let mut group = Element::group(group_id, bounds, ContainerLayout::default());
    group.parent_id = parent;
    // Take over the layout slot of the first member.
    if let Some(first) = frame.element(members[0]) {
        group.layout = first.layout.clone();
    }
    frame.elements.insert(at, group);
    for &id in &members {
        if let Some(el) = frame.element_mut(id) {
            el.parent_id = Some(group_id);
        }
    }
    reflow_container(frame, parent, config);

    doc.selection.set_frame(Some(frame_id));
    doc.selection.replace([group_id]);
    true
}

fn ungroup_element(
    doc: &mut Document,
    frame_id: NodeId,
    group_id: NodeId,
    config: &LayoutConfig,
) -> bool {
    let Some(frame) = doc.frame_mut(frame_id) else {
        log::warn!("ungroup: unknown frame {frame_id}");
        return false;
    };
    let Some(pos) = frame.position(group_id).filter(|&p| frame.elements[p].is_group()) else {
        log::warn!("ungroup: {group_id} is not a group");
        return false;
    };

    let group = frame.elements.remove(pos);
    let index = ContainmentIndex::build(frame);
    let children: Vec<NodeId> = index.children(Some(group_id)).to_vec();
    let mut moved: Vec<Element> = Vec::with_capacity(children.len());
    frame.elements.retain(|el| {
        if children.contains(&el.id) {
            let mut el = el.clone();
            el.parent_id = group.parent_id;
            moved.push(el);
            false
        } else {
            true
        }
    });
    let at = pos.min(frame.elements.len());
    frame.elements.splice(at..at, moved);
    reflow_container(frame, group.parent_id, config);

    if doc.selection.frame_id == Some(frame_id) && doc.selection.contains(group_id) {
        doc.selection.retain(|id| id != group_id);
        doc.selection.add(children);
    }
    true
}

// ─── Selection ───────────────────────────────────────────────────────────

fn set_active_frame(doc: &mut Document, frame_id: Option<NodeId>) -> bool {
    if let Some(id) = frame_id
        && doc.frame(id).is_none()
    {
        log::warn!("set active frame: unknown frame {id}");
        return false;
    }
    let before = doc.selection.clone();
    doc.selection.set_frame(frame_id);
    doc.selection != before
}

fn select(doc: &mut Document, element_ids: &[NodeId], mode: SelectMode) -> bool {
    let Some(frame) = doc.selection.frame_id.and_then(|id| doc.frame(id)) else {
        log::warn!("select: no active frame");
        return false;
    };
    let known: Vec<NodeId> = element_ids
        .iter()
        .copied()
        .filter(|&id| {
            let found = frame.element(id).is_some();
            if !found {
                log::warn!("select: unknown element {id}");
            }
            found
        })
        .collect();

    let before = doc.selection.clone();
    match mode {
        SelectMode::Replace => doc.selection.replace(known),
        SelectMode::Add => doc.selection.add(known),
        SelectMode::Toggle => {
            for id in known {
                doc.selection.toggle(id);
            }
        }
    }
    doc.selection != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::Rect;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    fn doc_with_frame(frame_id: &str, layout: ContainerLayout) -> Document {
        let mut doc = Document::new("store");
        doc.frames
            .push(Frame::new(id(frame_id), "F", 400.0, 400.0).with_layout(layout));
        doc
    }

    fn run(doc: Document, m: Mutation) -> Transition {
        apply(doc, m, &LayoutConfig::default())
    }

    fn add(doc: Document, frame: &str, el: Element, parent: Option<&str>) -> Document {
        run(
            doc,
            Mutation::AddElement {
                frame_id: id(frame),
                element: el,
                parent_id: parent.map(id),
            },
        )
        .document
    }

    fn shape(s: &str, r: Rect) -> Element {
        Element::shape(id(s), ShapeKind::Rect, r)
    }

    fn rect_of(doc: &Document, frame: &str, el: &str) -> Rect {
        doc.frame(id(frame)).unwrap().element(id(el)).unwrap().rect()
    }

    #[test]
    fn adding_to_a_flex_frame_reflows() {
        let doc = doc_with_frame("st_flex", ContainerLayout::flex_row(10.0));
        let doc = add(doc, "st_flex", shape("st_flex_a", rect(50.0, 50.0, 100.0, 40.0)), None);
        let doc = add(doc, "st_flex", shape("st_flex_b", rect(0.0, 0.0, 100.0, 40.0)), None);
        assert_eq!(rect_of(&doc, "st_flex", "st_flex_a"), rect(0.0, 0.0, 100.0, 40.0));
        assert_eq!(rect_of(&doc, "st_flex", "st_flex_b"), rect(110.0, 0.0, 100.0, 40.0));
    }

    #[test]
    fn patch_settled_back_by_reflow_is_unchanged() {
        let doc = doc_with_frame("st_cell", ContainerLayout::grid(1, 0.0));
        let doc = add(doc, "st_cell", shape("st_cell_a", rect(0.0, 0.0, 10.0, 10.0)), None);
        assert_eq!(rect_of(&doc, "st_cell", "st_cell_a"), rect(0.0, 0.0, 400.0, 100.0));

        let t = run(
            doc.clone(),
            Mutation::UpdateElementProps {
                frame_id: id("st_cell"),
                element_id: id("st_cell_a"),
                patch: PropsPatch::size(30.0, 30.0),
            },
        );
        assert!(!t.changed);
        assert_eq!(t.document, doc);
    }

    #[test]
    fn element_cannot_take_the_frame_id() {
        let doc = doc_with_frame("st_self", ContainerLayout::default());
        let doc = add(doc, "st_self", shape("st_self", rect(0.0, 0.0, 10.0, 10.0)), None);
        let frame = doc.frame(id("st_self")).unwrap();
        assert_eq!(frame.elements.len(), 1);
        assert_ne!(frame.elements[0].id, frame.id);
        assert_eq!(
            ContainmentIndex::build(frame).children(None),
            &[frame.elements[0].id]
        );
    }

    #[test]
    fn unknown_ids_are_noops() {
        let doc = doc_with_frame("st_noop", ContainerLayout::default());
        let t = run(
            doc.clone(),
            Mutation::UpdateElementProps {
                frame_id: id("st_noop"),
                element_id: id("st_nobody"),
                patch: PropsPatch::size(1.0, 1.0),
            },
        );
        assert!(!t.changed);
        assert_eq!(t.document, doc);

        let t = run(doc.clone(), Mutation::ReflowFrame { frame_id: id("st_nowhere") });
        assert!(!t.changed);
    }

    #[test]
    fn invalid_parent_falls_back_to_frame() {
        let doc = doc_with_frame("st_parent", ContainerLayout::default());
        let doc = add(doc, "st_parent", shape("st_parent_leaf", rect(0.0, 0.0, 10.0, 10.0)), None);
        let doc = add(
            doc,
            "st_parent",
            shape("st_parent_child", rect(0.0, 0.0, 10.0, 10.0)),
            Some("st_parent_leaf"),
        );
        let frame = doc.frame(id("st_parent")).unwrap();
        assert_eq!(frame.element(id("st_parent_child")).unwrap().parent_id, None);
    }

    #[test]
    fn removing_a_group_cascades_and_prunes_selection() {
        let doc = doc_with_frame("st_rm", ContainerLayout::default());
        let doc = add(
            doc,
            "st_rm",
            Element::group(id("st_rm_g"), rect(0.0, 0.0, 10.0, 10.0), ContainerLayout::default()),
            None,
        );
        let doc = add(doc, "st_rm", shape("st_rm_leaf", rect(5.0, 5.0, 10.0, 10.0)), Some("st_rm_g"));
        let doc = add(doc, "st_rm", shape("st_rm_other", rect(0.0, 0.0, 10.0, 10.0)), None);
        let doc = run(doc, Mutation::SetActiveFrame { frame_id: Some(id("st_rm")) }).document;
        let doc = run(
            doc,
            Mutation::Select {
                element_ids: vec![id("st_rm_leaf"), id("st_rm_other")],
                mode: SelectMode::Replace,
            },
        )
        .document;

        let t = run(
            doc,
            Mutation::RemoveElement {
                frame_id: id("st_rm"),
                element_id: id("st_rm_g"),
            },
        );
        assert!(t.changed);
        let frame = t.document.frame(id("st_rm")).unwrap();
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(t.document.selection.element_ids.as_slice(), &[id("st_rm_other")]);
    }

    #[test]
    fn moving_a_group_moves_its_children() {
        let doc = doc_with_frame("st_move", ContainerLayout::default());
        let doc = add(
            doc,
            "st_move",
            Element::group(id("st_move_g"), rect(0.0, 0.0, 10.0, 10.0), ContainerLayout::default()),
            None,
        );
        let doc = add(
            doc,
            "st_move",
            shape("st_move_leaf", rect(10.0, 10.0, 20.0, 20.0)),
            Some("st_move_g"),
        );
        assert_eq!(rect_of(&doc, "st_move", "st_move_g"), rect(10.0, 10.0, 20.0, 20.0));

        let doc = run(
            doc,
            Mutation::UpdateElementProps {
                frame_id: id("st_move"),
                element_id: id("st_move_g"),
                patch: PropsPatch::position(100.0, 50.0),
            },
        )
        .document;
        assert_eq!(rect_of(&doc, "st_move", "st_move_g"), rect(100.0, 50.0, 20.0, 20.0));
        assert_eq!(rect_of(&doc, "st_move", "st_move_leaf"), rect(100.0, 50.0, 20.0, 20.0));
    }

    #[test]
    fn duplicate_offsets_in_absolute_frames_and_selects_copy() {
        let doc = doc_with_frame("st_dup", ContainerLayout::default());
        let doc = add(
            doc,
            "st_dup",
            Element::group(id("st_dup_g"), rect(0.0, 0.0, 10.0, 10.0), ContainerLayout::default()),
            None,
        );
        let doc = add(doc, "st_dup", shape("st_dup_leaf", rect(10.0, 10.0, 20.0, 20.0)), Some("st_dup_g"));
        let doc = add(doc, "st_dup", shape("st_dup_after", rect(0.0, 0.0, 5.0, 5.0)), None);

        let t = run(
            doc,
            Mutation::DuplicateElement {
                frame_id: id("st_dup"),
                element_id: id("st_dup_g"),
                offset: 20.0,
            },
        );
        assert!(t.changed);
        let frame = t.document.frame(id("st_dup")).unwrap();
        assert_eq!(frame.elements.len(), 5);

        let copy = t.document.selection.element_ids[0];
        assert_ne!(copy, id("st_dup_g"));
        assert_eq!(frame.children_of(None).as_slice(), &[id("st_dup_g"), copy, id("st_dup_after")]);
        assert_eq!(frame.element(copy).unwrap().rect(), rect(30.0, 30.0, 20.0, 20.0));

        let copied_children = frame.children_of(Some(copy));
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], id("st_dup_leaf"));
        assert_eq!(
            frame.element(copied_children[0]).unwrap().rect(),
            rect(30.0, 30.0, 20.0, 20.0)
        );
    }

    #[test]
    fn reorder_moves_among_siblings_and_reflows() {
        let doc = doc_with_frame("st_ro", ContainerLayout::flex_row(0.0));
        let doc = add(doc, "st_ro", shape("st_ro_a", rect(0.0, 0.0, 10.0, 10.0)), None);
        let doc = add(doc, "st_ro", shape("st_ro_b", rect(0.0, 0.0, 20.0, 10.0)), None);
        let doc = add(doc, "st_ro", shape("st_ro_c", rect(0.0, 0.0, 30.0, 10.0)), None);

        let t = run(
            doc,
            Mutation::ReorderElement {
                frame_id: id("st_ro"),
                element_id: id("st_ro_a"),
                target_index: 99,
            },
        );
        assert!(t.changed);
        let frame = t.document.frame(id("st_ro")).unwrap();
        assert_eq!(
            frame.children_of(None).as_slice(),
            &[id("st_ro_b"), id("st_ro_c"), id("st_ro_a")]
        );
        assert_eq!(frame.element(id("st_ro_a")).unwrap().rect().x, 50.0);

        let t = run(
            t.document,
            Mutation::ReorderElement {
                frame_id: id("st_ro"),
                element_id: id("st_ro_a"),
                target_index: 2,
            },
        );
        assert!(!t.changed);
    }

    #[test]
    fn group_then_ungroup_restores_parents() {
        let doc = doc_with_frame("st_grp", ContainerLayout::default());
        let doc = add(doc, "st_grp", shape("st_grp_a", rect(10.0, 10.0, 10.0, 10.0)), None);
        let doc = add(doc, "st_grp", shape("st_grp_b", rect(40.0, 30.0, 10.0, 10.0)), None);

        let t = run(
            doc,
            Mutation::GroupElements {
                frame_id: id("st_grp"),
                element_ids: vec![id("st_grp_a"), id("st_grp_b")],
                group_id: id("st_grp_g"),
            },
        );
        assert!(t.changed);
        assert_eq!(rect_of(&t.document, "st_grp", "st_grp_g"), rect(10.0, 10.0, 40.0, 30.0));
        assert_eq!(t.document.selection.element_ids.as_slice(), &[id("st_grp_g")]);

        let t = run(
            t.document,
            Mutation::UngroupElement {
                frame_id: id("st_grp"),
                group_id: id("st_grp_g"),
            },
        );
        let frame = t.document.frame(id("st_grp")).unwrap();
        assert_eq!(frame.children_of(None).as_slice(), &[id("st_grp_a"), id("st_grp_b")]);
        assert_eq!(
            t.document.selection.element_ids.as_slice(),
            &[id("st_grp_a"), id("st_grp_b")]
        );
    }

    #[test]
    fn duplicate_frame_remaps_parents() {
        let doc = doc_with_frame("st_df", ContainerLayout::default());
        let doc = add(
            doc,
            "st_df",
            Element::group(id("st_df_g"), rect(0.0, 0.0, 10.0, 10.0), ContainerLayout::default()),
            None,
        );
        let doc = add(doc, "st_df", shape("st_df_leaf", rect(0.0, 0.0, 10.0, 10.0)), Some("st_df_g"));

        let t = run(doc, Mutation::DuplicateFrame { frame_id: id("st_df") });
        assert_eq!(t.document.frames.len(), 2);
        let copy = &t.document.frames[1];
        assert_eq!(copy.name, "F copy");
        let group = copy.elements[0].id;
        assert_ne!(group, id("st_df_g"));
        assert_eq!(copy.elements[1].parent_id, Some(group));
    }

    #[test]
    fn selection_requires_active_frame_and_known_ids() {
        let doc = doc_with_frame("st_sel", ContainerLayout::default());
        let doc = add(doc, "st_sel", shape("st_sel_a", rect(0.0, 0.0, 10.0, 10.0)), None);

        let t = run(
            doc,
            Mutation::Select {
                element_ids: vec![id("st_sel_a")],
                mode: SelectMode::Replace,
            },
        );
        assert!(!t.changed);

        let doc = run(t.document, Mutation::SetActiveFrame { frame_id: Some(id("st_sel")) }).document;
        let t = run(
            doc,
            Mutation::Select {
                element_ids: vec![id("st_sel_a"), id("st_sel_ghost")],
                mode: SelectMode::Add,
            },
        );
        assert!(t.changed);
        assert_eq!(t.document.selection.element_ids.as_slice(), &[id("st_sel_a")]);

        let t = run(
            t.document,
            Mutation::Select {
                element_ids: vec![id("st_sel_a")],
                mode: SelectMode::Toggle,
            },
        );
        assert!(t.document.selection.is_empty());
    }
}
