//! Containment index over a frame's flat element list.
//!
//! Elements reference their owning group through `parent_id`. The index
//! turns those back references into a directed graph (frame → top-level
//! elements, group → children) so callers can walk children in order and
//! visit nested groups bottom-up. It is rebuilt whenever the structure
//! changes; building it is linear in the element count.

use crate::geometry::Rect;
use crate::id::NodeId;
use crate::model::{ContainerLayout, Document, Frame, MAX_GRID_TRACKS};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::DfsPostOrder;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

pub struct ContainmentIndex {
    root: NodeId,
    graph: DiGraphMap<NodeId, ()>,
    children: HashMap<Option<NodeId>, SmallVec<[NodeId; 8]>>,
    groups: HashSet<NodeId>,
}

impl ContainmentIndex {
    pub fn build(frame: &Frame) -> Self {
        let mut graph = DiGraphMap::new();
        let mut children: HashMap<Option<NodeId>, SmallVec<[NodeId; 8]>> = HashMap::new();
        let mut groups = HashSet::new();

        graph.add_node(frame.id);
        for el in &frame.elements {
            graph.add_node(el.id);
            if el.is_group() {
                groups.insert(el.id);
            }
        }
        for el in &frame.elements {
            graph.add_edge(el.parent_id.unwrap_or(frame.id), el.id, ());
            children.entry(el.parent_id).or_default().push(el.id);
        }

        Self {
            root: frame.id,
            graph,
            children,
            groups,
        }
    }

    /// Direct children of `parent` (`None` = the frame) in list order.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        self.children.get(&parent).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn is_group(&self, id: NodeId) -> bool {
        self.groups.contains(&id)
    }

    /// Group descendants of `container` (`None` = the frame), children
    /// before their parents. `container` itself is excluded.
    pub fn groups_post_order(&self, container: Option<NodeId>) -> Vec<NodeId> {
        let start = container.unwrap_or(self.root);
        if !self.graph.contains_node(start) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut dfs = DfsPostOrder::new(&self.graph, start);
        while let Some(id) = dfs.next(&self.graph) {
            if id != start && self.groups.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

// ─── Sanitizing ──────────────────────────────────────────────────────────

/// Repair a loaded document so every layout invariant holds: finite
/// geometry, unique element ids, parents that exist and are groups, no
/// containment cycles, and a selection scoped to an existing frame.
pub fn sanitize_document(doc: &mut Document) {
    for frame in &mut doc.frames {
        sanitize_frame(frame);
    }

    let frame = doc
        .selection
        .frame_id
        .and_then(|id| doc.frames.iter().find(|f| f.id == id));
    match frame {
        Some(frame) => {
            let known: HashSet<NodeId> = frame.elements.iter().map(|e| e.id).collect();
            doc.selection.retain(|id| known.contains(&id));
        }
        None => {
            doc.selection.frame_id = None;
            doc.selection.element_ids.clear();
        }
    }
}

pub fn sanitize_frame(frame: &mut Frame) {
    let frame_id = frame.id;
    let full = Rect::new(0.0, 0.0, frame.width, frame.height).sanitized();
    frame.width = full.width;
    frame.height = full.height;
    sanitize_container(&mut frame.auto_layout);

    // The frame's own id names the root and cannot be reused by an element.
    let mut seen = HashSet::from([frame_id]);
    frame.elements.retain(|el| {
        let fresh = seen.insert(el.id);
        if !fresh {
            log::warn!("frame {frame_id}: dropping duplicate element {}", el.id);
        }
        fresh
    });

    let groups: HashSet<NodeId> = frame
        .elements
        .iter()
        .filter(|e| e.is_group())
        .map(|e| e.id)
        .collect();

    for el in &mut frame.elements {
        el.props.set_rect(el.rect().sanitized());
        el.layout.grid_column_span = el.layout.grid_column_span.clamp(1, MAX_GRID_TRACKS);
        el.layout.grid_row_span = el.layout.grid_row_span.clamp(1, MAX_GRID_TRACKS);
        if let Some(container) = el.container_mut() {
            sanitize_container(container);
        }
        if let Some(parent) = el.parent_id
            && (parent == el.id || !groups.contains(&parent))
        {
            log::warn!("frame {frame_id}: element {} has invalid parent {parent}", el.id);
            el.parent_id = None;
        }
    }

    break_cycles(frame);
}

fn sanitize_container(layout: &mut ContainerLayout) {
    layout.padding = layout.padding.normalized();
    layout.grid_columns = layout.grid_columns.clamp(1, MAX_GRID_TRACKS);
}

/// Detach elements until the parent relation is a forest.
fn break_cycles(frame: &mut Frame) {
    let frame_id = frame.id;
    for _ in 0..frame.elements.len() {
        let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();
        for el in &frame.elements {
            graph.add_node(el.id);
            if let Some(parent) = el.parent_id {
                graph.add_edge(parent, el.id, ());
            }
        }
        if !is_cyclic_directed(&graph) {
            return;
        }
        for scc in tarjan_scc(&graph) {
            if scc.len() > 1
                && let Some(&victim) = scc.iter().min()
                && let Some(el) = frame.element_mut(victim)
            {
                log::warn!("frame {frame_id}: breaking containment cycle at {victim}");
                el.parent_id = None;
            }
        }
    }
}
