//! Reflow coordinator.
//!
//! Keeps auto-layout containers consistent after a mutation. A container
//! (the frame, or a group element) is *settled* by repeatedly:
//!
//! 1. solving every nested group bottom-up, then refitting each group's
//!    bounding box to its children,
//! 2. solving the container itself,
//!
//! until a pass leaves every rectangle where it was. When a group's own
//! size changes, the change propagates to its parent container.
//!
//! A group sizes itself from its children on every axis its parent does
//! not dictate (stretch, grow or a grid cell). Coordinates are
//! frame-relative throughout, so a group that moves takes its descendants
//! with it.

use ab_core::flex::{
    Direction, FlexContainer, FlexItem, content_cross_extent, content_main_extent, solve_flex,
};
use ab_core::grid::{GridContainer, GridItem, solve_grid};
use ab_core::model::{CrossAlign, Element, Frame, LayoutMode};
use ab_core::tree::ContainmentIndex;
use ab_core::{LayoutConfig, NodeId, Rect, bounding_box};

/// Reflow the frame's own children and every nested group.
/// Returns whether any rectangle changed.
pub fn reflow_frame(frame: &mut Frame, config: &LayoutConfig) -> bool {
    let changed = settle(frame, None, config);
    log::debug!("reflow frame {}: changed={changed}", frame.id);
    changed
}

/// Reflow a group and, if its size changed, its ancestors.
/// Returns whether any rectangle changed.
pub fn reflow_group(frame: &mut Frame, group_id: NodeId, config: &LayoutConfig) -> bool {
    let Some(before) = frame.container_rect(Some(group_id)) else {
        log::warn!("reflow: {group_id} is not a group of frame {}", frame.id);
        return false;
    };

    let mut changed = settle(frame, Some(group_id), config);
    log::debug!("reflow group {group_id}: changed={changed}");

    let Some((after, parent)) = frame.element(group_id).map(|g| (g.rect(), g.parent_id)) else {
        return changed;
    };
    let resized = (after.width - before.width).abs() > config.epsilon
        || (after.height - before.height).abs() > config.epsilon;
    if resized {
        changed |= match parent {
            Some(parent) => reflow_group(frame, parent, config),
            None => reflow_frame(frame, config),
        };
    }
    changed
}

/// Solve `container`'s direct children without writing anything back.
/// Empty for absolute containers and unknown ids.
pub fn preview_container(
    frame: &Frame,
    container: Option<NodeId>,
    config: &LayoutConfig,
) -> Vec<(NodeId, Rect)> {
    let index = ContainmentIndex::build(frame);
    solve_container(frame, &index, container, config)
}

/// Move every descendant of `id` by `(dx, dy)`.
pub fn translate_subtree(frame: &mut Frame, id: NodeId, dx: f32, dy: f32) {
    if dx == 0.0 && dy == 0.0 {
        return;
    }
    for d in frame.descendants(id) {
        if let Some(el) = frame.element_mut(d) {
            el.props.x += dx;
            el.props.y += dy;
        }
    }
}

// ─── Settling ────────────────────────────────────────────────────────────

fn settle(frame: &mut Frame, container: Option<NodeId>, config: &LayoutConfig) -> bool {
    let index = ContainmentIndex::build(frame);
    let groups = index.groups_post_order(container);
    let initial = rects(frame);
    let passes = config.settle_passes.max(1);

    let mut converged = false;
    for pass in 0..passes {
        let before = rects(frame);
        for &gid in &groups {
            layout_container(frame, &index, Some(gid), config);
            refit_group(frame, &index, gid, config);
        }
        layout_container(frame, &index, container, config);
        if let Some(gid) = container {
            refit_group(frame, &index, gid, config);
        }
        if same_rects(&before, &rects(frame), config.epsilon) {
            log::trace!("settled after {} pass(es)", pass + 1);
            converged = true;
            break;
        }
    }
    if !converged {
        log::warn!(
            "frame {}: layout did not settle within {passes} passes",
            frame.id
        );
    }

    !same_rects(&initial, &rects(frame), config.epsilon)
}

fn rects(frame: &Frame) -> Vec<Rect> {
    frame.elements.iter().map(Element::rect).collect()
}

fn same_rects(a: &[Rect], b: &[Rect], epsilon: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y, epsilon))
}

fn layout_container(
    frame: &mut Frame,
    index: &ContainmentIndex,
    container: Option<NodeId>,
    config: &LayoutConfig,
) -> bool {
    let updates = solve_container(frame, index, container, config);
    write_back(frame, index, &updates, config.epsilon)
}

fn solve_container(
    frame: &Frame,
    index: &ContainmentIndex,
    container: Option<NodeId>,
    config: &LayoutConfig,
) -> Vec<(NodeId, Rect)> {
    let (Some(layout), Some(rect)) = (frame.container(container), frame.container_rect(container))
    else {
        return Vec::new();
    };
    let children: Vec<&Element> = index
        .children(container)
        .iter()
        .filter_map(|id| frame.element(*id))
        .collect();
    if children.is_empty() {
        return Vec::new();
    }

    let rects = match layout.mode {
        LayoutMode::Absolute => return Vec::new(),
        LayoutMode::FlexRow | LayoutMode::FlexColumn => {
            let Some(mut flex) = FlexContainer::from_layout(layout, rect) else {
                return Vec::new();
            };
            let mut items: Vec<FlexItem> =
                children.iter().map(|el| FlexItem::from_element(el)).collect();
            if let Some(group) = container.and_then(|gid| frame.element(gid)) {
                hug_content(&mut flex, &mut items, controlled_axes(frame, group), config);
            }
            solve_flex(&flex, &items, config).rects
        }
        LayoutMode::Grid => {
            let Some(grid) = GridContainer::from_layout(layout, rect) else {
                return Vec::new();
            };
            let items: Vec<GridItem> = children.iter().map(|el| GridItem::from_element(el)).collect();
            solve_grid(&grid, &items, config).rects
        }
    };

    children.iter().map(|el| el.id).zip(rects).collect()
}

/// Size a group's flex box to its content on every axis its parent does
/// not control. A hugged cross axis has no extent to stretch into, so
/// stretched children keep their own cross size there.
fn hug_content(
    flex: &mut FlexContainer,
    items: &mut [FlexItem],
    controlled: Controlled,
    config: &LayoutConfig,
) {
    let (hug_main, hug_cross) = match flex.direction {
        Direction::Row => (!controlled.x, !controlled.y),
        Direction::Column => (!controlled.y, !controlled.x),
    };
    if hug_main {
        let extent = content_main_extent(flex, items, config);
        match flex.direction {
            Direction::Row => flex.rect.width = extent,
            Direction::Column => flex.rect.height = extent,
        }
    }
    if hug_cross {
        for item in items.iter_mut() {
            if item.align_self.unwrap_or(flex.align) == CrossAlign::Stretch {
                item.align_self = Some(CrossAlign::Start);
            }
        }
        let extent = content_cross_extent(flex, items, config);
        match flex.direction {
            Direction::Row => flex.rect.height = extent,
            Direction::Column => flex.rect.width = extent,
        }
    }
}

/// Apply solved rectangles. Groups that move carry their descendants.
fn write_back(
    frame: &mut Frame,
    index: &ContainmentIndex,
    updates: &[(NodeId, Rect)],
    epsilon: f32,
) -> bool {
    let mut changed = false;
    for &(id, rect) in updates {
        let Some(old) = frame.element(id).map(Element::rect) else {
            continue;
        };
        if old.approx_eq(&rect, epsilon) {
            continue;
        }
        if index.is_group(id) {
            translate_subtree(frame, id, rect.x - old.x, rect.y - old.y);
        }
        if let Some(el) = frame.element_mut(id) {
            log::trace!("{id}: {old:?} -> {rect:?}");
            el.props.set_rect(rect);
            changed = true;
        }
    }
    changed
}

// ─── Group bounding box ──────────────────────────────────────────────────

/// Axes on which a child's size is dictated by its parent container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Controlled {
    x: bool,
    y: bool,
}

fn controlled_axes(frame: &Frame, el: &Element) -> Controlled {
    let Some(parent) = frame.container(el.parent_id) else {
        return Controlled::default();
    };
    let stretched = el.layout.align_self.unwrap_or(parent.align) == CrossAlign::Stretch;
    let grows = el.layout.grow > 0.0;
    match parent.mode {
        LayoutMode::Absolute => Controlled::default(),
        LayoutMode::Grid => Controlled { x: true, y: true },
        LayoutMode::FlexRow => Controlled {
            x: grows,
            y: stretched,
        },
        LayoutMode::FlexColumn => Controlled {
            x: stretched,
            y: grows,
        },
    }
}

/// Fit a group around its children on every axis its parent does not
/// control. Auto-layout groups keep their padding around the content.
fn refit_group(
    frame: &mut Frame,
    index: &ContainmentIndex,
    group_id: NodeId,
    config: &LayoutConfig,
) -> bool {
    let Some(group) = frame.element(group_id) else {
        return false;
    };
    let Some(layout) = group.container() else {
        return false;
    };
    let children = index
        .children(Some(group_id))
        .iter()
        .filter_map(|id| frame.element(*id))
        .map(Element::rect);
    let Some(content) = bounding_box(children) else {
        return false;
    };

    let target = if layout.is_auto() {
        content.outset(&layout.padding.normalized())
    } else {
        content
    };
    let controlled = controlled_axes(frame, group);
    let old = group.rect();
    let mut next = old;
    if !controlled.x {
        next.x = target.x;
        next.width = target.width;
    }
    if !controlled.y {
        next.y = target.y;
        next.height = target.height;
    }
    if next.approx_eq(&old, config.epsilon) {
        return false;
    }

    if let Some(group) = frame.element_mut(group_id) {
        log::trace!("refit {group_id}: {old:?} -> {next:?}");
        group.props.set_rect(next);
    }
    true
}
