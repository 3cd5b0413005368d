//! Flex-row / flex-column solver.
//!
//! Children are packed into lines (a single line unless wrapping), each
//! line resolves grow/shrink against the content box, then children are
//! positioned along the main axis by `justify` and along the cross axis by
//! their resolved alignment.

use crate::config::LayoutConfig;
use crate::geometry::{Padding, Rect, clamp, non_negative};
use crate::model::{ContainerLayout, CrossAlign, Element, LayoutMode, MainAlign, WrapMode};
use smallvec::SmallVec;

/// Main-axis direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Row,
    Column,
}

/// Container description consumed by `solve_flex`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexContainer {
    /// Outer rectangle, in frame coordinates.
    pub rect: Rect,
    pub padding: Padding,
    pub direction: Direction,
    pub gap: f32,
    /// Gap between lines when wrapping.
    pub line_gap: f32,
    pub justify: MainAlign,
    pub align: CrossAlign,
    pub wrap: WrapMode,
}

impl FlexContainer {
    /// Build from container layout fields; `None` unless the mode is flex.
    pub fn from_layout(layout: &ContainerLayout, rect: Rect) -> Option<Self> {
        let direction = match layout.mode {
            LayoutMode::FlexRow => Direction::Row,
            LayoutMode::FlexColumn => Direction::Column,
            _ => return None,
        };
        Some(Self {
            rect,
            padding: layout.padding.normalized(),
            direction,
            gap: layout.main_gap(),
            line_gap: layout.cross_gap(),
            justify: layout.justify,
            align: layout.align,
            wrap: layout.wrap,
        })
    }
}

/// A child as seen by the flex solver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlexItem {
    /// Current rectangle; supplies the fallback basis and natural cross size.
    pub rect: Rect,
    pub order: Option<i32>,
    pub basis: Option<f32>,
    pub grow: f32,
    pub shrink: f32,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_height: Option<f32>,
    pub align_self: Option<CrossAlign>,
}

impl FlexItem {
    pub fn from_element(el: &Element) -> Self {
        let l = &el.layout;
        Self {
            rect: el.rect(),
            order: l.order,
            basis: l.basis,
            grow: l.grow,
            shrink: l.shrink,
            min_width: l.min_width,
            max_width: l.max_width,
            min_height: l.min_height,
            max_height: l.max_height,
            align_self: l.align_self,
        }
    }
}

/// Output of `solve_flex`: one rectangle per input item, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexSolution {
    pub rects: Vec<Rect>,
    /// Number of lines the children were packed into.
    pub lines: usize,
    /// Whether any rectangle differs from the item's current one.
    pub changed: bool,
}

/// Item with every input coerced and projected onto main/cross axes.
#[derive(Debug, Clone, Copy)]
struct Prepared {
    index: usize,
    hypothetical: f32,
    min_main: Option<f32>,
    max_main: Option<f32>,
    natural_cross: f32,
    min_cross: Option<f32>,
    max_cross: Option<f32>,
    grow: f32,
    shrink: f32,
    align: CrossAlign,
}

/// Lay out `items` inside `container`.
pub fn solve_flex(
    container: &FlexContainer,
    items: &[FlexItem],
    config: &LayoutConfig,
) -> FlexSolution {
    if items.is_empty() {
        return FlexSolution {
            rects: Vec::new(),
            lines: 0,
            changed: false,
        };
    }

    let content = container.padding.inset(&container.rect.sanitized());
    let row = container.direction == Direction::Row;
    let (avail_main, avail_cross) = if row {
        (content.width, content.height)
    } else {
        (content.height, content.width)
    };
    let gap = non_negative(container.gap);
    let line_gap = non_negative(container.line_gap);

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].order.unwrap_or(0), i));

    let prepared: Vec<Prepared> = order
        .iter()
        .map(|&i| prepare(i, &items[i], container, config))
        .collect();

    let lines = break_lines(&prepared, container.wrap, avail_main, gap, config.epsilon);
    let single_line = container.wrap == WrapMode::NoWrap;

    let mut rects = vec![Rect::default(); items.len()];
    let mut cross_cursor = 0.0f32;

    for line in &lines {
        let members: SmallVec<[&Prepared; 8]> = line.iter().map(|&k| &prepared[k]).collect();
        let sizes = resolve_flexible(&members, avail_main, gap);

        let line_cross = if single_line {
            avail_cross
        } else {
            members
                .iter()
                .map(|p| clamp(p.natural_cross, p.min_cross, p.max_cross).max(0.0))
                .fold(0.0f32, f32::max)
        };
        let line_offset = if container.wrap == WrapMode::WrapReverse {
            avail_cross - cross_cursor - line_cross
        } else {
            cross_cursor
        };
        cross_cursor += line_cross + line_gap;

        let n = members.len();
        let used: f32 = sizes.iter().sum::<f32>() + gap * n.saturating_sub(1) as f32;
        let free = avail_main - used;
        let (start, between) = match container.justify {
            MainAlign::Start => (0.0, gap),
            MainAlign::Center => (free / 2.0, gap),
            MainAlign::End => (free, gap),
            MainAlign::SpaceBetween if n >= 2 => (0.0, gap + free.max(0.0) / (n - 1) as f32),
            MainAlign::SpaceBetween => (0.0, gap),
        };

        let mut main_cursor = start;
        for (p, &main_size) in members.iter().zip(&sizes) {
            let (cross_size, cross_offset) = match p.align {
                CrossAlign::Stretch => (clamp(line_cross, p.min_cross, p.max_cross).max(0.0), 0.0),
                align => {
                    let size = clamp(p.natural_cross, p.min_cross, p.max_cross).max(0.0);
                    let offset = match align {
                        CrossAlign::Center => (line_cross - size) / 2.0,
                        CrossAlign::End => line_cross - size,
                        _ => 0.0,
                    };
                    (size, offset)
                }
            };

            let rect = if row {
                Rect::new(
                    content.x + main_cursor,
                    content.y + line_offset + cross_offset,
                    main_size,
                    cross_size,
                )
            } else {
                Rect::new(
                    content.x + line_offset + cross_offset,
                    content.y + main_cursor,
                    cross_size,
                    main_size,
                )
            }
            .sanitized();

            log::trace!("flex item {} -> {:?}", p.index, rect);
            rects[p.index] = rect;
            main_cursor += main_size + between;
        }
    }

    let changed = rects
        .iter()
        .zip(items)
        .any(|(r, item)| !r.approx_eq(&item.rect, config.epsilon));

    FlexSolution {
        rects,
        lines: lines.len(),
        changed,
    }
}

/// Main-axis extent needed to hold every item at its clamped basis on one
/// line, padding included. Used to size containers that hug their content.
pub fn content_main_extent(
    container: &FlexContainer,
    items: &[FlexItem],
    config: &LayoutConfig,
) -> f32 {
    let bases: f32 = items
        .iter()
        .enumerate()
        .map(|(i, item)| prepare(i, item, container, config).hypothetical)
        .sum();
    let gaps = non_negative(container.gap) * items.len().saturating_sub(1) as f32;
    let padding = match container.direction {
        Direction::Row => container.padding.horizontal(),
        Direction::Column => container.padding.vertical(),
    };
    bases + gaps + padding
}

/// Cross-axis extent of the lines `items` pack into along the container's
/// current main extent, each line as tall as its largest clamped natural
/// cross size, padding included.
pub fn content_cross_extent(
    container: &FlexContainer,
    items: &[FlexItem],
    config: &LayoutConfig,
) -> f32 {
    let row = container.direction == Direction::Row;
    let content = container.padding.inset(&container.rect.sanitized());
    let (avail_main, padding) = if row {
        (content.width, container.padding.vertical())
    } else {
        (content.height, container.padding.horizontal())
    };
    let prepared: Vec<Prepared> = items
        .iter()
        .enumerate()
        .map(|(i, item)| prepare(i, item, container, config))
        .collect();
    let lines = break_lines(
        &prepared,
        container.wrap,
        avail_main,
        non_negative(container.gap),
        config.epsilon,
    );
    let crosses: f32 = lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|&k| {
                    let p = &prepared[k];
                    clamp(p.natural_cross, p.min_cross, p.max_cross).max(0.0)
                })
                .fold(0.0f32, f32::max)
        })
        .sum();
    let gaps = non_negative(container.line_gap) * lines.len().saturating_sub(1) as f32;
    crosses + gaps + padding
}

fn prepare(
    index: usize,
    item: &FlexItem,
    container: &FlexContainer,
    config: &LayoutConfig,
) -> Prepared {
    let row = container.direction == Direction::Row;
    let (current_main, current_cross) = if row {
        (item.rect.width, item.rect.height)
    } else {
        (item.rect.height, item.rect.width)
    };
    let (min_main, max_main, min_cross, max_cross) = if row {
        (item.min_width, item.max_width, item.min_height, item.max_height)
    } else {
        (item.min_height, item.max_height, item.min_width, item.max_width)
    };

    let basis = item
        .basis
        .filter(|b| b.is_finite() && *b >= 0.0)
        .or_else(|| Some(current_main).filter(|s| s.is_finite() && *s >= 0.0))
        .unwrap_or(config.fallback_size);
    let natural_cross = if current_cross.is_finite() && current_cross >= 0.0 {
        current_cross
    } else {
        config.fallback_size
    };

    Prepared {
        index,
        hypothetical: clamp(basis, min_main, max_main).max(0.0),
        min_main,
        max_main,
        natural_cross,
        min_cross,
        max_cross,
        grow: non_negative(item.grow),
        shrink: non_negative(item.shrink),
        align: item.align_self.unwrap_or(container.align),
    }
}

/// Greedy line breaking. Returns indices into `prepared`.
fn break_lines(
    prepared: &[Prepared],
    wrap: WrapMode,
    avail_main: f32,
    gap: f32,
    epsilon: f32,
) -> Vec<SmallVec<[usize; 8]>> {
    if wrap == WrapMode::NoWrap {
        return vec![(0..prepared.len()).collect()];
    }

    let mut lines: Vec<SmallVec<[usize; 8]>> = Vec::new();
    let mut line: SmallVec<[usize; 8]> = SmallVec::new();
    let mut line_main = 0.0f32;

    for (k, p) in prepared.iter().enumerate() {
        let extra = if line.is_empty() {
            p.hypothetical
        } else {
            gap + p.hypothetical
        };
        if !line.is_empty() && line_main + extra > avail_main + epsilon {
            lines.push(std::mem::take(&mut line));
            line_main = p.hypothetical;
        } else {
            line_main += extra;
        }
        line.push(k);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Distribute free space over one line by grow (positive) or shrink
/// (negative) weight. Items that hit a min/max bound are frozen and the
/// remainder is redistributed among the others.
fn resolve_flexible(members: &[&Prepared], avail_main: f32, gap: f32) -> Vec<f32> {
    let n = members.len();
    let gaps = gap * n.saturating_sub(1) as f32;
    let mut sizes: Vec<f32> = members.iter().map(|p| p.hypothetical).collect();

    let initial_free = avail_main - gaps - sizes.iter().sum::<f32>();
    if initial_free == 0.0 || !initial_free.is_finite() {
        return sizes;
    }
    let growing = initial_free > 0.0;
    let factor = |p: &Prepared| if growing { p.grow } else { p.shrink };

    let mut frozen: Vec<bool> = members.iter().map(|&p| factor(p) <= 0.0).collect();

    // Each round freezes at least one item, so n + 1 rounds always suffice.
    for _ in 0..=n {
        let open: SmallVec<[usize; 8]> = (0..n).filter(|&i| !frozen[i]).collect();
        if open.is_empty() {
            break;
        }

        let frozen_total: f32 = (0..n).filter(|&i| frozen[i]).map(|i| sizes[i]).sum();
        let open_base: f32 = open.iter().map(|&i| members[i].hypothetical).sum();
        let free = avail_main - gaps - frozen_total - open_base;
        let total_factor: f32 = open.iter().map(|&i| factor(members[i])).sum();
        if total_factor <= 0.0 {
            break;
        }

        let mut total_violation = 0.0f32;
        let mut clamped: SmallVec<[(usize, f32, f32); 8]> = SmallVec::new();
        for &i in &open {
            let p = members[i];
            let target = p.hypothetical + free * factor(p) / total_factor;
            let bounded = clamp(target, p.min_main, p.max_main).max(0.0);
            total_violation += bounded - target;
            clamped.push((i, target, bounded));
        }

        if total_violation.abs() <= f32::EPSILON * avail_main.abs().max(1.0) {
            for (i, _, bounded) in clamped {
                sizes[i] = bounded;
            }
            break;
        }

        for (i, target, bounded) in clamped {
            sizes[i] = bounded;
            let violated = if total_violation > 0.0 {
                bounded > target
            } else {
                bounded < target
            };
            if violated {
                frozen[i] = true;
            }
        }
    }

    sizes
}
