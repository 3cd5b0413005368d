//! Grid auto-placement solver.
//!
//! Columns are uniform; rows take the configured auto-row height unless a
//! child asks for more. Children are placed in `order` into an occupancy
//! matrix, either at their declared start lines or at the first free slot
//! scanning rows top-to-bottom, columns left-to-right.

use crate::config::LayoutConfig;
use crate::geometry::{Padding, Rect, finite_or, non_negative};
use crate::model::{ContainerLayout, Element, GridAutoFit, LayoutMode, MAX_GRID_TRACKS};

/// Container description consumed by `solve_grid`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridContainer {
    pub rect: Rect,
    pub padding: Padding,
    /// Column count when `auto_fit` is `Fixed`.
    pub columns: u32,
    pub auto_fit: GridAutoFit,
    pub min_column_width: f32,
    pub column_gap: f32,
    pub row_gap: f32,
    pub auto_row_height: f32,
}

impl GridContainer {
    /// Build from container layout fields; `None` unless the mode is grid.
    pub fn from_layout(layout: &ContainerLayout, rect: Rect) -> Option<Self> {
        if layout.mode != LayoutMode::Grid {
            return None;
        }
        Some(Self {
            rect,
            padding: layout.padding.normalized(),
            columns: layout.grid_columns,
            auto_fit: layout.grid_auto_fit,
            min_column_width: layout.grid_min_column_width,
            column_gap: layout.main_gap(),
            row_gap: layout.cross_gap(),
            auto_row_height: layout.grid_auto_rows,
        })
    }
}

/// A child as seen by the grid solver.
#[derive(Debug, Clone, PartialEq)]
pub struct GridItem {
    pub rect: Rect,
    pub order: Option<i32>,
    pub column_span: u32,
    pub row_span: u32,
    /// 1-based column line.
    pub column_start: Option<u32>,
    /// 1-based row line.
    pub row_start: Option<u32>,
    /// Height the child asks for; spread across the rows it spans.
    pub explicit_height: Option<f32>,
}

impl Default for GridItem {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            order: None,
            column_span: 1,
            row_span: 1,
            column_start: None,
            row_start: None,
            explicit_height: None,
        }
    }
}

impl GridItem {
    pub fn from_element(el: &Element) -> Self {
        let l = &el.layout;
        Self {
            rect: el.rect(),
            order: l.order,
            column_span: l.grid_column_span,
            row_span: l.grid_row_span,
            column_start: l.grid_column_start,
            row_start: l.grid_row_start,
            explicit_height: l.min_height,
        }
    }
}

/// Zero-based cell range assigned to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub column_span: u32,
    pub row_span: u32,
}

impl GridCell {
    /// One past the last column covered.
    pub fn column_end(&self) -> u32 {
        self.column.saturating_add(self.column_span)
    }

    /// One past the last row covered.
    pub fn row_end(&self) -> u32 {
        self.row.saturating_add(self.row_span)
    }

    pub fn overlaps(&self, other: &GridCell) -> bool {
        self.column < other.column_end()
            && other.column < self.column_end()
            && self.row < other.row_end()
            && other.row < self.row_end()
    }
}

/// Output of `solve_grid`, indexed like the input items.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSolution {
    pub rects: Vec<Rect>,
    pub cells: Vec<GridCell>,
    pub columns: u32,
    pub column_width: f32,
    pub rows: u32,
    pub changed: bool,
}

/// Effective column count for `container`.
///
/// For auto-fit/auto-fill this is the largest `n` with
/// `n * min + (n - 1) * gap <= available`, never less than 1.
pub fn resolve_columns(container: &GridContainer) -> u32 {
    let fixed = container.columns.clamp(1, MAX_GRID_TRACKS);
    match container.auto_fit {
        GridAutoFit::Fixed => fixed,
        GridAutoFit::AutoFit | GridAutoFit::AutoFill => {
            let min = container.min_column_width;
            if !min.is_finite() || min <= 0.0 {
                return fixed;
            }
            let avail = container.padding.inset(&container.rect.sanitized()).width;
            let gap = non_negative(container.column_gap);
            let count = ((avail + gap) / (min + gap) + 1e-4).floor();
            if count.is_finite() && count >= 1.0 {
                count.min(MAX_GRID_TRACKS as f32) as u32
            } else {
                1
            }
        }
    }
}

/// Occupied cells, grown on demand one row at a time.
struct Occupancy {
    columns: u32,
    rows: Vec<Vec<bool>>,
}

impl Occupancy {
    fn new(columns: u32) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn is_free(&self, row: u32, column: u32) -> bool {
        self.rows
            .get(row as usize)
            .is_none_or(|r| !r[column as usize])
    }

    fn fits(&self, row: u32, column: u32, column_span: u32, row_span: u32) -> bool {
        let column_end = column.saturating_add(column_span);
        if column_end > self.columns {
            return false;
        }
        (row..row.saturating_add(row_span))
            .all(|r| (column..column_end).all(|c| self.is_free(r, c)))
    }

    fn mark(&mut self, cell: GridCell) {
        let needed = cell.row_end() as usize;
        while self.rows.len() < needed {
            self.rows.push(vec![false; self.columns as usize]);
        }
        for r in cell.row..cell.row_end() {
            for c in cell.column..cell.column_end() {
                self.rows[r as usize][c as usize] = true;
            }
        }
    }

    fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }
}

/// Lay out `items` inside `container`.
pub fn solve_grid(
    container: &GridContainer,
    items: &[GridItem],
    config: &LayoutConfig,
) -> GridSolution {
    let columns = resolve_columns(container);
    let content = container.padding.inset(&container.rect.sanitized());
    let column_gap = non_negative(container.column_gap);
    let row_gap = non_negative(container.row_gap);
    let auto_row = non_negative(finite_or(container.auto_row_height, config.fallback_size));

    let mut column_width =
        non_negative((content.width - column_gap * (columns - 1) as f32) / columns as f32);
    if container.auto_fit == GridAutoFit::AutoFit {
        column_width = column_width.max(non_negative(container.min_column_width));
    }

    if items.is_empty() {
        return GridSolution {
            rects: Vec::new(),
            cells: Vec::new(),
            columns,
            column_width,
            rows: 0,
            changed: false,
        };
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].order.unwrap_or(0), i));

    let probe_limit = config.grid_probe_limit.clamp(1, MAX_GRID_TRACKS as usize) as u32;
    let mut occupancy = Occupancy::new(columns);
    let mut cells = vec![GridCell::default(); items.len()];

    for &i in &order {
        let item = &items[i];
        let column_span = item.column_span.clamp(1, columns);
        let row_span = item.row_span.clamp(1, probe_limit);
        let last_column = columns - column_span;

        let column_start = item
            .column_start
            .map(|c| c.saturating_sub(1).min(last_column));
        let row_start = item
            .row_start
            .map(|r| r.saturating_sub(1).min(probe_limit));

        let fits = |occ: &Occupancy, (r, c): (u32, u32)| occ.fits(r, c, column_span, row_span);
        let slot = match (row_start, column_start) {
            (Some(r), Some(c)) => Some((r, c)).filter(|&s| fits(&occupancy, s)),
            (None, Some(c)) => (0..probe_limit)
                .map(|r| (r, c))
                .find(|&s| fits(&occupancy, s)),
            (Some(r), None) => (0..=last_column)
                .map(|c| (r, c))
                .find(|&s| fits(&occupancy, s)),
            (None, None) => None,
        }
        .or_else(|| {
            (0..probe_limit)
                .flat_map(|r| (0..=last_column).map(move |c| (r, c)))
                .find(|&s| fits(&occupancy, s))
        });

        let (row, column) = slot.unwrap_or_else(|| {
            log::warn!(
                "grid: no free {column_span}x{row_span} slot within {probe_limit} rows, appending a row"
            );
            (occupancy.row_count(), 0)
        });

        let cell = GridCell {
            column,
            row,
            column_span,
            row_span,
        };
        occupancy.mark(cell);
        cells[i] = cell;
    }

    let rows = occupancy.row_count();
    let mut row_heights = vec![auto_row; rows as usize];
    let mut row_used = vec![false; rows as usize];

    for (item, cell) in items.iter().zip(&cells) {
        for r in cell.row..cell.row_end() {
            row_used[r as usize] = true;
        }
        if let Some(h) = item.explicit_height.filter(|h| h.is_finite() && *h > 0.0) {
            let spans = cell.row_span as f32;
            let share = non_negative((h - row_gap * (spans - 1.0)) / spans);
            for r in cell.row..cell.row_end() {
                let slot = &mut row_heights[r as usize];
                *slot = slot.max(share);
            }
        }
    }

    // Unused row indices advance by the auto-row height rather than
    // collapsing.
    let mut row_offsets = Vec::with_capacity(rows as usize + 1);
    let mut y = 0.0f32;
    for r in 0..rows as usize {
        row_offsets.push(y);
        let advance = if row_used[r] { row_heights[r] } else { auto_row };
        y += advance + row_gap;
    }
    row_offsets.push(y);

    let rects: Vec<Rect> = cells
        .iter()
        .map(|cell| {
            let span_c = cell.column_span as f32;
            let span_r = cell.row_span as f32;
            let x = content.x + cell.column as f32 * (column_width + column_gap);
            let width = span_c * column_width + (span_c - 1.0) * column_gap;
            let top = content.y + row_offsets[cell.row as usize];
            let height: f32 = (cell.row..cell.row_end())
                .map(|r| row_heights[r as usize])
                .sum::<f32>()
                + (span_r - 1.0) * row_gap;
            Rect::new(x, top, width, height).sanitized()
        })
        .collect();

    let changed = rects
        .iter()
        .zip(items)
        .any(|(r, item)| !r.approx_eq(&item.rect, config.epsilon));

    log::trace!("grid: {columns} columns x {rows} rows, column width {column_width}");

    GridSolution {
        rects,
        cells,
        columns,
        column_width,
        rows,
        changed,
    }
}
