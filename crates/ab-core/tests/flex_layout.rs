//! Integration tests: flex solver properties and reference scenarios.

use ab_core::flex::{Direction, FlexContainer, FlexItem, solve_flex};
use ab_core::model::{CrossAlign, MainAlign, WrapMode};
use ab_core::{LayoutConfig, Padding, Rect};

fn container(direction: Direction, width: f32, height: f32, gap: f32) -> FlexContainer {
    FlexContainer {
        rect: Rect::new(0.0, 0.0, width, height),
        padding: Padding::default(),
        direction,
        gap,
        line_gap: gap,
        justify: MainAlign::Start,
        align: CrossAlign::Start,
        wrap: WrapMode::NoWrap,
    }
}

fn with_basis(basis: f32, grow: f32) -> FlexItem {
    FlexItem {
        rect: Rect::new(0.0, 0.0, 50.0, 50.0),
        basis: Some(basis),
        grow,
        shrink: 1.0,
        ..Default::default()
    }
}

/// Tiny deterministic generator so property runs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self, max: f32) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32 / (1u64 << 31) as f32) * max
    }
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn row_grow_splits_free_space_evenly() {
    let c = container(Direction::Row, 900.0, 200.0, 20.0);
    let items = vec![with_basis(200.0, 1.0); 3];
    let solution = solve_flex(&c, &items, &LayoutConfig::default());

    let expected = (900.0 - 40.0) / 3.0;
    let mut x = 0.0;
    for r in &solution.rects {
        assert!((r.width - expected).abs() < 0.01, "width {}", r.width);
        assert!((r.x - x).abs() < 0.01, "x {} != {x}", r.x);
        assert_eq!(r.height, 50.0);
        x += expected + 20.0;
    }
    assert!(solution.changed);
}

#[test]
fn column_wrap_starts_a_second_line() {
    let mut c = container(Direction::Column, 400.0, 300.0, 0.0);
    c.wrap = WrapMode::Wrap;
    let items = vec![with_basis(200.0, 0.0), with_basis(200.0, 0.0)];
    let solution = solve_flex(&c, &items, &LayoutConfig::default());

    assert_eq!(solution.lines, 2);
    assert_eq!(solution.rects[0], Rect::new(0.0, 0.0, 50.0, 200.0));
    assert_eq!(solution.rects[1], Rect::new(50.0, 0.0, 50.0, 200.0));
}

#[test]
fn space_between_is_applied_per_line() {
    let mut c = container(Direction::Row, 300.0, 300.0, 10.0);
    c.wrap = WrapMode::Wrap;
    c.justify = MainAlign::SpaceBetween;
    let items = vec![with_basis(100.0, 0.0); 3];
    let solution = solve_flex(&c, &items, &LayoutConfig::default());

    assert_eq!(solution.lines, 2);
    assert_eq!(solution.rects[0].x, 0.0);
    assert_eq!(solution.rects[1].x, 200.0);
    // Alone on its line: starts at the line start.
    assert_eq!(solution.rects[2], Rect::new(0.0, 60.0, 100.0, 50.0));
}

#[test]
fn padding_offsets_content_box() {
    let mut c = container(Direction::Row, 300.0, 100.0, 0.0);
    c.padding = Padding::uniform(10.0);
    c.align = CrossAlign::Stretch;
    let solution = solve_flex(&c, &[with_basis(100.0, 1.0)], &LayoutConfig::default());
    assert_eq!(solution.rects[0], Rect::new(10.0, 10.0, 280.0, 80.0));
}

// ─── Properties ─────────────────────────────────────────────────────────

#[test]
fn nowrap_sizes_never_exceed_available_extent() {
    let config = LayoutConfig::default();
    let mut rng = Lcg(7);

    for case in 0..200 {
        let n = 1 + (rng.next_f32(6.0) as usize);
        let gap = rng.next_f32(10.0);
        let avail = 100.0 + rng.next_f32(900.0);
        let any_grow = case % 2 == 0;
        let items: Vec<FlexItem> = (0..n)
            .map(|_| FlexItem {
                rect: Rect::new(0.0, 0.0, 40.0, 40.0),
                basis: Some(rng.next_f32(400.0)),
                grow: if any_grow { 0.5 + rng.next_f32(2.0) } else { 0.0 },
                shrink: 0.5 + rng.next_f32(2.0),
                ..Default::default()
            })
            .collect();

        let c = container(Direction::Row, avail, 100.0, gap);
        let solution = solve_flex(&c, &items, &config);
        let used: f32 =
            solution.rects.iter().map(|r| r.width).sum::<f32>() + gap * (n - 1) as f32;

        assert!(
            used <= avail + 0.05,
            "case {case}: used {used} > available {avail}"
        );
        if any_grow {
            assert!(
                (used - avail).abs() < 0.05,
                "case {case}: growing items should fill {avail}, used {used}"
            );
        }
        for r in &solution.rects {
            assert!(r.width.is_finite() && r.width >= 0.0);
        }
    }
}

#[test]
fn solving_its_own_output_is_stable() {
    let config = LayoutConfig::default();
    let mut c = container(Direction::Row, 500.0, 300.0, 8.0);
    c.wrap = WrapMode::Wrap;
    c.justify = MainAlign::Center;
    c.align = CrossAlign::Center;

    let items: Vec<FlexItem> = [120.0, 200.0, 90.0, 260.0]
        .iter()
        .map(|&w| FlexItem {
            rect: Rect::new(0.0, 0.0, w, 40.0),
            ..Default::default()
        })
        .collect();
    let first = solve_flex(&c, &items, &config);

    let settled: Vec<FlexItem> = items
        .iter()
        .zip(&first.rects)
        .map(|(item, rect)| FlexItem {
            rect: *rect,
            ..item.clone()
        })
        .collect();
    let second = solve_flex(&c, &settled, &config);
    assert!(!second.changed);
    assert_eq!(first.rects, second.rects);
}
