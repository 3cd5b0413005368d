//! Geometry utilities shared by the solvers and the reflow coordinator.
//!
//! Every helper here is total: non-finite or negative inputs are coerced
//! instead of rejected, so layout always produces finite, non-negative
//! sizes.

use serde::{Deserialize, Serialize};

// ─── Scalars ─────────────────────────────────────────────────────────────

/// `value` if finite, otherwise `fallback`.
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Finite and `>= 0`, otherwise `0`.
#[inline]
pub fn non_negative(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Clamp `value` to optional bounds. `min` wins when the bounds cross,
/// matching how min-size overrides max-size in CSS.
pub fn clamp(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let mut v = value;
    if let Some(max) = max.filter(|m| m.is_finite()) {
        v = v.min(max);
    }
    if let Some(min) = min.filter(|m| m.is_finite()) {
        v = v.max(min);
    }
    v
}

// ─── Rect ────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Coerce every component to a finite value and sizes to `>= 0`.
    pub fn sanitized(&self) -> Self {
        Self {
            x: finite_or(self.x, 0.0),
            y: finite_or(self.y, 0.0),
            width: non_negative(self.width),
            height: non_negative(self.height),
        }
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Rect, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Grow outward by `padding` on each side.
    pub fn outset(&self, padding: &Padding) -> Rect {
        Rect {
            x: self.x - padding.left,
            y: self.y - padding.top,
            width: self.width + padding.horizontal(),
            height: self.height + padding.vertical(),
        }
    }

    /// Interior open-rectangle overlap (touching edges do not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Bounding box over a set of rectangles; `None` for an empty set.
pub fn bounding_box<I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = Rect>,
{
    rects.into_iter().reduce(|acc, r| acc.union(&r))
}

// ─── Padding ─────────────────────────────────────────────────────────────

/// Container padding. Accepts either a single number or a per-side object
/// on input; always serialized as an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PaddingRepr")]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaddingRepr {
    Uniform(f32),
    Sides {
        #[serde(default)]
        top: f32,
        #[serde(default)]
        right: f32,
        #[serde(default)]
        bottom: f32,
        #[serde(default)]
        left: f32,
    },
}

impl From<PaddingRepr> for Padding {
    fn from(repr: PaddingRepr) -> Self {
        match repr {
            PaddingRepr::Uniform(v) => Padding::uniform(v),
            PaddingRepr::Sides {
                top,
                right,
                bottom,
                left,
            } => Padding {
                top,
                right,
                bottom,
                left,
            }
            .normalized(),
        }
    }
}

impl Padding {
    pub fn uniform(value: f32) -> Self {
        let v = non_negative(value);
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
        .normalized()
    }

    /// Negative or non-finite sides become `0`.
    pub fn normalized(&self) -> Self {
        Self {
            top: non_negative(self.top),
            right: non_negative(self.right),
            bottom: non_negative(self.bottom),
            left: non_negative(self.left),
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// The content box of `outer` after removing this padding.
    pub fn inset(&self, outer: &Rect) -> Rect {
        let p = self.normalized();
        Rect {
            x: outer.x + p.left,
            y: outer.y + p.top,
            width: non_negative(outer.width - p.horizontal()),
            height: non_negative(outer.height - p.vertical()),
        }
    }
}
