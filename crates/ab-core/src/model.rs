//! Document data model.
//!
//! A `Document` holds an ordered list of `Frame`s. Each frame owns a flat
//! list of `Element`s; nesting is expressed with `parent_id` back
//! references to group elements of the same frame. Element coordinates are
//! frame-relative regardless of nesting depth.
//!
//! The JSON shape produced by serde (camelCase fields, kebab-case enum
//! values) is the contract shared with the renderer and the save/load
//! collaborator.

use crate::error::Error;
use crate::geometry::{Padding, Rect, non_negative};
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Container layout ────────────────────────────────────────────────────

/// Upper bound for grid column counts and spans.
pub const MAX_GRID_TRACKS: u32 = u16::MAX as u32;

/// How a container arranges its direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Children keep their own positions.
    #[default]
    Absolute,
    FlexRow,
    FlexColumn,
    Grid,
}

/// Main-axis distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MainAlign {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
}

/// Cross-axis alignment, for a container or a single child override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossAlign {
    #[default]
    Start,
    Center,
    End,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    #[default]
    #[serde(rename = "nowrap")]
    NoWrap,
    Wrap,
    WrapReverse,
}

/// How a grid resolves its column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridAutoFit {
    /// Use `grid_columns` as given.
    #[default]
    Fixed,
    /// As many columns of at least `grid_min_column_width` as fit; each
    /// column is floored at that minimum.
    AutoFit,
    /// As many columns of at least `grid_min_column_width` as fit.
    AutoFill,
}

/// Layout parameters shared by frames and group elements.
/// Only meaningful while `mode` is not `Absolute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerLayout {
    pub mode: LayoutMode,
    pub gap: f32,
    /// Gap between flex lines / grid rows. Falls back to `gap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_gap: Option<f32>,
    pub padding: Padding,
    pub justify: MainAlign,
    pub align: CrossAlign,
    pub wrap: WrapMode,
    pub grid_columns: u32,
    pub grid_auto_rows: f32,
    pub grid_auto_fit: GridAutoFit,
    pub grid_min_column_width: f32,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Absolute,
            gap: 0.0,
            row_gap: None,
            padding: Padding::default(),
            justify: MainAlign::Start,
            align: CrossAlign::Start,
            wrap: WrapMode::NoWrap,
            grid_columns: 2,
            grid_auto_rows: 100.0,
            grid_auto_fit: GridAutoFit::Fixed,
            grid_min_column_width: 120.0,
        }
    }
}

impl ContainerLayout {
    pub fn flex_row(gap: f32) -> Self {
        Self {
            mode: LayoutMode::FlexRow,
            gap,
            ..Default::default()
        }
    }

    pub fn flex_column(gap: f32) -> Self {
        Self {
            mode: LayoutMode::FlexColumn,
            gap,
            ..Default::default()
        }
    }

    pub fn grid(columns: u32, gap: f32) -> Self {
        Self {
            mode: LayoutMode::Grid,
            grid_columns: columns,
            gap,
            ..Default::default()
        }
    }

    /// Whether children are positioned by a solver.
    pub fn is_auto(&self) -> bool {
        self.mode != LayoutMode::Absolute
    }

    pub fn main_gap(&self) -> f32 {
        non_negative(self.gap)
    }

    pub fn cross_gap(&self) -> f32 {
        non_negative(self.row_gap.unwrap_or(self.gap))
    }

    /// Apply `patch`, returning whether anything changed.
    pub fn apply(&mut self, patch: &ContainerLayoutPatch) -> bool {
        let before = self.clone();
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(gap) = patch.gap {
            self.gap = non_negative(gap);
        }
        if let Some(row_gap) = patch.row_gap {
            self.row_gap = row_gap.map(non_negative);
        }
        if let Some(padding) = patch.padding {
            self.padding = padding.normalized();
        }
        if let Some(justify) = patch.justify {
            self.justify = justify;
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
        if let Some(wrap) = patch.wrap {
            self.wrap = wrap;
        }
        if let Some(columns) = patch.grid_columns {
            self.grid_columns = columns.clamp(1, MAX_GRID_TRACKS);
        }
        if let Some(rows) = patch.grid_auto_rows {
            self.grid_auto_rows = non_negative(rows);
        }
        if let Some(fit) = patch.grid_auto_fit {
            self.grid_auto_fit = fit;
        }
        if let Some(min) = patch.grid_min_column_width {
            self.grid_min_column_width = non_negative(min);
        }
        *self != before
    }
}

/// Partial update for a `ContainerLayout`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerLayoutPatch {
    pub mode: Option<LayoutMode>,
    pub gap: Option<f32>,
    /// `Some(None)` clears the row gap.
    pub row_gap: Option<Option<f32>>,
    pub padding: Option<Padding>,
    pub justify: Option<MainAlign>,
    pub align: Option<CrossAlign>,
    pub wrap: Option<WrapMode>,
    pub grid_columns: Option<u32>,
    pub grid_auto_rows: Option<f32>,
    pub grid_auto_fit: Option<GridAutoFit>,
    pub grid_min_column_width: Option<f32>,
}

// ─── Child layout ────────────────────────────────────────────────────────

/// Per-child parameters read when the parent container is flex or grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemLayout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basis: Option<f32>,
    pub grow: f32,
    pub shrink: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f32>,
    /// `None` inherits the container's cross alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align_self: Option<CrossAlign>,
    pub grid_column_span: u32,
    pub grid_row_span: u32,
    /// 1-based column line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_column_start: Option<u32>,
    /// 1-based row line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_row_start: Option<u32>,
}

impl Default for ItemLayout {
    fn default() -> Self {
        Self {
            order: None,
            basis: None,
            grow: 0.0,
            shrink: 1.0,
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            align_self: None,
            grid_column_span: 1,
            grid_row_span: 1,
            grid_column_start: None,
            grid_row_start: None,
        }
    }
}

impl ItemLayout {
    pub fn grow(grow: f32) -> Self {
        Self {
            grow,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, patch: &ItemLayoutPatch) -> bool {
        let before = self.clone();
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(basis) = patch.basis {
            self.basis = basis;
        }
        if let Some(grow) = patch.grow {
            self.grow = non_negative(grow);
        }
        if let Some(shrink) = patch.shrink {
            self.shrink = non_negative(shrink);
        }
        if let Some(v) = patch.min_width {
            self.min_width = v;
        }
        if let Some(v) = patch.max_width {
            self.max_width = v;
        }
        if let Some(v) = patch.min_height {
            self.min_height = v;
        }
        if let Some(v) = patch.max_height {
            self.max_height = v;
        }
        if let Some(align) = patch.align_self {
            self.align_self = align;
        }
        if let Some(span) = patch.grid_column_span {
            self.grid_column_span = span.clamp(1, MAX_GRID_TRACKS);
        }
        if let Some(span) = patch.grid_row_span {
            self.grid_row_span = span.clamp(1, MAX_GRID_TRACKS);
        }
        if let Some(start) = patch.grid_column_start {
            self.grid_column_start = start;
        }
        if let Some(start) = patch.grid_row_start {
            self.grid_row_start = start;
        }
        *self != before
    }
}

/// Partial update for an `ItemLayout`. Optional fields take
/// `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemLayoutPatch {
    pub order: Option<Option<i32>>,
    pub basis: Option<Option<f32>>,
    pub grow: Option<f32>,
    pub shrink: Option<f32>,
    pub min_width: Option<Option<f32>>,
    pub max_width: Option<Option<f32>>,
    pub min_height: Option<Option<f32>>,
    pub max_height: Option<Option<f32>>,
    pub align_self: Option<Option<CrossAlign>>,
    pub grid_column_span: Option<u32>,
    pub grid_row_span: Option<u32>,
    pub grid_column_start: Option<Option<u32>>,
    pub grid_row_start: Option<Option<u32>>,
}

// ─── Element props ───────────────────────────────────────────────────────

/// Fields every element kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Props {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub opacity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    pub stroke_width: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub visible: bool,
    pub locked: bool,
}

impl Default for Props {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            opacity: 1.0,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            name: None,
            visible: true,
            locked: false,
        }
    }
}

impl Props {
    pub fn at(rect: Rect) -> Self {
        let mut props = Self::default();
        props.set_rect(rect);
        props
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextData {
    pub text: String,
    pub font_size: f32,
    pub font_family: String,
    pub font_weight: u16,
    pub text_align: TextAlign,
    pub line_height: f32,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 16.0,
            font_family: "Inter".into(),
            font_weight: 400,
            text_align: TextAlign::Left,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    #[default]
    Rect,
    Ellipse,
    Line,
    Polygon,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeData {
    pub shape: ShapeKind,
    pub corner_radius: f32,
    /// Flat `[x0, y0, x1, y1, ...]` list for lines and polygons, relative
    /// to the element origin.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sides: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageData {
    pub src: String,
    pub fit: ImageFit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupData {
    pub auto_layout: ContainerLayout,
    pub clip: bool,
}

/// Kind-specific element data. Serialized inline with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text(TextData),
    Shape(ShapeData),
    Image(ImageData),
    Group(GroupData),
}

impl ElementKind {
    /// Lowercase kind name, used for generated ids and history labels.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Shape(s) => match s.shape {
                ShapeKind::Rect => "rect",
                ShapeKind::Ellipse => "ellipse",
                ShapeKind::Line => "line",
                ShapeKind::Polygon => "polygon",
            },
            ElementKind::Image(_) => "image",
            ElementKind::Group(_) => "group",
        }
    }
}

// ─── Element ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: NodeId,
    /// Owning group, or `None` when owned by the frame.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub layout: ItemLayout,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    pub fn new(id: NodeId, kind: ElementKind, rect: Rect) -> Self {
        Self {
            id,
            parent_id: None,
            props: Props::at(rect),
            layout: ItemLayout::default(),
            kind,
        }
    }

    pub fn text(id: NodeId, text: &str, rect: Rect) -> Self {
        Self::new(
            id,
            ElementKind::Text(TextData {
                text: text.into(),
                ..Default::default()
            }),
            rect,
        )
    }

    pub fn shape(id: NodeId, shape: ShapeKind, rect: Rect) -> Self {
        Self::new(
            id,
            ElementKind::Shape(ShapeData {
                shape,
                ..Default::default()
            }),
            rect,
        )
    }

    pub fn image(id: NodeId, src: &str, rect: Rect) -> Self {
        Self::new(
            id,
            ElementKind::Image(ImageData {
                src: src.into(),
                ..Default::default()
            }),
            rect,
        )
    }

    pub fn group(id: NodeId, rect: Rect, auto_layout: ContainerLayout) -> Self {
        Self::new(
            id,
            ElementKind::Group(GroupData {
                auto_layout,
                clip: false,
            }),
            rect,
        )
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: ItemLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn rect(&self) -> Rect {
        self.props.rect()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group(_))
    }

    /// Container parameters when this element is a group.
    pub fn container(&self) -> Option<&ContainerLayout> {
        match &self.kind {
            ElementKind::Group(g) => Some(&g.auto_layout),
            _ => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut ContainerLayout> {
        match &mut self.kind {
            ElementKind::Group(g) => Some(&mut g.auto_layout),
            _ => None,
        }
    }
}

/// Partial update for element props. Kind-specific fields are ignored
/// for elements of another kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropsPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
    pub fill: Option<Option<String>>,
    pub stroke: Option<Option<String>>,
    pub stroke_width: Option<f32>,
    pub name: Option<Option<String>>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub src: Option<String>,
    pub corner_radius: Option<f32>,
}

impl PropsPatch {
    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }
}

impl Element {
    /// Apply `patch` with numeric coercion. Returns whether anything changed.
    pub fn apply_props(&mut self, patch: &PropsPatch) -> bool {
        let before = (self.props.clone(), self.kind.clone());
        let p = &mut self.props;
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            p.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            p.y = y;
        }
        if let Some(w) = patch.width {
            p.width = non_negative(w);
        }
        if let Some(h) = patch.height {
            p.height = non_negative(h);
        }
        if let Some(r) = patch.rotation.filter(|v| v.is_finite()) {
            p.rotation = r;
        }
        if let Some(o) = patch.opacity.filter(|v| v.is_finite()) {
            p.opacity = o.clamp(0.0, 1.0);
        }
        if let Some(fill) = &patch.fill {
            p.fill = fill.clone();
        }
        if let Some(stroke) = &patch.stroke {
            p.stroke = stroke.clone();
        }
        if let Some(sw) = patch.stroke_width {
            p.stroke_width = non_negative(sw);
        }
        if let Some(name) = &patch.name {
            p.name = name.clone();
        }
        if let Some(visible) = patch.visible {
            p.visible = visible;
        }
        if let Some(locked) = patch.locked {
            p.locked = locked;
        }

        match &mut self.kind {
            ElementKind::Text(t) => {
                if let Some(text) = &patch.text {
                    t.text = text.clone();
                }
                if let Some(size) = patch.font_size.filter(|v| v.is_finite() && *v > 0.0) {
                    t.font_size = size;
                }
            }
            ElementKind::Image(img) => {
                if let Some(src) = &patch.src {
                    img.src = src.clone();
                }
            }
            ElementKind::Shape(s) => {
                if let Some(radius) = patch.corner_radius {
                    s.corner_radius = non_negative(radius);
                }
            }
            ElementKind::Group(_) => {}
        }

        (self.props.clone(), self.kind.clone()) != before
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────

/// A top-level design surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub auto_layout: ContainerLayout,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Frame {
    pub fn new(id: NodeId, name: &str, width: f32, height: f32) -> Self {
        Self {
            id,
            name: name.into(),
            width: non_negative(width),
            height: non_negative(height),
            background: None,
            auto_layout: ContainerLayout::default(),
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, auto_layout: ContainerLayout) -> Self {
        self.auto_layout = auto_layout;
        self
    }

    /// The frame's own rectangle in frame coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Direct children of `parent` (`None` = the frame) in list order.
    pub fn children_of(&self, parent: Option<NodeId>) -> SmallVec<[NodeId; 8]> {
        self.elements
            .iter()
            .filter(|e| e.parent_id == parent)
            .map(|e| e.id)
            .collect()
    }

    /// All descendants of `id`, depth-first, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(Some(id)).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            // Guard against malformed input that slipped past sanitizing.
            if next == id || out.contains(&next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children_of(Some(next)).into_iter().rev());
        }
        out
    }

    /// Layout parameters of a container (`None` = the frame itself).
    pub fn container(&self, container: Option<NodeId>) -> Option<&ContainerLayout> {
        match container {
            None => Some(&self.auto_layout),
            Some(id) => self.element(id).and_then(Element::container),
        }
    }

    /// Rectangle of a container (`None` = the frame itself).
    pub fn container_rect(&self, container: Option<NodeId>) -> Option<Rect> {
        match container {
            None => Some(self.rect()),
            Some(id) => self.element(id).filter(|e| e.is_group()).map(Element::rect),
        }
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.element(id).and_then(|e| e.parent_id);
        let mut hops = 0;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.elements.len() {
                return false;
            }
            current = self.element(p).and_then(|e| e.parent_id);
        }
        false
    }
}

/// Partial update for frame-level attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePatch {
    pub name: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub background: Option<Option<String>>,
}

impl Frame {
    pub fn apply(&mut self, patch: &FramePatch) -> bool {
        let mut changed = false;
        if let Some(name) = &patch.name
            && *name != self.name
        {
            self.name = name.clone();
            changed = true;
        }
        if let Some(w) = patch.width.map(non_negative)
            && w != self.width
        {
            self.width = w;
            changed = true;
        }
        if let Some(h) = patch.height.map(non_negative)
            && h != self.height
        {
            self.height = h;
            changed = true;
        }
        if let Some(bg) = &patch.background
            && *bg != self.background
        {
            self.background = bg.clone();
            changed = true;
        }
        changed
    }
}

// ─── Selection ───────────────────────────────────────────────────────────

/// Active frame plus an ordered, duplicate-free list of selected element
/// ids scoped to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selection {
    pub frame_id: Option<NodeId>,
    pub element_ids: SmallVec<[NodeId; 4]>,
}

impl Selection {
    /// Switch the active frame. Clears element ids when the frame changes.
    pub fn set_frame(&mut self, frame_id: Option<NodeId>) {
        if self.frame_id != frame_id {
            self.frame_id = frame_id;
            self.element_ids.clear();
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.element_ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.element_ids.is_empty()
    }

    pub fn replace(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.element_ids.clear();
        self.add(ids);
    }

    pub fn add(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            if !self.contains(id) {
                self.element_ids.push(id);
            }
        }
    }

    pub fn toggle(&mut self, id: NodeId) {
        if let Some(pos) = self.element_ids.iter().position(|e| *e == id) {
            self.element_ids.remove(pos);
        } else {
            self.element_ids.push(id);
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.element_ids.retain(|id| keep(*id));
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// The whole editable state: frames with their elements, and selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub selection: Selection,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn frame_mut(&mut self, id: NodeId) -> Option<&mut Frame> {
        self.frames.iter_mut().find(|f| f.id == id)
    }

    pub fn frame_position(&self, id: NodeId) -> Option<usize> {
        self.frames.iter().position(|f| f.id == id)
    }

    /// Parse a saved document and repair anything that would break layout
    /// invariants (dangling parents, cycles, non-finite geometry).
    ///
    /// Frame ids must be unique; element-level problems are repaired.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut doc: Document = serde_json::from_str(json)?;
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = doc.frames.iter().find(|f| !seen.insert(f.id)) {
            return Err(Error::InvalidDocument(format!("duplicate frame id {}", dup.id)));
        }
        crate::tree::sanitize_document(&mut doc);
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn element_json_shape() {
        let el = Element::text(
            NodeId::intern("title"),
            "Hello",
            Rect::new(10.0, 20.0, 200.0, 40.0),
        )
        .with_parent(NodeId::intern("header"));
        let json: serde_json::Value = serde_json::to_value(&el).unwrap();

        assert_eq!(json["type"], "text");
        assert_eq!(json["id"], "title");
        assert_eq!(json["parentId"], "header");
        assert_eq!(json["props"]["width"], 200.0);
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["layout"]["gridColumnSpan"], 1);
    }

    #[test]
    fn group_roundtrip_keeps_container_layout() {
        let mut layout = ContainerLayout::flex_row(12.0);
        layout.justify = MainAlign::SpaceBetween;
        layout.wrap = WrapMode::WrapReverse;
        let el = Element::group(
            NodeId::intern("toolbar"),
            Rect::new(0.0, 0.0, 300.0, 48.0),
            layout,
        );

        let json = serde_json::to_string(&el).unwrap();
        assert!(json.contains("\"mode\":\"flex-row\""));
        assert!(json.contains("\"justify\":\"space-between\""));
        assert!(json.contains("\"wrap\":\"wrap-reverse\""));

        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn props_patch_ignores_foreign_kind_fields() {
        let mut img = Element::image(NodeId::intern("hero"), "a.png", Rect::default());
        let changed = img.apply_props(&PropsPatch {
            text: Some("nope".into()),
            ..Default::default()
        });
        assert!(!changed);

        let changed = img.apply_props(&PropsPatch {
            src: Some("b.png".into()),
            width: Some(f32::NAN),
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(img.props.width, 0.0);
        match &img.kind {
            ElementKind::Image(data) => assert_eq!(data.src, "b.png"),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn selection_is_duplicate_free() {
        let a = NodeId::intern("sel_a");
        let b = NodeId::intern("sel_b");
        let mut sel = Selection::default();
        sel.set_frame(Some(NodeId::intern("sel_frame")));
        sel.replace([a, b, a]);
        assert_eq!(sel.element_ids.as_slice(), &[a, b]);
        sel.toggle(a);
        assert_eq!(sel.element_ids.as_slice(), &[b]);
        sel.set_frame(Some(NodeId::intern("other_frame")));
        assert!(sel.is_empty());
    }

    #[test]
    fn descendants_are_depth_first() {
        let mut frame = Frame::new(NodeId::intern("desc_f"), "F", 100.0, 100.0);
        let g = NodeId::intern("desc_g");
        let inner = NodeId::intern("desc_inner");
        let leaf = NodeId::intern("desc_leaf");
        let other = NodeId::intern("desc_other");
        frame
            .elements
            .push(Element::group(g, Rect::default(), ContainerLayout::default()));
        frame.elements.push(
            Element::group(inner, Rect::default(), ContainerLayout::default()).with_parent(g),
        );
        frame
            .elements
            .push(Element::shape(leaf, ShapeKind::Rect, Rect::default()).with_parent(inner));
        frame
            .elements
            .push(Element::shape(other, ShapeKind::Ellipse, Rect::default()).with_parent(g));

        assert_eq!(frame.descendants(g), vec![inner, leaf, other]);
        assert!(frame.is_ancestor_of(g, leaf));
        assert!(!frame.is_ancestor_of(leaf, g));
    }

    #[test]
    fn grid_patches_cap_tracks() {
        let mut item = ItemLayout::default();
        assert!(item.apply(&ItemLayoutPatch {
            grid_column_span: Some(u32::MAX),
            grid_row_span: Some(0),
            ..Default::default()
        }));
        assert_eq!(item.grid_column_span, MAX_GRID_TRACKS);
        assert_eq!(item.grid_row_span, 1);

        let mut container = ContainerLayout::default();
        assert!(container.apply(&ContainerLayoutPatch {
            grid_columns: Some(u32::MAX),
            ..Default::default()
        }));
        assert_eq!(container.grid_columns, MAX_GRID_TRACKS);
    }
}
