//! Drawing-surface abstraction.
//!
//! Every draw call the engine makes goes through [`Surface`]. The trait is
//! stateful like a 2D canvas context: fill/stroke/font setters affect the
//! calls that follow until the next `restore`. [`HeadlessSurface`] measures
//! text with fixed monospace metrics and records what was drawn.

use crate::color::Color;
use crate::geometry::{BoundingBox, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Fill,
    Stroke,
    FillAndStroke,
}

impl PaintMode {
    pub fn fills(self) -> bool {
        matches!(self, PaintMode::Fill | PaintMode::FillAndStroke)
    }

    pub fn strokes(self) -> bool {
        matches!(self, PaintMode::Stroke | PaintMode::FillAndStroke)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    #[default]
    Alphabetic,
    Middle,
    Top,
}

/// Per-corner radii, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerRadii {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

impl CornerRadii {
    pub const fn uniform(r: f64) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    pub const fn top(r: f64) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: 0.0,
            bottom_left: 0.0,
        }
    }

    pub const fn bottom(r: f64) -> Self {
        Self {
            top_left: 0.0,
            top_right: 0.0,
            bottom_right: r,
            bottom_left: r,
        }
    }
}

impl From<f64> for CornerRadii {
    fn from(r: f64) -> Self {
        Self::uniform(r)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub size: f64,
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size: 16.0,
            family: "Courier New".into(),
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl TextMetrics {
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

pub trait Surface {
    /// Logical (CSS-pixel) size.
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn size(&self) -> Vector2 {
        Vector2::new(self.width(), self.height())
    }
    /// Resize to `width`×`height` logical pixels backed by
    /// `device_pixel_ratio` physical pixels each.
    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64);
    fn clear(&mut self);

    fn save(&mut self);
    fn restore(&mut self);
    fn clip_rect(&mut self, bounds: BoundingBox);

    fn set_fill(&mut self, color: Color);
    fn set_stroke(&mut self, color: Color);
    fn set_line_width(&mut self, width: f64);
    /// Empty slice restores solid lines.
    fn set_line_dash(&mut self, segments: &[f64]);
    fn set_shadow(&mut self, color: Color, blur: f64);
    fn set_font(&mut self, font: &FontSpec);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    fn rect(&mut self, bounds: BoundingBox, mode: PaintMode);
    fn rounded_rect(&mut self, bounds: BoundingBox, radii: CornerRadii, mode: PaintMode);
    fn circle(&mut self, center: Vector2, radius: f64, mode: PaintMode);
    fn line(&mut self, from: Vector2, to: Vector2);
    /// Horizontal S-curve: both control points sit at the x midpoint.
    fn bezier(&mut self, from: Vector2, to: Vector2);

    fn fill_text(&mut self, text: &str, position: Vector2);
    /// Measure `text` in the current font.
    fn measure_text(&self, text: &str) -> TextMetrics;
}

// ─── Headless surface ────────────────────────────────────────────────────

/// Fixed monospace metrics: advance 0.6×size, ascent 0.8×size,
/// descent 0.2×size.
pub fn monospace_metrics(text: &str, font_size: f64) -> TextMetrics {
    TextMetrics {
        width: text.chars().count() as f64 * font_size * 0.6,
        ascent: font_size * 0.8,
        descent: font_size * 0.2,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Clip(BoundingBox),
    Rect {
        bounds: BoundingBox,
        mode: PaintMode,
        fill: Color,
        stroke: Color,
    },
    RoundedRect {
        bounds: BoundingBox,
        radii: CornerRadii,
        mode: PaintMode,
        fill: Color,
        stroke: Color,
    },
    Circle {
        center: Vector2,
        radius: f64,
        mode: PaintMode,
        fill: Color,
    },
    Line {
        from: Vector2,
        to: Vector2,
        stroke: Color,
        width: f64,
    },
    Bezier {
        from: Vector2,
        to: Vector2,
        stroke: Color,
        width: f64,
    },
    Text {
        text: String,
        position: Vector2,
        size: f64,
        color: Color,
    },
}

#[derive(Debug, Clone)]
struct PaintState {
    fill: Color,
    stroke: Color,
    line_width: f64,
    dash: Vec<f64>,
    font: FontSpec,
    align: TextAlign,
    baseline: TextBaseline,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            dash: Vec::new(),
            font: FontSpec::default(),
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
        }
    }
}

/// Surface without a backend. Used for layout and by tests.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    state: PaintState,
    stack: Vec<PaintState>,
    ops: Vec<DrawOp>,
}

impl HeadlessSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            state: PaintState::default(),
            stack: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Every string drawn, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn font(&self) -> &FontSpec {
        &self.state.font
    }

    pub fn line_dash(&self) -> &[f64] {
        &self.state.dash
    }

    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl Surface for HeadlessSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.width = width;
        self.height = height;
        self.pixel_ratio = device_pixel_ratio;
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => log::error!("restore without matching save"),
        }
    }

    fn clip_rect(&mut self, bounds: BoundingBox) {
        self.ops.push(DrawOp::Clip(bounds));
    }

    fn set_fill(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_stroke(&mut self, color: Color) {
        self.state.stroke = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        self.state.dash = segments.to_vec();
    }

    fn set_shadow(&mut self, _color: Color, _blur: f64) {}

    fn set_font(&mut self, font: &FontSpec) {
        self.state.font = font.clone();
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.baseline = baseline;
    }

    fn rect(&mut self, bounds: BoundingBox, mode: PaintMode) {
        self.ops.push(DrawOp::Rect {
            bounds,
            mode,
            fill: self.state.fill,
            stroke: self.state.stroke,
        });
    }

    fn rounded_rect(&mut self, bounds: BoundingBox, radii: CornerRadii, mode: PaintMode) {
        self.ops.push(DrawOp::RoundedRect {
            bounds,
            radii,
            mode,
            fill: self.state.fill,
            stroke: self.state.stroke,
        });
    }

    fn circle(&mut self, center: Vector2, radius: f64, mode: PaintMode) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            mode,
            fill: self.state.fill,
        });
    }

    fn line(&mut self, from: Vector2, to: Vector2) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            stroke: self.state.stroke,
            width: self.state.line_width,
        });
    }

    fn bezier(&mut self, from: Vector2, to: Vector2) {
        self.ops.push(DrawOp::Bezier {
            from,
            to,
            stroke: self.state.stroke,
            width: self.state.line_width,
        });
    }

    fn fill_text(&mut self, text: &str, position: Vector2) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            position,
            size: self.state.font.size,
            color: self.state.fill,
        });
    }

    fn measure_text(&self, text: &str) -> TextMetrics {
        monospace_metrics(text, self.state.font.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_with_current_font() {
        let mut s = HeadlessSurface::default();
        s.set_font(&FontSpec {
            size: 10.0,
            ..Default::default()
        });
        let m = s.measure_text("hello");
        assert_eq!(m.width, 30.0);
        assert_eq!(m.height(), 10.0);
    }

    #[test]
    fn save_restore_scopes_state() {
        let mut s = HeadlessSurface::default();
        s.set_fill(Color::WHITE);
        s.save();
        s.set_fill(Color::BLACK);
        s.restore();
        s.rect(BoundingBox::from_xywh(0.0, 0.0, 1.0, 1.0), PaintMode::Fill);
        assert!(matches!(s.ops()[0], DrawOp::Rect { fill, .. } if fill == Color::WHITE));
        assert_eq!(s.save_depth(), 0);
    }

    #[test]
    fn records_text() {
        let mut s = HeadlessSurface::default();
        s.fill_text("a", Vector2::ZERO);
        s.fill_text("b", Vector2::ZERO);
        assert_eq!(s.texts(), vec!["a", "b"]);
    }
}
