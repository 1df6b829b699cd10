//! `Surface` → Vello drawing commands.
//!
//! Mirrors the canvas-style state machine of [`Surface`] on top of a
//! `vello::Scene`: fill, stroke and dash state live on a save/restore stack
//! and clips become Vello clip layers. The host presents the scene via
//! wgpu.

use kurbo::{Affine, Circle, CubicBez, Line, Point, Rect, RoundedRect, RoundedRectRadii, Shape, Stroke};
use nf_core::surface::{
    CornerRadii, FontSpec, PaintMode, Surface, TextAlign, TextBaseline, TextMetrics, monospace_metrics,
};
use nf_core::{BoundingBox, Color, Vector2};
use peniko::{Fill, Mix};
use vello::Scene;

#[derive(Debug, Clone)]
struct DrawState {
    fill: Color,
    stroke: Color,
    line_width: f64,
    dash: Vec<f64>,
    shadow: Option<(Color, f64)>,
    font: FontSpec,
    align: TextAlign,
    baseline: TextBaseline,
    /// Clip layers pushed since the matching `save`.
    clips: usize,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            dash: Vec::new(),
            shadow: None,
            font: FontSpec::default(),
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
            clips: 0,
        }
    }
}

/// A [`Surface`] that records into a `vello::Scene`.
///
/// Text is measured with the same monospace metrics as the headless
/// surface so layout matches tests; glyph drawing needs a font context the
/// host supplies and is skipped here.
pub struct VelloSurface {
    scene: Scene,
    width: f64,
    height: f64,
    transform: Affine,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl std::fmt::Debug for VelloSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelloSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl VelloSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scene: Scene::new(),
            width,
            height,
            transform: Affine::IDENTITY,
            state: DrawState::default(),
            stack: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Take the finished frame, leaving an empty scene behind.
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Open clip layers across every saved state.
    pub fn clip_depth(&self) -> usize {
        self.stack.iter().map(|s| s.clips).sum::<usize>() + self.state.clips
    }

    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    fn stroke_style(&self) -> Stroke {
        let stroke = Stroke::new(self.state.line_width);
        if self.state.dash.is_empty() {
            stroke
        } else {
            stroke.with_dashes(0.0, self.state.dash.iter().copied())
        }
    }

    fn paint<S: Shape>(&mut self, shape: &S, mode: PaintMode) {
        if mode.fills() {
            self.scene
                .fill(Fill::NonZero, self.transform, to_peniko(self.state.fill), None, shape);
        }
        if mode.strokes() {
            let stroke = self.stroke_style();
            self.scene
                .stroke(&stroke, self.transform, to_peniko(self.state.stroke), None, shape);
        }
    }

    fn pop_clip_or_state(&mut self) {
        if self.state.clips > 0 {
            self.scene.pop_layer();
            self.state.clips -= 1;
        } else if let Some(saved) = self.stack.pop() {
            self.state = saved;
        }
    }

    fn shadow(&mut self, rect: Rect, radius: f64, mode: PaintMode) {
        if let Some((color, blur)) = self.state.shadow
            && mode.fills()
            && blur > 0.0
        {
            self.scene
                .draw_blurred_rounded_rect(self.transform, rect, to_peniko(color), radius, blur / 2.0);
        }
    }
}

// ─── Surface ─────────────────────────────────────────────────────────────

impl Surface for VelloSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.width = width;
        self.height = height;
        self.transform = Affine::scale(device_pixel_ratio);
    }

    fn clear(&mut self) {
        while self.clip_depth() > 0 {
            self.pop_clip_or_state();
        }
        self.scene.reset();
        self.state = DrawState::default();
        self.stack.clear();
    }

    fn save(&mut self) {
        let mut saved = self.state.clone();
        std::mem::swap(&mut saved, &mut self.state);
        self.stack.push(saved);
        self.state.clips = 0;
    }

    fn restore(&mut self) {
        let Some(saved) = self.stack.pop() else {
            log::warn!("restore without matching save");
            return;
        };
        for _ in 0..self.state.clips {
            self.scene.pop_layer();
        }
        self.state = saved;
    }

    fn clip_rect(&mut self, bounds: BoundingBox) {
        self.scene
            .push_layer(Mix::Clip, 1.0, self.transform, &to_rect(bounds));
        self.state.clips += 1;
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

    fn set_shadow(&mut self, color: Color, blur: f64) {
        self.state.shadow = (color.a > 0.0 && blur > 0.0).then_some((color, blur));
    }

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
        let rect = to_rect(bounds);
        self.shadow(rect, 0.0, mode);
        self.paint(&rect, mode);
    }

    fn rounded_rect(&mut self, bounds: BoundingBox, radii: CornerRadii, mode: PaintMode) {
        let rect = to_rect(bounds);
        self.shadow(rect, radii.top_left, mode);
        let radii = RoundedRectRadii::new(radii.top_left, radii.top_right, radii.bottom_right, radii.bottom_left);
        self.paint(&RoundedRect::from_rect(rect, radii), mode);
    }

    fn circle(&mut self, center: Vector2, radius: f64, mode: PaintMode) {
        self.paint(&Circle::new(to_point(center), radius), mode);
    }

    fn line(&mut self, from: Vector2, to: Vector2) {
        self.paint(&Line::new(to_point(from), to_point(to)), PaintMode::Stroke);
    }

    fn bezier(&mut self, from: Vector2, to: Vector2) {
        let mid = (from.x + to.x) / 2.0;
        let curve = CubicBez::new(
            to_point(from),
            Point::new(mid, from.y),
            Point::new(mid, to.y),
            to_point(to),
        );
        self.paint(&curve, PaintMode::Stroke);
    }

    fn fill_text(&mut self, text: &str, position: Vector2) {
        log::trace!(
            "TEXT {:?} at ({}, {}) size {} {:?}/{:?}",
            text,
            position.x,
            position.y,
            self.state.font.size,
            self.state.align,
            self.state.baseline
        );
        // Glyph runs need a host font context; deferred to the font milestone.
    }

    fn measure_text(&self, text: &str) -> TextMetrics {
        monospace_metrics(text, self.state.font.size)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn to_peniko(color: Color) -> peniko::Color {
    let [r, g, b, a] = color.to_rgba8();
    peniko::Color::from_rgba8(r, g, b, a)
}

fn to_point(v: Vector2) -> Point {
    Point::new(v.x, v.y)
}

fn to_rect(bounds: BoundingBox) -> Rect {
    let b = bounds.normalized();
    Rect::new(b.pos.x, b.pos.y, b.right(), b.bottom())
}
