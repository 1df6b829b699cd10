//! Hover popups and the post-process queue they are drawn from.

use nf_core::surface::{CornerRadii, PaintMode, Surface, TextAlign, TextBaseline};
use nf_core::{BoundingBox, Color, Text, Vector2};

const BACKGROUND: Color = Color::rgba(0.0, 0.0, 0.0, 0.85);
const RADIUS: f64 = 6.0;
const PADDING: f64 = 13.0;

type Deferred = Box<dyn FnOnce(&mut dyn Surface)>;

/// Draw calls deferred until every subsystem has rendered, so popups land
/// on top of the scene.
#[derive(Default)]
pub struct PostProcess {
    queue: Vec<Deferred>,
}

impl PostProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, draw: impl FnOnce(&mut dyn Surface) + 'static) {
        self.queue.push(Box::new(draw));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Run and drop everything queued this frame, in queue order.
    pub fn flush(&mut self, surface: &mut dyn Surface) {
        for draw in self.queue.drain(..) {
            draw(surface);
        }
    }
}

/// A column of centered text lines on a dark rounded panel.
#[derive(Debug, Clone, Default)]
pub struct Popup {
    lines: Vec<(Text, f64)>,
}

impl Popup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line with `padding_top` of space above it.
    pub fn line(mut self, text: Text, padding_top: f64) -> Self {
        self.lines.push((text, padding_top));
        self
    }

    pub fn size(&mut self, surface: &mut dyn Surface) -> Vector2 {
        let mut size = Vector2::ZERO;
        for (text, padding_top) in &mut self.lines {
            let m = text.measure(surface);
            size.x = size.x.max(m.x);
            size.y += m.y + *padding_top;
        }
        size + Vector2::new(PADDING * 2.0, PADDING * 2.0)
    }

    /// Draw horizontally centered on `anchor.x` with the panel top at
    /// `anchor.y`.
    pub fn render(&mut self, surface: &mut dyn Surface, anchor: Vector2) {
        let size = self.size(surface);
        let panel = BoundingBox::new(Vector2::new(anchor.x - size.x / 2.0, anchor.y), size);

        surface.save();
        surface.set_fill(BACKGROUND);
        surface.rounded_rect(panel, CornerRadii::uniform(RADIUS), PaintMode::Fill);

        surface.set_text_align(TextAlign::Center);
        surface.set_text_baseline(TextBaseline::Top);
        let mut y = panel.pos.y + PADDING;
        for (text, padding_top) in &mut self.lines {
            y += *padding_top;
            text.render(surface, 1.0, Vector2::new(anchor.x, y));
            y += text.measure(surface).y;
        }
        surface.restore();
    }
}
