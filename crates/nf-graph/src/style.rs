//! Box, stroke and text-box styles.
//!
//! Configs are partial: [`BoxStyleConfig::fallback`] fills the unset fields
//! of one config from another, and the resolved style is built once from the
//! merged result.

use nf_core::surface::{CornerRadii, PaintMode, Surface, TextAlign, TextBaseline};
use nf_core::{BoundingBox, Color, TextStyle, TextStyleConfig, Vector2};
use serde::{Deserialize, Serialize};

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyleConfig {
    pub color: Option<Color>,
    pub size: Option<f64>,
}

impl StrokeStyleConfig {
    pub fn new(color: Color, size: f64) -> Self {
        Self {
            color: Some(color),
            size: Some(size),
        }
    }

    pub fn fallback(&self, fallback: &StrokeStyleConfig) -> StrokeStyleConfig {
        StrokeStyleConfig {
            color: self.color.or(fallback.color),
            size: self.size.or(fallback.size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub size: f64,
}

impl StrokeStyle {
    pub fn new(config: &StrokeStyleConfig) -> Self {
        Self {
            color: config.color.unwrap_or(Color::BLACK),
            size: config.size.unwrap_or(0.5),
        }
    }

    pub fn setup(&self, surface: &mut dyn Surface, scale: f64) {
        surface.set_stroke(self.color);
        surface.set_line_width(self.size * scale);
    }
}

// ─── Box ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxStyleConfig {
    pub color: Option<Color>,
    pub border: Option<StrokeStyleConfig>,
    pub radius: Option<f64>,
}

impl BoxStyleConfig {
    pub fn fallback(&self, fallback: &BoxStyleConfig) -> BoxStyleConfig {
        let border = match (&self.border, &fallback.border) {
            (Some(b), Some(f)) => Some(b.fallback(f)),
            (b, f) => b.or(*f),
        };
        BoxStyleConfig {
            color: self.color.or(fallback.color),
            border,
            radius: self.radius.or(fallback.radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStyle {
    pub color: Color,
    pub border: Option<StrokeStyle>,
    pub radius: f64,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self::new(&BoxStyleConfig::default())
    }
}

impl BoxStyle {
    pub fn new(config: &BoxStyleConfig) -> Self {
        Self {
            color: config.color.unwrap_or(Color::rgb(0.8, 0.8, 0.8)),
            border: config.border.as_ref().map(StrokeStyle::new),
            radius: config.radius.unwrap_or(2.0),
        }
    }

    pub fn border_size(&self) -> f64 {
        self.border.map_or(0.0, |b| b.size)
    }

    fn paint(&self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64, radii: CornerRadii) {
        surface.set_fill(self.color);
        let mode = match &self.border {
            Some(border) => {
                border.setup(surface, scale);
                PaintMode::FillAndStroke
            }
            None => PaintMode::Fill,
        };
        surface.rounded_rect(bounds, radii, mode);
    }

    pub fn draw(&self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64) {
        self.paint(surface, bounds, scale, CornerRadii::uniform(self.radius * scale));
    }

    pub fn draw_rounded_top(&self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64) {
        self.paint(surface, bounds, scale, CornerRadii::top(self.radius * scale * 2.0));
    }

    /// Rounded top, square bottom, and a rule along the bottom edge.
    pub fn draw_underline(&self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64) {
        surface.set_fill(self.color);
        if let Some(border) = &self.border {
            border.setup(surface, scale);
        }
        surface.rounded_rect(
            bounds,
            CornerRadii::top(self.radius * scale * 2.0),
            PaintMode::Fill,
        );
        let y = bounds.bottom();
        surface.line(
            Vector2::new(bounds.pos.x, y),
            Vector2::new(bounds.right(), y),
        );
    }

    pub fn outline(&self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64) {
        if let Some(border) = &self.border {
            border.setup(surface, scale);
        }
        surface.rounded_rect(
            bounds,
            CornerRadii::uniform(self.radius * scale),
            PaintMode::Stroke,
        );
    }
}

// ─── Text box ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBoxStyleConfig {
    #[serde(rename = "box")]
    pub box_style: Option<BoxStyleConfig>,
    pub text: Option<TextStyleConfig>,
}

impl TextBoxStyleConfig {
    pub fn fallback(&self, fallback: &TextBoxStyleConfig) -> TextBoxStyleConfig {
        let box_style = match (&self.box_style, &fallback.box_style) {
            (Some(b), Some(f)) => Some(b.fallback(f)),
            (b, f) => b.or(*f),
        };
        let text = match (&self.text, &fallback.text) {
            (Some(t), Some(f)) => Some(t.fallback(f)),
            (t, f) => t.clone().or_else(|| f.clone()),
        };
        TextBoxStyleConfig { box_style, text }
    }
}

/// A box with a label centered inside it.
#[derive(Debug, Clone)]
pub struct TextBoxStyle {
    pub box_style: BoxStyle,
    pub text: TextStyle,
}

impl TextBoxStyle {
    pub fn new(config: &TextBoxStyleConfig) -> Self {
        Self {
            box_style: BoxStyle::new(&config.box_style.unwrap_or_default()),
            text: TextStyle::new(&config.text.clone().unwrap_or_default()),
        }
    }

    fn label(&mut self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64, label: &str) {
        self.text.setup(surface, scale);
        surface.set_text_align(TextAlign::Center);
        surface.set_text_baseline(TextBaseline::Middle);
        surface.fill_text(label, bounds.center());
    }

    pub fn draw(&mut self, surface: &mut dyn Surface, bounds: BoundingBox, scale: f64, label: &str) {
        self.box_style.draw(surface, bounds, scale);
        self.label(surface, bounds, scale, label);
    }

    pub fn draw_underline(
        &mut self,
        surface: &mut dyn Surface,
        bounds: BoundingBox,
        scale: f64,
        label: &str,
    ) {
        self.box_style.draw_underline(surface, bounds, scale);
        self.label(surface, bounds, scale, label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;

    #[test]
    fn fallback_fills_unset_fields_only() {
        let input = BoxStyleConfig {
            border: Some(StrokeStyleConfig {
                size: Some(3.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let fallback = BoxStyleConfig {
            color: Some(Color::WHITE),
            border: Some(StrokeStyleConfig::new(Color::BLACK, 1.0)),
            radius: Some(7.0),
        };
        let merged = input.fallback(&fallback);
        assert_eq!(merged.color, Some(Color::WHITE));
        assert_eq!(merged.radius, Some(7.0));
        assert_eq!(merged.border, Some(StrokeStyleConfig::new(Color::BLACK, 3.0)));
    }

    #[test]
    fn defaults_match_plain_box() {
        let style = BoxStyle::default();
        assert_eq!(style.radius, 2.0);
        assert_eq!(style.border_size(), 0.0);
    }

    #[test]
    fn borderless_box_only_fills() {
        let mut surface = HeadlessSurface::default();
        BoxStyle::default().draw(&mut surface, BoundingBox::from_xywh(0.0, 0.0, 10.0, 10.0), 2.0);
        let DrawOp::RoundedRect { mode, radii, .. } = &surface.ops()[0] else {
            panic!("expected rounded rect");
        };
        assert_eq!(*mode, PaintMode::Fill);
        assert_eq!(*radii, CornerRadii::uniform(4.0));
    }

    #[test]
    fn underline_draws_rule_at_bottom() {
        let mut surface = HeadlessSurface::default();
        let style = BoxStyle::new(&BoxStyleConfig {
            border: Some(StrokeStyleConfig::new(Color::BLACK, 2.0)),
            ..Default::default()
        });
        style.draw_underline(&mut surface, BoundingBox::from_xywh(5.0, 5.0, 20.0, 10.0), 1.0);
        assert_eq!(
            surface.ops()[1],
            DrawOp::Line {
                from: Vector2::new(5.0, 15.0),
                to: Vector2::new(25.0, 15.0),
                stroke: Color::BLACK,
                width: 2.0,
            }
        );
    }
}
