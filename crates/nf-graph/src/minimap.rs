//! Overview of every node and note in the bottom right corner of the
//! surface, with the area outside the current view dimmed.

use nf_core::surface::{CornerRadii, PaintMode, Surface};
use nf_core::{BoundingBox, Camera, Color, Vector2, theme};
use serde::{Deserialize, Serialize};

const OUTSIDE_VIEW: Color = Color::rgba(10.0 / 255.0, 10.0 / 255.0, 10.0 / 255.0, 0.4);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
    /// Fraction of the surface width, 0 to 1.
    pub width: Option<f64>,
    /// Fraction of the surface height, 0 to 1.
    pub height: Option<f64>,
    pub padding: Option<f64>,
    pub min_map_zoom: Option<f64>,
    pub max_map_zoom: Option<f64>,
    pub map_zoom_factor: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimap {
    width: f64,
    height: f64,
    padding: f64,
    min_map_zoom: f64,
    max_map_zoom: f64,
    map_zoom_factor: f64,
}

impl Default for Minimap {
    fn default() -> Self {
        Self::new(&MinimapConfig::default())
    }
}

impl Minimap {
    pub fn new(config: &MinimapConfig) -> Self {
        Self {
            width: config.width.unwrap_or(0.16),
            height: config.height.unwrap_or(0.16),
            padding: config.padding.unwrap_or(10.0),
            min_map_zoom: config.min_map_zoom.unwrap_or(0.5),
            max_map_zoom: config.max_map_zoom.unwrap_or(1.0),
            map_zoom_factor: config.map_zoom_factor.unwrap_or(0.6),
        }
    }

    /// Screen-space area the map occupies.
    pub fn bounds(&self, surface: &dyn Surface) -> BoundingBox {
        let (w, h) = (surface.width() * self.width, surface.height() * self.height);
        BoundingBox::from_xywh(
            surface.width() - w - self.padding,
            surface.height() - h - self.padding,
            w,
            h,
        )
    }

    /// Map zoom for the given camera zoom.
    pub fn map_zoom(&self, camera_zoom: f64) -> f64 {
        (self.map_zoom_factor / camera_zoom).clamp(self.min_map_zoom, self.max_map_zoom)
    }

    /// Project a screen-space box onto the map.
    pub fn project(&self, surface: &dyn Surface, map: BoundingBox, zoom: f64, b: BoundingBox) -> BoundingBox {
        let (sw, sh) = (surface.width(), surface.height());
        let center = Vector2::new(sw * 0.5, sh * 0.5);
        BoundingBox::from_xywh(
            map.pos.x + ((b.pos.x - center.x) / sw) * map.size.x * zoom + map.size.x * 0.5,
            map.pos.y + ((b.pos.y - center.y) / sh) * map.size.y * zoom + map.size.y * 0.5,
            (b.size.x / sw) * map.size.x * zoom,
            (b.size.y / sh) * map.size.y * zoom,
        )
    }

    /// Draw the map over `nodes` and `notes`, both given as screen-space
    /// boxes. Nothing is drawn for an empty graph.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        camera: &Camera,
        nodes: &[BoundingBox],
        notes: &[BoundingBox],
    ) {
        if nodes.is_empty() && notes.is_empty() {
            return;
        }
        let theme = theme::current();
        let map = self.bounds(surface);
        let zoom = self.map_zoom(camera.zoom);

        surface.set_fill(theme.minimap.background);
        surface.rect(map, PaintMode::Fill);

        surface.save();
        surface.clip_rect(map);
        surface.set_line_width(theme.minimap.line_width);
        let layers = [
            (notes, theme.minimap.note_fill, theme.minimap.note_stroke),
            (nodes, theme.minimap.node_fill, theme.minimap.node_stroke),
        ];
        for (boxes, fill, stroke) in layers {
            surface.set_fill(fill);
            surface.set_stroke(stroke);
            for b in boxes {
                let projected = self.project(surface, map, zoom, *b);
                surface.rounded_rect(projected, CornerRadii::uniform(2.0), PaintMode::FillAndStroke);
            }
        }
        surface.restore();

        let view_size = Vector2::new(map.size.x * zoom, map.size.y * zoom);
        let view = BoundingBox::new(
            Vector2::new(
                map.pos.x + (map.size.x - view_size.x) * 0.5,
                map.pos.y + (map.size.y - view_size.y) * 0.5,
            ),
            view_size,
        );

        surface.save();
        surface.set_fill(OUTSIDE_VIEW);
        let outside = [
            BoundingBox::from_xywh(map.pos.x, map.pos.y, map.size.x, view.pos.y - map.pos.y),
            BoundingBox::from_xywh(map.pos.x, view.bottom(), map.size.x, map.bottom() - view.bottom()),
            BoundingBox::from_xywh(map.pos.x, view.pos.y, view.pos.x - map.pos.x, view.size.y),
            BoundingBox::from_xywh(view.right(), view.pos.y, map.right() - view.right(), view.size.y),
        ];
        for dim in outside {
            surface.rect(dim, PaintMode::Fill);
        }
        surface.restore();

        surface.set_line_width(theme.minimap.line_width);
        surface.set_stroke(theme.minimap.viewport_stroke);
        surface.rect(view, PaintMode::Stroke);
        surface.set_stroke(theme.minimap.border);
        surface.rect(map, PaintMode::Stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;

    #[test]
    fn sits_in_bottom_right_corner() {
        let surface = HeadlessSurface::new(1000.0, 500.0);
        let map = Minimap::default().bounds(&surface);
        assert_eq!(map, BoundingBox::from_xywh(830.0, 410.0, 160.0, 80.0));
    }

    #[test]
    fn map_zoom_is_clamped() {
        let minimap = Minimap::default();
        assert_eq!(minimap.map_zoom(0.1), 1.0);
        assert_eq!(minimap.map_zoom(1.0), 0.6);
        assert_eq!(minimap.map_zoom(10.0), 0.5);
    }

    #[test]
    fn screen_center_maps_to_map_center() {
        let surface = HeadlessSurface::new(1000.0, 500.0);
        let minimap = Minimap::default();
        let map = minimap.bounds(&surface);
        let projected = minimap.project(
            &surface,
            map,
            1.0,
            BoundingBox::from_xywh(500.0, 250.0, 100.0, 50.0),
        );
        assert_eq!(projected.pos, map.center());
        assert_eq!(projected.size, Vector2::new(16.0, 8.0));
    }

    #[test]
    fn empty_graph_draws_nothing() {
        let mut surface = HeadlessSurface::new(1000.0, 500.0);
        Minimap::default().render(&mut surface, &Camera::default(), &[], &[]);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn draws_one_box_per_element() {
        let mut surface = HeadlessSurface::new(1000.0, 500.0);
        let boxes = [BoundingBox::from_xywh(0.0, 0.0, 10.0, 10.0); 3];
        Minimap::default().render(&mut surface, &Camera::default(), &boxes[..2], &boxes[2..]);
        let rounded = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::RoundedRect { .. }))
            .count();
        assert_eq!(rounded, 3);
    }
}
