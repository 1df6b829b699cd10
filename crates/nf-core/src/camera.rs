use crate::geometry::Vector2;
use serde::{Deserialize, Serialize};

/// Zoom limits and starting zoom. Absent limits leave zoom unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub start: Option<f64>,
}

/// Maps graph space onto screen space: `screen = position + graph * zoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub zoom: f64,
    pub position: Vector2,
    config: CameraConfig,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            zoom: 1.0,
            position: Vector2::ZERO,
            config,
        };
        camera.set_zoom(config.start.unwrap_or(1.0));
        camera
    }

    fn clamp_zoom(&self, mut value: f64) -> f64 {
        if let Some(min) = self.config.min {
            value = value.max(min);
        }
        if let Some(max) = self.config.max {
            value = value.min(max);
        }
        value
    }

    pub fn set_zoom(&mut self, value: f64) {
        self.zoom = self.clamp_zoom(value);
    }

    pub fn add_zoom(&mut self, delta: f64) {
        self.set_zoom(self.zoom + delta);
    }

    /// Zoom by `amount` steps of 5% while keeping the graph point under
    /// `anchor` (screen space) fixed on screen.
    pub fn zoom_at(&mut self, amount: f64, anchor: Option<Vector2>) {
        let before = anchor.map(|a| self.screen_to_graph(a));
        self.add_zoom(amount * self.zoom * 0.05);

        if let (Some(anchor), Some(graph_pos)) = (anchor, before) {
            self.position = anchor - graph_pos * self.zoom;
        }
    }

    pub fn screen_to_graph(&self, screen: Vector2) -> Vector2 {
        Vector2::new(
            screen.x / self.zoom - self.position.x / self.zoom,
            screen.y / self.zoom - self.position.y / self.zoom,
        )
    }

    pub fn graph_to_screen(&self, graph: Vector2) -> Vector2 {
        Vector2::new(
            self.position.x + graph.x * self.zoom,
            self.position.y + graph.y * self.zoom,
        )
    }

    pub fn pan(&mut self, delta: Vector2) {
        self.position += delta;
    }

    pub fn reset(&mut self) {
        self.zoom = self.clamp_zoom(1.0);
        self.position = Vector2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_graph_roundtrip() {
        let mut camera = Camera::default();
        camera.zoom = 2.0;
        camera.position = Vector2::new(30.0, -10.0);

        let g = Vector2::new(12.5, 40.0);
        let s = camera.graph_to_screen(g);
        assert_eq!(s, Vector2::new(55.0, 70.0));
        assert_eq!(camera.screen_to_graph(s), g);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::new(CameraConfig {
            min: Some(0.5),
            max: Some(2.0),
            start: Some(4.0),
        });
        assert_eq!(camera.zoom, 2.0);
        camera.set_zoom(0.1);
        assert_eq!(camera.zoom, 0.5);
        camera.add_zoom(0.25);
        assert_eq!(camera.zoom, 0.75);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut camera = Camera::new(CameraConfig {
            min: Some(1.5),
            ..Default::default()
        });
        camera.pan(Vector2::new(5.0, 5.0));
        camera.reset();
        assert_eq!(camera.zoom, 1.5);
        assert_eq!(camera.position, Vector2::ZERO);
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut camera = Camera::default();
        camera.position = Vector2::new(100.0, 50.0);
        let anchor = Vector2::new(320.0, 240.0);
        let before = camera.screen_to_graph(anchor);

        camera.zoom_at(1.0, Some(anchor));
        assert!((camera.zoom - 1.05).abs() < 1e-9);

        let after = camera.screen_to_graph(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }
}
