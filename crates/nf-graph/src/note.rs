//! FlowNote: a markdown annotation with a fixed layout width.
//!
//! While unlocked and hovered, a note shows resize handles on its left and
//! right edges. Resizing follows the cursor during render, so the width is
//! always in step with the frame being drawn.

use crate::style::{BoxStyle, BoxStyleConfig, StrokeStyleConfig};
use indexmap::IndexMap;
use nf_core::markdown::{MarkdownEntry, parse};
use nf_core::surface::{Surface, TextAlign, TextBaseline};
use nf_core::{BoundingBox, Camera, Color, NoteId, Vector2, theme};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BOUNDS_SPACING: f64 = 20.0;
const HANDLE_SIZE: f64 = 10.0;
const HANDLE_FILL: Color = Color::rgb(41.0 / 255.0, 54.0 / 255.0, 57.0 / 255.0);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowNoteConfig {
    pub text: Option<String>,
    pub position: Vector2,
    /// Layout width in graph units. Defaults to 500.
    pub width: Option<f64>,
    pub locked: bool,
    pub metadata: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    Left,
    Right,
}

type ContentCallback = Box<dyn FnMut(NoteId, &str)>;
type WidthCallback = Box<dyn FnMut(NoteId, f64)>;

pub struct FlowNote {
    id: NoteId,
    text: String,
    document: Vec<MarkdownEntry>,
    width: f64,
    position: Vector2,
    locked: bool,
    hovering: bool,
    handle: Option<DragHandle>,
    last_bounds: BoundingBox,
    handle_style: BoxStyle,
    metadata: IndexMap<String, Value>,
    content_listeners: Vec<ContentCallback>,
    width_listeners: Vec<WidthCallback>,
}

impl std::fmt::Debug for FlowNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowNote")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("position", &self.position)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl Default for FlowNote {
    fn default() -> Self {
        Self::new(FlowNoteConfig::default())
    }
}

impl FlowNote {
    pub fn new(config: FlowNoteConfig) -> Self {
        let text = config.text.unwrap_or_default();
        Self {
            id: NoteId::next(),
            document: parse(&text),
            text,
            width: config.width.unwrap_or(500.0),
            position: config.position,
            locked: config.locked,
            hovering: false,
            handle: None,
            last_bounds: BoundingBox::default(),
            handle_style: BoxStyle::new(&BoxStyleConfig {
                color: Some(HANDLE_FILL),
                border: Some(StrokeStyleConfig::new(Color::WHITE, 1.0)),
                radius: Some(2.0),
            }),
            metadata: config.metadata,
            content_listeners: Vec::new(),
            width_listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the markdown source and reparse it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.document = parse(&self.text);
        for callback in &mut self.content_listeners {
            callback(self.id, &self.text);
        }
    }

    pub fn add_content_change_listener(&mut self, callback: impl FnMut(NoteId, &str) + 'static) {
        self.content_listeners.push(Box::new(callback));
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
        for callback in &mut self.width_listeners {
            callback(self.id, width);
        }
    }

    pub fn add_width_change_listener(&mut self, callback: impl FnMut(NoteId, f64) + 'static) {
        self.width_listeners.push(Box::new(callback));
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vector2) {
        self.position += delta;
    }

    pub fn metadata_property(&self, name: &str) -> Option<&Value> {
        self.metadata.get(name)
    }

    pub fn set_metadata_property(&mut self, name: impl Into<String>, value: Value) {
        self.metadata.insert(name.into(), value);
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn handle_selected(&self) -> Option<DragHandle> {
        self.handle
    }

    pub fn select_handle(&mut self, handle: Option<DragHandle>) {
        self.handle = handle;
    }

    pub fn set_hovering(&mut self, hovering: bool) {
        self.hovering = hovering;
    }

    /// Screen-space box of the last render, padded on every side.
    pub fn bounds(&self) -> BoundingBox {
        self.last_bounds
    }

    pub fn left_handle_box(&self) -> BoundingBox {
        let b = self.last_bounds;
        BoundingBox::from_xywh(
            b.pos.x - HANDLE_SIZE / 2.0,
            b.pos.y + b.size.y / 2.0 - HANDLE_SIZE / 2.0,
            HANDLE_SIZE,
            HANDLE_SIZE,
        )
    }

    pub fn right_handle_box(&self) -> BoundingBox {
        let mut handle = self.left_handle_box();
        handle.pos.x += self.last_bounds.size.x;
        handle
    }

    fn resize(&mut self, camera: &Camera, mouse: Vector2) {
        let left = self.position.x * camera.zoom + camera.position.x;
        match self.handle {
            Some(DragHandle::Right) => {
                self.set_width(((mouse.x - left) / camera.zoom).max(1.0));
            }
            Some(DragHandle::Left) => {
                // Right edge stays put.
                let right = left + self.width * camera.zoom;
                self.set_width(((right - mouse.x) / camera.zoom).max(1.0));
                self.position.x = (right - self.width * camera.zoom - camera.position.x) / camera.zoom;
            }
            None => {}
        }
    }

    fn render_edit_frame(&self, surface: &mut dyn Surface, camera: &Camera) {
        self.handle_style.draw(surface, self.left_handle_box(), camera.zoom);
        self.handle_style.draw(surface, self.right_handle_box(), camera.zoom);

        let b = self.last_bounds;
        let (left, right) = (b.pos.x, b.right());
        let half = b.size.y / 2.0;
        for (edge, toward) in [(b.pos.y, half - HANDLE_SIZE), (b.bottom(), -(half - HANDLE_SIZE))] {
            surface.line(Vector2::new(left, edge + toward), Vector2::new(left, edge));
            surface.line(Vector2::new(left, edge), Vector2::new(right, edge));
            surface.line(Vector2::new(right, edge), Vector2::new(right, edge + toward));
        }
    }

    pub fn render(&mut self, surface: &mut dyn Surface, camera: &Camera, mouse: Option<Vector2>) {
        if !self.locked && (self.hovering || self.handle.is_some()) {
            if let Some(mouse) = mouse {
                self.resize(camera, mouse);
            }
            self.render_edit_frame(surface, camera);
        }

        let theme = theme::current();
        let start = camera.graph_to_screen(self.position);
        let spacing = theme.note.entry_spacing * camera.zoom;

        surface.set_text_align(TextAlign::Left);
        surface.set_text_baseline(TextBaseline::Alphabetic);
        let mut cursor = start;
        for entry in &mut self.document {
            cursor.y += entry.render(surface, cursor, camera.zoom, self.width) + spacing;
        }

        self.last_bounds = BoundingBox::from_xywh(
            start.x - BOUNDS_SPACING,
            start.y - BOUNDS_SPACING,
            camera.zoom * self.width + BOUNDS_SPACING * 2.0,
            cursor.y - start.y + BOUNDS_SPACING * 2.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::HeadlessSurface;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rendered(config: FlowNoteConfig) -> FlowNote {
        let mut note = FlowNote::new(config);
        let mut surface = HeadlessSurface::default();
        note.render(&mut surface, &Camera::default(), None);
        note
    }

    #[test]
    fn defaults() {
        let note = FlowNote::default();
        assert_eq!(note.width(), 500.0);
        assert!(!note.is_locked());
        assert_eq!(note.text(), "");
    }

    #[test]
    fn bounds_are_padded() {
        let note = rendered(FlowNoteConfig {
            text: Some("hello".into()),
            position: Vector2::new(100.0, 100.0),
            width: Some(200.0),
            ..Default::default()
        });
        let b = note.bounds();
        assert_eq!(b.pos, Vector2::new(80.0, 80.0));
        assert_eq!(b.size.x, 240.0);
        assert!(b.size.y > 40.0);
        assert_eq!(note.right_handle_box().pos.x - note.left_handle_box().pos.x, 240.0);
    }

    #[test]
    fn left_handle_keeps_right_edge() {
        let mut note = rendered(FlowNoteConfig {
            text: Some("text".into()),
            width: Some(300.0),
            ..Default::default()
        });
        note.set_hovering(true);
        note.select_handle(Some(DragHandle::Left));
        let mut surface = HeadlessSurface::default();
        note.render(&mut surface, &Camera::default(), Some(Vector2::new(100.0, 0.0)));
        assert_eq!(note.width(), 200.0);
        assert_eq!(note.position().x + note.width(), 300.0);
    }

    #[test]
    fn width_never_collapses() {
        let mut note = rendered(FlowNoteConfig::default());
        note.select_handle(Some(DragHandle::Right));
        let mut surface = HeadlessSurface::default();
        note.render(&mut surface, &Camera::default(), Some(Vector2::new(-50.0, 0.0)));
        assert_eq!(note.width(), 1.0);
    }

    #[test]
    fn locked_notes_ignore_handles() {
        let mut note = rendered(FlowNoteConfig {
            locked: true,
            ..Default::default()
        });
        note.select_handle(Some(DragHandle::Right));
        let mut surface = HeadlessSurface::default();
        note.render(&mut surface, &Camera::default(), Some(Vector2::new(50.0, 0.0)));
        assert_eq!(note.width(), 500.0);
    }

    #[test]
    fn listeners_fire() {
        let mut note = FlowNote::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        note.add_content_change_listener(move |_, text| sink.borrow_mut().push(text.to_string()));
        let widths = Rc::new(RefCell::new(Vec::new()));
        let sink = widths.clone();
        note.add_width_change_listener(move |_, w| sink.borrow_mut().push(w));

        note.set_text("# Title");
        note.set_width(42.0);
        assert_eq!(*seen.borrow(), vec!["# Title".to_string()]);
        assert_eq!(*widths.borrow(), vec![42.0]);
    }
}
