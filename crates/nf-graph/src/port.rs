//! Ports: typed attachment points on a node.
//!
//! A port keeps the ordered list of connections bound to it. Whether the
//! port renders empty or filled is derived from that list every frame.

use crate::popup::{PostProcess, Popup};
use nf_core::surface::{PaintMode, Surface};
use nf_core::text::FontStyle;
use nf_core::{
    BoundingBox, Color, ConnectionId, DataType, NodeId, Text, TextStyleConfig, Vector2,
    fallback_port_color, theme,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    Input,
    InputArray,
    Output,
    OutputArray,
}

impl PortType {
    pub fn is_input(self) -> bool {
        matches!(self, PortType::Input | PortType::InputArray)
    }

    pub fn is_array(self) -> bool {
        matches!(self, PortType::InputArray | PortType::OutputArray)
    }

    pub fn input(array: bool) -> Self {
        if array { PortType::InputArray } else { PortType::Input }
    }

    pub fn output(array: bool) -> Self {
        if array { PortType::OutputArray } else { PortType::Output }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortStyleConfig {
    pub border_color: Option<Color>,
    pub fill_color: Option<Color>,
    pub border_size: Option<f64>,
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub description: Option<String>,
    pub array: bool,
    pub empty_style: PortStyleConfig,
    pub filled_style: PortStyleConfig,
}

impl PortConfig {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data_type: Some(data_type.into()),
            ..Default::default()
        }
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortStyle {
    pub border_color: Color,
    pub fill_color: Color,
    pub border_size: f64,
    pub size: f64,
}

// ─── Events ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection: ConnectionId,
    /// Position in the port's connection list when the event fired.
    pub index: usize,
    pub port_type: PortType,
    pub node: NodeId,
}

type ConnectionListener = Box<dyn FnMut(&ConnectionEvent)>;

// ─── Port ────────────────────────────────────────────────────────────────

pub struct Port {
    node: NodeId,
    port_type: PortType,
    name: String,
    data_type: DataType,
    empty_style: PortStyleConfig,
    filled_style: PortStyleConfig,
    connections: SmallVec<[ConnectionId; 4]>,
    bounds: Option<BoundingBox>,
    popup: Popup,
    listeners: Vec<(ConnectionEventKind, ConnectionListener)>,
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("node", &self.node)
            .field("port_type", &self.port_type)
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

impl Port {
    pub fn new(node: NodeId, port_type: PortType, config: &PortConfig) -> Self {
        let data_type = DataType::intern(config.data_type.as_deref().unwrap_or(""));

        let label = if port_type.is_array() {
            format!("Array<{data_type}>")
        } else {
            data_type.to_string()
        };
        let mut popup = Popup::new().line(
            Text::new(label, &TextStyleConfig::default().with_color(Color::WHITE)),
            0.0,
        );
        if let Some(description) = config.description.as_deref().filter(|d| !d.is_empty()) {
            let style = TextStyleConfig::default()
                .with_color(Color::WHITE)
                .with_style(FontStyle::Italic);
            let mut text = Text::new(description, &style);
            text.set_max_width(Some(400.0));
            popup = popup.line(text, 16.0);
        }

        Self {
            node,
            port_type,
            name: config.name.clone().unwrap_or_else(|| "Port".into()),
            data_type,
            empty_style: config.empty_style,
            filled_style: config.filled_style,
            connections: SmallVec::new(),
            bounds: None,
            popup,
            listeners: Vec::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Hit box from the last frame this port was drawn in.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn add_connection_listener(
        &mut self,
        kind: ConnectionEventKind,
        listener: impl FnMut(&ConnectionEvent) + 'static,
    ) {
        self.listeners.push((kind, Box::new(listener)));
    }

    fn fire(&mut self, kind: ConnectionEventKind, connection: ConnectionId, index: usize) {
        let event = ConnectionEvent {
            kind,
            connection,
            index,
            port_type: self.port_type,
            node: self.node,
        };
        for (k, listener) in &mut self.listeners {
            if *k == kind {
                listener(&event);
            }
        }
    }

    pub fn add_connection(&mut self, connection: ConnectionId) {
        let index = self.connections.len();
        self.connections.push(connection);
        self.fire(ConnectionEventKind::Added, connection, index);
    }

    /// Overwrite the connection at `index`, appending when the list is
    /// shorter.
    pub fn replace_connection(&mut self, connection: ConnectionId, index: usize) {
        match self.connections.get_mut(index) {
            Some(slot) => *slot = connection,
            None => self.connections.push(connection),
        }
        let index = index.min(self.connections.len() - 1);
        self.fire(ConnectionEventKind::Added, connection, index);
    }

    /// Remove `connection`. Returns false, after logging, when it was never
    /// bound here.
    pub fn clear_connection(&mut self, connection: ConnectionId) -> bool {
        let Some(index) = self.connections.iter().position(|c| *c == connection) else {
            log::error!(
                "no connection {connection} found to remove from port {:?} on {}",
                self.name,
                self.node
            );
            return false;
        };
        self.connections.remove(index);
        self.fire(ConnectionEventKind::Removed, connection, index);
        true
    }

    /// Style resolved against the current theme.
    pub fn style(&self, filled: bool) -> PortStyle {
        let theme = theme::current();
        let (config, saturation, size) = if filled {
            (&self.filled_style, 0.2, 5.0)
        } else {
            (&self.empty_style, 0.3, 4.0)
        };
        PortStyle {
            border_color: config
                .border_color
                .unwrap_or(theme.node.port_border_color),
            fill_color: config
                .fill_color
                .unwrap_or_else(|| fallback_port_color(self.data_type.as_str(), saturation)),
            border_size: config.border_size.unwrap_or(1.0),
            size: config.size.unwrap_or(size),
        }
    }

    pub fn filled_color(&self) -> Color {
        self.style(true).fill_color
    }

    /// Draw centered on `position` and record the hit box. Hovering grows
    /// the port and queues its data-type popup.
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        zoom: f64,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
    ) -> BoundingBox {
        let style = self.style(!self.connections.is_empty());
        let mut radius = style.size * zoom;

        if let (Some(mouse), Some(bounds)) = (mouse, self.bounds)
            && bounds.contains(mouse)
        {
            radius *= 1.25;
            let mut popup = self.popup.clone();
            post.queue(move |surface| popup.render(surface, position));
        }

        let bounds = BoundingBox::from_xywh(
            position.x - radius,
            position.y - radius,
            radius * 2.0,
            radius * 2.0,
        );
        self.bounds = Some(bounds);

        surface.set_stroke(style.border_color);
        surface.set_line_width(style.border_size * zoom);
        surface.set_fill(style.fill_color);
        if self.port_type == PortType::InputArray {
            surface.rect(bounds, PaintMode::FillAndStroke);
        } else {
            surface.circle(position, radius, PaintMode::FillAndStroke);
        }

        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn port(port_type: PortType) -> Port {
        Port::new(
            NodeId::intern("port-test"),
            port_type,
            &PortConfig::new("in", "float"),
        )
    }

    #[test]
    fn defaults() {
        let p = Port::new(NodeId::intern("n"), PortType::Output, &PortConfig::default());
        assert_eq!(p.display_name(), "Port");
        assert_eq!(p.data_type().as_str(), "");
        assert!(p.connections().is_empty());
    }

    #[test]
    fn listeners_see_indices() {
        let mut p = port(PortType::InputArray);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [ConnectionEventKind::Added, ConnectionEventKind::Removed] {
            let seen = seen.clone();
            p.add_connection_listener(kind, move |e| {
                seen.borrow_mut().push((e.kind, e.index))
            });
        }

        let a = ConnectionId::next();
        let b = ConnectionId::next();
        p.add_connection(a);
        p.add_connection(b);
        assert!(p.clear_connection(a));

        assert_eq!(
            *seen.borrow(),
            vec![
                (ConnectionEventKind::Added, 0),
                (ConnectionEventKind::Added, 1),
                (ConnectionEventKind::Removed, 0),
            ]
        );
        assert_eq!(p.connections(), &[b]);
    }

    #[test]
    fn clearing_unknown_connection_fails() {
        let mut p = port(PortType::Input);
        assert!(!p.clear_connection(ConnectionId::next()));
    }

    #[test]
    fn replace_overwrites_slot() {
        let mut p = port(PortType::Input);
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        p.add_connection(a);
        p.replace_connection(b, 0);
        assert_eq!(p.connections(), &[b]);
    }

    #[test]
    fn fill_follows_connection_count() {
        let mut p = port(PortType::Input);
        assert_eq!(p.style(false).size, 4.0);
        assert_eq!(p.style(true).size, 5.0);
        assert_eq!(p.style(false).fill_color, fallback_port_color("float", 0.3));

        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        p.add_connection(ConnectionId::next());
        let bounds = p.render(&mut surface, Vector2::new(10.0, 10.0), 2.0, None, &mut post);
        assert_eq!(bounds, BoundingBox::from_xywh(0.0, 0.0, 20.0, 20.0));
        assert!(matches!(
            surface.ops()[0],
            DrawOp::Circle { radius, .. } if radius == 10.0
        ));
    }

    #[test]
    fn input_arrays_render_square() {
        let mut p = port(PortType::InputArray);
        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        p.render(&mut surface, Vector2::new(10.0, 10.0), 1.0, None, &mut post);
        assert!(matches!(surface.ops()[0], DrawOp::Rect { .. }));
    }

    #[test]
    fn hover_grows_and_queues_popup() {
        let mut p = port(PortType::Output);
        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        let at = Vector2::new(50.0, 50.0);
        p.render(&mut surface, at, 1.0, None, &mut post);
        assert!(post.is_empty());

        let bounds = p.render(&mut surface, at, 1.0, Some(at), &mut post);
        assert_eq!(bounds.size, Vector2::new(10.0, 10.0));
        assert_eq!(post.len(), 1);

        post.flush(&mut surface);
        assert!(surface.texts().contains(&"float"));
    }
}
