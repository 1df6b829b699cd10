//! Connections between an output port and an input port.
//!
//! Either end may be unbound while the user drags a new link. A connection
//! registers itself with the port on every bound end, so a port's list
//! always mirrors the connections pointing at it.

use crate::error::{GraphError, Result};
use crate::node::NodeMap;
use crate::port::{Port, PortType};
use nf_core::surface::Surface;
use nf_core::{Color, ConnectionId, NodeId, Vector2};
use serde::{Deserialize, Serialize};

/// One bound end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: usize,
}

impl Endpoint {
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

fn port_ref(nodes: &NodeMap, end: Endpoint, input: bool) -> Option<&Port> {
    let node = nodes.get(&end.node)?;
    if input {
        node.input_port(end.port)
    } else {
        node.output_port(end.port)
    }
}

fn port_mut(nodes: &mut NodeMap, end: Endpoint, input: bool) -> Result<&mut Port> {
    let node = nodes
        .get_mut(&end.node)
        .ok_or(GraphError::NodeNotFound(end.node))?;
    let port = if input {
        node.input_port_mut(end.port)
    } else {
        node.output_port_mut(end.port)
    };
    port.ok_or(GraphError::PortOutOfRange {
        node: end.node,
        kind: if input { PortType::Input } else { PortType::Output },
        index: end.port,
    })
}

// ─── Rendering ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRendererConfig {
    pub size: Option<f64>,
    pub color: Option<Color>,
    pub mouse_over_size: Option<f64>,
    pub mouse_over_color: Option<Color>,
}

pub struct ConnectionRenderParams<'a> {
    /// Input end, or the cursor while the input is unbound.
    pub start: Vector2,
    /// Output end, or the cursor while the output is unbound.
    pub end: Vector2,
    pub scale: f64,
    pub mouse_over: bool,
    pub in_port: Option<&'a Port>,
    pub out_port: Option<&'a Port>,
    pub in_node_selected: bool,
    pub out_node_selected: bool,
}

pub trait ConnectionRenderer {
    fn render(&self, surface: &mut dyn Surface, params: &ConnectionRenderParams<'_>);
}

impl<F> ConnectionRenderer for F
where
    F: Fn(&mut dyn Surface, &ConnectionRenderParams<'_>),
{
    fn render(&self, surface: &mut dyn Surface, params: &ConnectionRenderParams<'_>) {
        self(surface, params)
    }
}

/// Bezier in the output port's filled color. Thickens and glows while a
/// port of the connection is hovered or either node is selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultConnectionRenderer {
    size: f64,
    color: Option<Color>,
    mouse_over_size: f64,
    mouse_over_color: Option<Color>,
}

impl Default for DefaultConnectionRenderer {
    fn default() -> Self {
        Self::new(&ConnectionRendererConfig::default())
    }
}

impl DefaultConnectionRenderer {
    pub fn new(config: &ConnectionRendererConfig) -> Self {
        Self {
            size: config.size.unwrap_or(2.0),
            color: config.color,
            mouse_over_size: config.mouse_over_size.unwrap_or(4.0),
            mouse_over_color: config.mouse_over_color,
        }
    }
}

impl ConnectionRenderer for DefaultConnectionRenderer {
    fn render(&self, surface: &mut dyn Surface, params: &ConnectionRenderParams<'_>) {
        let mut color = params
            .out_port
            .or(params.in_port)
            .map_or(Color::rgb(0.0, 1.0, 0.0), Port::filled_color);
        if let Some(c) = self.color {
            color = c;
        }

        let mut width = self.size * params.scale;
        let highlighted =
            params.mouse_over || params.in_node_selected || params.out_node_selected;

        surface.save();
        if highlighted {
            width = self.mouse_over_size * params.scale;
            if let Some(c) = self.mouse_over_color {
                color = c;
            }
            surface.set_shadow(color, 25.0 * params.scale);
        }
        surface.set_stroke(color);
        surface.set_line_width(width);
        surface.bezier(params.start, params.end);
        surface.restore();
    }
}

// ─── Connection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    input: Option<Endpoint>,
    output: Option<Endpoint>,
}

impl Connection {
    /// Create a connection already registered with the ports on its bound
    /// ends. Nothing is registered when either end does not resolve.
    pub fn new(
        nodes: &mut NodeMap,
        input: Option<Endpoint>,
        output: Option<Endpoint>,
    ) -> Result<Self> {
        if let Some(end) = input {
            port_mut(nodes, end, true)?;
        }
        if let Some(end) = output {
            port_mut(nodes, end, false)?;
        }

        let id = ConnectionId::next();
        if let Some(end) = input {
            port_mut(nodes, end, true)?.add_connection(id);
        }
        if let Some(end) = output {
            port_mut(nodes, end, false)?.add_connection(id);
        }
        Ok(Self { id, input, output })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn input(&self) -> Option<Endpoint> {
        self.input
    }

    pub fn output(&self) -> Option<Endpoint> {
        self.output
    }

    pub fn in_port<'n>(&self, nodes: &'n NodeMap) -> Option<&'n Port> {
        port_ref(nodes, self.input?, true)
    }

    pub fn out_port<'n>(&self, nodes: &'n NodeMap) -> Option<&'n Port> {
        port_ref(nodes, self.output?, false)
    }

    pub fn is_dangling(&self) -> bool {
        self.input.is_none() || self.output.is_none()
    }

    pub fn references_node(&self, node: NodeId) -> bool {
        self.input.is_some_and(|e| e.node == node) || self.output.is_some_and(|e| e.node == node)
    }

    pub fn clear_input(&mut self, nodes: &mut NodeMap) {
        if let Some(end) = self.input.take()
            && let Ok(port) = port_mut(nodes, end, true)
        {
            port.clear_connection(self.id);
        }
    }

    pub fn clear_output(&mut self, nodes: &mut NodeMap) {
        if let Some(end) = self.output.take()
            && let Ok(port) = port_mut(nodes, end, false)
        {
            port.clear_connection(self.id);
        }
    }

    pub fn clear_ports(&mut self, nodes: &mut NodeMap) {
        self.clear_input(nodes);
        self.clear_output(nodes);
    }

    /// Bind the input end. With `replace`, an occupied port has its first
    /// slot overwritten instead of growing.
    pub fn set_input(&mut self, nodes: &mut NodeMap, end: Endpoint, replace: bool) -> Result<()> {
        let id = self.id;
        let port = port_mut(nodes, end, true)?;
        if replace && !port.connections().is_empty() {
            port.replace_connection(id, 0);
        } else {
            port.add_connection(id);
        }
        self.input = Some(end);
        Ok(())
    }

    pub fn set_output(&mut self, nodes: &mut NodeMap, end: Endpoint) -> Result<()> {
        port_mut(nodes, end, false)?.add_connection(self.id);
        self.output = Some(end);
        Ok(())
    }

    /// The bound end whose port box contains `mouse`, input side first.
    /// The flag is true for the input side.
    pub fn mouse_over_port(&self, nodes: &NodeMap, mouse: Vector2) -> Option<(Endpoint, bool)> {
        let hit = |end: Option<Endpoint>, input: bool| {
            let end = end?;
            let bounds = port_ref(nodes, end, input)?.bounds()?;
            bounds.contains(mouse).then_some((end, input))
        };
        hit(self.input, true).or_else(|| hit(self.output, false))
    }

    fn end_position(
        nodes: &NodeMap,
        end: Option<Endpoint>,
        input: bool,
        mouse: Option<Vector2>,
    ) -> Option<Vector2> {
        match end {
            Some(end) => Some(port_ref(nodes, end, input)?.bounds()?.center()),
            None => mouse,
        }
    }

    /// Draw between the port centers recorded last frame. An unbound end
    /// follows the cursor; nothing is drawn when an end has no position.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        nodes: &NodeMap,
        scale: f64,
        mouse_over: bool,
        mouse: Option<Vector2>,
        renderer: &dyn ConnectionRenderer,
    ) {
        if self.input.is_none() && self.output.is_none() {
            return;
        }
        let Some(start) = Self::end_position(nodes, self.input, true, mouse) else {
            return;
        };
        let Some(end) = Self::end_position(nodes, self.output, false, mouse) else {
            return;
        };

        let selected = |e: Option<Endpoint>| {
            e.and_then(|e| nodes.get(&e.node))
                .is_some_and(|n| n.is_selected())
        };
        renderer.render(
            surface,
            &ConnectionRenderParams {
                start,
                end,
                scale,
                mouse_over,
                in_port: self.in_port(nodes),
                out_port: self.out_port(nodes),
                in_node_selected: selected(self.input),
                out_node_selected: selected(self.output),
            },
        );
    }
}
