//! The node layer: owns every node and connection, hit-tests them each
//! frame and runs the click/drag/release gestures over them.
//!
//! Hover state is captured while rendering and consumed by the next
//! `click_start`, so input always acts on what was last drawn.

use crate::connection::{
    Connection, ConnectionRenderer, ConnectionRendererConfig, DefaultConnectionRenderer, Endpoint,
};
use crate::error::{GraphError, Result};
use crate::node::{FlowNode, NodeMap, NodeState, PortHit};
use crate::organize::organize;
use crate::popup::PostProcess;
use crate::port::{Port, PortConfig, PortType};
use crate::publisher::{NodeFactory, NodeFactoryConfig, Publisher};
use crate::style::{BoxStyle, BoxStyleConfig, StrokeStyleConfig};
use crate::subsystem::{CursorStyle, GraphAction, GraphSubsystem, RenderResults};
use crate::widget::create_widget;
use nf_core::surface::Surface;
use nf_core::theme::{self, Theme, ThemeSubscription};
use nf_core::{
    BoundingBox, Camera, Color, ConnectionId, ContextMenuConfig, ContextMenuItemConfig, NodeId,
    Vector2, combine_context_menus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NODE_MENU_GROUP: &str = "node-flow-graph-node-menu";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSubsystemConfig {
    pub idle_connection: ConnectionRendererConfig,
    pub nodes: NodeFactoryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PortHover {
    node: NodeId,
    hit: PortHit,
}

impl PortHover {
    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.node, self.hit.index)
    }
}

/// Drag-select anchors in graph space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoxSelect {
    start: Vector2,
    end: Vector2,
}

impl BoxSelect {
    fn screen_box(&self, camera: &Camera) -> BoundingBox {
        let pos = camera.graph_to_screen(self.start);
        BoundingBox::new(pos, camera.graph_to_screen(self.end) - pos)
    }
}

fn box_select_style(theme: &Theme) -> BoxStyle {
    BoxStyle::new(&BoxStyleConfig {
        color: Some(Color::TRANSPARENT),
        border: Some(StrokeStyleConfig::new(
            theme.box_select.color,
            theme.box_select.size,
        )),
        radius: Some(theme.box_select.radius),
    })
}

type NodeCallback = Box<dyn FnMut(&FlowNode)>;

pub struct NodeSubsystem {
    nodes: NodeMap,
    connections: Vec<Connection>,
    factory: NodeFactory,
    renderer: Box<dyn ConnectionRenderer>,

    node_hovering: Option<NodeId>,
    port_hovering: Option<PortHover>,
    widget_hovering: Option<(NodeId, usize)>,
    widget_clicking: Option<(NodeId, usize)>,
    nodes_grabbed: Vec<NodeId>,
    connection_selected: Option<ConnectionId>,
    box_select: Option<BoxSelect>,
    box_selection: Vec<NodeId>,
    box_style: BoxStyle,
    theme: ThemeSubscription,
    pending_organize: Option<Option<Vec<NodeId>>>,

    added: Vec<NodeCallback>,
    removed: Vec<NodeCallback>,
}

impl std::fmt::Debug for NodeSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSubsystem")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("node_hovering", &self.node_hovering)
            .field("connection_selected", &self.connection_selected)
            .finish_non_exhaustive()
    }
}

impl Default for NodeSubsystem {
    fn default() -> Self {
        Self::new(NodeSubsystemConfig::default())
    }
}

impl NodeSubsystem {
    pub fn new(config: NodeSubsystemConfig) -> Self {
        Self {
            nodes: NodeMap::new(),
            connections: Vec::new(),
            factory: NodeFactory::new(config.nodes),
            renderer: Box::new(DefaultConnectionRenderer::new(&config.idle_connection)),
            node_hovering: None,
            port_hovering: None,
            widget_hovering: None,
            widget_clicking: None,
            nodes_grabbed: Vec::new(),
            connection_selected: None,
            box_select: None,
            box_selection: Vec::new(),
            box_style: box_select_style(&theme::current()),
            theme: theme::subscribe(),
            pending_organize: None,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn set_connection_renderer(&mut self, renderer: impl ConnectionRenderer + 'static) {
        self.renderer = Box::new(renderer);
    }

    // ─── Publishers ──────────────────────────────────────────────────────

    pub fn add_publisher(&mut self, id: impl Into<String>, publisher: Publisher) {
        self.factory.add_publisher(id, publisher);
    }

    pub fn node_factory(&self) -> &NodeFactory {
        &self.factory
    }

    pub fn node_factory_mut(&mut self) -> &mut NodeFactory {
        &mut self.factory
    }

    pub fn add_node_created_listener(&mut self, callback: impl FnMut(&str, &str, &FlowNode) + 'static) {
        self.factory.add_node_created_listener(callback);
    }

    pub fn add_node_added_listener(&mut self, callback: impl FnMut(&FlowNode) + 'static) {
        self.added.push(Box::new(callback));
    }

    pub fn add_node_removed_listener(&mut self, callback: impl FnMut(&FlowNode) + 'static) {
        self.removed.push(Box::new(callback));
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FlowNode> {
        self.nodes.get_mut(&id)
    }

    /// Screen-space bounds of every node under `camera`.
    pub fn node_bounds(&mut self, surface: &mut dyn Surface, camera: &Camera) -> Vec<BoundingBox> {
        self.nodes
            .values_mut()
            .map(|node| node.calculate_bounds(surface, camera))
            .collect()
    }

    /// Node under the cursor as of the last render.
    pub fn hovered_node(&self) -> Option<NodeId> {
        self.node_hovering
    }

    /// Add a node. A node already present under the same id is removed
    /// first, along with its connections.
    pub fn add_node(&mut self, node: FlowNode) -> NodeId {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            log::warn!("replacing existing node {id}");
            if let Err(err) = self.remove_node(id) {
                log::error!("failed to replace node {id}: {err}");
            }
        }
        self.nodes.insert(id, node);
        if let Some(node) = self.nodes.get(&id) {
            for callback in &mut self.added {
                callback(node);
            }
        }
        log::debug!("node {id} added");
        id
    }

    /// Build a node from a registered publisher and place it at `position`.
    pub fn create_node(&mut self, publisher: &str, node_type: &str, position: Vector2) -> Result<NodeId> {
        let mut node = self.factory.create(publisher, node_type)?;
        node.set_position(position);
        Ok(self.add_node(node))
    }

    /// Remove a node and every connection that touches it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<FlowNode> {
        if !self.nodes.contains_key(&id) {
            log::error!("no node {id} to remove");
            return Err(GraphError::NodeNotFound(id));
        }
        self.remove_node_connections(id);
        let node = self.nodes.shift_remove(&id).ok_or(GraphError::NodeNotFound(id))?;

        self.nodes_grabbed.retain(|n| *n != id);
        self.box_selection.retain(|n| *n != id);
        if self.node_hovering == Some(id) {
            self.node_hovering = None;
        }
        if self.port_hovering.is_some_and(|p| p.node == id) {
            self.port_hovering = None;
        }
        if self.widget_hovering.is_some_and(|(n, _)| n == id) {
            self.widget_hovering = None;
        }
        if self.widget_clicking.is_some_and(|(n, _)| n == id) {
            self.widget_clicking = None;
        }

        for callback in &mut self.removed {
            callback(&node);
        }
        log::debug!("node {id} removed");
        Ok(node)
    }

    /// Drop every connection touching `id`.
    pub fn remove_node_connections(&mut self, id: NodeId) {
        let mut i = self.connections.len();
        while i > 0 {
            i -= 1;
            if self.connections[i].references_node(id) {
                self.remove_connection_at(i);
            }
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_node(&mut self, id: NodeId, unselect_others: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.select();
        if !unselect_others {
            return;
        }
        for (other, node) in self.nodes.iter_mut() {
            if *other != id {
                node.unselect();
            }
        }
    }

    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_selected())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Nodes feeding the inputs of `id`.
    pub fn connected_input_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|c| c.input().is_some_and(|e| e.node == id))
            .filter_map(|c| c.output().map(|e| e.node))
            .collect()
    }

    /// Nodes fed by the outputs of `id`.
    pub fn connected_output_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|c| c.output().is_some_and(|e| e.node == id))
            .filter_map(|c| c.input().map(|e| e.node))
            .collect()
    }

    /// Select `id` and its direct neighbours on both sides.
    pub fn select_connected_nodes(&mut self, id: NodeId) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        self.select_node(id, false);
        for other in self
            .connected_output_nodes(id)
            .into_iter()
            .chain(self.connected_input_nodes(id))
        {
            self.select_node(other, false);
        }
    }

    /// Select `id` and everything upstream of it. Each node is visited once,
    /// so cycles terminate.
    pub fn select_inputs_and_descendants(&mut self, id: NodeId) {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            self.select_node(next, false);
            stack.extend(self.connected_input_nodes(next));
        }
    }

    // ─── Connections ─────────────────────────────────────────────────────

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id() == id)
    }

    fn port(&self, node: NodeId, index: usize, input: bool) -> Result<&Port> {
        let found = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let port = if input {
            found.input_port(index)
        } else {
            found.output_port(index)
        };
        port.ok_or(GraphError::PortOutOfRange {
            node,
            kind: if input { PortType::Input } else { PortType::Output },
            index,
        })
    }

    fn remove_connection_at(&mut self, index: usize) -> Connection {
        let mut connection = self.connections.remove(index);
        connection.clear_ports(&mut self.nodes);
        if self.connection_selected == Some(connection.id()) {
            self.connection_selected = None;
        }
        connection
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection> {
        match self.connections.iter().position(|c| c.id() == id) {
            Some(index) => Ok(self.remove_connection_at(index)),
            None => {
                log::error!("no connection {id} found to remove");
                Err(GraphError::ConnectionNotFound(id))
            }
        }
    }

    /// Drop every connection bound to input `index` of `node`.
    pub fn clear_node_input_connection(&mut self, node: NodeId, index: usize) {
        let end = Endpoint::new(node, index);
        let mut i = self.connections.len();
        while i > 0 {
            i -= 1;
            if self.connections[i].input() == Some(end) {
                self.remove_connection_at(i);
            }
        }
    }

    /// Connect output `out_port` of `out_node` to input `in_port` of
    /// `in_node`.
    ///
    /// Mismatched data types are refused with a warning (`Ok(None)`). An
    /// identical existing link is returned as is. A filled non-array input
    /// drops its old connection first.
    pub fn connect_nodes(
        &mut self,
        out_node: NodeId,
        out_port: usize,
        in_node: NodeId,
        in_port: usize,
    ) -> Result<Option<ConnectionId>> {
        let output = self.port(out_node, out_port, false)?.data_type();
        let input = self.port(in_node, in_port, true)?;
        if output != input.data_type() {
            let err = GraphError::TypeMismatch {
                output,
                input: input.data_type(),
            };
            log::warn!("can't connect {out_node} to {in_node}: {err}");
            return Ok(None);
        }
        let replace = !input.port_type().is_array() && !input.connections().is_empty();

        let out_end = Endpoint::new(out_node, out_port);
        let in_end = Endpoint::new(in_node, in_port);
        if let Some(existing) = self
            .connections
            .iter()
            .find(|c| c.input() == Some(in_end) && c.output() == Some(out_end))
        {
            return Ok(Some(existing.id()));
        }

        if replace {
            self.clear_node_input_connection(in_node, in_port);
        }
        let connection = Connection::new(&mut self.nodes, Some(in_end), Some(out_end))?;
        let id = connection.id();
        self.connections.push(connection);
        Ok(Some(id))
    }

    fn discard_connection(&mut self, id: ConnectionId) {
        if let Some(index) = self.connections.iter().position(|c| c.id() == id) {
            self.remove_connection_at(index);
        }
    }

    /// Bind the free end of the dragged connection to the hovered port, or
    /// discard it when the port does not accept it.
    fn complete_connection(&mut self, id: ConnectionId) {
        let Some(target) = self.port_hovering else {
            self.discard_connection(id);
            return;
        };
        let Some(connection) = self.connection(id) else {
            return;
        };
        let end = target.endpoint();
        let input = target.hit.input;

        let same_port = if input {
            connection.input() == Some(end)
        } else {
            connection.output() == Some(end)
        };
        let side_taken = if input {
            connection.input().is_some()
        } else {
            connection.output().is_some()
        };
        let other_type = if input {
            connection.out_port(&self.nodes)
        } else {
            connection.in_port(&self.nodes)
        }
        .map(Port::data_type);
        let target_port = self.port(target.node, target.hit.index, input).ok();
        let type_matches =
            target_port.is_some_and(|p| Some(p.data_type()) == other_type);

        if same_port || side_taken || !type_matches {
            self.discard_connection(id);
            return;
        }

        let replaced = target_port
            .filter(|p| input && !p.port_type().is_array())
            .and_then(|p| p.connections().first().copied());
        if let Some(old) = replaced
            && let Some(index) = self.connections.iter().position(|c| c.id() == old)
        {
            let mut old = self.connections.remove(index);
            old.clear_output(&mut self.nodes);
        }

        let Some(index) = self.connections.iter().position(|c| c.id() == id) else {
            return;
        };
        let bound = if input {
            self.connections[index].set_input(&mut self.nodes, end, replaced.is_some())
        } else {
            self.connections[index].set_output(&mut self.nodes, end)
        };
        if let Err(err) = bound {
            log::error!("failed to complete connection {id}: {err}");
            self.discard_connection(id);
        }
    }

    // ─── Organize ────────────────────────────────────────────────────────

    pub fn organize(&mut self, surface: &mut dyn Surface) {
        organize(surface, &mut self.nodes, &self.connections, None);
    }

    pub fn organize_selected(&mut self, surface: &mut dyn Surface) {
        let selected = self.selected_nodes();
        organize(surface, &mut self.nodes, &self.connections, Some(&selected));
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    fn render_connections(
        &self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        cursor: &mut CursorStyle,
    ) {
        for connection in &self.connections {
            let over = mouse.is_some_and(|m| connection.mouse_over_port(&self.nodes, m).is_some());
            if over {
                *cursor = CursorStyle::Pointer;
            }
            connection.render(surface, &self.nodes, camera.zoom, over, mouse, self.renderer.as_ref());
        }
    }

    fn render_nodes(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
        cursor: &mut CursorStyle,
    ) {
        self.port_hovering = None;
        self.widget_hovering = None;
        self.node_hovering = None;
        self.box_selection.clear();

        let selection = self.box_select.map(|b| b.screen_box(camera));
        let grabbing = !self.nodes_grabbed.is_empty();

        for (&id, node) in self.nodes.iter_mut() {
            let mut state = NodeState::Idle;
            match (selection, mouse) {
                (Some(selection), _) => {
                    if selection.intersects(&node.calculate_bounds(surface, camera)) {
                        state = NodeState::MouseOver;
                        self.box_selection.push(id);
                    }
                }
                (None, Some(mouse)) => {
                    let hit = node.in_bounds(surface, camera, mouse);
                    if hit.node && hit.port.is_none() && hit.widget.is_none() {
                        state = NodeState::MouseOver;
                        self.node_hovering = Some(id);
                        *cursor = CursorStyle::Grab;
                    }
                    if let Some(widget) = hit.widget {
                        self.widget_hovering = Some((id, widget));
                        *cursor = CursorStyle::Pointer;
                    }
                    if let Some(port) = hit.port {
                        self.port_hovering = Some(PortHover { node: id, hit: port });
                    }
                }
                (None, None) => {}
            }

            if grabbing && node.is_selected() {
                state = NodeState::Grabbed;
                *cursor = CursorStyle::Grabbing;
            }
            node.render(surface, camera, state, mouse, post);
        }

        if let Some(hover) = self.node_hovering {
            log::trace!("hovering node {hover}");
        }
    }
}

impl GraphSubsystem for NodeSubsystem {
    fn render(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
    ) -> Option<RenderResults> {
        if let Some(theme) = self.theme.changed() {
            self.box_style = box_select_style(&theme);
        }
        if let Some(subset) = self.pending_organize.take() {
            organize(surface, &mut self.nodes, &self.connections, subset.as_deref());
        }

        let mut cursor = CursorStyle::Default;
        self.render_connections(surface, camera, mouse, &mut cursor);
        self.render_nodes(surface, camera, mouse, post, &mut cursor);

        if let Some(select) = self.box_select {
            let dash = theme::current().box_select.line_dash;
            surface.set_line_dash(&[dash]);
            self.box_style
                .draw(surface, select.screen_box(camera).normalized(), 1.0);
            surface.set_line_dash(&[]);
        }

        Some(RenderResults::cursor(cursor))
    }

    fn context_menu(&self, _position: Vector2) -> Option<ContextMenuConfig<GraphAction>> {
        let mut organize = ContextMenuConfig::named("Organize")
            .grouped(NODE_MENU_GROUP)
            .item(ContextMenuItemConfig::new("All Nodes", GraphAction::OrganizeAll).grouped(NODE_MENU_GROUP));
        if self.nodes.values().any(FlowNode::is_selected) {
            organize = organize.item(
                ContextMenuItemConfig::new("Selected Nodes", GraphAction::OrganizeSelected)
                    .grouped(NODE_MENU_GROUP),
            );
        }

        let mut config = ContextMenuConfig::default()
            .sub_menu(organize)
            .sub_menu(self.factory.open_menu());

        if let Some(id) = self.node_hovering
            && let Some(node) = self.nodes.get(&id)
        {
            let item = |name: &str, action| ContextMenuItemConfig::new(name, action).grouped(NODE_MENU_GROUP);
            config = config
                .sub_menu(
                    ContextMenuConfig::named("Select")
                        .grouped(NODE_MENU_GROUP)
                        .item(item("Direct Connected Nodes", GraphAction::SelectConnected(id)))
                        .item(item(
                            "Input Nodes + Descendents",
                            GraphAction::SelectInputsAndDescendants(id),
                        )),
                )
                .sub_menu(
                    ContextMenuConfig::named("Delete")
                        .grouped(NODE_MENU_GROUP)
                        .item(item("Node", GraphAction::DeleteNode(id)))
                        .item(item("Connections", GraphAction::ClearConnections(id))),
                );
            config = combine_context_menus([config, node.context_menu()]);
        }
        Some(config)
    }

    fn click_start(&mut self, mouse: Vector2, camera: &Camera, ctrl: bool) -> bool {
        self.box_select = None;

        let mut hovering = false;
        if let Some(id) = self.node_hovering {
            self.select_node(id, !ctrl);
            self.nodes_grabbed = self.selected_nodes();
            hovering = true;
        }

        if let Some((node, index)) = self.widget_hovering {
            if let Some(widget) = self.nodes.get_mut(&node).and_then(|n| n.widget_mut(index)) {
                widget.click_start();
            }
            self.widget_clicking = Some((node, index));
            hovering = true;
        }

        let Some(port) = self.port_hovering else {
            if ctrl && !hovering {
                let start = camera.screen_to_graph(mouse);
                self.box_select = Some(BoxSelect { start, end: start });
            }
            return hovering || ctrl;
        };

        if port.hit.input {
            // Pick up the link already plugged into this input.
            let end = port.endpoint();
            if let Some(connection) = self.connections.iter_mut().find(|c| c.input() == Some(end)) {
                connection.clear_input(&mut self.nodes);
                self.connection_selected = Some(connection.id());
            }
        } else {
            match Connection::new(&mut self.nodes, None, Some(port.endpoint())) {
                Ok(connection) => {
                    self.connection_selected = Some(connection.id());
                    self.connections.push(connection);
                }
                Err(err) => log::error!("failed to start connection: {err}"),
            }
        }
        true
    }

    fn mouse_drag(&mut self, delta: Vector2, scale: f64) -> bool {
        let scaled = Vector2::new(delta.x / scale, delta.y / scale);
        if let Some(select) = &mut self.box_select {
            select.end += scaled;
        }

        let mut moved = false;
        for id in &self.nodes_grabbed {
            if let Some(node) = self.nodes.get_mut(id)
                && !node.is_locked()
            {
                node.translate(scaled);
                moved = true;
            }
        }

        moved
            || self.connection_selected.is_some()
            || self.widget_clicking.is_some()
            || self.box_select.is_some()
    }

    fn click_end(&mut self) {
        for id in std::mem::take(&mut self.nodes_grabbed) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.raise_drag_stopped();
            }
        }

        if self.box_select.take().is_some() {
            for id in std::mem::take(&mut self.box_selection) {
                self.select_node(id, false);
            }
        }

        if let Some((node, index)) = self.widget_clicking.take()
            && let Some(widget) = self.nodes.get_mut(&node).and_then(|n| n.widget_mut(index))
        {
            widget.click_end();
        }

        if let Some(id) = self.connection_selected.take() {
            self.complete_connection(id);
        }
    }

    fn execute(&mut self, action: &GraphAction, position: Vector2) -> bool {
        match action {
            GraphAction::OrganizeAll => self.pending_organize = Some(None),
            GraphAction::OrganizeSelected => {
                self.pending_organize = Some(Some(self.selected_nodes()));
            }
            GraphAction::NewNode { publisher, node_type } => {
                if let Err(err) = self.create_node(publisher, node_type, position) {
                    log::error!("failed to create {publisher}/{node_type}: {err}");
                }
            }
            GraphAction::SelectConnected(id) => self.select_connected_nodes(*id),
            GraphAction::SelectInputsAndDescendants(id) => self.select_inputs_and_descendants(*id),
            GraphAction::DeleteNode(id) => {
                if let Err(err) = self.remove_node(*id) {
                    log::error!("failed to delete node {id}: {err}");
                }
            }
            GraphAction::ClearConnections(id) => self.remove_node_connections(*id),
            GraphAction::LockNode(id) | GraphAction::UnlockNode(id) => {
                let lock = matches!(action, GraphAction::LockNode(_));
                if let Some(node) = self.nodes.get_mut(id) {
                    if lock { node.lock() } else { node.unlock() }
                }
            }
            GraphAction::AddInput(id) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.add_input(&PortConfig::new("input", "string"));
                }
            }
            GraphAction::AddOutput(id) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.add_output(&PortConfig::new("output", "string"));
                }
            }
            GraphAction::AddWidget { node, widget_type } => {
                let Some(node) = self.nodes.get_mut(node) else {
                    return true;
                };
                match create_widget(widget_type, None) {
                    Ok(widget) => {
                        node.add_widget(widget);
                    }
                    Err(err) => log::error!("failed to add widget: {err}"),
                }
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FlowNodeConfig;
    use nf_core::surface::HeadlessSurface;
    use pretty_assertions::assert_eq;

    fn node(inputs: &[(&str, bool)], outputs: &[&str]) -> FlowNode {
        FlowNode::new(FlowNodeConfig {
            inputs: inputs
                .iter()
                .map(|(t, array)| {
                    let config = PortConfig::new("in", *t);
                    if *array { config.array() } else { config }
                })
                .collect(),
            outputs: outputs.iter().map(|t| PortConfig::new("out", *t)).collect(),
            ..Default::default()
        })
        .expect("node")
    }

    #[test]
    fn mismatched_types_are_refused() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        let b = nodes.add_node(node(&[("string", false)], &[]));
        assert_eq!(nodes.connect_nodes(a, 0, b, 0).expect("ports exist"), None);
        assert!(nodes.connections().is_empty());
    }

    #[test]
    fn duplicate_connect_returns_existing() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        let b = nodes.add_node(node(&[("float", true)], &[]));
        let first = nodes.connect_nodes(a, 0, b, 0).expect("ports exist");
        let second = nodes.connect_nodes(a, 0, b, 0).expect("ports exist");
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(nodes.connections().len(), 1);
    }

    #[test]
    fn single_inputs_replace_array_inputs_accumulate() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        let b = nodes.add_node(node(&[], &["float"]));
        let single = nodes.add_node(node(&[("float", false)], &[]));
        let many = nodes.add_node(node(&[("float", true)], &[]));

        nodes.connect_nodes(a, 0, single, 0).expect("ports exist");
        let latest = nodes.connect_nodes(b, 0, single, 0).expect("ports exist");
        let port = nodes.node(single).and_then(|n| n.input_port(0)).expect("port");
        assert_eq!(port.connections(), latest.as_slice());
        assert!(nodes.node(a).and_then(|n| n.output_port(0)).is_some_and(|p| p.connections().is_empty()));

        nodes.connect_nodes(a, 0, many, 0).expect("ports exist");
        nodes.connect_nodes(b, 0, many, 0).expect("ports exist");
        let port = nodes.node(many).and_then(|n| n.input_port(0)).expect("port");
        assert_eq!(port.connections().len(), 2);
    }

    #[test]
    fn bad_port_index_is_an_error() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        assert!(matches!(
            nodes.connect_nodes(a, 4, a, 0),
            Err(GraphError::PortOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn upstream_selection_survives_cycles() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[("float", false)], &["float"]));
        let b = nodes.add_node(node(&[("float", false)], &["float"]));
        let c = nodes.add_node(node(&[("float", false)], &["float"]));
        nodes.connect_nodes(a, 0, b, 0).expect("ports exist");
        nodes.connect_nodes(b, 0, a, 0).expect("ports exist");
        nodes.select_inputs_and_descendants(b);
        assert_eq!(nodes.selected_nodes(), vec![a, b]);
        assert!(!nodes.node(c).is_some_and(FlowNode::is_selected));
    }

    #[test]
    fn removal_notifies_and_errors_when_missing() {
        let mut nodes = NodeSubsystem::default();
        let removed = std::rc::Rc::new(std::cell::Cell::new(0));
        let count = removed.clone();
        nodes.add_node_removed_listener(move |_| count.set(count.get() + 1));
        let a = nodes.add_node(node(&[], &[]));
        assert!(nodes.remove_node(a).is_ok());
        assert!(matches!(nodes.remove_node(a), Err(GraphError::NodeNotFound(_))));
        assert_eq!(removed.get(), 1);
    }

    #[test]
    fn delete_action_on_a_missing_node_is_consumed() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        let b = nodes.add_node(node(&[("float", false)], &[]));
        nodes.connect_nodes(a, 0, b, 0).expect("ports exist");

        assert!(nodes.execute(&GraphAction::DeleteNode(a), Vector2::ZERO));
        assert!(nodes.execute(&GraphAction::DeleteNode(a), Vector2::ZERO));
        assert!(nodes.node(a).is_none());
        assert!(nodes.node(b).is_some());
        assert!(nodes.connections().is_empty());
    }

    #[test]
    fn organize_runs_on_next_render() {
        let mut nodes = NodeSubsystem::default();
        let a = nodes.add_node(node(&[], &["float"]));
        let b = nodes.add_node(node(&[("float", false)], &[]));
        nodes.connect_nodes(a, 0, b, 0).expect("ports exist");
        assert!(nodes.execute(&GraphAction::OrganizeAll, Vector2::ZERO));

        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        nodes.render(&mut surface, &Camera::default(), None, &mut post);
        let (pa, pb) = (
            nodes.node(a).map(FlowNode::position),
            nodes.node(b).map(FlowNode::position),
        );
        assert_eq!(pa, Some(Vector2::new(250.0, 0.0)));
        assert_eq!(pb, Some(Vector2::ZERO));
    }

    #[test]
    fn hovered_node_menu_has_select_and_delete() {
        let mut nodes = NodeSubsystem::default();
        nodes.add_node(node(&[], &[]));
        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        nodes.render(&mut surface, &Camera::default(), Some(Vector2::new(75.0, 20.0)), &mut post);

        let menu = nodes.context_menu(Vector2::ZERO).expect("menu");
        let names: Vec<_> = menu.sub_menus.iter().filter_map(|m| m.name.as_deref()).collect();
        assert_eq!(names, vec!["Organize", "New Node", "Select", "Delete"]);
    }
}
