//! The top level: a camera over a view of layers, plus the graph context
//! menu, background and input routing.
//!
//! The host feeds input events and calls [`NodeFlowGraph::render`] once per
//! frame. Hover state computed during a render is what the next click acts
//! on.

use crate::connection::ConnectionRendererConfig;
use crate::error::Result;
use crate::input::{InputAction, InputEvent, InputState};
use crate::minimap::{Minimap, MinimapConfig};
use crate::node::FlowNode;
use crate::note::FlowNote;
use crate::nodes::{NodeSubsystem, NodeSubsystemConfig};
use crate::notes::{NoteSubsystem, NoteSubsystemConfig};
use crate::popup::PostProcess;
use crate::publisher::{NodeFactoryConfig, Publisher};
use crate::subsystem::{CursorStyle, GraphAction, GraphSubsystem, RenderResults};
use nf_core::surface::{PaintMode, Surface};
use nf_core::{
    BoundingBox, Camera, CameraConfig, Color, ConnectionId, ContextMenu, ContextMenuConfig,
    ContextMenuItemConfig, NodeId, NoteId, Vector2, clamp01, combine_context_menus, theme,
};
use serde::{Deserialize, Serialize};

pub const GRAPH_MENU_GROUP: &str = "graph-context-menu";

const GRID_DOT: Color = Color::rgb(41.0 / 255.0, 54.0 / 255.0, 57.0 / 255.0);
const GRID_EXTENT: i32 = 50;

// ─── View ────────────────────────────────────────────────────────────────

/// Notes below nodes, then any extra layers. Popups queued while rendering
/// are flushed after every layer has drawn.
#[derive(Default)]
pub struct GraphView {
    notes: NoteSubsystem,
    nodes: NodeSubsystem,
    layers: Vec<Box<dyn GraphSubsystem>>,
}

impl std::fmt::Debug for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("notes", &self.notes)
            .field("nodes", &self.nodes)
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl GraphView {
    pub fn new(notes: NoteSubsystem, nodes: NodeSubsystem) -> Self {
        Self {
            notes,
            nodes,
            layers: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &NodeSubsystem {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeSubsystem {
        &mut self.nodes
    }

    pub fn notes(&self) -> &NoteSubsystem {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteSubsystem {
        &mut self.notes
    }

    /// Add a layer drawn above the nodes.
    pub fn push_layer(&mut self, layer: impl GraphSubsystem + 'static) {
        self.layers.push(Box::new(layer));
    }

    fn layers(&self) -> Vec<&dyn GraphSubsystem> {
        let mut layers: Vec<&dyn GraphSubsystem> = Vec::with_capacity(self.layers.len() + 2);
        layers.push(&self.notes);
        layers.push(&self.nodes);
        layers.extend(self.layers.iter().map(|l| l.as_ref() as &dyn GraphSubsystem));
        layers
    }

    fn layers_mut(&mut self) -> Vec<&mut dyn GraphSubsystem> {
        let mut layers: Vec<&mut dyn GraphSubsystem> = Vec::with_capacity(self.layers.len() + 2);
        layers.push(&mut self.notes);
        layers.push(&mut self.nodes);
        layers.extend(self.layers.iter_mut().map(|l| l.as_mut() as &mut dyn GraphSubsystem));
        layers
    }
}

impl GraphSubsystem for GraphView {
    fn render(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
    ) -> Option<RenderResults> {
        let mut cursor = CursorStyle::Default;
        for layer in self.layers_mut() {
            if let Some(RenderResults { cursor: Some(c) }) = layer.render(surface, camera, mouse, post)
                && c != CursorStyle::Default
            {
                cursor = c;
            }
        }
        post.flush(surface);
        Some(RenderResults::cursor(cursor))
    }

    fn context_menu(&self, position: Vector2) -> Option<ContextMenuConfig<GraphAction>> {
        Some(combine_context_menus(
            self.layers().into_iter().filter_map(|l| l.context_menu(position)),
        ))
    }

    fn click_start(&mut self, mouse: Vector2, camera: &Camera, ctrl: bool) -> bool {
        self.layers_mut()
            .into_iter()
            .rev()
            .any(|layer| layer.click_start(mouse, camera, ctrl))
    }

    fn mouse_drag(&mut self, delta: Vector2, scale: f64) -> bool {
        self.layers_mut()
            .into_iter()
            .any(|layer| layer.mouse_drag(delta, scale))
    }

    fn click_end(&mut self) {
        for layer in self.layers_mut() {
            layer.click_end();
        }
    }

    fn execute(&mut self, action: &GraphAction, position: Vector2) -> bool {
        self.layers_mut()
            .into_iter()
            .any(|layer| layer.execute(action, position))
    }
}

// ─── Graph ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Defaults to the theme's graph background.
    pub background_color: Option<Color>,
    pub idle_connection: ConnectionRendererConfig,
    /// Extra entries merged into the graph menu.
    pub context_menu: Option<ContextMenuConfig<GraphAction>>,
    pub nodes: NodeFactoryConfig,
    pub board: NoteSubsystemConfig,
    pub camera: CameraConfig,
    /// The minimap is shown when present.
    pub minimap: Option<MinimapConfig>,
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub type BackgroundRenderer = Box<dyn Fn(&mut dyn Surface, &Camera)>;
type ActionCallback = Box<dyn FnMut(&GraphAction, Vector2)>;

struct OpenMenu {
    menu: ContextMenu<GraphAction>,
    /// Graph space, so the menu follows the camera.
    position: Vector2,
}

/// Theme background plus a dot grid that fades out when zoomed far out.
pub fn render_background(surface: &mut dyn Surface, camera: &Camera, color: Color) {
    surface.set_fill(color);
    surface.rect(
        BoundingBox::from_xywh(0.0, 0.0, surface.width(), surface.height()),
        PaintMode::Fill,
    );

    let alpha = clamp01(camera.zoom - 0.3);
    if alpha <= 0.0 {
        return;
    }
    surface.set_fill(Color::rgba(GRID_DOT.r, GRID_DOT.g, GRID_DOT.b, alpha as f32));
    let spacing = 100.0 * camera.zoom;
    let radius = 2.0 * camera.zoom;
    for x in -GRID_EXTENT..GRID_EXTENT {
        for y in -GRID_EXTENT..GRID_EXTENT {
            let center = Vector2::new(
                f64::from(x) * spacing + camera.position.x,
                f64::from(y) * spacing + camera.position.y,
            );
            surface.circle(center, radius, PaintMode::Fill);
        }
    }
}

pub struct NodeFlowGraph {
    camera: Camera,
    view: GraphView,
    menu_config: ContextMenuConfig<GraphAction>,
    open_menu: Option<OpenMenu>,
    menu_hovering: Option<GraphAction>,
    mouse: Option<Vector2>,
    input: InputState,
    background_color: Option<Color>,
    background: Option<BackgroundRenderer>,
    minimap: Option<Minimap>,
    post: PostProcess,
    cursor: CursorStyle,
    action_listeners: Vec<ActionCallback>,
}

impl std::fmt::Debug for NodeFlowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFlowGraph")
            .field("camera", &self.camera)
            .field("view", &self.view)
            .field("menu_open", &self.open_menu.is_some())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Default for NodeFlowGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl NodeFlowGraph {
    pub fn new(config: GraphConfig) -> Self {
        let nodes = NodeSubsystem::new(NodeSubsystemConfig {
            idle_connection: config.idle_connection,
            nodes: config.nodes,
        });
        let notes = NoteSubsystem::new(config.board);

        let reset = ContextMenuConfig::default().item(
            ContextMenuItemConfig::new("Reset View", GraphAction::ResetView).grouped(GRAPH_MENU_GROUP),
        );
        let menu_config = combine_context_menus([reset].into_iter().chain(config.context_menu));

        Self {
            camera: Camera::new(config.camera),
            view: GraphView::new(notes, nodes),
            menu_config,
            open_menu: None,
            menu_hovering: None,
            mouse: None,
            input: InputState::new(),
            background_color: config.background_color,
            background: None,
            minimap: config.minimap.as_ref().map(Minimap::new),
            post: PostProcess::new(),
            cursor: CursorStyle::Default,
            action_listeners: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(GraphConfig::from_json(json)?))
    }

    pub fn set_background_renderer(&mut self, renderer: impl Fn(&mut dyn Surface, &Camera) + 'static) {
        self.background = Some(Box::new(renderer));
    }

    pub fn set_minimap(&mut self, minimap: Option<Minimap>) {
        self.minimap = minimap;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut GraphView {
        &mut self.view
    }

    pub fn nodes(&self) -> &NodeSubsystem {
        self.view.nodes()
    }

    pub fn nodes_mut(&mut self) -> &mut NodeSubsystem {
        self.view.nodes_mut()
    }

    pub fn notes(&self) -> &NoteSubsystem {
        self.view.notes()
    }

    pub fn notes_mut(&mut self) -> &mut NoteSubsystem {
        self.view.notes_mut()
    }

    /// Cursor chosen by the last render.
    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    pub fn mouse_position(&self) -> Option<Vector2> {
        self.mouse
    }

    // ─── Graph API ───────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: FlowNode) -> NodeId {
        self.view.nodes.add_node(node)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<FlowNode> {
        self.view.nodes.remove_node(id)
    }

    pub fn connect_nodes(
        &mut self,
        out_node: NodeId,
        out_port: usize,
        in_node: NodeId,
        in_port: usize,
    ) -> Result<Option<ConnectionId>> {
        self.view.nodes.connect_nodes(out_node, out_port, in_node, in_port)
    }

    pub fn connected_input_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.view.nodes.connected_input_nodes(id)
    }

    pub fn connected_output_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.view.nodes.connected_output_nodes(id)
    }

    pub fn add_note(&mut self, note: FlowNote) -> NoteId {
        self.view.notes.add_note(note)
    }

    pub fn remove_note(&mut self, id: NoteId) -> Result<FlowNote> {
        self.view.notes.remove_note(id)
    }

    pub fn add_publisher(&mut self, id: impl Into<String>, publisher: Publisher) {
        self.view.nodes.add_publisher(id, publisher);
    }

    pub fn organize(&mut self, surface: &mut dyn Surface) {
        self.view.nodes.organize(surface);
    }

    pub fn organize_selected(&mut self, surface: &mut dyn Surface) {
        self.view.nodes.organize_selected(surface);
    }

    pub fn add_node_created_listener(&mut self, callback: impl FnMut(&str, &str, &FlowNode) + 'static) {
        self.view.nodes.add_node_created_listener(callback);
    }

    pub fn add_node_added_listener(&mut self, callback: impl FnMut(&FlowNode) + 'static) {
        self.view.nodes.add_node_added_listener(callback);
    }

    pub fn add_node_removed_listener(&mut self, callback: impl FnMut(&FlowNode) + 'static) {
        self.view.nodes.add_node_removed_listener(callback);
    }

    pub fn add_note_added_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.view.notes.add_note_added_listener(callback);
    }

    pub fn add_note_removed_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.view.notes.add_note_removed_listener(callback);
    }

    pub fn add_note_drag_start_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.view.notes.add_note_drag_start_listener(callback);
    }

    pub fn add_note_drag_stop_listener(&mut self, callback: impl FnMut(&FlowNote) + 'static) {
        self.view.notes.add_note_drag_stop_listener(callback);
    }

    /// Called with every action the graph cannot carry out itself: title,
    /// info and note editing, and custom menu entries.
    pub fn add_action_listener(&mut self, callback: impl FnMut(&GraphAction, Vector2) + 'static) {
        self.action_listeners.push(Box::new(callback));
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    /// Carry out `action` as if picked from a menu opened at `position`
    /// (graph space).
    pub fn execute(&mut self, action: &GraphAction, position: Vector2) {
        if *action == GraphAction::ResetView {
            self.camera.reset();
            return;
        }
        if self.view.execute(action, position) {
            return;
        }
        if self.action_listeners.is_empty() {
            log::warn!("no handler for {action:?}");
        }
        for callback in &mut self.action_listeners {
            callback(action, position);
        }
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: InputEvent) {
        for action in self.input.handle(event) {
            match action {
                InputAction::Move(position) => self.mouse_move(position),
                InputAction::Drag(delta) => self.mouse_drag(delta),
                InputAction::ClickStart { position, additive } => self.click_start(position, additive),
                InputAction::ClickEnd => self.click_end(),
                InputAction::Zoom(amount) => self.zoom(amount),
                InputAction::ContextMenu(position) => self.open_context_menu(position),
            }
        }
    }

    pub fn mouse_move(&mut self, position: Vector2) {
        self.mouse = Some(position);
    }

    /// Zoom by `amount` steps around the cursor.
    pub fn zoom(&mut self, amount: f64) {
        self.camera.zoom_at(amount, self.mouse);
    }

    pub fn click_start(&mut self, position: Vector2, ctrl: bool) {
        let menu = self.open_menu.take();
        if let Some(action) = self.menu_hovering.take() {
            let at = menu.map_or(Vector2::ZERO, |m| m.position);
            self.execute(&action, at);
            return;
        }
        self.mouse = Some(position);
        self.view.click_start(position, &self.camera, ctrl);
    }

    pub fn mouse_drag(&mut self, delta: Vector2) {
        if !self.view.mouse_drag(delta, self.camera.zoom) {
            self.camera.pan(delta);
        }
    }

    pub fn click_end(&mut self) {
        self.view.click_end();
    }

    /// Open the graph menu at `position` (screen space).
    pub fn open_context_menu(&mut self, position: Vector2) {
        let at = self.camera.screen_to_graph(position);
        let mut config = self.menu_config.clone();
        if let Some(view) = self.view.context_menu(at) {
            config = combine_context_menus([config, view]);
        }
        self.open_menu = Some(OpenMenu {
            menu: ContextMenu::new(config),
            position: at,
        });
        self.menu_hovering = None;
    }

    pub fn close_context_menu(&mut self) {
        self.open_menu = None;
        self.menu_hovering = None;
    }

    pub fn is_context_menu_open(&self) -> bool {
        self.open_menu.is_some()
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Draw one frame and return the cursor to show.
    pub fn render(&mut self, surface: &mut dyn Surface) -> CursorStyle {
        match &self.background {
            Some(renderer) => renderer(surface, &self.camera),
            None => {
                let color = self
                    .background_color
                    .unwrap_or_else(|| theme::current().graph_background);
                render_background(surface, &self.camera, color);
            }
        }

        let results = self.view.render(surface, &self.camera, self.mouse, &mut self.post);
        self.cursor = results.and_then(|r| r.cursor).unwrap_or_default();

        if let Some(minimap) = &self.minimap {
            let nodes = self.view.nodes.node_bounds(surface, &self.camera);
            let notes: Vec<BoundingBox> = self.view.notes.notes().iter().map(FlowNote::bounds).collect();
            minimap.render(surface, &self.camera, &nodes, &notes);
        }

        self.menu_hovering = None;
        if let Some(open) = &mut self.open_menu {
            let at = self.camera.graph_to_screen(open.position);
            self.menu_hovering = open.menu.render(surface, at, self.mouse, true);
            if self.menu_hovering.is_some() {
                self.cursor = CursorStyle::Pointer;
            }
        }
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FlowNodeConfig;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn reset_view_from_menu() {
        let mut graph = NodeFlowGraph::default();
        let mut surface = HeadlessSurface::default();
        graph.camera_mut().pan(Vector2::new(50.0, 50.0));

        graph.open_context_menu(Vector2::new(100.0, 100.0));
        graph.mouse_move(Vector2::new(110.0, 105.0));
        assert_eq!(graph.render(&mut surface), CursorStyle::Pointer);

        graph.click_start(Vector2::new(110.0, 105.0), false);
        assert_eq!(graph.camera().position, Vector2::ZERO);
        assert!(!graph.is_context_menu_open());
    }

    #[test]
    fn any_other_click_closes_menu() {
        let mut graph = NodeFlowGraph::default();
        graph.open_context_menu(Vector2::new(100.0, 100.0));
        graph.click_start(Vector2::new(900.0, 600.0), false);
        assert!(!graph.is_context_menu_open());
    }

    #[test]
    fn unclaimed_drag_pans() {
        let mut graph = NodeFlowGraph::default();
        graph.handle_input(InputEvent::PointerDown {
            button: crate::input::PointerButton::Primary,
            position: Vector2::new(10.0, 10.0),
            modifiers: Default::default(),
        });
        graph.handle_input(InputEvent::PointerMove {
            position: Vector2::new(30.0, 40.0),
        });
        assert_eq!(graph.camera().position, Vector2::new(20.0, 30.0));
    }

    #[test]
    fn dragging_a_node_moves_it_not_the_camera() {
        let mut graph = NodeFlowGraph::default();
        let mut surface = HeadlessSurface::default();
        let id = graph.add_node(FlowNode::new(FlowNodeConfig::titled("A")).expect("node"));

        graph.mouse_move(Vector2::new(75.0, 20.0));
        assert_eq!(graph.render(&mut surface), CursorStyle::Grab);
        graph.click_start(Vector2::new(75.0, 20.0), false);
        graph.mouse_drag(Vector2::new(10.0, 5.0));
        graph.click_end();

        assert_eq!(graph.camera().position, Vector2::ZERO);
        assert_eq!(graph.nodes().node(id).map(FlowNode::position), Some(Vector2::new(10.0, 5.0)));
    }

    #[test]
    fn unhandled_actions_reach_listeners() {
        let mut graph = NodeFlowGraph::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        graph.add_action_listener(move |action, _| sink.borrow_mut().push(action.clone()));

        graph.execute(&GraphAction::Custom("export".into()), Vector2::ZERO);
        graph.execute(&GraphAction::NewNote, Vector2::ZERO);
        assert_eq!(*seen.borrow(), vec![GraphAction::Custom("export".into())]);
        assert_eq!(graph.notes().notes().len(), 1);
    }

    #[test]
    fn grid_fades_out_when_zoomed_far_out() {
        let count_dots = |zoom: f64| {
            let mut surface = HeadlessSurface::default();
            let mut camera = Camera::default();
            camera.zoom = zoom;
            render_background(&mut surface, &camera, Color::BLACK);
            surface
                .ops()
                .iter()
                .filter(|op| matches!(op, DrawOp::Circle { .. }))
                .count()
        };
        assert_eq!(count_dots(0.3), 0);
        assert_eq!(count_dots(1.0), 10_000);
    }

    #[test]
    fn wheel_zoom_keeps_point_under_cursor() {
        let mut graph = NodeFlowGraph::default();
        let cursor = Vector2::new(200.0, 100.0);
        graph.mouse_move(cursor);
        let before = graph.camera().screen_to_graph(cursor);
        graph.handle_input(InputEvent::Wheel { delta: 3.0 });
        assert!(graph.camera().zoom > 1.0);
        let after = graph.camera().screen_to_graph(cursor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn config_from_json() {
        let graph = NodeFlowGraph::from_json(
            r##"{
                "background_color": "#112233",
                "camera": { "start": 2.0 },
                "minimap": {},
                "context_menu": { "items": [ { "name": "Export", "action": { "action": "custom", "target": "export" } } ] }
            }"##,
        )
        .expect("valid config");
        assert_eq!(graph.camera().zoom, 2.0);
        assert!(graph.minimap.is_some());
        assert_eq!(graph.menu_config.items.len(), 2);
    }
}
