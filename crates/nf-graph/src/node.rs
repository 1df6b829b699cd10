//! FlowNode: a titled box of input ports, output ports and widgets.
//!
//! Bounds are recomputed from text measurements every frame rather than
//! cached, since titles, ports and fonts can all change between frames.
//! Port and widget hit boxes are the ones recorded by the last render.

use crate::error::{GraphError, Result};
use crate::nodes::NODE_MENU_GROUP;
use crate::popup::PostProcess;
use crate::port::{Port, PortConfig, PortType};
use crate::style::{BoxStyle, BoxStyleConfig, StrokeStyleConfig};
use crate::subsystem::GraphAction;
use crate::widget::{Widget, WidgetConfig, create_widget};
use indexmap::IndexMap;
use nf_core::surface::{CornerRadii, PaintMode, Surface, TextAlign, TextBaseline};
use nf_core::text::{FontWeight, MultilineTextConfig, TextStyle, split_string_into_lines};
use nf_core::theme::{self, Theme, ThemeSubscription};
use nf_core::{
    BoundingBox, Camera, Color, ContextMenuConfig, ContextMenuItemConfig, NodeId, Text,
    TextStyleConfig, Vector2, combine_context_menus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MINIMUM_NODE_WIDTH: f64 = 150.0;
const ELEMENT_SPACING: f64 = 15.0;
const DEFAULT_PADDING: f64 = 15.0;

/// Nodes keyed by id, in insertion order.
pub type NodeMap = IndexMap<NodeId, FlowNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Idle,
    MouseOver,
    Grabbed,
}

// ─── Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Info,
    Warning,
    Error,
}

impl MessageType {
    pub fn color(self, theme: &Theme) -> Color {
        match self {
            MessageType::Info => theme.node.message_info,
            MessageType::Warning => theme.node.message_warn,
            MessageType::Error => theme.node.message_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMessageConfig {
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub always_show: bool,
    pub color: Option<Color>,
}

impl NodeMessageConfig {
    pub fn new(message: impl Into<String>, message_type: MessageType) -> Self {
        Self {
            message: message.into(),
            message_type,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTitleStyleConfig {
    pub text_style: Option<TextStyleConfig>,
    pub color: Option<Color>,
    pub padding: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyleConfig {
    pub title: NodeTitleStyleConfig,
    pub idle: Option<BoxStyleConfig>,
    pub mouse_over: Option<BoxStyleConfig>,
    pub grabbed: Option<BoxStyleConfig>,
    pub selected: Option<BoxStyleConfig>,
    pub port_text: Option<TextStyleConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowNodeConfig {
    /// Generated when absent.
    pub id: Option<String>,
    pub position: Vector2,
    pub title: Option<String>,
    pub sub_title: Option<String>,
    pub info: Option<String>,
    pub messages: Vec<NodeMessageConfig>,
    pub locked: bool,
    pub data: IndexMap<String, Value>,
    pub context_menu: Option<ContextMenuConfig<GraphAction>>,
    pub metadata: Option<Value>,
    pub can_edit_title: bool,
    pub can_edit_info: bool,
    pub can_edit_ports: bool,
    pub inputs: Vec<PortConfig>,
    pub outputs: Vec<PortConfig>,
    pub widgets: Vec<WidgetConfig>,
    pub style: NodeStyleConfig,
}

impl FlowNodeConfig {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

// ─── Styles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StateStyles {
    idle: BoxStyle,
    mouse_over: BoxStyle,
    grabbed: BoxStyle,
    selected: BoxStyle,
}

impl StateStyles {
    fn resolve(style: &NodeStyleConfig, theme: &Theme) -> Self {
        let build = |config: &Option<BoxStyleConfig>, border: Color, size: f64| {
            let fallback = BoxStyleConfig {
                color: Some(theme.node.background),
                border: Some(StrokeStyleConfig::new(border, size)),
                radius: Some(theme.node.border_radius),
            };
            BoxStyle::new(&config.as_ref().map_or(fallback, |c| c.fallback(&fallback)))
        };
        let border = &theme.node.border;
        Self {
            idle: build(&style.idle, border.idle, 1.0),
            mouse_over: build(&style.mouse_over, border.mouse_over, 1.1),
            grabbed: build(&style.grabbed, border.grabbed, 2.0),
            selected: build(&style.selected, border.selected, 1.0),
        }
    }
}

fn port_text_config(style: &NodeStyleConfig, theme: &Theme) -> TextStyleConfig {
    let fallback = TextStyleConfig::default()
        .with_size(14.0)
        .with_color(theme.node.port_font_color);
    style
        .port_text
        .as_ref()
        .map_or(fallback.clone(), |c| c.fallback(&fallback))
}

fn title_text_config(style: &NodeStyleConfig, size: f64, theme: &Theme) -> TextStyleConfig {
    let fallback = TextStyleConfig::default()
        .with_size(size)
        .with_weight(FontWeight::Bold)
        .with_color(theme.node.font_color);
    style
        .title
        .text_style
        .as_ref()
        .map_or(fallback.clone(), |c| c.fallback(&fallback))
}

struct Message {
    text: Text,
    message_type: MessageType,
    color: Option<Color>,
    always_show: bool,
}

impl Message {
    fn new(config: &NodeMessageConfig, theme: &Theme) -> Self {
        let style = TextStyleConfig::default()
            .with_color(config.color.unwrap_or(config.message_type.color(theme)));
        Self {
            text: Text::multiline(
                config.message.clone(),
                &style,
                MultilineTextConfig {
                    max_width: Some(200.0),
                    line_spacing: 2.5,
                },
            ),
            message_type: config.message_type,
            color: config.color,
            always_show: config.always_show,
        }
    }

    /// Returns the height drawn, zero when hidden.
    fn render(&mut self, surface: &mut dyn Surface, scale: f64, position: Vector2, hovering: bool) -> f64 {
        if !self.always_show && !hovering {
            return 0.0;
        }
        surface.set_text_align(TextAlign::Center);
        self.text.render(surface, scale, position);
        self.text.height(surface) * scale
    }
}

// ─── Hit testing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortHit {
    pub index: usize,
    pub input: bool,
}

/// What lies under a point. A port or widget hit also counts as a node hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeIntersection {
    pub node: bool,
    pub port: Option<PortHit>,
    pub widget: Option<usize>,
}

// ─── Listeners ───────────────────────────────────────────────────────────

type Callback = Box<dyn FnMut()>;
type NodeCallback = Box<dyn FnMut(NodeId)>;
type TextChangeCallback = Box<dyn FnMut(NodeId, &str, &str)>;
type AnyPropertyCallback = Box<dyn FnMut(&str, Option<&Value>, &Value)>;
type PropertyCallback = Box<dyn FnMut(Option<&Value>, &Value)>;

#[derive(Default)]
struct Listeners {
    select: Vec<Callback>,
    unselect: Vec<Callback>,
    drag_stop: Vec<NodeCallback>,
    title: Vec<TextChangeCallback>,
    info: Vec<TextChangeCallback>,
    any_property: Vec<AnyPropertyCallback>,
    property: IndexMap<String, Vec<PropertyCallback>>,
}

// ─── Node ────────────────────────────────────────────────────────────────

pub struct FlowNode {
    id: NodeId,
    position: Vector2,
    title: Text,
    sub_title: Text,
    info_symbol: Text,
    info: String,
    messages: Vec<Message>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    widgets: Vec<Box<dyn Widget>>,
    widget_boxes: Vec<BoundingBox>,

    locked: bool,
    selected: bool,
    can_edit_title: bool,
    can_edit_info: bool,
    can_edit_ports: bool,
    context_menu: Option<ContextMenuConfig<GraphAction>>,
    metadata: Option<Value>,
    data: IndexMap<String, Value>,

    style: NodeStyleConfig,
    states: StateStyles,
    title_color: Color,
    padding: f64,
    port_text: TextStyle,
    theme: ThemeSubscription,

    listeners: Listeners,
}

impl std::fmt::Debug for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowNode")
            .field("id", &self.id)
            .field("title", &self.title.get())
            .field("position", &self.position)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("widgets", &self.widgets.len())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl FlowNode {
    /// Build a node. Fails when a configured widget type is not registered
    /// or its config does not parse.
    pub fn new(config: FlowNodeConfig) -> Result<Self> {
        let theme = theme::current();
        let id = match config.id.as_deref() {
            Some(id) => NodeId::intern(id),
            None => NodeId::with_prefix("node"),
        };

        let title = Text::new(
            config.title.clone().unwrap_or_default(),
            &title_text_config(&config.style, 16.0, &theme),
        );
        let sub_title = Text::new(
            config.sub_title.clone().unwrap_or_default(),
            &title_text_config(&config.style, 10.0, &theme),
        );
        let info_symbol = Text::new(
            "i",
            &TextStyleConfig::default()
                .with_size(13.0)
                .with_weight(FontWeight::Bold)
                .with_color(theme.node.font_color),
        );

        let mut node = Self {
            id,
            position: config.position,
            title,
            sub_title,
            info_symbol,
            info: config.info.clone().unwrap_or_default(),
            messages: config
                .messages
                .iter()
                .map(|m| Message::new(m, &theme))
                .collect(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            widget_boxes: Vec::new(),
            locked: config.locked,
            selected: false,
            can_edit_title: config.can_edit_title,
            can_edit_info: config.can_edit_info,
            can_edit_ports: config.can_edit_ports,
            context_menu: config.context_menu.clone(),
            metadata: config.metadata.clone(),
            data: config.data.clone(),
            states: StateStyles::resolve(&config.style, &theme),
            title_color: config.style.title.color.unwrap_or(theme.node.title_color),
            padding: config.style.title.padding.unwrap_or(DEFAULT_PADDING),
            port_text: TextStyle::new(&port_text_config(&config.style, &theme)),
            theme: theme::subscribe(),
            style: config.style,
            listeners: Listeners::default(),
        };

        for port in &config.inputs {
            node.add_input(port);
        }
        for port in &config.outputs {
            node.add_output(port);
        }
        for widget in &config.widgets {
            let Some(widget_type) = widget.widget_type.as_deref() else {
                continue;
            };
            node.add_widget(create_widget(widget_type, widget.config.as_ref())?);
        }
        Ok(node)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    fn sync_theme(&mut self) {
        let Some(theme) = self.theme.changed() else {
            return;
        };
        if self.style.title.text_style.as_ref().and_then(|s| s.color).is_none() {
            self.title.set_color(theme.node.font_color);
            self.sub_title.set_color(theme.node.font_color);
        }
        self.info_symbol.set_color(theme.node.font_color);
        self.states = StateStyles::resolve(&self.style, &theme);
        if self.style.title.color.is_none() {
            self.title_color = theme.node.title_color;
        }
        self.port_text = TextStyle::new(&port_text_config(&self.style, &theme));
        for message in &mut self.messages {
            if message.color.is_none() {
                message.text.set_color(message.message_type.color(&theme));
            }
        }
    }

    // ─── Position & flags ────────────────────────────────────────────────

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vector2) {
        self.position += delta;
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

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn select(&mut self) {
        if self.selected {
            return;
        }
        self.selected = true;
        for callback in &mut self.listeners.select {
            callback();
        }
    }

    pub fn unselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        for callback in &mut self.listeners.unselect {
            callback();
        }
    }

    pub fn add_select_listener(&mut self, callback: impl FnMut() + 'static) {
        self.listeners.select.push(Box::new(callback));
    }

    pub fn add_unselect_listener(&mut self, callback: impl FnMut() + 'static) {
        self.listeners.unselect.push(Box::new(callback));
    }

    pub fn add_drag_stopped_listener(&mut self, callback: impl FnMut(NodeId) + 'static) {
        self.listeners.drag_stop.push(Box::new(callback));
    }

    pub fn raise_drag_stopped(&mut self) {
        let id = self.id;
        for callback in &mut self.listeners.drag_stop {
            callback(id);
        }
    }

    // ─── Title & info ────────────────────────────────────────────────────

    pub fn title(&self) -> &str {
        self.title.get()
    }

    pub fn sub_title(&self) -> &str {
        self.sub_title.get()
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn can_edit_title(&self) -> bool {
        self.can_edit_title
    }

    pub fn can_edit_info(&self) -> bool {
        self.can_edit_info
    }

    pub fn can_edit_ports(&self) -> bool {
        self.can_edit_ports
    }

    pub fn add_title_change_listener(&mut self, callback: impl FnMut(NodeId, &str, &str) + 'static) {
        self.listeners.title.push(Box::new(callback));
    }

    pub fn add_info_change_listener(&mut self, callback: impl FnMut(NodeId, &str, &str) + 'static) {
        self.listeners.info.push(Box::new(callback));
    }

    /// Ignored, with a warning, unless the title is editable.
    pub fn set_title(&mut self, title: impl Into<String>) {
        if !self.can_edit_title {
            log::warn!("set_title ignored, {} has been marked un-editable", self.id);
            return;
        }
        let title = title.into();
        if title == self.title.get() {
            return;
        }
        let old = self.title.get().to_string();
        self.title.set(title.clone());
        let id = self.id;
        for callback in &mut self.listeners.title {
            callback(id, &old, &title);
        }
    }

    /// Ignored, with a warning, unless the info text is editable.
    pub fn set_info(&mut self, info: impl Into<String>) {
        if !self.can_edit_info {
            log::warn!("set_info ignored, {} has been marked un-editable", self.id);
            return;
        }
        let info = info.into();
        if info == self.info {
            return;
        }
        let old = std::mem::replace(&mut self.info, info);
        let id = self.id;
        for callback in &mut self.listeners.info {
            callback(id, &old, &self.info);
        }
    }

    // ─── Messages ────────────────────────────────────────────────────────

    pub fn add_message(&mut self, config: &NodeMessageConfig) {
        self.messages.push(Message::new(config, &theme::current()));
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    // ─── Ports ───────────────────────────────────────────────────────────

    pub fn add_input(&mut self, config: &PortConfig) -> usize {
        self.inputs
            .push(Port::new(self.id, PortType::input(config.array), config));
        self.inputs.len() - 1
    }

    pub fn add_output(&mut self, config: &PortConfig) -> usize {
        self.outputs
            .push(Port::new(self.id, PortType::output(config.array), config));
        self.outputs.len() - 1
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn input_port(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    pub fn input_port_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.inputs.get_mut(index)
    }

    pub fn output_port(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    pub fn output_port_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.outputs.get_mut(index)
    }

    // ─── Widgets ─────────────────────────────────────────────────────────

    /// Append a widget. A widget bound to a property the node already holds
    /// takes that value; otherwise the widget's value seeds the property.
    pub fn add_widget(&mut self, mut widget: Box<dyn Widget>) -> usize {
        if let Some(property) = widget.bound_property().map(str::to_string) {
            match self.data.get(&property) {
                Some(value) => {
                    widget.set_value(value);
                }
                None => {
                    if let Some(value) = widget.value() {
                        self.widgets.push(widget);
                        self.set_property(&property, value);
                        return self.widgets.len() - 1;
                    }
                }
            }
        }
        self.widgets.push(widget);
        self.widgets.len() - 1
    }

    pub fn remove_widget(&mut self, index: usize) -> Result<Box<dyn Widget>> {
        if index >= self.widgets.len() {
            log::error!("{} does not contain widget {index}", self.id);
            return Err(GraphError::WidgetNotFound {
                node: self.id,
                index,
            });
        }
        self.widget_boxes.clear();
        Ok(self.widgets.remove(index))
    }

    pub fn widget(&self, index: usize) -> Option<&dyn Widget> {
        self.widgets.get(index).map(|w| w.as_ref())
    }

    pub fn widget_mut(&mut self, index: usize) -> Option<&mut (dyn Widget + 'static)> {
        self.widgets.get_mut(index).map(|w| w.as_mut())
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Set a widget's value and write it through to its bound property.
    pub fn set_widget_value(&mut self, index: usize, value: &Value) -> Result<bool> {
        let widget = self.widgets.get_mut(index).ok_or(GraphError::WidgetNotFound {
            node: self.id,
            index,
        })?;
        if !widget.set_value(value) {
            return Ok(false);
        }
        if let Some(property) = widget.bound_property().map(str::to_string)
            && let Some(value) = widget.value()
        {
            self.set_property(&property, value);
        }
        Ok(true)
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.data
    }

    pub fn add_any_property_change_listener(
        &mut self,
        callback: impl FnMut(&str, Option<&Value>, &Value) + 'static,
    ) {
        self.listeners.any_property.push(Box::new(callback));
    }

    pub fn add_property_change_listener(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(Option<&Value>, &Value) + 'static,
    ) {
        self.listeners
            .property
            .entry(name.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// No-op when `value` equals the stored value. Widgets bound to `name`
    /// follow the new value.
    pub fn set_property(&mut self, name: &str, value: Value) {
        if self.data.get(name) == Some(&value) {
            return;
        }
        let old = self.data.insert(name.to_string(), value.clone());

        for callback in &mut self.listeners.any_property {
            callback(name, old.as_ref(), &value);
        }
        if let Some(callbacks) = self.listeners.property.get_mut(name) {
            for callback in callbacks {
                callback(old.as_ref(), &value);
            }
        }
        for widget in &mut self.widgets {
            if widget.bound_property() == Some(name) {
                widget.set_value(&value);
            }
        }
    }

    // ─── Context menu ────────────────────────────────────────────────────

    pub fn context_menu(&self) -> ContextMenuConfig<GraphAction> {
        let id = self.id;
        let mut config = ContextMenuConfig::default().grouped(NODE_MENU_GROUP);

        if self.can_edit_ports || self.can_edit_title || self.can_edit_info {
            let mut edit = ContextMenuConfig::named("Edit").grouped(NODE_MENU_GROUP);
            if self.can_edit_title {
                edit = edit.item(ContextMenuItemConfig::new("Title", GraphAction::EditTitle(id)));
            }
            if self.can_edit_info {
                edit = edit.item(ContextMenuItemConfig::new("Info", GraphAction::EditInfo(id)));
            }
            if self.can_edit_ports {
                let widgets = ContextMenuConfig::named("Widget").item(ContextMenuItemConfig::new(
                    "Number",
                    GraphAction::AddWidget {
                        node: id,
                        widget_type: "number".into(),
                    },
                ));
                edit = edit.sub_menu(
                    ContextMenuConfig::named("Add")
                        .item(ContextMenuItemConfig::new("Input", GraphAction::AddInput(id)))
                        .item(ContextMenuItemConfig::new("Output", GraphAction::AddOutput(id)))
                        .sub_menu(widgets),
                );
            }
            config = config.sub_menu(edit);
        }

        let lock = if self.locked {
            ContextMenuItemConfig::new("Unlock Node Position", GraphAction::UnlockNode(id))
        } else {
            ContextMenuItemConfig::new("Lock Node Position", GraphAction::LockNode(id))
        };
        config = config.item(lock.grouped(NODE_MENU_GROUP));

        match &self.context_menu {
            Some(menu) => combine_context_menus([config, menu.clone()]),
            None => config,
        }
    }

    // ─── Layout & rendering ──────────────────────────────────────────────

    /// Screen-space bounds under `camera`.
    pub fn calculate_bounds(&mut self, surface: &mut dyn Surface, camera: &Camera) -> BoundingBox {
        self.sync_theme();
        let double_padding = self.padding * 2.0;

        let mut size = self.title.measure(surface);
        size.x = size.x.max(self.sub_title.measure(surface).x);
        if !self.info.is_empty() {
            size.x += size.y * 4.0;
        }

        size.x += double_padding;
        size.y += double_padding;

        for port in self.inputs.iter().chain(&self.outputs) {
            let m = self.port_text.measure(surface, 1.0, port.display_name());
            size.y += m.y + ELEMENT_SPACING;
            size.x = size.x.max(m.x + double_padding);
        }

        for widget in &self.widgets {
            let w = widget.size();
            size.y += w.y + ELEMENT_SPACING;
            size.x = size.x.max(w.x + double_padding);
        }

        size.y += ELEMENT_SPACING;
        size.x = size.x.max(MINIMUM_NODE_WIDTH);

        BoundingBox::new(camera.graph_to_screen(self.position), size.scale(camera.zoom))
    }

    /// Hit test in screen space. Later matches win: node box, then input
    /// ports, then output ports, then widgets.
    pub fn in_bounds(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        position: Vector2,
    ) -> NodeIntersection {
        let mut hit = NodeIntersection {
            node: self.calculate_bounds(surface, camera).contains(position),
            ..Default::default()
        };
        for (input, ports) in [(true, &self.inputs), (false, &self.outputs)] {
            for (index, port) in ports.iter().enumerate() {
                if port.bounds().is_some_and(|b| b.contains(position)) {
                    hit.node = true;
                    hit.port = Some(PortHit { index, input });
                }
            }
        }
        for (index, bounds) in self.widget_boxes.iter().enumerate() {
            if bounds.contains(position) {
                hit.node = true;
                hit.widget = Some(index);
            }
        }
        hit
    }

    fn style_for(&self, state: NodeState) -> &BoxStyle {
        if self.selected && state == NodeState::Idle {
            return &self.states.selected;
        }
        match state {
            NodeState::Idle => &self.states.idle,
            NodeState::MouseOver => &self.states.mouse_over,
            NodeState::Grabbed => &self.states.grabbed,
        }
    }

    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        camera: &Camera,
        state: NodeState,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
    ) {
        let zoom = camera.zoom;
        let padding = self.padding * zoom;
        let spacing = ELEMENT_SPACING * zoom;

        let bounds = self.calculate_bounds(surface, camera);
        let style = *self.style_for(state);
        style.draw(surface, bounds, zoom);
        let border = style.border_size() * zoom;

        surface.set_text_align(TextAlign::Center);
        surface.set_text_baseline(TextBaseline::Middle);

        let title_size = self.title.scaled_size(surface, zoom);
        let title_x = bounds.pos.x + border * 0.5;
        let title_y = bounds.pos.y + border * 0.5;
        let title_width = bounds.size.x - border;
        let title_height = title_size.y + padding * 2.0 - border * 0.5;
        surface.set_fill(self.title_color);
        surface.rounded_rect(
            BoundingBox::from_xywh(title_x, title_y, title_width, title_height),
            CornerRadii::top(style.radius * zoom),
            PaintMode::Fill,
        );

        let mut title_pos = Vector2::new(
            bounds.pos.x + bounds.size.x / 2.0,
            bounds.pos.y + padding + title_size.y / 2.0,
        );
        if !self.sub_title.get().is_empty() {
            let subtitle_pos = Vector2::new(title_pos.x, title_pos.y - title_size.y / 1.5);
            title_pos.y += padding / 2.0;
            self.sub_title.render(surface, zoom, subtitle_pos);
        }
        self.title.render(surface, zoom, title_pos);

        if !self.info.is_empty() {
            self.render_info(surface, zoom, mouse, post, (title_x, title_y, title_width, title_height), style.radius);
        }

        let mut y = bounds.pos.y + padding * 2.0 + title_size.y + spacing;

        surface.set_text_align(TextAlign::Left);
        let left = bounds.pos.x + padding;
        for port in &mut self.inputs {
            let m = self.port_text.measure(surface, zoom, port.display_name());
            let position = Vector2::new(bounds.pos.x, y + m.y / 2.0);
            self.port_text.setup(surface, zoom);
            surface.fill_text(port.display_name(), Vector2::new(left, position.y));
            port.render(surface, position, zoom, mouse, post);
            y += m.y + spacing;
        }

        let right = bounds.right();
        for port in &mut self.outputs {
            surface.set_text_align(TextAlign::Right);
            let m = self.port_text.measure(surface, zoom, port.display_name());
            let position = Vector2::new(right, y + m.y / 2.0);
            self.port_text.setup(surface, zoom);
            surface.fill_text(port.display_name(), Vector2::new(right - padding, position.y));
            port.render(surface, position, zoom, mouse, post);
            y += m.y + spacing;
        }

        self.widget_boxes.clear();
        for widget in &mut self.widgets {
            let size = widget.size().scale(zoom);
            let position = Vector2::new(bounds.pos.x + (bounds.size.x - size.x) / 2.0, y);
            self.widget_boxes.push(widget.draw(surface, position, zoom, mouse));
            y += size.y + spacing;
        }

        let mut message_pos = Vector2::new(
            bounds.pos.x + bounds.size.x / 2.0,
            bounds.bottom() + 15.0 * zoom,
        );
        let hovering = state != NodeState::Idle;
        for message in &mut self.messages {
            message_pos.y += message.render(surface, zoom, message_pos, hovering) + 10.0 * zoom;
        }
    }

    /// The "i" glyph in the title bar; hovering it queues the info popup.
    fn render_info(
        &mut self,
        surface: &mut dyn Surface,
        zoom: f64,
        mouse: Option<Vector2>,
        post: &mut PostProcess,
        (title_x, title_y, title_width, title_height): (f64, f64, f64, f64),
        radius: f64,
    ) {
        let info_radius = title_height * 0.25;
        let center = Vector2::new(
            title_x + title_width - title_height * 0.25 - info_radius,
            title_y + title_height * 0.25 + info_radius,
        );
        let glyph = Vector2::new(center.x, center.y + title_height * 0.025);

        let mut thickness = 1.5 * zoom;
        if mouse.is_some_and(|m| Vector2::distance(glyph, m) <= info_radius) {
            thickness *= 1.5;

            let style = self.info_symbol.style().clone();
            let info = self.info.clone();
            let fill = self.title_color;
            post.queue(move |surface| {
                let mut style = style.borrow_mut();
                style.setup(surface, zoom);
                surface.set_text_align(TextAlign::Center);

                let box_width = title_width * 1.5;
                let lines = split_string_into_lines(&*surface, &info, box_width);
                let line_height = (style.size() + 2.0) * zoom;
                let box_height = line_height * lines.len() as f64;
                let start = title_y - box_height - line_height / 2.0;

                surface.set_fill(fill);
                surface.rounded_rect(
                    BoundingBox::from_xywh(
                        center.x - box_width / 2.0 - line_height / 2.0,
                        start - line_height,
                        box_width + line_height,
                        box_height + line_height,
                    ),
                    CornerRadii::uniform(radius * zoom),
                    PaintMode::Fill,
                );

                style.setup(surface, zoom);
                for (i, line) in lines.iter().enumerate() {
                    surface.fill_text(line, Vector2::new(center.x, start + i as f64 * line_height));
                }
            });
        }

        surface.set_line_width(thickness);
        surface.set_stroke(self.info_symbol.color());
        surface.circle(center, info_radius, PaintMode::Stroke);

        surface.set_text_align(TextAlign::Center);
        self.info_symbol.render(surface, zoom, glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node(config: FlowNodeConfig) -> FlowNode {
        FlowNode::new(config).expect("valid node")
    }

    #[test]
    fn bounds_grow_with_ports() {
        let mut surface = HeadlessSurface::default();
        let camera = Camera::default();
        let mut empty = node(FlowNodeConfig::titled("A"));
        // title 16 + padding 30 + trailing spacing 15
        assert_eq!(
            empty.calculate_bounds(&mut surface, &camera),
            BoundingBox::from_xywh(0.0, 0.0, 150.0, 61.0)
        );

        let mut with_port = node(FlowNodeConfig {
            title: Some("A".into()),
            inputs: vec![PortConfig::new("value", "float")],
            ..Default::default()
        });
        // one port: 14 text + 15 spacing
        assert_eq!(with_port.calculate_bounds(&mut surface, &camera).size.y, 90.0);
    }

    #[test]
    fn bounds_follow_camera() {
        let mut surface = HeadlessSurface::default();
        let mut camera = Camera::default();
        camera.zoom = 2.0;
        camera.position = Vector2::new(10.0, 20.0);
        let mut n = node(FlowNodeConfig {
            position: Vector2::new(5.0, 5.0),
            ..Default::default()
        });
        let b = n.calculate_bounds(&mut surface, &camera);
        assert_eq!(b.pos, Vector2::new(20.0, 30.0));
        assert_eq!(b.size.x, 300.0);
    }

    #[test]
    fn uneditable_title_is_ignored() {
        let mut n = node(FlowNodeConfig::titled("A"));
        n.set_title("B");
        assert_eq!(n.title(), "A");

        let mut n = node(FlowNodeConfig {
            title: Some("A".into()),
            can_edit_title: true,
            can_edit_info: false,
            ..Default::default()
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        n.add_title_change_listener(move |_, old, new| {
            sink.borrow_mut().push((old.to_string(), new.to_string()))
        });
        n.set_title("B");
        n.set_title("B");
        n.set_info("ignored");
        assert_eq!(*seen.borrow(), vec![("A".to_string(), "B".to_string())]);
        assert_eq!(n.info(), "");
    }

    #[test]
    fn property_listeners_fire_on_change_only() {
        let mut n = node(FlowNodeConfig::default());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let any = calls.clone();
        n.add_any_property_change_listener(move |name, _, v| {
            any.borrow_mut().push(format!("{name}={v}"))
        });
        let keyed = calls.clone();
        n.add_property_change_listener("x", move |old, _| {
            keyed.borrow_mut().push(format!("old={old:?}"))
        });

        n.set_property("x", json!(1));
        n.set_property("x", json!(1));
        n.set_property("y", json!("a"));
        assert_eq!(
            *calls.borrow(),
            vec!["x=1".to_string(), "old=None".to_string(), "y=\"a\"".to_string()]
        );
    }

    #[test]
    fn bound_widget_syncs_both_ways() {
        let mut n = node(FlowNodeConfig {
            widgets: vec![WidgetConfig::new("number", json!({ "property": "k", "value": 2 }))],
            ..Default::default()
        });
        assert_eq!(n.property("k"), Some(&json!(2.0)));

        n.set_property("k", json!(5.0));
        assert_eq!(n.widget(0).and_then(|w| w.value()), Some(json!(5.0)));

        assert!(n.set_widget_value(0, &json!(7.0)).expect("widget 0"));
        assert_eq!(n.property("k"), Some(&json!(7.0)));
        assert!(matches!(
            n.set_widget_value(3, &json!(1)),
            Err(GraphError::WidgetNotFound { index: 3, .. })
        ));
    }

    #[test]
    fn unknown_widget_type_fails_construction() {
        let err = FlowNode::new(FlowNodeConfig {
            widgets: vec![WidgetConfig::new("toggle", json!({}))],
            ..Default::default()
        });
        assert!(matches!(err, Err(GraphError::UnknownWidgetType(_))));
    }

    #[test]
    fn select_fires_once() {
        let mut n = node(FlowNodeConfig::default());
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        n.add_select_listener(move || *c.borrow_mut() += 1);
        n.select();
        n.select();
        assert!(n.is_selected());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn render_records_port_boxes_for_hit_testing() {
        let mut surface = HeadlessSurface::default();
        let camera = Camera::default();
        let mut post = PostProcess::new();
        let mut n = node(FlowNodeConfig {
            inputs: vec![PortConfig::new("a", "float")],
            outputs: vec![PortConfig::new("b", "float")],
            ..Default::default()
        });
        n.render(&mut surface, &camera, NodeState::Idle, None, &mut post);

        let input = n.input_port(0).and_then(Port::bounds).expect("drawn");
        let output = n.output_port(0).and_then(Port::bounds).expect("drawn");
        assert_eq!(input.center().x, 0.0);
        assert_eq!(output.center().x, 150.0);

        let hit = n.in_bounds(&mut surface, &camera, output.center());
        assert_eq!(hit.port, Some(PortHit { index: 0, input: false }));
        assert!(hit.node);
        assert_eq!(n.in_bounds(&mut surface, &camera, Vector2::new(-100.0, 0.0)), NodeIntersection::default());
        assert!(surface.texts().contains(&"a"));
    }

    #[test]
    fn messages_show_on_hover_or_always() {
        let mut surface = HeadlessSurface::default();
        let camera = Camera::default();
        let mut post = PostProcess::new();
        let mut n = node(FlowNodeConfig {
            messages: vec![
                NodeMessageConfig::new("hover only", MessageType::Warning),
                NodeMessageConfig {
                    always_show: true,
                    ..NodeMessageConfig::new("pinned", MessageType::Error)
                },
            ],
            ..Default::default()
        });
        n.render(&mut surface, &camera, NodeState::Idle, None, &mut post);
        let texts = surface.texts();
        assert!(texts.contains(&"pinned"));
        assert!(!texts.contains(&"hover only"));

        surface.take_ops();
        n.render(&mut surface, &camera, NodeState::MouseOver, None, &mut post);
        assert!(surface.texts().contains(&"hover only"));
    }

    #[test]
    fn selected_idle_uses_selected_border() {
        let theme = theme::current();
        let mut surface = HeadlessSurface::default();
        let mut post = PostProcess::new();
        let mut n = node(FlowNodeConfig::default());
        n.select();
        n.render(&mut surface, &Camera::default(), NodeState::Idle, None, &mut post);
        let DrawOp::RoundedRect { stroke, .. } = &surface.ops()[0] else {
            panic!("expected node box");
        };
        assert_eq!(*stroke, theme.node.border.selected);
    }

    #[test]
    fn menu_offers_edit_only_when_editable() {
        let n = node(FlowNodeConfig::default());
        let menu = n.context_menu();
        assert!(menu.sub_menus.is_empty());
        assert_eq!(menu.items[0].name.as_deref(), Some("Lock Node Position"));

        let mut n = node(FlowNodeConfig {
            can_edit_ports: true,
            ..Default::default()
        });
        n.lock();
        let menu = n.context_menu();
        assert_eq!(menu.sub_menus[0].name.as_deref(), Some("Edit"));
        assert_eq!(menu.items[0].action, Some(GraphAction::UnlockNode(n.id())));
    }
}
