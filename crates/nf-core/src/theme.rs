//! Process-wide theme.
//!
//! A [`Palette`] names every color the engine paints with; [`Theme`] is the
//! immutable value derived from it. Publishing a new theme swaps an
//! `Arc<Theme>` and bumps a generation counter. Consumers either poll a
//! [`ThemeSubscription`] once per frame or register an [`on_change`]
//! listener that lives as long as its [`ThemeListener`] handle.

use crate::color::Color;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

// ─── Palette ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    #[serde(rename = "graph.bg")]
    pub graph_bg: Color,

    #[serde(rename = "node.bg")]
    pub node_bg: Color,
    #[serde(rename = "node.font")]
    pub node_font: Color,
    #[serde(rename = "node.title.bg")]
    pub node_title_bg: Color,
    #[serde(rename = "node.title.font")]
    pub node_title_font: Color,
    #[serde(rename = "node.border.idle")]
    pub node_border_idle: Color,
    #[serde(rename = "node.border.hover")]
    pub node_border_hover: Color,
    #[serde(rename = "node.border.grab")]
    pub node_border_grab: Color,
    #[serde(rename = "node.border.selected")]
    pub node_border_selected: Color,
    #[serde(rename = "node.port.font")]
    pub node_port_font: Color,
    #[serde(rename = "node.port.border")]
    pub node_port_border: Color,

    #[serde(rename = "msg.info")]
    pub msg_info: Color,
    #[serde(rename = "msg.warn")]
    pub msg_warn: Color,
    #[serde(rename = "msg.error")]
    pub msg_error: Color,

    #[serde(rename = "widget.bg")]
    pub widget_bg: Color,
    #[serde(rename = "widget.font")]
    pub widget_font: Color,
    #[serde(rename = "widget.border")]
    pub widget_border: Color,
    #[serde(rename = "widget.hover")]
    pub widget_hover: Color,
    #[serde(rename = "widget.slider")]
    pub widget_slider: Color,
    #[serde(rename = "widget.button")]
    pub widget_button: Color,

    #[serde(rename = "context.bg")]
    pub context_bg: Color,
    #[serde(rename = "context.hl")]
    pub context_highlight: Color,
    #[serde(rename = "context.font")]
    pub context_font: Color,

    #[serde(rename = "minimap.bg")]
    pub minimap_bg: Color,
    #[serde(rename = "minimap.border")]
    pub minimap_border: Color,
    #[serde(rename = "minimap.node.fill")]
    pub minimap_node_fill: Color,
    #[serde(rename = "minimap.node.stroke")]
    pub minimap_node_stroke: Color,
    #[serde(rename = "minimap.note.fill")]
    pub minimap_note_fill: Color,
    #[serde(rename = "minimap.note.stroke")]
    pub minimap_note_stroke: Color,
    #[serde(rename = "minimap.view")]
    pub minimap_view: Color,
}

fn hex(s: &str) -> Color {
    Color::from_hex(s).unwrap_or_default()
}

impl Palette {
    /// Decode a palette from a JSON object keyed by palette names
    /// (`"node.border.idle"`, ...). Every key is required.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn dark() -> Self {
        Self {
            graph_bg: hex("#0e0e0e"),
            node_bg: hex("#0d0d0d"),
            node_font: hex("#e6dccf"),
            node_title_bg: hex("#7f5539"),
            node_title_font: hex("#e6dccf"),
            node_border_idle: hex("#7f5539"),
            node_border_hover: hex("#a47148"),
            node_border_grab: hex("#ddb892"),
            node_border_selected: hex("#c89b6a"),
            node_port_font: hex("#b8aa99"),
            node_port_border: hex("#7f5539"),
            msg_info: hex("#8a7f72"),
            msg_warn: hex("#e6b566"),
            msg_error: hex("#c75d4a"),
            widget_bg: hex("#0a0a0a"),
            widget_font: hex("#e6dccf"),
            widget_border: hex("#7f5539"),
            widget_hover: hex("#242424"),
            widget_slider: hex("#3b2f24"),
            widget_button: hex("#c89b6a"),
            context_bg: hex("#0a0a0a"),
            context_highlight: hex("#3b2f24"),
            context_font: hex("#e6dccf"),
            minimap_bg: hex("#0e0e0e"),
            minimap_border: hex("#7f5539"),
            minimap_node_fill: hex("#0d0d0d"),
            minimap_node_stroke: hex("#a47148"),
            minimap_note_fill: hex("#0e0e0e"),
            minimap_note_stroke: hex("#e6dccf"),
            minimap_view: hex("#ddb892"),
        }
    }

    pub fn light() -> Self {
        Self {
            graph_bg: hex("#ececec"),
            node_bg: hex("#e7e7e7"),
            node_font: hex("#3a2f25"),
            node_title_bg: hex("#b08968"),
            node_title_font: hex("#3a2f25"),
            node_border_idle: hex("#b08968"),
            node_border_hover: hex("#ddb892"),
            node_border_grab: hex("#ddb892"),
            node_border_selected: hex("#b08968"),
            node_port_font: hex("#6f5e4d"),
            node_port_border: hex("#b08968"),
            msg_info: hex("#9b8a78"),
            msg_warn: hex("#e6b566"),
            msg_error: hex("#c75d4a"),
            widget_bg: hex("#cfcfcf"),
            widget_font: hex("#3a2f25"),
            widget_border: hex("#b08968"),
            widget_hover: hex("#e0e0e0"),
            widget_slider: hex("#e6dccf"),
            widget_button: hex("#b08968"),
            context_bg: hex("#cfcfcf"),
            context_highlight: hex("#e6dccf"),
            context_font: hex("#3a2f25"),
            minimap_bg: hex("#ececec"),
            minimap_border: hex("#b08968"),
            minimap_node_fill: hex("#e7e7e7"),
            minimap_node_stroke: hex("#ddb892"),
            minimap_note_fill: hex("#ececec"),
            minimap_note_stroke: hex("#3a2f25"),
            minimap_view: hex("#ddb892"),
        }
    }

    /// Built-in palette by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

// ─── Theme ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBorderColors {
    pub idle: Color,
    pub mouse_over: Color,
    pub grabbed: Color,
    pub selected: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTheme {
    pub font_color: Color,
    pub background: Color,
    pub title_color: Color,
    pub title_font_color: Color,
    pub title_padding: f64,
    pub border_radius: f64,
    pub border: NodeBorderColors,
    pub port_font_color: Color,
    pub port_border_color: Color,
    pub message_info: Color,
    pub message_warn: Color,
    pub message_error: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSelectTheme {
    pub color: Color,
    pub size: f64,
    pub radius: f64,
    pub line_dash: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetTheme {
    pub font_color: Color,
    pub background: Color,
    pub border_color: Color,
    pub border_size: f64,
    pub border_radius: f64,
    pub hover_background: Color,
    pub slider_fill: Color,
    pub button_click_background: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuTheme {
    pub background: Color,
    pub highlight: Color,
    pub font_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteTheme {
    pub font_color: Color,
    pub font_size: f64,
    pub entry_spacing: f64,
    pub line_spacing: f64,
    pub dot_size: f64,
    pub header_line_width: f64,
    pub quote_indent: f64,
    pub quote_bar_color: Color,
    /// Font sizes for H1 through H6.
    pub heading_sizes: [f64; 6],
    pub code_background: Color,
    pub code_padding: f64,
    pub code_border_radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimapTheme {
    pub background: Color,
    pub border: Color,
    pub node_fill: Color,
    pub node_stroke: Color,
    pub note_fill: Color,
    pub note_stroke: Color,
    pub viewport_stroke: Color,
    pub line_width: f64,
}

/// Everything the engine paints with, derived once from a [`Palette`].
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub font_family: String,
    pub graph_background: Color,
    pub node: NodeTheme,
    pub box_select: BoxSelectTheme,
    pub widget: WidgetTheme,
    pub context_menu: ContextMenuTheme,
    pub note: NoteTheme,
    pub minimap: MinimapTheme,
}

impl Theme {
    pub fn from_palette(p: &Palette) -> Self {
        Self {
            font_family: "Courier New".into(),
            graph_background: p.graph_bg,
            node: NodeTheme {
                font_color: p.node_font,
                background: p.node_bg,
                title_color: p.node_title_bg,
                title_font_color: p.node_title_font,
                title_padding: 5.0,
                border_radius: 15.0,
                border: NodeBorderColors {
                    idle: p.node_border_idle,
                    mouse_over: p.node_border_hover,
                    grabbed: p.node_border_grab,
                    selected: p.node_border_selected,
                },
                port_font_color: p.node_port_font,
                port_border_color: p.node_port_border,
                message_info: p.msg_info,
                message_warn: p.msg_warn,
                message_error: p.msg_error,
            },
            box_select: BoxSelectTheme {
                color: p.widget_slider,
                size: 1.0,
                radius: 2.0,
                line_dash: 5.0,
            },
            widget: WidgetTheme {
                font_color: p.widget_font,
                background: p.widget_bg,
                border_color: p.widget_border,
                border_size: 2.0,
                border_radius: 2.0,
                hover_background: p.widget_hover,
                slider_fill: p.widget_slider,
                button_click_background: p.widget_button,
            },
            context_menu: ContextMenuTheme {
                background: p.context_bg,
                highlight: p.context_highlight,
                font_color: p.context_font,
            },
            note: NoteTheme {
                font_color: p.node_font,
                font_size: 16.0,
                entry_spacing: 20.0,
                line_spacing: 5.0,
                dot_size: 3.0,
                header_line_width: 2.0,
                quote_indent: 2.0,
                quote_bar_color: p.node_font,
                heading_sizes: [32.0, 28.0, 24.0, 20.0, 18.0, 16.0],
                code_background: p.widget_bg,
                code_padding: 16.0,
                code_border_radius: 4.0,
            },
            minimap: MinimapTheme {
                background: p.minimap_bg,
                border: p.minimap_border,
                node_fill: p.minimap_node_fill,
                node_stroke: p.minimap_node_stroke,
                note_fill: p.minimap_note_fill,
                note_stroke: p.minimap_note_stroke,
                viewport_stroke: p.minimap_view,
                line_width: 2.0,
            },
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_palette(&Palette::dark())
    }
}

// ─── Process-wide state ──────────────────────────────────────────────────

type Listener = Arc<dyn Fn(&Arc<Theme>) + Send + Sync>;

static CURRENT: LazyLock<RwLock<Arc<Theme>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Theme::default())));
static GENERATION: AtomicU64 = AtomicU64::new(0);
static LISTENERS: LazyLock<Mutex<Vec<(u64, Listener)>>> = LazyLock::new(|| Mutex::new(Vec::new()));
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(0);

/// The theme currently in effect.
pub fn current() -> Arc<Theme> {
    CURRENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Bumped every time a theme is published.
pub fn generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

/// Publish the theme derived from `palette` and notify listeners.
pub fn install(palette: &Palette) -> Arc<Theme> {
    let next = Arc::new(Theme::from_palette(palette));
    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
    GENERATION.fetch_add(1, Ordering::AcqRel);

    // Listeners may register or drop handles, so call them unlocked.
    let listeners: Vec<Listener> = LISTENERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(_, l)| l.clone())
        .collect();
    log::debug!("theme installed, notifying {} listeners", listeners.len());
    for listener in listeners {
        listener(&next);
    }
    next
}

/// Switch to a built-in theme (`"dark"` or `"light"`).
pub fn set_theme(name: &str) -> Result<Arc<Theme>> {
    match Palette::builtin(name) {
        Some(palette) => Ok(install(&palette)),
        None => {
            log::warn!("theme {name:?} not found");
            Err(CoreError::UnknownTheme(name.to_string()))
        }
    }
}

/// Pull-based subscription. Reports a theme once per publication.
#[derive(Debug, Clone)]
pub struct ThemeSubscription {
    seen: u64,
}

impl ThemeSubscription {
    /// The new theme if one was published since the last call.
    pub fn changed(&mut self) -> Option<Arc<Theme>> {
        let now = generation();
        if now == self.seen {
            return None;
        }
        self.seen = now;
        Some(current())
    }
}

/// Subscribe starting from the theme currently in effect.
pub fn subscribe() -> ThemeSubscription {
    ThemeSubscription { seen: generation() }
}

/// Handle for a push listener; dropping it unregisters the listener.
#[must_use = "the listener is removed when the handle drops"]
pub struct ThemeListener {
    id: u64,
}

impl Drop for ThemeListener {
    fn drop(&mut self) {
        LISTENERS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

/// Register `callback` for every future publication. It is also called once
/// immediately with the current theme.
pub fn on_change(callback: impl Fn(&Arc<Theme>) + Send + Sync + 'static) -> ThemeListener {
    let id = NEXT_LISTENER.fetch_add(1, Ordering::Relaxed);
    let listener: Listener = Arc::new(callback);
    listener(&current());
    LISTENERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, listener));
    ThemeListener { id }
}
