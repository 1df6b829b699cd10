//! Widgets embedded in nodes and the registry that builds them by name.
//!
//! A widget may mirror one entry of its node's property bag. The node keeps
//! the two in step: a changed widget value is written to the property, and a
//! property change is pushed back into the widget.

use crate::error::{GraphError, Result};
use crate::style::{BoxStyleConfig, StrokeStyleConfig, TextBoxStyle, TextBoxStyleConfig};
use indexmap::IndexMap;
use nf_core::surface::Surface;
use nf_core::theme::{self, Theme, ThemeSubscription};
use nf_core::{BoundingBox, TextStyleConfig, Vector2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;

pub const WIDGET_WIDTH: f64 = 150.0;
pub const WIDGET_HEIGHT: f64 = 25.0;

pub trait Widget {
    /// Unscaled size.
    fn size(&self) -> Vector2;

    /// Draw with the top-left corner at `position` and return the hit box.
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        mouse: Option<Vector2>,
    ) -> BoundingBox;

    fn click_start(&mut self) {}

    fn click_end(&mut self) {}

    /// Node property this widget mirrors.
    fn bound_property(&self) -> Option<&str> {
        None
    }

    fn value(&self) -> Option<Value> {
        None
    }

    /// Apply a new value. Returns true when the value changed.
    fn set_value(&mut self, _value: &Value) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub config: Option<Value>,
}

impl WidgetConfig {
    pub fn new(widget_type: impl Into<String>, config: Value) -> Self {
        Self {
            widget_type: Some(widget_type.into()),
            config: Some(config),
        }
    }
}

// ─── Number ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberWidgetConfig {
    pub value: Option<f64>,
    pub property: Option<String>,
    pub idle_box_style: Option<TextBoxStyleConfig>,
    pub highlight_box_style: Option<TextBoxStyleConfig>,
}

/// Up to 6 significant digits, trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = 5 - magnitude;
    let rounded = if decimals >= 0 {
        let factor = 10f64.powi(decimals);
        if !factor.is_finite() {
            return format!("{value}");
        }
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-decimals);
        (value / factor).round() * factor
    };
    format!("{rounded}")
}

fn number_styles(config: &NumberWidgetConfig, theme: &Theme) -> (TextBoxStyle, TextBoxStyle) {
    let w = &theme.widget;
    let fallback = |background| TextBoxStyleConfig {
        box_style: Some(BoxStyleConfig {
            color: Some(background),
            border: Some(StrokeStyleConfig::new(w.border_color, w.border_size)),
            radius: Some(w.border_radius),
        }),
        text: Some(TextStyleConfig::default().with_color(w.font_color)),
    };
    let resolve = |input: &Option<TextBoxStyleConfig>, background| {
        let fallback = fallback(background);
        TextBoxStyle::new(&input.as_ref().map_or(fallback.clone(), |i| i.fallback(&fallback)))
    };
    (
        resolve(&config.idle_box_style, w.background),
        resolve(&config.highlight_box_style, w.hover_background),
    )
}

pub struct NumberWidget {
    config: NumberWidgetConfig,
    value: f64,
    text: String,
    idle: TextBoxStyle,
    highlight: TextBoxStyle,
    theme: ThemeSubscription,
    callback: Option<Box<dyn FnMut(f64)>>,
}

impl std::fmt::Debug for NumberWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumberWidget")
            .field("value", &self.value)
            .field("property", &self.config.property)
            .finish_non_exhaustive()
    }
}

impl NumberWidget {
    pub fn new(config: NumberWidgetConfig) -> Self {
        let (idle, highlight) = number_styles(&config, &theme::current());
        let mut widget = Self {
            value: 0.0,
            text: "0".into(),
            idle,
            highlight,
            theme: theme::subscribe(),
            callback: None,
            config,
        };
        if let Some(value) = widget.config.value {
            widget.set(value);
        }
        widget
    }

    pub fn on_change(mut self, callback: impl FnMut(f64) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns false when `value` equals the current value.
    pub fn set(&mut self, value: f64) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        if let Some(callback) = &mut self.callback {
            callback(value);
        }
        self.text = format_number(value);
        true
    }
}

impl Widget for NumberWidget {
    fn size(&self) -> Vector2 {
        Vector2::new(WIDGET_WIDTH, WIDGET_HEIGHT)
    }

    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        position: Vector2,
        scale: f64,
        mouse: Option<Vector2>,
    ) -> BoundingBox {
        if let Some(theme) = self.theme.changed() {
            (self.idle, self.highlight) = number_styles(&self.config, &theme);
        }

        let bounds = BoundingBox::new(position, self.size().scale(scale));
        let style = if mouse.is_some_and(|m| bounds.contains(m)) {
            &mut self.highlight
        } else {
            &mut self.idle
        };
        style.draw_underline(surface, bounds, scale, &self.text);
        bounds
    }

    fn bound_property(&self) -> Option<&str> {
        self.config.property.as_deref()
    }

    fn value(&self) -> Option<Value> {
        Some(Value::from(self.value))
    }

    fn set_value(&mut self, value: &Value) -> bool {
        match value.as_f64() {
            Some(v) => self.set(v),
            None => {
                log::warn!("number widget ignoring non-numeric value {value}");
                false
            }
        }
    }
}

// ─── Factory ─────────────────────────────────────────────────────────────

pub type WidgetBuilder = Box<dyn Fn(Option<&Value>) -> Result<Box<dyn Widget>>>;

/// Widget builders keyed by type name. `"number"` is always registered.
pub struct WidgetFactory {
    builders: IndexMap<String, WidgetBuilder>,
}

impl Default for WidgetFactory {
    fn default() -> Self {
        let mut factory = Self {
            builders: IndexMap::new(),
        };
        factory.register("number", |config| {
            let config: NumberWidgetConfig = match config {
                Some(value) => serde_json::from_value(value.clone())
                    .map_err(|e| GraphError::InvalidWidgetConfig(e.to_string()))?,
                None => NumberWidgetConfig::default(),
            };
            Ok(Box::new(NumberWidget::new(config)))
        });
        factory
    }
}

impl WidgetFactory {
    pub fn register(
        &mut self,
        widget_type: impl Into<String>,
        builder: impl Fn(Option<&Value>) -> Result<Box<dyn Widget>> + 'static,
    ) {
        self.builders.insert(widget_type.into(), Box::new(builder));
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    pub fn create(&self, widget_type: &str, config: Option<&Value>) -> Result<Box<dyn Widget>> {
        match self.builders.get(widget_type) {
            Some(builder) => builder(config),
            None => {
                log::error!("no builder registered for widget {widget_type:?}");
                Err(GraphError::UnknownWidgetType(widget_type.to_string()))
            }
        }
    }
}

thread_local! {
    static GLOBAL_FACTORY: RefCell<WidgetFactory> = RefCell::new(WidgetFactory::default());
}

/// Register a builder with the factory nodes build their configured
/// widgets from.
pub fn register_widget(
    widget_type: impl Into<String>,
    builder: impl Fn(Option<&Value>) -> Result<Box<dyn Widget>> + 'static,
) {
    GLOBAL_FACTORY.with(|f| f.borrow_mut().register(widget_type, builder));
}

pub fn create_widget(widget_type: &str, config: Option<&Value>) -> Result<Box<dyn Widget>> {
    GLOBAL_FACTORY.with(|f| f.borrow().create(widget_type, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::surface::{DrawOp, HeadlessSurface};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn six_significant_digits() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(std::f64::consts::PI), "3.14159");
        assert_eq!(format_number(1234567.0), "1234570");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn set_is_noop_on_equal_value() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut w = NumberWidget::new(NumberWidgetConfig::default())
            .on_change(move |_| seen.set(seen.get() + 1));
        assert!(!w.set(0.0));
        assert!(w.set(2.0));
        assert!(!w.set(2.0));
        assert_eq!(calls.get(), 1);
        assert_eq!(w.text(), "2");
    }

    #[test]
    fn configured_value_applies() {
        let w = NumberWidget::new(NumberWidgetConfig {
            value: Some(1.5),
            ..Default::default()
        });
        assert_eq!(w.get(), 1.5);
        assert_eq!(w.value(), Some(json!(1.5)));
    }

    #[test]
    fn hover_switches_to_highlight() {
        let theme = theme::current();
        let mut w = NumberWidget::new(NumberWidgetConfig::default());
        let mut surface = HeadlessSurface::default();
        let bounds = w.draw(&mut surface, Vector2::new(10.0, 10.0), 2.0, Some(Vector2::new(20.0, 20.0)));
        assert_eq!(bounds, BoundingBox::from_xywh(10.0, 10.0, 300.0, 50.0));
        let DrawOp::RoundedRect { fill, .. } = &surface.ops()[0] else {
            panic!("expected box");
        };
        assert_eq!(*fill, theme.widget.hover_background);
        assert_eq!(surface.texts(), vec!["0"]);
    }

    #[test]
    fn factory_builds_numbers_and_rejects_unknown() {
        let factory = WidgetFactory::default();
        let w = factory
            .create("number", Some(&json!({ "value": 4, "property": "x" })))
            .expect("number is built in");
        assert_eq!(w.bound_property(), Some("x"));
        assert_eq!(w.value(), Some(json!(4.0)));

        assert!(matches!(
            factory.create("slider", None),
            Err(GraphError::UnknownWidgetType(t)) if t == "slider"
        ));
        assert!(matches!(
            factory.create("number", Some(&json!({ "value": "nope" }))),
            Err(GraphError::InvalidWidgetConfig(_))
        ));
    }
}
