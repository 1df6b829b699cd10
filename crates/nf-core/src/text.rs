//! Styled text and the line-breaking engine.
//!
//! Line breaking binary-searches the longest prefix that fits, then backs up
//! to the nearest preceding space. When no space exists the break falls
//! mid-word, and a line always takes at least one character.
//!
//! Fragments produced by splitting a [`Text`] share its [`SharedStyle`]:
//! restyling one fragment restyles all of them.

use crate::color::Color;
use crate::geometry::Vector2;
use crate::surface::{FontSpec, Surface};
use crate::theme::{self, ThemeSubscription};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

// ─── Font loading ────────────────────────────────────────────────────────

static FONT_EPOCH: AtomicU64 = AtomicU64::new(0);

/// Signal that web/system fonts finished loading. Every cached measurement
/// re-measures on its next use.
pub fn notify_fonts_loaded() {
    FONT_EPOCH.fetch_add(1, Ordering::AcqRel);
    log::debug!("fonts loaded, text caches invalidated");
}

pub fn font_epoch() -> u64 {
    FONT_EPOCH.load(Ordering::Acquire)
}

// ─── Style ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStrike {
    #[default]
    None,
    Line,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyleConfig {
    pub size: Option<f64>,
    pub color: Option<Color>,
    pub font: Option<String>,
    pub weight: Option<FontWeight>,
    pub style: Option<FontStyle>,
    pub strike: Option<FontStrike>,
}

impl TextStyleConfig {
    /// Fields set on `self` win; the rest come from `fallback`.
    pub fn fallback(&self, fallback: &TextStyleConfig) -> TextStyleConfig {
        TextStyleConfig {
            size: self.size.or(fallback.size),
            color: self.color.or(fallback.color),
            font: self.font.clone().or_else(|| fallback.font.clone()),
            weight: self.weight.or(fallback.weight),
            style: self.style.or(fallback.style),
            strike: self.strike.or(fallback.strike),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Resolved text style. Unset size, color and font follow the theme.
#[derive(Debug, Clone)]
pub struct TextStyle {
    explicit: TextStyleConfig,
    size: f64,
    color: Color,
    font: String,
    weight: FontWeight,
    style: FontStyle,
    strike: FontStrike,
    theme: ThemeSubscription,
    revision: u64,
}

pub type SharedStyle = Rc<RefCell<TextStyle>>;

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(&TextStyleConfig::default())
    }
}

impl TextStyle {
    pub fn new(config: &TextStyleConfig) -> Self {
        let theme = theme::current();
        Self {
            explicit: config.clone(),
            size: config.size.unwrap_or(theme.note.heading_sizes[5]),
            color: config.color.unwrap_or(theme.note.font_color),
            font: config.font.clone().unwrap_or_else(|| theme.font_family.clone()),
            weight: config.weight.unwrap_or_default(),
            style: config.style.unwrap_or_default(),
            strike: config.strike.unwrap_or_default(),
            theme: theme::subscribe(),
            revision: 0,
        }
    }

    pub fn shared(config: &TextStyleConfig) -> SharedStyle {
        Rc::new(RefCell::new(Self::new(config)))
    }

    /// Re-derive theme-backed fields if a new theme was published.
    pub fn sync_theme(&mut self) {
        if let Some(theme) = self.theme.changed() {
            self.size = self.explicit.size.unwrap_or(theme.note.heading_sizes[5]);
            self.color = self.explicit.color.unwrap_or(theme.note.font_color);
            self.font = self
                .explicit
                .font
                .clone()
                .unwrap_or_else(|| theme.font_family.clone());
            self.revision += 1;
        }
    }

    /// Bumped by every change that can affect measurement or drawing.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn font_spec(&self, scale: f64) -> FontSpec {
        FontSpec {
            size: self.size * scale,
            family: self.font.clone(),
            bold: self.weight == FontWeight::Bold,
            italic: self.style == FontStyle::Italic,
        }
    }

    /// Load this style into the surface at `scale`.
    pub fn setup(&mut self, surface: &mut dyn Surface, scale: f64) {
        self.sync_theme();
        surface.set_fill(self.color);
        surface.set_font(&self.font_spec(scale));
    }

    /// Width and ascent+descent of `text` at `scale`.
    pub fn measure(&mut self, surface: &mut dyn Surface, scale: f64, text: &str) -> Vector2 {
        self.setup(surface, scale);
        let m = surface.measure_text(text);
        Vector2::new(m.width, m.height())
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn weight(&self) -> FontWeight {
        self.weight
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn strike(&self) -> FontStrike {
        self.strike
    }

    pub fn set_size(&mut self, size: f64) -> &mut Self {
        self.explicit.size = Some(size);
        self.size = size;
        self.revision += 1;
        self
    }

    pub fn set_color(&mut self, color: Color) -> &mut Self {
        self.explicit.color = Some(color);
        self.color = color;
        self.revision += 1;
        self
    }

    pub fn set_font(&mut self, font: impl Into<String>) -> &mut Self {
        let font = font.into();
        self.explicit.font = Some(font.clone());
        self.font = font;
        self.revision += 1;
        self
    }

    pub fn set_weight(&mut self, weight: FontWeight) -> &mut Self {
        self.weight = weight;
        self.revision += 1;
        self
    }

    pub fn set_bold(&mut self, bold: bool) -> &mut Self {
        self.set_weight(if bold { FontWeight::Bold } else { FontWeight::Normal })
    }

    pub fn set_italic(&mut self, italic: bool) -> &mut Self {
        self.style = if italic { FontStyle::Italic } else { FontStyle::Normal };
        self.revision += 1;
        self
    }

    pub fn set_strike(&mut self, strike: FontStrike) -> &mut Self {
        self.strike = strike;
        self.revision += 1;
        self
    }
}

// ─── String fitting ──────────────────────────────────────────────────────

const ELLIPSIS: &str = "…";

/// Byte offsets of every char boundary, including the end.
fn char_bounds(s: &str) -> Vec<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .collect()
}

/// Largest prefix length (in chars) whose width does not exceed `target`.
/// An exact hit returns immediately.
fn search_prefix(
    surface: &dyn Surface,
    s: &str,
    bounds: &[usize],
    chars: usize,
    target: f64,
) -> usize {
    let mut min: isize = 0;
    let mut max: isize = chars as isize;
    while min <= max {
        let guess = (min + max) / 2;
        let width = surface.measure_text(&s[..bounds[guess as usize]]).width;
        if width == target {
            return guess as usize;
        }
        if width < target {
            min = guess + 1;
        } else {
            max = guess - 1;
        }
    }
    max.max(0) as usize
}

/// Where to break a string so its head fits, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Break {
    pub index: usize,
    /// False when no space was found and the break falls mid-word.
    pub word_boundary: bool,
}

/// Break point for `s` at `max_width` in the surface's current font, or
/// `None` when all of `s` fits. The index may be 0 when not even one char
/// fits.
pub fn find_break(surface: &dyn Surface, s: &str, max_width: f64) -> Option<Break> {
    if surface.measure_text(s).width <= max_width {
        return None;
    }
    let bounds = char_bounds(s);
    let chars: Vec<char> = s.chars().collect();
    let index = search_prefix(surface, s, &bounds, chars.len(), max_width);
    if index >= chars.len() {
        return None;
    }
    let found = (1..index).rev().find(|&i| chars[i] == ' ');
    Some(match found {
        Some(i) => Break {
            index: i + 1,
            word_boundary: true,
        },
        None => Break {
            index,
            word_boundary: false,
        },
    })
}

/// Split `s` at a char index.
fn split_chars(s: &str, index: usize) -> (&str, &str) {
    let at = s.char_indices().nth(index).map_or(s.len(), |(i, _)| i);
    s.split_at(at)
}

/// Truncate `s` with an ellipsis so it fits in `max_width`, using the
/// surface's current font.
pub fn fit_string(surface: &dyn Surface, s: &str, max_width: f64) -> String {
    let width = surface.measure_text(s).width;
    let ellipsis = surface.measure_text(ELLIPSIS).width;
    if width <= max_width || width <= ellipsis {
        return s.to_string();
    }
    let bounds = char_bounds(s);
    let index = search_prefix(surface, s, &bounds, bounds.len() - 1, max_width - ellipsis);
    format!("{}{ELLIPSIS}", &s[..bounds[index]])
}

/// Split `s` once so the head fits in `max_width`. The head is empty when
/// not even one char fits.
pub fn split_string(surface: &dyn Surface, s: &str, max_width: f64) -> Vec<String> {
    match find_break(surface, s, max_width) {
        None => vec![s.to_string()],
        Some(b) => {
            let (head, tail) = split_chars(s, b.index);
            vec![head.to_string(), tail.to_string()]
        }
    }
}

/// Break `s` into lines no wider than `max_width`, except where a single
/// word is wider on its own.
pub fn split_string_into_lines(surface: &dyn Surface, s: &str, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut remaining = s;
    loop {
        match find_break(surface, remaining, max_width) {
            None => {
                lines.push(remaining.to_string());
                break;
            }
            Some(b) => {
                let (line, rest) = split_chars(remaining, b.index.max(1));
                lines.push(line.to_string());
                remaining = rest;
                if remaining.is_empty() {
                    break;
                }
            }
        }
    }
    lines
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultilineTextConfig {
    pub max_width: Option<f64>,
    pub line_spacing: f64,
}

impl Default for MultilineTextConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            line_spacing: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MeasureKey {
    epoch: u64,
    revision: u64,
}

/// A run of text with a shared style and an optional wrap width.
#[derive(Debug, Clone)]
pub struct Text {
    value: String,
    style: SharedStyle,
    max_width: Option<f64>,
    line_spacing: f64,
    indent: usize,
    lines: Vec<String>,
    size: Vector2,
    measured: Option<MeasureKey>,
}

impl Text {
    pub fn new(value: impl Into<String>, style: &TextStyleConfig) -> Self {
        Self::with_style(value, TextStyle::shared(style))
    }

    pub fn with_style(value: impl Into<String>, style: SharedStyle) -> Self {
        let value = value.into();
        Self {
            lines: vec![value.clone()],
            value,
            style,
            max_width: None,
            line_spacing: MultilineTextConfig::default().line_spacing,
            indent: 0,
            size: Vector2::ZERO,
            measured: None,
        }
    }

    pub fn multiline(
        value: impl Into<String>,
        style: &TextStyleConfig,
        config: MultilineTextConfig,
    ) -> Self {
        let mut text = Self::new(value, style);
        text.max_width = config.max_width;
        text.line_spacing = config.line_spacing;
        text
    }

    /// New fragment sharing this text's style.
    fn derive(&self, value: &str) -> Text {
        Text::with_style(value, self.style.clone())
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.measured = None;
    }

    /// Leading indent in space characters.
    pub fn set_indent(&mut self, indent: usize) {
        self.indent = indent;
        self.measured = None;
    }

    pub fn set_max_width(&mut self, max_width: Option<f64>) {
        self.max_width = max_width;
        self.measured = None;
    }

    pub fn style(&self) -> &SharedStyle {
        &self.style
    }

    pub fn color(&self) -> Color {
        self.style.borrow().color()
    }

    pub fn set_color(&self, color: Color) {
        self.style.borrow_mut().set_color(color);
    }

    pub fn set_size(&self, size: f64) {
        self.style.borrow_mut().set_size(size);
    }

    pub fn set_weight(&self, weight: FontWeight) {
        self.style.borrow_mut().set_weight(weight);
    }

    pub fn break_into_lines(&self, surface: &mut dyn Surface, max_width: f64) -> Vec<Text> {
        self.style.borrow_mut().setup(surface, 1.0);
        let lines = split_string_into_lines(surface, &self.value, max_width);
        if lines.len() == 1 {
            return vec![self.clone()];
        }
        lines.iter().map(|l| self.derive(l)).collect()
    }

    pub fn split(&self, ch: char) -> Vec<Text> {
        self.value.split(ch).map(|part| self.derive(part)).collect()
    }

    /// Split before the char at `index`.
    pub fn split_at_index(&self, index: usize) -> [Text; 2] {
        let (head, tail) = split_chars(&self.value, index);
        [self.derive(head), self.derive(tail)]
    }

    pub fn split_at_width(&self, surface: &mut dyn Surface, max_width: f64) -> Vec<Text> {
        self.style.borrow_mut().setup(surface, 1.0);
        let parts = split_string(surface, &self.value, max_width);
        if parts.len() == 1 {
            return vec![self.clone()];
        }
        parts.iter().map(|p| self.derive(p)).collect()
    }

    fn key(&self) -> MeasureKey {
        let mut style = self.style.borrow_mut();
        style.sync_theme();
        MeasureKey {
            epoch: font_epoch(),
            revision: style.revision(),
        }
    }

    /// Unscaled size: single-line width × (ascent+descent), or for wrapped
    /// text the widest line × `(n-1)*line_spacing + n*font_size`.
    pub fn measure(&mut self, surface: &mut dyn Surface) -> Vector2 {
        let key = self.key();
        if self.measured == Some(key) {
            return self.size;
        }

        let font_size = {
            let mut style = self.style.borrow_mut();
            style.setup(surface, 1.0);
            style.size()
        };

        match self.max_width {
            None => {
                let m = surface.measure_text(&self.value);
                self.size = Vector2::new(m.width, m.height());
                self.lines = vec![self.value.clone()];
            }
            Some(max_width) => {
                self.lines = split_string_into_lines(surface, &self.value, max_width);
                let width = self
                    .lines
                    .iter()
                    .map(|l| surface.measure_text(l).width)
                    .fold(0.0, f64::max);
                let n = self.lines.len() as f64;
                self.size = Vector2::new(width, (n - 1.0) * self.line_spacing + font_size * n);
            }
        }
        self.measured = Some(key);
        self.size
    }

    pub fn scaled_size(&mut self, surface: &mut dyn Surface, scale: f64) -> Vector2 {
        self.measure(surface).scale(scale)
    }

    pub fn height(&mut self, surface: &mut dyn Surface) -> f64 {
        self.measure(surface).y
    }

    pub fn width(&mut self, surface: &mut dyn Surface) -> f64 {
        self.measure(surface).x
    }

    /// Lines produced by the last measurement.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Draw at `position` (alphabetic baseline of the first line).
    pub fn render(&mut self, surface: &mut dyn Surface, scale: f64, position: Vector2) {
        self.measure(surface);

        let (font_size, strike, color) = {
            let mut style = self.style.borrow_mut();
            style.setup(surface, scale);
            (style.size(), style.strike(), style.color())
        };

        let indent = " ".repeat(self.indent);
        let mut y_offset = 0.0;
        for line in &self.lines {
            let line = format!("{indent}{line}");
            surface.fill_text(&line, Vector2::new(position.x, position.y + y_offset));

            if strike != FontStrike::None {
                let width = surface.measure_text(&line).width;
                let y = position.y + y_offset - font_size * scale / 3.0;
                surface.save();
                surface.set_stroke(color);
                surface.set_line_width(scale.max(1.0));
                if strike == FontStrike::Dashed {
                    surface.set_line_dash(&[4.0 * scale, 4.0 * scale]);
                }
                surface.line(Vector2::new(position.x, y), Vector2::new(position.x + width, y));
                surface.restore();
            }

            y_offset += (font_size + self.line_spacing) * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, HeadlessSurface};

    fn style(size: f64) -> TextStyleConfig {
        TextStyleConfig::default().with_size(size)
    }

    #[test]
    fn single_line_measure() {
        let mut s = HeadlessSurface::default();
        let mut t = Text::new("hello", &style(10.0));
        assert_eq!(t.measure(&mut s), Vector2::new(30.0, 10.0));
    }

    #[test]
    fn wrapped_height_formula() {
        let mut s = HeadlessSurface::default();
        // 10px font: 6px per char; 60px fits 10 chars
        let mut t = Text::multiline(
            "aaaa bbbb cccc dddd",
            &style(10.0),
            MultilineTextConfig {
                max_width: Some(60.0),
                line_spacing: 5.0,
            },
        );
        let size = t.measure(&mut s);
        assert_eq!(t.lines(), ["aaaa bbbb ", "cccc dddd"]);
        assert_eq!(size.y, 5.0 + 2.0 * 10.0);
        assert_eq!(size.x, 60.0);
    }

    #[test]
    fn breaks_mid_word_without_spaces() {
        let mut s = HeadlessSurface::default();
        s.set_font(&FontSpec {
            size: 10.0,
            ..Default::default()
        });
        let lines = split_string_into_lines(&s, "abcdefghijklmnop", 30.0);
        assert_eq!(lines, ["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn always_advances_when_one_char_is_too_wide() {
        let mut s = HeadlessSurface::default();
        s.set_font(&FontSpec {
            size: 100.0,
            ..Default::default()
        });
        let lines = split_string_into_lines(&s, "abc", 10.0);
        assert_eq!(lines, ["a", "b", "c"]);
    }

    #[test]
    fn split_at_index_keeps_both_halves() {
        let t = Text::new("héllo", &style(10.0));
        let [a, b] = t.split_at_index(2);
        assert_eq!(a.get(), "hé");
        assert_eq!(b.get(), "llo");
    }

    #[test]
    fn split_fragments_share_style() {
        let t = Text::new("a,b", &style(10.0));
        let parts = t.split(',');
        parts[0].set_color(Color::WHITE);
        assert_eq!(parts[1].color(), Color::WHITE);
        assert_eq!(t.color(), Color::WHITE);
    }

    #[test]
    fn style_change_invalidates_measurement() {
        let mut s = HeadlessSurface::default();
        let mut t = Text::new("abc", &style(10.0));
        assert_eq!(t.width(&mut s), 18.0);
        t.set_size(20.0);
        assert_eq!(t.width(&mut s), 36.0);
    }

    #[test]
    fn font_epoch_forces_remeasure() {
        let mut s = HeadlessSurface::default();
        let mut t = Text::new("abc", &style(10.0));
        t.measure(&mut s);
        let key = t.measured;
        notify_fonts_loaded();
        assert_ne!(Some(t.key()), key);
    }

    #[test]
    fn fit_string_adds_ellipsis() {
        let mut s = HeadlessSurface::default();
        s.set_font(&FontSpec {
            size: 10.0,
            ..Default::default()
        });
        assert_eq!(fit_string(&s, "short", 100.0), "short");
        let fitted = fit_string(&s, "a long title here", 60.0);
        assert!(fitted.ends_with(ELLIPSIS));
        assert!(s.measure_text(&fitted).width <= 60.0);
    }

    #[test]
    fn render_strikes_through() {
        let mut s = HeadlessSurface::default();
        let mut t = Text::new("x", &style(12.0));
        t.style().borrow_mut().set_strike(FontStrike::Line);
        t.set_indent(2);
        t.render(&mut s, 1.0, Vector2::new(0.0, 100.0));
        assert_eq!(s.texts(), vec!["  x"]);
        assert!(s.ops().iter().any(|op| matches!(op, DrawOp::Line { from, .. } if from.y == 96.0)));
    }

    #[test]
    fn style_fallback_merges() {
        let a = TextStyleConfig::default().with_size(10.0);
        let b = TextStyleConfig::default().with_size(20.0).with_color(Color::WHITE);
        let merged = a.fallback(&b);
        assert_eq!(merged.size, Some(10.0));
        assert_eq!(merged.color, Some(Color::WHITE));
    }
}
