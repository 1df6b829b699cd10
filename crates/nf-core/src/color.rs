//! Colors, HSV conversion and the per-data-type fallback palette.

use crate::geometry::clamp01;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ─── Color ───────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn hex_pair(hi: u8, lo: u8) -> Option<f32> {
    Some((hex_val(hi)? << 4 | hex_val(lo)?) as f32 / 255.0)
}

fn hex_single(c: u8) -> Option<f32> {
    Some((hex_val(c)? * 17) as f32 / 255.0)
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            (clamp01(self.r as f64) * 255.0).round() as u8,
            (clamp01(self.g as f64) * 255.0).round() as u8,
            (clamp01(self.b as f64) * 255.0).round() as u8,
            (clamp01(self.a as f64) * 255.0).round() as u8,
        ]
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let b = hex.as_bytes();

        match b.len() {
            3 => Some(Self::rgb(hex_single(b[0])?, hex_single(b[1])?, hex_single(b[2])?)),
            4 => Some(Self::rgba(
                hex_single(b[0])?,
                hex_single(b[1])?,
                hex_single(b[2])?,
                hex_single(b[3])?,
            )),
            6 => Some(Self::rgb(
                hex_pair(b[0], b[1])?,
                hex_pair(b[2], b[3])?,
                hex_pair(b[4], b[5])?,
            )),
            8 => Some(Self::rgba(
                hex_pair(b[0], b[1])?,
                hex_pair(b[2], b[3])?,
                hex_pair(b[4], b[5])?,
                hex_pair(b[6], b[7])?,
            )),
            _ => None,
        }
    }

    /// `rgba(r, g, b, a)` with 0-255 channels and a 0-1 alpha, or
    /// `rgb(r, g, b)`.
    fn from_css_fn(s: &str) -> Option<Self> {
        let (body, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return None;
        };
        let body = body.strip_suffix(')')?;
        let parts: Vec<f32> = body
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;
        match (parts.as_slice(), has_alpha) {
            ([r, g, b, a], true) => Some(Self::rgba(r / 255.0, g / 255.0, b / 255.0, *a)),
            ([r, g, b], false) => Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0)),
            _ => None,
        }
    }

    /// Emit as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    pub fn to_hsv(&self) -> Hsv {
        rgb_to_hsv(*self)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            "transparent" => return Ok(Color::TRANSPARENT),
            _ => {}
        }
        Color::from_hex(s)
            .or_else(|| Color::from_css_fn(s))
            .ok_or_else(|| format!("invalid color {s:?}"))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─── HSV ─────────────────────────────────────────────────────────────────

/// Hue in degrees [0, 360), saturation and value in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub const fn new(h: f64, s: f64, v: f64) -> Self {
        Self { h, s, v }
    }

    pub fn to_rgb(&self) -> Color {
        hsv_to_rgb(*self)
    }
}

pub fn hsv_to_rgb(hsv: Hsv) -> Color {
    if hsv.s <= 0.0 {
        let v = clamp01(hsv.v) as f32;
        return Color::rgb(v, v, v);
    }

    let mut hh = hsv.h;
    if hh >= 360.0 {
        hh = 0.0;
    }
    hh /= 60.0;

    let sector = hh.floor();
    let ff = hh - sector;
    let v = hsv.v;
    let p = v * (1.0 - hsv.s);
    let q = v * (1.0 - hsv.s * ff);
    let t = v * (1.0 - hsv.s * (1.0 - ff));

    let (r, g, b) = match sector as i64 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Color::rgb(clamp01(r) as f32, clamp01(g) as f32, clamp01(b) as f32)
}

pub fn rgb_to_hsv(rgb: Color) -> Hsv {
    let (r, g, b) = (rgb.r as f64, rgb.g as f64, rgb.b as f64);
    let min = r.min(g).min(b);
    let max = r.max(g).max(b);
    let delta = max - min;

    if delta < 0.00001 || max <= 0.0 {
        return Hsv::new(0.0, 0.0, max);
    }

    let mut h = if r >= max {
        (g - b) / delta
    } else if g >= max {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }
    Hsv::new(h, delta / max, max)
}

// ─── Fallback port colors ────────────────────────────────────────────────

/// Deterministic hue for a data-type tag: the position-weighted sum of its
/// char codes picks one of 24 buckets on the hue wheel.
pub fn fallback_port_color(data_type: &str, saturation: f64) -> Color {
    let hash: u64 = data_type
        .chars()
        .enumerate()
        .map(|(i, c)| c as u64 * (i as u64 + 1))
        .sum();
    let bucket = (hash % 24) as f64;
    hsv_to_rgb(Hsv::new(bucket / 23.0 * 360.0, saturation, 1.0))
}
