//! 2D geometry primitives shared by every layer of the engine.
//!
//! Screen space and graph space both use these types; the [`Camera`]
//! converts between the two.
//!
//! [`Camera`]: crate::camera::Camera

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// ─── Vector2 ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn distance(a: Vector2, b: Vector2) -> f64 {
        let xd = b.x - a.x;
        let yd = b.y - a.y;
        (xd * xd + yd * yd).sqrt()
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        self.scale(rhs)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

// ─── BoundingBox ─────────────────────────────────────────────────────────

/// Axis-aligned rectangle `{pos, size}`.
///
/// `size` may be negative while a drag-select rectangle is being drawn
/// backwards; [`BoundingBox::intersects`] normalizes both operands first.
/// [`BoundingBox::contains`] treats `pos` as the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub pos: Vector2,
    pub size: Vector2,
}

impl BoundingBox {
    pub const fn new(pos: Vector2, size: Vector2) -> Self {
        Self { pos, size }
    }

    pub const fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            pos: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    /// Box spanning two corners given in any order.
    pub fn from_corners(a: Vector2, b: Vector2) -> Self {
        Self::new(a, b - a).normalized()
    }

    /// Min/max corners with negative extents flipped.
    pub fn min_max(&self) -> (Vector2, Vector2) {
        let a = self.pos;
        let b = self.pos + self.size;
        (
            Vector2::new(a.x.min(b.x), a.y.min(b.y)),
            Vector2::new(a.x.max(b.x), a.y.max(b.y)),
        )
    }

    /// Same area with a non-negative size.
    pub fn normalized(&self) -> Self {
        let (min, max) = self.min_max();
        Self::new(min, max - min)
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let (a_min, a_max) = self.min_max();
        let (b_min, b_max) = other.min_max();
        a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
    }

    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.pos.x
            && p.y >= self.pos.y
            && p.x <= self.pos.x + self.size.x
            && p.y <= self.pos.y + self.size.y
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(
            self.pos.x + self.size.x / 2.0,
            self.pos.y + self.size.y / 2.0,
        )
    }

    pub fn right(&self) -> f64 {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> f64 {
        self.pos.y + self.size.y
    }

    /// Grow every side by `amount`.
    pub fn inflate(&self, amount: f64) -> Self {
        Self::from_xywh(
            self.pos.x - amount,
            self.pos.y - amount,
            self.size.x + amount * 2.0,
            self.size.y + amount * 2.0,
        )
    }
}

pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
