//! geometry primitives shared between the engine and its host

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Two-component vector used for both positions and sizes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub const fn splat(v: f64) -> Self {
        Vec2 { x: v, y: v }
    }

    pub fn round(self) -> Self {
        Vec2::new(self.x.round(), self.y.round())
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle described by origin and size.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Rect { origin, size }
    }

    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (self.origin.x..=self.max().x).contains(&point.x)
            && (self.origin.y..=self.max().y).contains(&point.y)
    }

    pub fn area(&self) -> f64 {
        self.size.x * self.size.y
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        (self - other).abs() < how_much
    }
}

impl IsWithin for Vec2 {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin.is_within(how_much, other.origin) && self.size.is_within(how_much, other.size)
    }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool {
        self.is_within(0.1, other)
    }
}

impl SameAs for f64 {}
impl SameAs for Vec2 {}
impl SameAs for Rect {}

/// Slack for deciding whether a node edge sits on a display edge.
pub const STICK_SLACK: f64 = 2.0;

/// Edge-stick comparison used for outer-gap and resize-clamp decisions.
pub fn sticks(a: f64, b: f64) -> bool {
    a.is_within(STICK_SLACK, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = Vec2::new(10.0, 20.0);
        let b = Vec2::new(1.0, 2.0);
        assert_eq!(a + b, Vec2::new(11.0, 22.0));
        assert_eq!(a - b, Vec2::new(9.0, 18.0));
        assert_eq!(b * 3.0, Vec2::new(3.0, 6.0));
    }

    #[test]
    fn rect_contains_and_max() {
        let r = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
        assert_eq!(r.max(), Vec2::new(110.0, 60.0));
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(r.contains(Vec2::new(110.0, 60.0)));
        assert!(!r.contains(Vec2::new(111.0, 60.0)));
        assert_eq!(r.area(), 5000.0);
    }

    #[test]
    fn stick_comparison() {
        assert!(sticks(0.0, 1.5));
        assert!(sticks(1920.0, 1919.0));
        assert!(!sticks(0.0, 2.0));
    }

    #[test]
    fn same_as_tolerance() {
        assert!(1.0_f64.same_as(1.05));
        assert!(!1.0_f64.same_as(1.2));
        assert!(Vec2::new(1.0, 1.0).same_as(Vec2::new(1.05, 0.95)));
    }
}
