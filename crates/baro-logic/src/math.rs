//! 2D vector type and angle helpers shared by physics and animation.
//!
//! All angles are radians, counter-clockwise, in simulation units.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// 2D vector in simulation units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const UNIT_X: Self = Self { x: 1.0, y: 0.0 };
    pub const UNIT_Y: Self = Self { x: 0.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product of two vectors in the XY plane.
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate counter-clockwise by `angle` radians.
    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Perpendicular vector, `(-y, x)`.
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn lerp(self, target: Self, t: f32) -> Self {
        self + (target - self) * t
    }

    /// Component-wise smooth step toward `target`.
    pub fn smooth_step(self, target: Self, amount: f32) -> Self {
        Self::new(
            smooth_step(self.x, target.x, amount),
            smooth_step(self.y, target.y, amount),
        )
    }

    /// Angle of the vector measured from +X.
    pub fn to_angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Unit vector pointing along `angle`.
    pub fn from_angle(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(c, s)
    }

    pub fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn with_x(self, x: f32) -> Self {
        Self::new(x, self.y)
    }

    pub fn with_y(self, y: f32) -> Self {
        Self::new(self.x, y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl std::ops::Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle_two_pi(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle_pi(angle: f32) -> f32 {
    let wrapped = wrap_angle_two_pi(angle);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation that takes `from` to `to`.
pub fn shortest_angle(from: f32, to: f32) -> f32 {
    wrap_angle_pi(to - from)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smooth step from `a` to `b`; `amount` is clamped to `[0, 1]`.
pub fn smooth_step(a: f32, b: f32, amount: f32) -> f32 {
    let t = amount.clamp(0.0, 1.0);
    lerp(a, b, t * t * (3.0 - 2.0 * t))
}

/// Replace NaN/infinite values with zero.
pub fn valid_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Reflect `angle` about the axis at `axis` radians.
pub fn reflect_angle(angle: f32, axis: f32) -> f32 {
    2.0 * axis - angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_two_pi_bounds() {
        for a in [-100.0f32, -TAU, -0.0001, 0.0, 3.0, TAU, 1000.0] {
            let w = wrap_angle_two_pi(a);
            assert!((0.0..TAU).contains(&w), "{} wrapped to {}", a, w);
        }
        assert_eq!(wrap_angle_two_pi(f32::NAN), 0.0);
    }

    #[test]
    fn test_shortest_angle_crosses_zero() {
        let d = shortest_angle(0.1, TAU - 0.1);
        assert!((d + 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_smooth_step_endpoints() {
        assert_eq!(smooth_step(2.0, 4.0, 0.0), 2.0);
        assert_eq!(smooth_step(2.0, 4.0, 1.0), 4.0);
        assert_eq!(smooth_step(2.0, 4.0, 5.0), 4.0);
        assert!((smooth_step(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Vec2::UNIT_X.rotate(PI / 2.0);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_angle() {
        assert!((reflect_angle(0.3, 0.0) + 0.3).abs() < 1e-6);
        assert!((reflect_angle(0.0, PI / 2.0) - PI).abs() < 1e-6);
    }
}
