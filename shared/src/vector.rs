//! Two dimensional vector used for positions and directions on the wire

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// World-space vector. Serialized as `{"x":..,"y":..}`.
///
/// Screen conventions apply: `+y` points down, so "up" is `(0, -1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };
    pub const UP: Vector2D = Vector2D { x: 0.0, y: -1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn dot(&self, other: Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Scales the vector to unit length in place.
    ///
    /// Zero-length and non-finite vectors become [`Vector2D::ZERO`]; the result
    /// never contains NaN.
    pub fn normalize(&mut self) {
        *self = self.normalized();
    }

    pub fn normalized(self) -> Self {
        let length = self.length();
        if !length.is_finite() || length <= 0.0 {
            return Self::ZERO;
        }
        Self::new(self.x / length, self.y / length)
    }

    /// Heading in degrees, `0` pointing up and increasing clockwise, in the
    /// range `(-180, 180]`.
    ///
    /// Degenerate input (zero, NaN, infinite) maps to `0`, the neutral
    /// rotation.
    pub fn to_angle(self) -> f64 {
        let unit = self.normalized();
        if unit == Self::ZERO {
            return 0.0;
        }

        let mut theta = (-unit.y).clamp(-1.0, 1.0).acos();
        if unit.x < 0.0 {
            theta = -theta;
        }
        theta.to_degrees()
    }

    /// Inverse of [`Vector2D::to_angle`].
    pub fn from_angle(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Self::UP;
        }
        let radians = degrees.to_radians();
        Self::new(radians.sin(), -radians.cos())
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, rhs: f64) -> Vector2D {
        Vector2D::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_unit_length() {
        let mut v = Vector2D::new(3.0, -4.0);
        v.normalize();
        assert_approx_eq!(v.length(), 1.0, 1e-12);
        assert_approx_eq!(v.x, 0.6, 1e-12);
        assert_approx_eq!(v.y, -0.8, 1e-12);
    }

    #[test]
    fn test_normalize_zero_stays_zero() {
        let v = Vector2D::new(0.0, 0.0).normalized();
        assert_eq!(v, Vector2D::ZERO);
        assert!(!v.x.is_nan() && !v.y.is_nan());
    }

    #[test]
    fn test_normalize_non_finite_is_zero() {
        assert_eq!(Vector2D::new(f64::NAN, 1.0).normalized(), Vector2D::ZERO);
        assert_eq!(
            Vector2D::new(f64::INFINITY, 1.0).normalized(),
            Vector2D::ZERO
        );
    }

    #[test]
    fn test_normalize_huge_components() {
        let v = Vector2D::new(f64::MAX, f64::MAX).normalized();
        assert_approx_eq!(v.length(), 1.0, 1e-12);
    }

    #[test]
    fn test_to_angle_cardinal_directions() {
        assert_approx_eq!(Vector2D::new(0.0, -1.0).to_angle(), 0.0, 1e-9);
        assert_approx_eq!(Vector2D::new(1.0, 0.0).to_angle(), 90.0, 1e-9);
        assert_approx_eq!(Vector2D::new(0.0, 1.0).to_angle(), 180.0, 1e-9);
        assert_approx_eq!(Vector2D::new(-1.0, 0.0).to_angle(), -90.0, 1e-9);
    }

    #[test]
    fn test_to_angle_ignores_magnitude() {
        assert_approx_eq!(Vector2D::new(25.0, -25.0).to_angle(), 45.0, 1e-9);
    }

    #[test]
    fn test_to_angle_degenerate_is_neutral() {
        assert_eq!(Vector2D::ZERO.to_angle(), 0.0);
        assert_eq!(Vector2D::new(f64::NAN, f64::NAN).to_angle(), 0.0);
        assert_eq!(Vector2D::new(f64::NEG_INFINITY, 2.0).to_angle(), 0.0);
    }

    #[test]
    fn test_from_angle_inverts_to_angle() {
        for degrees in [-135.0, -90.0, -10.0, 0.0, 33.0, 90.0, 179.0] {
            let v = Vector2D::from_angle(degrees);
            assert_approx_eq!(v.length(), 1.0, 1e-12);
            assert_approx_eq!(v.to_angle(), degrees, 1e-9);
        }
        assert_eq!(Vector2D::from_angle(f64::NAN), Vector2D::UP);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector2D::new(1.0, 2.0);
        let b = Vector2D::new(-3.0, 0.5);
        assert_eq!(a + b, Vector2D::new(-2.0, 2.5));
        assert_eq!(a - b, Vector2D::new(4.0, 1.5));
        assert_eq!(a * 2.0, Vector2D::new(2.0, 4.0));
        assert_approx_eq!(a.dot(b), -2.0, 1e-12);
    }

    #[test]
    fn test_json_shape() {
        let v: Vector2D = serde_json::from_str(r#"{"x":-12.5,"y":40}"#).unwrap();
        assert_eq!(v, Vector2D::new(-12.5, 40.0));
        assert_eq!(
            serde_json::to_string(&Vector2D::UP).unwrap(),
            r#"{"x":0.0,"y":-1.0}"#
        );
    }
}
