//! Planar vector used for leg targets and body-frame positions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// Internal
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A 2D point or displacement.
///
/// Units: millimetres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Length of the vector.
    pub fn magnitude(&self) -> f64 {
        self.as_vector().norm()
    }

    /// Euclidean distance between two points.
    pub fn distance(a: Vec2, b: Vec2) -> f64 {
        // Both slices are always two long
        maths::norm(&[a.x, a.y], &[b.x, b.y]).unwrap_or(std::f64::NAN)
    }

    /// Return this vector rotated anticlockwise about the origin.
    pub fn rotated(&self, angle_deg: f64) -> Vec2 {
        (Rotation2::new(angle_deg.to_radians()) * self.as_vector()).into()
    }

    /// Rotate this vector in place anticlockwise about the origin.
    pub fn rotate(&mut self, angle_deg: f64) {
        *self = self.rotated(angle_deg);
    }

    /// Polar angle of the vector in degrees, in the range [0, 360).
    ///
    /// The axes are handled explicitly so that a vector lying on an axis maps
    /// to exactly 0, 90, 180 or 270. The zero vector has an angle of 0.
    pub fn polar_angle_deg(&self) -> f64 {
        if self.x == 0.0 {
            return if self.y > 0.0 {
                90.0
            } else if self.y < 0.0 {
                270.0
            } else {
                0.0
            };
        }
        if self.y == 0.0 {
            return if self.x >= 0.0 { 0.0 } else { 180.0 };
        }

        let base = (self.y / self.x).atan().to_degrees();

        let angle = if self.x < 0.0 {
            // Quadrants II and III
            180.0 + base
        } else if self.y < 0.0 {
            // Quadrant IV, base is negative here
            270.0 + (90.0 + base)
        } else {
            base
        };

        maths::wrap_360(angle)
    }

    fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<Vector2<f64>> for Vec2 {
    fn from(v: Vector2<f64>) -> Self {
        Vec2::new(v.x, v.y)
    }
}

impl From<Vec2> for Vector2<f64> {
    fn from(v: Vec2) -> Self {
        v.as_vector()
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from(a: [f64; 2]) -> Self {
        Vec2::new(a[0], a[1])
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        *self = *self - rhs;
    }
}
