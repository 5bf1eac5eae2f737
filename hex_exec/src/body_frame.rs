//! Body geometry and the leg indexing table
//!
//! Legs are indexed 0-5 starting at the right front leg and running around
//! the body clockwise when seen from above:
//!
//! | idx | leg          | side  | longitudinal offset  | lateral offset      |
//! |-----|--------------|-------|----------------------|---------------------|
//! | 0   | RightFront   | right | +corner_longitudinal | corner_lateral      |
//! | 1   | RightMiddle  | right | 0                    | centre_lateral      |
//! | 2   | RightBack    | right | -corner_longitudinal | corner_lateral      |
//! | 3   | LeftBack     | left  | -corner_longitudinal | corner_lateral      |
//! | 4   | LeftMiddle   | left  | 0                    | centre_lateral      |
//! | 5   | LeftFront    | left  | +corner_longitudinal | corner_lateral      |
//!
//! Left legs are mirrored: every Y term of the local/body transform is
//! negated for them. Diagonal partners are `idx` and `(idx + 3) % 6`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::convert::TryFrom;
use std::fmt::Display;

use crate::vec2::Vec2;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of legs on the platform.
pub const NUM_LEGS: usize = 6;

/// The number of joints (and so servos) on each leg.
pub const NUM_JOINTS_PER_LEG: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed geometry of the platform.
///
/// Immutable once constructed, shared by every leg.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyFrame {
    // ---- LEG SEGMENTS ----
    /// Horizontal length from the leg root to the femur joint.
    ///
    /// Units: millimetres
    pub coxa_length_mm: f64,

    /// Length of the segment between the femur and tibia joints.
    ///
    /// Units: millimetres
    pub femur_length_mm: f64,

    /// Length of the segment between the tibia joint and the foot.
    ///
    /// Units: millimetres
    pub tibia_length_mm: f64,

    // ---- ATTACHMENT ----
    /// Lateral distance from the body centre to a middle leg's root.
    ///
    /// Units: millimetres
    pub centre_lateral_offset_mm: f64,

    /// Lateral distance from the body centre to a front or back leg's root.
    ///
    /// Units: millimetres
    pub corner_lateral_offset_mm: f64,

    /// Longitudinal distance from the body centre to a front or back leg's
    /// root.
    ///
    /// Units: millimetres
    pub corner_longitudinal_offset_mm: f64,

    /// Offset between the mathematical zero of the coxa angle and the servo's
    /// zero, caused by the way the servo is mounted.
    ///
    /// Units: degrees
    pub coxa_mount_offset_deg: f64,

    /// Neutral foot position of each leg in its own local frame, ordered by
    /// leg index.
    ///
    /// Units: millimetres
    pub rest_centres_mm: [[f64; 2]; NUM_LEGS],
}

/// How a single leg is attached to the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegMount {
    /// True for legs on the left side, whose local Y axis points the
    /// opposite way to the body Y axis.
    pub mirrored: bool,

    /// Position of the leg root along the body X axis.
    ///
    /// Units: millimetres
    pub longitudinal_mm: f64,

    /// Distance of the leg root from the body centre line.
    ///
    /// Units: millimetres
    pub lateral_mm: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies one of the six legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegId {
    RightFront = 0,
    RightMiddle = 1,
    RightBack = 2,
    LeftBack = 3,
    LeftMiddle = 4,
    LeftFront = 5,
}

/// Where along the body a leg is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegPosition {
    Front,
    Middle,
    Back,
}

/// A leg index outside of 0-5 was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Leg index {0} is outside of the valid range 0-5")]
pub struct InvalidLegIndexError(pub usize);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegId {
    /// All legs in index order.
    pub const ALL: [LegId; NUM_LEGS] = [
        LegId::RightFront,
        LegId::RightMiddle,
        LegId::RightBack,
        LegId::LeftBack,
        LegId::LeftMiddle,
        LegId::LeftFront,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Left legs are mirrored relative to the body frame.
    pub fn is_mirrored(self) -> bool {
        self.index() >= NUM_LEGS / 2
    }

    pub fn position(self) -> LegPosition {
        match self {
            LegId::RightFront | LegId::LeftFront => LegPosition::Front,
            LegId::RightMiddle | LegId::LeftMiddle => LegPosition::Middle,
            LegId::RightBack | LegId::LeftBack => LegPosition::Back,
        }
    }

    /// The leg on the opposite side and opposite end of the body.
    pub fn diagonal(self) -> LegId {
        LegId::ALL[(self.index() + NUM_LEGS / 2) % NUM_LEGS]
    }

    /// Direction the leg points in, in the body frame.
    ///
    /// Units: degrees
    pub fn heading_deg(self) -> f64 {
        if self.is_mirrored() {
            90.0
        } else {
            -90.0
        }
    }

    /// Index of the servo driving the given joint of this leg.
    pub fn motor_index(self, joint: usize) -> usize {
        self.index() * NUM_JOINTS_PER_LEG + joint
    }
}

impl TryFrom<usize> for LegId {
    type Error = InvalidLegIndexError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        LegId::ALL
            .get(value)
            .copied()
            .ok_or(InvalidLegIndexError(value))
    }
}

impl Display for LegId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegId::RightFront => f.write_str("right front"),
            LegId::RightMiddle => f.write_str("right middle"),
            LegId::RightBack => f.write_str("right back"),
            LegId::LeftBack => f.write_str("left back"),
            LegId::LeftMiddle => f.write_str("left middle"),
            LegId::LeftFront => f.write_str("left front"),
        }
    }
}

impl BodyFrame {
    /// Attachment of the given leg, see the module level table.
    pub fn mount(&self, leg: LegId) -> LegMount {
        let (longitudinal_mm, lateral_mm) = match leg.position() {
            LegPosition::Front => (
                self.corner_longitudinal_offset_mm,
                self.corner_lateral_offset_mm,
            ),
            LegPosition::Middle => (0.0, self.centre_lateral_offset_mm),
            LegPosition::Back => (
                -self.corner_longitudinal_offset_mm,
                self.corner_lateral_offset_mm,
            ),
        };

        LegMount {
            mirrored: leg.is_mirrored(),
            longitudinal_mm,
            lateral_mm,
        }
    }

    /// Rest centre of the given leg in its local frame.
    pub fn rest_centre(&self, leg: LegId) -> Vec2 {
        self.rest_centres_mm[leg.index()].into()
    }
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self {
            coxa_length_mm: 53.0,
            femur_length_mm: 81.0,
            tibia_length_mm: 120.0,
            centre_lateral_offset_mm: 85.0,
            corner_lateral_offset_mm: 50.0,
            corner_longitudinal_offset_mm: 86.5,
            coxa_mount_offset_deg: -90.0,
            rest_centres_mm: [
                [100.0, 100.0],
                [0.0, 160.0],
                [-100.0, 100.0],
                [-100.0, 100.0],
                [0.0, 160.0],
                [100.0, 100.0],
            ],
        }
    }
}

impl LegMount {
    fn y_sign(&self) -> f64 {
        if self.mirrored {
            -1.0
        } else {
            1.0
        }
    }

    /// Convert a point in the leg's local frame into the body frame.
    pub fn local_to_global(&self, local: Vec2) -> Vec2 {
        Vec2::new(
            local.x + self.longitudinal_mm,
            self.y_sign() * (local.y + self.lateral_mm),
        )
    }

    /// Convert a point in the body frame into the leg's local frame.
    pub fn global_to_local(&self, global: Vec2) -> Vec2 {
        Vec2::new(
            global.x - self.longitudinal_mm,
            self.y_sign() * global.y - self.lateral_mm,
        )
    }
}
