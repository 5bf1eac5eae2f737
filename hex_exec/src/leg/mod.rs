//! Leg kinematics module
//!
//! A [`Leg`] owns one leg's foot target in its local frame, the foot height,
//! the step state machine and the last solved joint angles. Solving is done
//! in [`inverse_kinematics`], and every solve pushes the three joint demands
//! to the leg's servo sink.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod inverse_kinematics;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt::Display;

// Internal
use crate::{
    body_frame::{InvalidLegIndexError, LegId},
    vec2::Vec2,
};
pub use inverse_kinematics::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Absolute tolerance used when checking whether a foot is at its rest
/// centre.
///
/// Units: millimetres
pub const CENTRE_TOLERANCE_MM: f64 = 0.001;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Foot planted, height is zero.
    OnGround,
    /// Foot raised, waiting to swing to its new ground point.
    MovingUp,
    /// Foot raised above its new ground point, waiting to touch down.
    MovingToTarget,
}

/// Joints of a single leg, in servo order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    /// Vertical lift of the upper segment.
    Femur = 0,
    /// Bend between the two lower segments.
    Tibia = 1,
    /// Horizontal swing of the whole leg.
    Coxa = 2,
}

/// Possible errors raised by leg operations.
#[derive(Debug, thiserror::Error)]
pub enum LegError {
    #[error("Cannot lift the {leg} leg as it is not on the ground (state: {state:?})")]
    InvalidState { leg: LegId, state: MotionState },

    #[error(transparent)]
    InvalidIndex(#[from] InvalidLegIndexError),

    #[error(
        "The {leg} leg cannot reach ({:.3}, {:.3}) with foot height {foot_height_mm:.3} and \
        body height {body_height_mm:.3}",
        .target.x,
        .target.y
    )]
    Unreachable {
        leg: LegId,
        target: Vec2,
        foot_height_mm: f64,
        body_height_mm: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Joint {
    pub const ALL: [Joint; 3] = [Joint::Femur, Joint::Tibia, Joint::Coxa];

    /// Convert a joint-space angle into the servo angle, accounting for the
    /// way each servo is mounted.
    pub fn to_servo_deg(self, angle_deg: f64, coxa_mount_offset_deg: f64) -> f64 {
        match self {
            Joint::Femur => angle_deg,
            Joint::Tibia => 180.0 - angle_deg,
            Joint::Coxa => angle_deg - coxa_mount_offset_deg,
        }
    }
}

impl Display for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Joint::Femur => f.write_str("femur"),
            Joint::Tibia => f.write_str("tibia"),
            Joint::Coxa => f.write_str("coxa"),
        }
    }
}
