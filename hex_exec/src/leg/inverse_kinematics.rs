//! Leg inverse kinematics calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

// Internal imports
use super::*;
use crate::body_frame::BodyFrame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Joint-space angles of one leg, before any servo mounting correction.
///
/// Units: degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct JointAngles {
    pub femur_deg: f64,
    pub tibia_deg: f64,
    pub coxa_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointAngles {
    pub fn get(&self, joint: Joint) -> f64 {
        match joint {
            Joint::Femur => self.femur_deg,
            Joint::Tibia => self.tibia_deg,
            Joint::Coxa => self.coxa_deg,
        }
    }

    /// Servo demands in joint order.
    pub fn to_servo_deg(&self, coxa_mount_offset_deg: f64) -> [f64; 3] {
        let mut out = [0.0; 3];
        for joint in Joint::ALL.iter() {
            out[*joint as usize] = joint.to_servo_deg(self.get(*joint), coxa_mount_offset_deg);
        }
        out
    }

    fn is_finite(&self) -> bool {
        self.femur_deg.is_finite() && self.tibia_deg.is_finite() && self.coxa_deg.is_finite()
    }
}

impl Leg {
    /// Solve the joint angles for the current target and push them to the
    /// servos.
    ///
    /// If the target is outside the leg's reach nothing is sent, the
    /// previously solved angles are kept and `LegError::Unreachable` is
    /// returned.
    pub fn recompute_joint_angles(&mut self) -> Result<JointAngles, LegError> {
        let angles = solve(
            self.frame(),
            self.local_position(),
            self.height_above_ground(),
            self.body_height(),
        )
        .ok_or_else(|| LegError::Unreachable {
            leg: self.id(),
            target: self.local_position(),
            foot_height_mm: self.height_above_ground(),
            body_height_mm: self.body_height(),
        })?;

        trace!("{} leg angles: {:?}", self.id(), angles);

        self.set_joint_angles(angles);

        let servo_deg = angles.to_servo_deg(self.frame().coxa_mount_offset_deg);
        for (joint, angle_deg) in servo_deg.iter().enumerate() {
            self.servo().set_angle(self.id().motor_index(joint), *angle_deg);
        }

        Ok(angles)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the joint angles putting the foot at `local` in the leg frame.
///
/// `foot_height_mm` is how far the foot is raised off the ground and
/// `body_height_mm` how far the leg root is above the ground.
///
/// The femur angle is measured from the vertical through the femur joint and
/// the tibia angle is the inner angle between femur and tibia. The coxa angle
/// is the foot's heading from the leg's lateral axis, which is exact on the
/// degenerate `y == 0` axis.
///
/// Returns `None` when the target cannot be reached, i.e. when the segment
/// lengths cannot form a triangle with the root-to-foot distance. No clamping
/// is applied.
pub fn solve(
    frame: &BodyFrame,
    local: Vec2,
    foot_height_mm: f64,
    body_height_mm: f64,
) -> Option<JointAngles> {
    let femur = frame.femur_length_mm;
    let tibia = frame.tibia_length_mm;

    // atan(x/y) for every y != 0, without dividing by y
    let coxa_rad = if local.y < 0.0 {
        (-local.x).atan2(-local.y)
    } else {
        local.x.atan2(local.y.abs())
    };

    // Distance from the femur joint to the foot, projected onto the leg plane
    let planar_reach = local.magnitude();
    let horizontal = planar_reach - frame.coxa_length_mm;
    let reach = (body_height_mm.powi(2) + horizontal.powi(2)).sqrt();

    let femur_rad = ((body_height_mm - foot_height_mm) / reach).acos()
        + ((tibia.powi(2) - femur.powi(2) - reach.powi(2)) / (-2.0 * femur * reach)).acos();

    let tibia_rad =
        ((reach.powi(2) - tibia.powi(2) - femur.powi(2)) / (-2.0 * tibia * femur)).acos();

    let angles = JointAngles {
        femur_deg: femur_rad.to_degrees(),
        tibia_deg: tibia_rad.to_degrees(),
        coxa_deg: coxa_rad.to_degrees(),
    };

    if angles.is_finite() {
        Some(angles)
    } else {
        None
    }
}
